//! Reference-point (pivot) index for metric range search.
//!
//! # The Core Insight
//!
//! Comparing every query with every stored record costs `|Q| * |S|` distance evaluations.
//! Precompute the distance from each stored record to a few pivots instead. For a metric the
//! triangle inequality gives, for every pivot `p`:
//!
//! ```text
//! d(q, x) >= |d(p, q) - d(p, x)|
//! ```
//!
//! so `lb(x) = max_p |d(p, q) - d(p, x)|` is a lower bound on the true distance. Any `x` with
//! `lb(x) > T` is out of range and its distance never needs computing.
//!
//! # Cost
//!
//! - **Build**: `|S| * k` distance evaluations, one independent row per stored record
//!   (parallel with the `parallel` feature).
//! - **Query**: `k` evaluations against the pivots, then one per unpruned record.
//! - **Space**: `|S| * k` floats.
//!
//! # Non-metric measures
//!
//! If the measure breaks the triangle inequality the bound can exceed the true distance and
//! pruning drops records that are in range. [`PruningPolicy`] makes that choice explicit:
//! by default an index over a measure that does not declare itself a metric answers by
//! linear scan.
//!
//! # References
//!
//! - Chávez et al. (2001). "Searching in Metric Spaces"
//! - Zezula et al. (2006). "Similarity Search: The Metric Space Approach"

use std::collections::HashMap;

use ndarray::Array2;
use rand::prelude::*;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::traits::{sort_neighbours, Neighbour, RangeSearch};
use crate::error::{Error, Result};
use crate::measure::Measure;

/// Rounding slack added to the threshold before a bound prunes.
const PRUNE_SLACK: f64 = 1e-9;

/// When the index may skip records using the pivot lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PruningPolicy {
    /// Prune only if the measure declares itself a true metric; otherwise scan.
    #[default]
    RequireMetric,
    /// Prune regardless. Records in range may be missed for non-metric measures.
    AllowHeuristic,
    /// Never prune.
    Disabled,
}

/// Index construction parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexConfig {
    /// Number of pivots. Clamped to the stored set size; 0 means linear scan.
    pub n_pivots: usize,
    /// Seed for pivot sampling.
    pub seed: u64,
    /// Pruning policy.
    pub pruning: PruningPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            n_pivots: 20,
            seed: 42,
            pruning: PruningPolicy::RequireMetric,
        }
    }
}

impl IndexConfig {
    /// Create with `n_pivots` pivots and default seed and policy.
    pub fn new(n_pivots: usize) -> Self {
        Self {
            n_pivots,
            ..Self::default()
        }
    }

    /// Set the pivot sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the pruning policy.
    pub fn with_pruning(mut self, pruning: PruningPolicy) -> Self {
        self.pruning = pruning;
        self
    }
}

/// Work done by one range query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Distances evaluated, pivots included.
    pub distance_computations: u64,
    /// Stored records skipped by the lower bound.
    pub distances_pruned: u64,
}

impl QueryStats {
    /// Fraction of stored records skipped (higher is better).
    pub fn prune_fraction(&self, stored: usize) -> f64 {
        if stored == 0 {
            0.0
        } else {
            self.distances_pruned as f64 / stored as f64
        }
    }

    /// Add another query's counts.
    pub fn merge(&mut self, other: &QueryStats) {
        self.distance_computations += other.distance_computations;
        self.distances_pruned += other.distances_pruned;
    }
}

/// Pivot table over a stored set. Read-only once built and safe to query from many threads.
#[derive(Debug)]
pub struct ReferencePointIndex<T, M> {
    items: Vec<T>,
    measure: M,
    /// Stored positions of the pivots.
    pivots: Vec<usize>,
    /// Stored position -> pivot column, for reusing pivot distances.
    pivot_column: HashMap<usize, usize>,
    /// `table[[x, j]] = d(pivots[j], x)`.
    table: Array2<f64>,
    prune: bool,
}

impl<T, M> ReferencePointIndex<T, M>
where
    T: Sync,
    M: Measure<T>,
{
    /// Sample pivots and compute every stored item's distance to each of them.
    pub fn build(items: Vec<T>, measure: M, config: &IndexConfig) -> Result<Self> {
        let n = items.len();
        let k = config.n_pivots.min(n);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let pivots = rand::seq::index::sample(&mut rng, n, k).into_vec();
        let pivot_column = pivots
            .iter()
            .enumerate()
            .map(|(column, &position)| (position, column))
            .collect();

        let mut data = vec![0.0; n * k];
        if k > 0 {
            let fill = |(row, x): (&mut [f64], &T)| {
                for (slot, &p) in row.iter_mut().zip(&pivots) {
                    *slot = measure.distance(&items[p], x);
                }
            };

            #[cfg(feature = "parallel")]
            data.par_chunks_mut(k).zip(items.par_iter()).for_each(fill);

            #[cfg(not(feature = "parallel"))]
            data.chunks_mut(k).zip(items.iter()).for_each(fill);
        }
        let table = Array2::from_shape_vec((n, k), data)
            .map_err(|e| Error::Other(format!("pivot table: {e}")))?;

        let metric = measure.is_true_metric();
        let prune = match config.pruning {
            PruningPolicy::Disabled => false,
            PruningPolicy::AllowHeuristic => {
                if !metric && k > 0 {
                    warn!("heuristic pruning over a non-metric measure; in-range records may be missed");
                }
                true
            }
            PruningPolicy::RequireMetric => {
                if !metric && k > 0 {
                    warn!("measure is not a declared metric; range queries fall back to linear scan");
                }
                metric
            }
        };
        let prune = prune && k > 0;

        debug!(stored = n, pivots = k, prune, "built reference-point index");

        Ok(Self {
            items,
            measure,
            pivots,
            pivot_column,
            table,
            prune,
        })
    }

    /// Stored items in stored order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Stored positions of the pivots.
    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// Whether queries use the pivot lower bound.
    pub fn prunes(&self) -> bool {
        self.prune
    }

    /// The measure the index was built with.
    pub fn measure(&self) -> &M {
        &self.measure
    }

    /// Range query that also reports how much work was done.
    pub fn range_query_with_stats(&self, query: &T, threshold: f64) -> (Vec<Neighbour>, QueryStats) {
        let mut stats = QueryStats::default();
        let mut out = Vec::new();

        if !self.prune {
            for (index, x) in self.items.iter().enumerate() {
                let distance = self.measure.distance(x, query);
                stats.distance_computations += 1;
                if distance <= threshold {
                    out.push(Neighbour { index, distance });
                }
            }
            sort_neighbours(&mut out);
            return (out, stats);
        }

        let to_pivots: Vec<f64> = self
            .pivots
            .iter()
            .map(|&p| self.measure.distance(&self.items[p], query))
            .collect();
        stats.distance_computations += to_pivots.len() as u64;

        let bound = threshold + PRUNE_SLACK;
        for (index, row) in self.table.outer_iter().enumerate() {
            let distance = match self.pivot_column.get(&index) {
                Some(&column) => to_pivots[column],
                None => {
                    let lower = row
                        .iter()
                        .zip(&to_pivots)
                        .map(|(px, pq)| (pq - px).abs())
                        .fold(0.0, f64::max);
                    if lower > bound {
                        stats.distances_pruned += 1;
                        continue;
                    }
                    stats.distance_computations += 1;
                    self.measure.distance(&self.items[index], query)
                }
            };
            if distance <= threshold {
                out.push(Neighbour { index, distance });
            }
        }

        sort_neighbours(&mut out);
        (out, stats)
    }
}

impl<T, M> RangeSearch<T> for ReferencePointIndex<T, M>
where
    T: Sync,
    M: Measure<T>,
{
    fn range_query(&self, query: &T, threshold: f64) -> Vec<Neighbour> {
        self.range_query_with_stats(query, threshold).0
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
