//! Empirical metric-validity checks.
//!
//! A measure that declares itself a metric lets the index prune with the triangle
//! inequality. These checks sample a record set and look for counter-examples, which is the
//! evidence a caller needs before opting into heuristic pruning for a measure that does not
//! make that declaration.

use rand::prelude::*;

use super::traits::Measure;

/// Slack allowed before a sampled triple counts as a violation.
pub const TOLERANCE: f64 = 1e-7;

/// Outcome of [`check_triangle_inequality`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricCheckReport {
    /// Triples sampled.
    pub triples_checked: usize,
    /// Triples where `d(x, z) > d(x, y) + d(y, z)`.
    pub triangle_violations: usize,
    /// Sampled pairs where `d(x, y) != d(y, x)`.
    pub symmetry_violations: usize,
    /// Sampled values where `d(x, x) != 0`.
    pub identity_violations: usize,
    /// Largest triangle-inequality excess seen.
    pub max_excess: f64,
}

impl MetricCheckReport {
    /// No violation of any kind was sampled.
    pub fn is_consistent(&self) -> bool {
        self.triangle_violations == 0
            && self.symmetry_violations == 0
            && self.identity_violations == 0
    }
}

/// Sample `samples` random triples from `items` and test the metric axioms on each.
///
/// Fewer than three items yields an empty report.
pub fn check_triangle_inequality<T, M>(
    measure: &M,
    items: &[T],
    samples: usize,
    seed: u64,
) -> MetricCheckReport
where
    M: Measure<T> + ?Sized,
{
    let mut report = MetricCheckReport::default();
    let n = items.len();
    if n < 3 {
        return report;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..samples {
        let x = &items[rng.random_range(0..n)];
        let y = &items[rng.random_range(0..n)];
        let z = &items[rng.random_range(0..n)];

        let xy = measure.distance(x, y);
        let yz = measure.distance(y, z);
        let xz = measure.distance(x, z);

        let excess = xz - (xy + yz);
        if excess > TOLERANCE {
            report.triangle_violations += 1;
            report.max_excess = report.max_excess.max(excess);
        }
        if (xy - measure.distance(y, x)).abs() > TOLERANCE {
            report.symmetry_violations += 1;
        }
        if measure.distance(x, x).abs() > TOLERANCE {
            report.identity_violations += 1;
        }
        report.triples_checked += 1;
    }

    report
}
