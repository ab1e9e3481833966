//! String distances for single field values, adapted from `strsim`.
//!
//! All adapters share one policy for absent values:
//!
//! | a | b | distance |
//! |---|---|----------|
//! | empty | empty | 0.0 |
//! | empty | non-empty | 1.0 |
//! | non-empty | non-empty | metric-specific |
//!
//! Values are compared as given; case folding and trimming belong to the importer.
//!
//! | Adapter | True metric |
//! |---------|-------------|
//! | [`Exact`] | yes (discrete metric) |
//! | [`BoundedLevenshtein`] | yes (`min(lev, c) / c`) |
//! | [`Levenshtein`] | no (length normalisation breaks the triangle inequality) |
//! | [`JaroWinkler`] | no |
//! | [`SorensenDice`] | no |

use super::traits::AtomicMetric;
use crate::error::{Error, Result};

#[inline]
fn empty_policy(a: &str, b: &str) -> Option<f64> {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Some(0.0),
        (true, false) | (false, true) => Some(1.0),
        (false, false) => None,
    }
}

/// Discrete metric: 0 for equal values, 1 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl AtomicMetric for Exact {
    fn distance(&self, a: &str, b: &str) -> f64 {
        if a == b {
            0.0
        } else {
            1.0
        }
    }

    fn is_true_metric(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "exact"
    }
}

/// Edit distance divided by the longer length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl AtomicMetric for Levenshtein {
    fn distance(&self, a: &str, b: &str) -> f64 {
        empty_policy(a, b).unwrap_or_else(|| 1.0 - strsim::normalized_levenshtein(a, b))
    }

    fn name(&self) -> &str {
        "levenshtein"
    }
}

/// Edit distance truncated at `cutoff` edits and scaled into `[0, 1]`.
///
/// Truncating a metric keeps it a metric, so this adapter supports exact index pruning.
#[derive(Debug, Clone, Copy)]
pub struct BoundedLevenshtein {
    cutoff: usize,
}

impl BoundedLevenshtein {
    /// Create with the number of edits at which values count as fully different.
    pub fn new(cutoff: usize) -> Result<Self> {
        if cutoff == 0 {
            return Err(Error::InvalidParameter {
                name: "cutoff",
                message: "must be at least 1",
            });
        }
        Ok(Self { cutoff })
    }

    /// Edit count at which the distance saturates.
    pub fn cutoff(&self) -> usize {
        self.cutoff
    }
}

impl Default for BoundedLevenshtein {
    fn default() -> Self {
        Self { cutoff: 4 }
    }
}

impl AtomicMetric for BoundedLevenshtein {
    fn distance(&self, a: &str, b: &str) -> f64 {
        empty_policy(a, b).unwrap_or_else(|| {
            let edits = strsim::levenshtein(a, b).min(self.cutoff);
            edits as f64 / self.cutoff as f64
        })
    }

    fn is_true_metric(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "bounded-levenshtein"
    }
}

/// One minus Jaro-Winkler similarity. Favours shared prefixes, which suits surnames.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl AtomicMetric for JaroWinkler {
    fn distance(&self, a: &str, b: &str) -> f64 {
        empty_policy(a, b).unwrap_or_else(|| 1.0 - strsim::jaro_winkler(a, b))
    }

    fn name(&self) -> &str {
        "jaro-winkler"
    }
}

/// One minus the Sørensen-Dice coefficient over character bigrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SorensenDice;

impl AtomicMetric for SorensenDice {
    fn distance(&self, a: &str, b: &str) -> f64 {
        empty_policy(a, b).unwrap_or_else(|| 1.0 - strsim::sorensen_dice(a, b))
    }

    fn name(&self) -> &str {
        "sorensen-dice"
    }
}
