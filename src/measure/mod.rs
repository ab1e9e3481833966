//! Distances between records.
//!
//! # The Core Insight
//!
//! Linkage compares a handful of fields at a time (names, parents' names, places). Each field
//! pair gets an atomic string distance in `[0, 1]`; a composite measure aggregates them into
//! one record distance:
//!
//! ```text
//! d(r1, r2) = mean_i  atomic(r1[f1_i], r2[f2_i])
//! ```
//!
//! If the atomic distance is a metric, so are the mean and the maximum over positions, and
//! the reference-point index can prune with the triangle inequality. Aggregations that treat
//! missing values specially give better linkage on sparse data but are not metrics.
//!
//! # Components
//!
//! - [`AtomicMetric`]: one field pair. Adapters over `strsim` live in [`atomic`].
//! - [`CompositeMeasure`]: record pair, with an [`Aggregation`].
//! - [`Measure`]: what the index needs; implemented by the composite over [`Projection`]s.
//! - [`check_triangle_inequality`]: sampled evidence that a measure is (or is not) a metric.

pub mod atomic;
mod checks;
mod composite;
mod traits;

pub use atomic::{BoundedLevenshtein, Exact, JaroWinkler, Levenshtein, SorensenDice};
pub use checks::{check_triangle_inequality, MetricCheckReport, TOLERANCE};
pub use composite::{Aggregation, CompositeMeasure, LinkageFieldSet, Projection, Side};
pub use traits::{AtomicMetric, Measure};
