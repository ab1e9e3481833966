//! Threshold linkage.
//!
//! [`ThresholdLinker`] turns a composite measure, a distance threshold and a
//! [`Viability`] predicate into [`Link`]s between a stored and a query record set.
//!
//! # Non-metric measures
//!
//! Candidates come from a [`ReferencePointIndex`](crate::index::ReferencePointIndex). Its
//! pruning is exact only for measures satisfying the triangle inequality. With the default
//! [`PruningPolicy::RequireMetric`](crate::index::PruningPolicy) a non-metric measure is
//! searched linearly; opting into heuristic pruning trades missed links for speed.

mod link;
mod threshold;
mod viability;

pub use link::{pair_key, Link, GROUND_TRUTH};
pub use threshold::{LinkerState, ThresholdLinker};
pub use viability::{
    parse_year, AlwaysViable, MaxYearGap, Viability, YearOrdering, YearSource,
};
