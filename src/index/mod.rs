//! Range search over a stored record set.
//!
//! [`ReferencePointIndex`] answers "everything within distance `T` of this query" without
//! comparing the query with every stored record, by bounding distances through a small set
//! of pivots. [`LinearScan`] is the exact brute-force reference.

mod linear;
mod reference_point;
mod traits;

pub use linear::LinearScan;
pub use reference_point::{IndexConfig, PruningPolicy, QueryStats, ReferencePointIndex};
pub use traits::{Neighbour, RangeSearch};
