//! # kinlink
//!
//! Similarity-search record linkage for historical vital-event records (births, marriages,
//! deaths): composite field distances, a reference-point metric index, threshold linking
//! under domain viability rules, and evaluation against curated ground truth.
//!
//! **Default build** enables `parallel` (rayon) for index construction, link collection
//! and evaluation. `serde` derives serialization for configuration and result values.
//!
//! ```rust
//! use kinlink::linker::AlwaysViable;
//! use kinlink::record::{birth, Record, RecordId, RecordKind, Role};
//! use kinlink::{GroundTruth, LinkageRunner, LinkageTask, TrueMatchRule};
//!
//! let baby = |id, father: &str| {
//!     Record::new(RecordId(id), RecordKind::Birth)
//!         .with_field(birth::FATHER_FORENAME, "james")
//!         .with_field(birth::MOTHER_FORENAME, "mary")
//!         .with_field(birth::FATHER_IDENTITY, father)
//!         .with_field(birth::MOTHER_IDENTITY, "M1")
//! };
//! let records = vec![baby(1, "F1"), baby(2, "F1")];
//!
//! let fields = [birth::FATHER_FORENAME, birth::MOTHER_FORENAME];
//! let task = LinkageTask::new("sibling", Role::baby(), Role::baby())
//!     .with_fields(fields, fields)
//!     .with_threshold(0.25)
//!     .with_true_match(TrueMatchRule::siblings_for(&Role::baby(), &Role::baby()).unwrap())
//!     .with_ground_truth(GroundTruth::siblings_for(&Role::baby(), &Role::baby()).unwrap());
//!
//! let outcome = LinkageRunner::new(task, AlwaysViable)?.run(&records, &records)?;
//! assert_eq!(outcome.links.len(), 2);
//! assert_eq!(outcome.quality.unwrap().f_measure(), 1.0);
//! # Ok::<(), kinlink::Error>(())
//! ```

pub mod blocking;
/// Error types used across `kinlink`.
pub mod error;
pub mod index;
pub mod linker;
pub mod measure;
pub mod metrics;
pub mod record;
pub mod repository;
pub mod runner;
pub mod task;
pub mod truth;

#[cfg(test)]
mod end_to_end_tests;

pub use error::{Error, Result};

pub use blocking::{BlockingFilter, FilterReport};
pub use index::{IndexConfig, PruningPolicy, ReferencePointIndex};
pub use linker::{Link, LinkerState, ThresholdLinker, Viability};
pub use measure::{Aggregation, AtomicMetric, CompositeMeasure, LinkageFieldSet, Measure};
pub use metrics::{evaluate, LinkageQuality};
pub use record::{FieldId, Record, RecordId, RecordKind, Role};
pub use repository::{load_records, InMemoryRepository, RecordRepository};
pub use runner::{LinkageOutcome, LinkageRunner, ThresholdQuality};
pub use task::LinkageTask;
pub use truth::{GroundTruth, LinkStatus, TrueMatchRule};
