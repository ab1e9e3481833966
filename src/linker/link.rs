use std::fmt;
use std::sync::Arc;

use crate::record::{Record, Role};

/// Provenance of links derived from identity fields.
pub const GROUND_TRUTH: &str = "ground truth";

/// An accepted pairing of two records. Immutable once created.
///
/// `record1` plays `role1` (the stored side) and `record2` plays `role2` (the query side).
#[derive(Debug, Clone)]
pub struct Link<'a> {
    record1: &'a Record,
    role1: Role,
    record2: &'a Record,
    role2: Role,
    distance: f64,
    provenance: Arc<str>,
}

impl<'a> Link<'a> {
    /// Create a link.
    pub fn new(
        record1: &'a Record,
        role1: Role,
        record2: &'a Record,
        role2: Role,
        distance: f64,
        provenance: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            record1,
            role1,
            record2,
            role2,
            distance,
            provenance: provenance.into(),
        }
    }

    /// A zero-distance link tagged as ground truth.
    pub fn ground_truth(record1: &'a Record, role1: Role, record2: &'a Record, role2: Role) -> Self {
        Self::new(record1, role1, record2, role2, 0.0, GROUND_TRUTH)
    }

    /// Stored-side record.
    pub fn record1(&self) -> &'a Record {
        self.record1
    }

    /// Role of the stored-side record.
    pub fn role1(&self) -> &Role {
        &self.role1
    }

    /// Query-side record.
    pub fn record2(&self) -> &'a Record {
        self.record2
    }

    /// Role of the query-side record.
    pub fn role2(&self) -> &Role {
        &self.role2
    }

    /// Composite distance between the two records.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// How the link was produced.
    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    /// Direction-independent key: the two records' ids, smaller first.
    pub fn pair_key(&self) -> String {
        pair_key(self.record1, self.record2)
    }
}

impl fmt::Display for Link<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} <-> {} {} ({:.4}, {})",
            self.role1,
            key_id(self.record1),
            self.role2,
            key_id(self.record2),
            self.distance,
            self.provenance
        )
    }
}

/// Original id, or the kind-qualified storage id when the dataset supplied none.
///
/// Storage ids are only unique within one kind, so the fallback carries the kind name.
fn key_id(record: &Record) -> String {
    match record.original_id().trim() {
        "" => format!("{}#{}", record.kind().name(), record.id()),
        id => id.to_owned(),
    }
}

/// Direction-independent key for a record pair.
pub fn pair_key(a: &Record, b: &Record) -> String {
    let (a, b) = (key_id(a), key_id(b));
    if a <= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}
