//! Boundary with the record store.
//!
//! The linkage core never reads files or talks to a database. It pulls records through a
//! [`RecordRepository`], a synchronous iterator per record kind. Storage failures end the
//! run: [`load_records`] wraps them in [`Error::Repository`] with the original error kept as
//! the source, and never retries.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Record, RecordKind};

/// Iterator over one kind of record, as served by a repository.
pub type RecordIter<'r, E> = Box<dyn Iterator<Item = std::result::Result<Record, E>> + 'r>;

/// Source of records.
pub trait RecordRepository {
    /// Storage error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Every record of `kind`.
    fn records(&self, kind: RecordKind) -> RecordIter<'_, Self::Error>;

    /// Number of records of `kind`.
    fn count(&self, kind: RecordKind) -> usize;
}

/// Repository over records already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Vec<Record>>,
}

impl InMemoryRepository {
    /// Create from prebuilt records of any kinds.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

impl RecordRepository for InMemoryRepository {
    type Error = std::convert::Infallible;

    fn records(&self, kind: RecordKind) -> RecordIter<'_, Self::Error> {
        Box::new(
            self.records
                .iter()
                .filter(move |r| r.kind() == kind)
                .cloned()
                .map(Ok),
        )
    }

    fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|r| r.kind() == kind).count()
    }
}

/// Load every record of `kind`, stopping at the first storage error.
pub fn load_records<R>(repository: &R, kind: RecordKind) -> Result<Vec<Record>>
where
    R: RecordRepository + ?Sized,
{
    let mut out = Vec::with_capacity(repository.count(kind));
    for record in repository.records(kind) {
        out.push(record.map_err(Error::repository)?);
    }
    debug!(kind = %kind, loaded = out.len(), "records loaded");
    Ok(out)
}
