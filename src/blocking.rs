//! Pre-filtering of sparsely populated records.
//!
//! Records missing most of their linkage fields cannot link reliably and cost as much to
//! index as complete ones. A [`BlockingFilter`] keeps only records with at least
//! `min_populated` of the key fields present, before the index is built.

use std::fmt;

use tracing::info;

use crate::error::{Error, Result};
use crate::record::{is_missing, FieldId, Record, RecordKind};

/// Counts from one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Records kept.
    pub accepted: usize,
    /// Records dropped for having too few populated key fields.
    pub rejected: usize,
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "accepted {}, rejected {}", self.accepted, self.rejected)
    }
}

/// Keeps records with enough populated key fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingFilter {
    key_fields: Vec<FieldId>,
    min_populated: usize,
    limit: Option<usize>,
    markers: bool,
}

impl BlockingFilter {
    /// Require at least `min_populated` of `key_fields` to be present.
    pub fn new(key_fields: impl Into<Vec<FieldId>>, min_populated: usize) -> Result<Self> {
        let key_fields = key_fields.into();
        if min_populated > key_fields.len() {
            return Err(Error::InvalidParameter {
                name: "min_populated",
                message: "cannot exceed the number of key fields",
            });
        }
        Ok(Self {
            key_fields,
            min_populated,
            limit: None,
            markers: true,
        })
    }

    /// Stop after `limit` records have been accepted.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether transcription markers such as `--` count as missing (default: true).
    pub fn with_marker_detection(mut self, markers: bool) -> Self {
        self.markers = markers;
        self
    }

    /// Key fields checked.
    pub fn key_fields(&self) -> &[FieldId] {
        &self.key_fields
    }

    /// Minimum number of populated key fields.
    pub fn min_populated(&self) -> usize {
        self.min_populated
    }

    /// Fail unless every key field exists for `kind`.
    pub fn validate_for(&self, kind: RecordKind) -> Result<()> {
        self.key_fields
            .iter()
            .try_for_each(|&field| kind.check_field(field))
    }

    /// Whether one record has enough populated key fields.
    pub fn passes(&self, record: &Record) -> bool {
        let populated = self
            .key_fields
            .iter()
            .filter(|&&f| !is_missing(record.field(f), self.markers))
            .count();
        populated >= self.min_populated
    }

    /// Keep passing records, borrowing them from the input.
    pub fn filter<'a, I>(&self, records: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        self.filter_with_report(records).0
    }

    /// As [`BlockingFilter::filter`], also counting what was dropped.
    pub fn filter_with_report<'a, I>(&self, records: I) -> (Vec<&'a Record>, FilterReport)
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut kept = Vec::new();
        let mut report = FilterReport::default();

        for record in records {
            if self.limit.is_some_and(|limit| kept.len() >= limit) {
                break;
            }
            if self.passes(record) {
                kept.push(record);
            } else {
                report.rejected += 1;
            }
        }
        report.accepted = kept.len();

        info!(
            accepted = report.accepted,
            rejected = report.rejected,
            "blocking filter applied"
        );
        (kept, report)
    }
}
