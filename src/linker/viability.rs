//! Domain plausibility checks applied to candidate links.
//!
//! A candidate within the distance threshold can still be impossible: siblings born sixty
//! years apart, a person dying before their own marriage. Viability predicates reject such
//! pairs independently of string similarity.
//!
//! Missing or unparseable data is never grounds for rejection. Every predicate here treats
//! it as viable.

use chrono::{Datelike, NaiveDate};

use crate::record::{FieldId, Record};

/// Plausibility check on a (stored, query) record pair.
///
/// Implementations must return a verdict for any input; a panic here is a defect in the
/// predicate and aborts the run.
pub trait Viability: Sync {
    /// Whether the pair could plausibly be linked.
    fn is_viable(&self, stored: &Record, query: &Record) -> bool;
}

impl<F> Viability for F
where
    F: Fn(&Record, &Record) -> bool + Sync,
{
    fn is_viable(&self, stored: &Record, query: &Record) -> bool {
        self(stored, query)
    }
}

/// Accepts every pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysViable;

impl Viability for AlwaysViable {
    fn is_viable(&self, _: &Record, _: &Record) -> bool {
        true
    }
}

/// Parse a year from a plain year or a `dd/mm/yyyy` or `yyyy-mm-dd` date.
pub fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|date| date.year())
}

/// Where a year comes from on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSource {
    /// A field holding a year or a full date.
    Field(FieldId),
    /// Birth year derived from an event: `event_year - age`, or the year of `age_or_date`
    /// when it holds a date of birth rather than an age.
    BirthYearFromAge {
        /// Field holding an age in years or a date of birth.
        age_or_date: FieldId,
        /// Field holding the event year the age refers to.
        event_year: FieldId,
    },
}

impl YearSource {
    /// Resolve the year, or `None` when the data does not allow it.
    pub fn year(&self, record: &Record) -> Option<i32> {
        match *self {
            YearSource::Field(field) => parse_year(record.field(field)),
            YearSource::BirthYearFromAge {
                age_or_date,
                event_year,
            } => {
                let raw = record.field(age_or_date).trim();
                match raw.parse::<i32>() {
                    Ok(age) => parse_year(record.field(event_year))?.checked_sub(age),
                    Err(_) => parse_year(raw),
                }
            }
        }
    }
}

impl From<FieldId> for YearSource {
    fn from(field: FieldId) -> Self {
        YearSource::Field(field)
    }
}

/// Years on the two records are at most `max_gap` apart, in either direction.
///
/// The sibling check: siblings are born within a generation of each other.
#[derive(Debug, Clone, Copy)]
pub struct MaxYearGap {
    stored: YearSource,
    query: YearSource,
    max_gap: i32,
}

impl MaxYearGap {
    /// Create the check.
    pub fn new(stored: impl Into<YearSource>, query: impl Into<YearSource>, max_gap: i32) -> Self {
        Self {
            stored: stored.into(),
            query: query.into(),
            max_gap,
        }
    }
}

impl Viability for MaxYearGap {
    fn is_viable(&self, stored: &Record, query: &Record) -> bool {
        match (self.stored.year(stored), self.query.year(query)) {
            (Some(a), Some(b)) => (i64::from(a) - i64::from(b)).abs() <= i64::from(self.max_gap),
            _ => true,
        }
    }
}

/// One record's year precedes the other's by a gap within `[min_gap, max_gap]`.
///
/// Covers "death not before marriage" (gap at least 0) and "parent aged 15 to 50 at the
/// child's birth" (gap within 15..=50).
#[derive(Debug, Clone, Copy)]
pub struct YearOrdering {
    stored: YearSource,
    query: YearSource,
    stored_first: bool,
    min_gap: i32,
    max_gap: i32,
}

impl YearOrdering {
    /// The stored record's year comes first: `query - stored` within the gap range.
    pub fn stored_first(stored: impl Into<YearSource>, query: impl Into<YearSource>) -> Self {
        Self {
            stored: stored.into(),
            query: query.into(),
            stored_first: true,
            min_gap: 0,
            max_gap: i32::MAX,
        }
    }

    /// The query record's year comes first: `stored - query` within the gap range.
    pub fn query_first(stored: impl Into<YearSource>, query: impl Into<YearSource>) -> Self {
        Self {
            stored_first: false,
            ..Self::stored_first(stored, query)
        }
    }

    /// Bound the gap (default `0..=i32::MAX`).
    pub fn with_gap_range(mut self, min_gap: i32, max_gap: i32) -> Self {
        self.min_gap = min_gap;
        self.max_gap = max_gap;
        self
    }
}

impl Viability for YearOrdering {
    fn is_viable(&self, stored: &Record, query: &Record) -> bool {
        let (Some(s), Some(q)) = (self.stored.year(stored), self.query.year(query)) else {
            return true;
        };
        let (s, q) = (i64::from(s), i64::from(q));
        let gap = if self.stored_first { q - s } else { s - q };
        (i64::from(self.min_gap)..=i64::from(self.max_gap)).contains(&gap)
    }
}
