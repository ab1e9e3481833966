//! Record-pair distance built from per-field atomic distances.

use std::fmt;
use std::sync::Arc;

use super::traits::{AtomicMetric, Measure};
use crate::error::{Error, Result};
use crate::record::{is_missing, FieldId, Record, RecordKind};

/// Ordered field ids for one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageFieldSet {
    kind: RecordKind,
    fields: Vec<FieldId>,
}

impl LinkageFieldSet {
    /// Create a field set, checking every id against the kind's schema.
    pub fn new(kind: RecordKind, fields: impl Into<Vec<FieldId>>) -> Result<Self> {
        let fields = fields.into();
        if fields.is_empty() {
            return Err(Error::InvalidParameter {
                name: "fields",
                message: "field set must contain at least one field",
            });
        }
        for &field in &fields {
            kind.check_field(field)?;
        }
        Ok(Self { kind, fields })
    }

    /// Record kind these ids belong to.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Field ids in comparison order.
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Number of compared positions.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// How per-position distances combine into one value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggregation {
    /// Arithmetic mean over every position.
    #[default]
    Mean,
    /// Largest per-position distance.
    Maximum,
    /// Mean over positions where both values are present.
    MeanIgnoringMissing {
        /// Result when no position has both values present.
        all_missing: f64,
    },
    /// Mean where positions with a missing value contribute a fixed distance.
    MeanImputingMissing {
        /// Distance used for positions with a missing value.
        imputed: f64,
    },
}

impl Aggregation {
    /// Mean and maximum of metrics are metrics; the missing-value variants are not.
    pub fn preserves_metric(&self) -> bool {
        matches!(self, Aggregation::Mean | Aggregation::Maximum)
    }
}

/// Which side of the comparison a record plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The indexed (stored) side.
    Stored,
    /// The query side.
    Query,
}

/// A record's compared values, in comparison order.
///
/// Stored and query records project into the same positional space, so the index can
/// compare stored records with each other and with queries using one distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection<'r> {
    values: Vec<&'r str>,
}

impl<'r> Projection<'r> {
    /// Projected values.
    pub fn values(&self) -> &[&'r str] {
        &self.values
    }
}

/// Distance between records computed over corresponding field positions.
///
/// For each position `i` the atomic metric compares `stored.field(stored_fields[i])` with
/// `query.field(query_fields[i])`; the aggregation combines the results into `[0, 1]`.
#[derive(Clone)]
pub struct CompositeMeasure {
    stored: LinkageFieldSet,
    query: LinkageFieldSet,
    metric: Arc<dyn AtomicMetric>,
    aggregation: Aggregation,
}

impl fmt::Debug for CompositeMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeMeasure")
            .field("stored", &self.stored)
            .field("query", &self.query)
            .field("metric", &self.metric.name())
            .field("aggregation", &self.aggregation)
            .finish()
    }
}

impl CompositeMeasure {
    /// Create a measure over two field sets of equal length.
    pub fn new(
        stored: LinkageFieldSet,
        query: LinkageFieldSet,
        metric: Arc<dyn AtomicMetric>,
    ) -> Result<Self> {
        if stored.len() != query.len() {
            return Err(Error::FieldSetLengthMismatch {
                expected: stored.len(),
                found: query.len(),
            });
        }
        Ok(Self {
            stored,
            query,
            metric,
            aggregation: Aggregation::Mean,
        })
    }

    /// Create a measure that compares the same fields on both sides.
    pub fn symmetric(fields: LinkageFieldSet, metric: Arc<dyn AtomicMetric>) -> Self {
        Self {
            stored: fields.clone(),
            query: fields,
            metric,
            aggregation: Aggregation::Mean,
        }
    }

    /// Set the aggregation.
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Field set of the given side.
    pub fn fields(&self, side: Side) -> &LinkageFieldSet {
        match side {
            Side::Stored => &self.stored,
            Side::Query => &self.query,
        }
    }

    /// Aggregation in use.
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Name of the atomic metric.
    pub fn metric_name(&self) -> &str {
        self.metric.name()
    }

    /// Whether the measure is a true metric over projections.
    pub fn is_true_metric(&self) -> bool {
        self.aggregation.preserves_metric() && self.metric.is_true_metric()
    }

    /// Fail unless `record` has the kind configured for `side`.
    pub fn check_record(&self, record: &Record, side: Side) -> Result<()> {
        let expected = self.fields(side).kind();
        if record.kind() != expected {
            return Err(Error::KindMismatch {
                expected,
                found: record.kind(),
            });
        }
        Ok(())
    }

    /// Project a record into comparison order for the given side.
    pub fn project<'r>(&self, record: &'r Record, side: Side) -> Result<Projection<'r>> {
        self.check_record(record, side)?;
        let values = self
            .fields(side)
            .fields()
            .iter()
            .map(|&f| record.field(f))
            .collect();
        Ok(Projection { values })
    }

    /// Distance between a stored-side record and a query-side record.
    ///
    /// Records are read through their configured field ids without a kind check; use
    /// [`CompositeMeasure::project`] when kinds come from untrusted input.
    pub fn distance(&self, stored: &Record, query: &Record) -> f64 {
        let pairs = self
            .stored
            .fields()
            .iter()
            .zip(self.query.fields())
            .map(|(&f1, &f2)| (stored.field(f1), query.field(f2)));
        self.combine(pairs)
    }

    fn atomic(&self, a: &str, b: &str) -> f64 {
        let d = self.metric.distance(a, b);
        if d.is_finite() {
            d.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn combine<'v>(&self, pairs: impl Iterator<Item = (&'v str, &'v str)>) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        let mut max = 0.0f64;

        for (a, b) in pairs {
            match self.aggregation {
                Aggregation::Mean => {
                    total += self.atomic(a, b);
                    count += 1;
                }
                Aggregation::Maximum => {
                    max = max.max(self.atomic(a, b));
                    count += 1;
                }
                Aggregation::MeanIgnoringMissing { .. } => {
                    if !is_missing(a, false) && !is_missing(b, false) {
                        total += self.atomic(a, b);
                        count += 1;
                    }
                }
                Aggregation::MeanImputingMissing { imputed } => {
                    total += if is_missing(a, false) || is_missing(b, false) {
                        imputed
                    } else {
                        self.atomic(a, b)
                    };
                    count += 1;
                }
            }
        }

        let d = match self.aggregation {
            Aggregation::Maximum => max,
            Aggregation::MeanIgnoringMissing { all_missing } if count == 0 => all_missing,
            _ if count == 0 => 0.0,
            _ => total / count as f64,
        };
        if d.is_finite() {
            d.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

impl<'r> Measure<Projection<'r>> for CompositeMeasure {
    fn distance(&self, a: &Projection<'r>, b: &Projection<'r>) -> f64 {
        self.combine(a.values.iter().copied().zip(b.values.iter().copied()))
    }

    fn is_true_metric(&self) -> bool {
        CompositeMeasure::is_true_metric(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{BoundedLevenshtein, Exact, Levenshtein};
    use crate::record::{birth, marriage, RecordId};
    use proptest::prelude::*;

    fn baby(id: u64, forename: &str, surname: &str, father: &str) -> Record {
        Record::new(RecordId(id), RecordKind::Birth)
            .with_field(birth::FORENAME, forename)
            .with_field(birth::SURNAME, surname)
            .with_field(birth::FATHER_FORENAME, father)
    }

    fn name_fields() -> LinkageFieldSet {
        LinkageFieldSet::new(
            RecordKind::Birth,
            [birth::FORENAME, birth::SURNAME, birth::FATHER_FORENAME],
        )
        .unwrap()
    }

    #[test]
    fn test_field_set_validation() {
        assert!(LinkageFieldSet::new(RecordKind::Birth, Vec::<FieldId>::new()).is_err());
        let err = LinkageFieldSet::new(RecordKind::Death, [marriage::GROOM_IDENTITY]).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let brides = LinkageFieldSet::new(
            RecordKind::Marriage,
            [marriage::BRIDE_FORENAME, marriage::BRIDE_SURNAME],
        )
        .unwrap();
        let err = CompositeMeasure::new(name_fields(), brides, Arc::new(Exact)).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldSetLengthMismatch {
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_mean_distance() {
        let m = CompositeMeasure::symmetric(name_fields(), Arc::new(Exact));
        let a = baby(1, "john", "smith", "james");
        let b = baby(2, "john", "smyth", "james");
        assert!((m.distance(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_maximum_distance() {
        let m = CompositeMeasure::symmetric(name_fields(), Arc::new(Exact))
            .with_aggregation(Aggregation::Maximum);
        let a = baby(1, "john", "smith", "james");
        let b = baby(2, "john", "smyth", "james");
        assert_eq!(m.distance(&a, &b), 1.0);
        assert!(m.is_true_metric());
    }

    #[test]
    fn test_mean_ignoring_missing() {
        let m = CompositeMeasure::symmetric(name_fields(), Arc::new(Exact))
            .with_aggregation(Aggregation::MeanIgnoringMissing { all_missing: 0.75 });
        let a = baby(1, "john", "smith", "");
        let b = baby(2, "john", "smyth", "james");
        assert!((m.distance(&a, &b) - 0.5).abs() < 1e-12);

        let empty1 = baby(3, "", "", "");
        let empty2 = baby(4, "", "", "");
        assert_eq!(m.distance(&empty1, &empty2), 0.75);
        assert!(!m.is_true_metric());
    }

    #[test]
    fn test_mean_imputing_missing() {
        let m = CompositeMeasure::symmetric(name_fields(), Arc::new(Exact))
            .with_aggregation(Aggregation::MeanImputingMissing { imputed: 0.5 });
        let a = baby(1, "john", "smith", "");
        let b = baby(2, "john", "smith", "james");
        assert!((m.distance(&a, &b) - 0.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_atomic_is_maximal() {
        let nan = |_: &str, _: &str| f64::NAN;
        let m = CompositeMeasure::symmetric(name_fields(), Arc::new(nan));
        let a = baby(1, "a", "b", "c");
        assert_eq!(m.distance(&a, &a), 1.0);
        assert!(!m.is_true_metric());
    }

    #[test]
    fn test_cross_kind_projection() {
        let grooms = LinkageFieldSet::new(
            RecordKind::Marriage,
            [
                marriage::GROOM_FORENAME,
                marriage::GROOM_SURNAME,
                marriage::GROOM_FATHER_FORENAME,
            ],
        )
        .unwrap();
        let m = CompositeMeasure::new(name_fields(), grooms, Arc::new(Levenshtein)).unwrap();

        let b = baby(1, "john", "smith", "james");
        let g = Record::new(RecordId(9), RecordKind::Marriage)
            .with_field(marriage::GROOM_FORENAME, "john")
            .with_field(marriage::GROOM_SURNAME, "smith")
            .with_field(marriage::GROOM_FATHER_FORENAME, "james");

        let pb = m.project(&b, Side::Stored).unwrap();
        let pg = m.project(&g, Side::Query).unwrap();
        assert_eq!(pb, pg);
        assert_eq!(Measure::distance(&m, &pb, &pg), 0.0);
        assert_eq!(m.distance(&b, &g), 0.0);

        let err = m.project(&b, Side::Query).unwrap_err();
        assert!(matches!(err, Error::KindMismatch { .. }));
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[a-e]{1,6}"
    }

    proptest! {
        #[test]
        fn prop_self_distance_zero(f in name_strategy(), s in name_strategy(), p in name_strategy()) {
            let m = CompositeMeasure::symmetric(name_fields(), Arc::new(Levenshtein));
            let r = baby(1, &f, &s, &p);
            prop_assert_eq!(m.distance(&r, &r), 0.0);
        }

        #[test]
        fn prop_symmetric_task_is_symmetric(
            a in proptest::collection::vec("[a-c]{0,5}", 3),
            b in proptest::collection::vec("[a-c]{0,5}", 3),
        ) {
            let m = CompositeMeasure::symmetric(name_fields(), Arc::new(BoundedLevenshtein::default()));
            let ra = baby(1, &a[0], &a[1], &a[2]);
            let rb = baby(2, &b[0], &b[1], &b[2]);
            prop_assert!((m.distance(&ra, &rb) - m.distance(&rb, &ra)).abs() < 1e-12);
        }
    }
}
