//! True-match determination from identity fields.

use crate::record::{birth, FieldId, Record, Role};

/// Outcome of comparing two records' identity fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkStatus {
    /// Identities agree.
    TrueMatch,
    /// Identities present and disagree.
    NotTrueMatch,
    /// Not enough identity data to say.
    Unknown,
}

/// When missing identity fields make the outcome [`LinkStatus::Unknown`].
///
/// Some curated datasets leave an identity empty only when the person is outside the
/// dataset, so a one-sided absence is informative there. Elsewhere it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbsencePolicy {
    /// Any missing identity field gives `Unknown`.
    #[default]
    AnyAbsentIsUnknown,
    /// Only all identity fields missing gives `Unknown`; one-sided absence is a non-match.
    AllAbsentIsUnknown,
}

/// Identity field on the first record and the field it must equal on the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityPair {
    /// Field read from the first record.
    pub first: FieldId,
    /// Field read from the second record.
    pub second: FieldId,
}

impl IdentityPair {
    /// Create a pair.
    pub fn new(first: FieldId, second: FieldId) -> Self {
        Self { first, second }
    }
}

/// Decides whether two records refer to linked people.
///
/// A rule is a list of alternatives; an alternative holds when every one of its identity
/// pairs is non-empty and equal. One holding alternative makes a true match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrueMatchRule {
    alternatives: Vec<Vec<IdentityPair>>,
    absence: AbsencePolicy,
}

impl TrueMatchRule {
    /// Create from alternatives.
    pub fn new(alternatives: Vec<Vec<IdentityPair>>) -> Self {
        Self {
            alternatives,
            absence: AbsencePolicy::default(),
        }
    }

    /// Same person: `first` on record 1 equals `second` on record 2.
    pub fn identity(first: FieldId, second: FieldId) -> Self {
        Self::new(vec![vec![IdentityPair::new(first, second)]])
    }

    /// Siblings: both parent identities agree.
    pub fn siblings(parents1: (FieldId, FieldId), parents2: (FieldId, FieldId)) -> Self {
        Self::new(vec![vec![
            IdentityPair::new(parents1.0, parents2.0),
            IdentityPair::new(parents1.1, parents2.1),
        ]])
    }

    /// Sibling rule for two roles, if both roles have known parent identity fields.
    pub fn siblings_for(role1: &Role, role2: &Role) -> Option<Self> {
        Some(Self::siblings(
            role1.parent_identity_fields()?,
            role2.parent_identity_fields()?,
        ))
    }

    /// Set the absence policy.
    pub fn with_absence(mut self, absence: AbsencePolicy) -> Self {
        self.absence = absence;
        self
    }

    /// Alternatives in evaluation order.
    pub fn alternatives(&self) -> &[Vec<IdentityPair>] {
        &self.alternatives
    }

    /// Classify a pair of records.
    pub fn status(&self, record1: &Record, record2: &Record) -> LinkStatus {
        let holds = |pairs: &Vec<IdentityPair>| {
            pairs.iter().all(|p| {
                let a = record1.field(p.first).trim();
                !a.is_empty() && a == record2.field(p.second).trim()
            })
        };
        if self.alternatives.iter().any(holds) {
            return LinkStatus::TrueMatch;
        }

        let fields = || {
            self.alternatives.iter().flatten().flat_map(|p| {
                [(record1, p.first), (record2, p.second)]
            })
        };
        let unknown = match self.absence {
            AbsencePolicy::AnyAbsentIsUnknown => fields().any(|(r, f)| identity_empty(r, f)),
            AbsencePolicy::AllAbsentIsUnknown => fields().all(|(r, f)| identity_empty(r, f)),
        };

        if unknown {
            LinkStatus::Unknown
        } else {
            LinkStatus::NotTrueMatch
        }
    }
}

/// The storage id slot is always populated and never counts as an absent identity.
fn identity_empty(record: &Record, field: FieldId) -> bool {
    field != birth::STANDARDISED_ID && record.field(field).trim().is_empty()
}
