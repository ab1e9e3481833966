//! Vital-event records, their field schemas and linkage roles.
//!
//! A [`Record`] is a flat list of string fields addressed by [`FieldId`]. Which ids exist is
//! fixed by the record's [`RecordKind`]; the constants in [`birth`], [`marriage`] and
//! [`death`] name them. Absent values are empty strings.
//!
//! Identity fields (`*_IDENTITY`) hold the ids assigned by whoever curated the dataset. They
//! are read by the ground-truth code only and must never be used as linkage fields.

use core::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Index of a field within a record.
pub type FieldId = usize;

/// Storage identity of a record within one record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three kinds of vital-event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecordKind {
    /// Birth registration.
    Birth,
    /// Marriage registration.
    Marriage,
    /// Death registration.
    Death,
}

impl RecordKind {
    /// Number of fields defined for this kind.
    pub fn field_count(self) -> usize {
        match self {
            RecordKind::Birth => birth::FIELD_COUNT,
            RecordKind::Marriage => marriage::FIELD_COUNT,
            RecordKind::Death => death::FIELD_COUNT,
        }
    }

    /// Lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            RecordKind::Birth => "birth",
            RecordKind::Marriage => "marriage",
            RecordKind::Death => "death",
        }
    }

    /// Check that `field` exists in this kind's schema.
    pub fn check_field(self, field: FieldId) -> Result<()> {
        if field < self.field_count() {
            Ok(())
        } else {
            Err(Error::UnknownField { kind: self, field })
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field ids for birth records.
pub mod birth {
    use super::FieldId;

    pub const STANDARDISED_ID: FieldId = 0;
    pub const ORIGINAL_ID: FieldId = 1;
    pub const FORENAME: FieldId = 2;
    pub const SURNAME: FieldId = 3;
    pub const SEX: FieldId = 4;
    pub const FATHER_FORENAME: FieldId = 5;
    pub const FATHER_SURNAME: FieldId = 6;
    pub const FATHER_OCCUPATION: FieldId = 7;
    pub const MOTHER_FORENAME: FieldId = 8;
    pub const MOTHER_MAIDEN_SURNAME: FieldId = 9;
    pub const BIRTH_DAY: FieldId = 10;
    pub const BIRTH_MONTH: FieldId = 11;
    pub const BIRTH_YEAR: FieldId = 12;
    pub const BIRTH_ADDRESS: FieldId = 13;
    pub const PARENTS_DAY_OF_MARRIAGE: FieldId = 14;
    pub const PARENTS_MONTH_OF_MARRIAGE: FieldId = 15;
    pub const PARENTS_YEAR_OF_MARRIAGE: FieldId = 16;
    pub const PARENTS_PLACE_OF_MARRIAGE: FieldId = 17;
    pub const CHILD_IDENTITY: FieldId = 18;
    pub const FATHER_IDENTITY: FieldId = 19;
    pub const MOTHER_IDENTITY: FieldId = 20;
    pub const PARENT_MARRIAGE_RECORD_IDENTITY: FieldId = 21;
    pub const FATHER_BIRTH_RECORD_IDENTITY: FieldId = 22;
    pub const MOTHER_BIRTH_RECORD_IDENTITY: FieldId = 23;
    pub const DEATH_RECORD_IDENTITY: FieldId = 24;

    pub const FIELD_COUNT: usize = 25;
}

/// Field ids for marriage records.
pub mod marriage {
    use super::FieldId;

    pub const STANDARDISED_ID: FieldId = 0;
    pub const ORIGINAL_ID: FieldId = 1;
    pub const BRIDE_FORENAME: FieldId = 2;
    pub const BRIDE_SURNAME: FieldId = 3;
    pub const BRIDE_AGE_OR_DATE_OF_BIRTH: FieldId = 4;
    pub const BRIDE_OCCUPATION: FieldId = 5;
    pub const BRIDE_ADDRESS: FieldId = 6;
    pub const BRIDE_FATHER_FORENAME: FieldId = 7;
    pub const BRIDE_FATHER_SURNAME: FieldId = 8;
    pub const BRIDE_MOTHER_FORENAME: FieldId = 9;
    pub const BRIDE_MOTHER_MAIDEN_SURNAME: FieldId = 10;
    pub const GROOM_FORENAME: FieldId = 11;
    pub const GROOM_SURNAME: FieldId = 12;
    pub const GROOM_AGE_OR_DATE_OF_BIRTH: FieldId = 13;
    pub const GROOM_OCCUPATION: FieldId = 14;
    pub const GROOM_ADDRESS: FieldId = 15;
    pub const GROOM_FATHER_FORENAME: FieldId = 16;
    pub const GROOM_FATHER_SURNAME: FieldId = 17;
    pub const GROOM_MOTHER_FORENAME: FieldId = 18;
    pub const GROOM_MOTHER_MAIDEN_SURNAME: FieldId = 19;
    pub const MARRIAGE_DAY: FieldId = 20;
    pub const MARRIAGE_MONTH: FieldId = 21;
    pub const MARRIAGE_YEAR: FieldId = 22;
    pub const PLACE_OF_MARRIAGE: FieldId = 23;
    pub const BRIDE_IDENTITY: FieldId = 24;
    pub const GROOM_IDENTITY: FieldId = 25;
    pub const BRIDE_FATHER_IDENTITY: FieldId = 26;
    pub const BRIDE_MOTHER_IDENTITY: FieldId = 27;
    pub const GROOM_FATHER_IDENTITY: FieldId = 28;
    pub const GROOM_MOTHER_IDENTITY: FieldId = 29;
    pub const BRIDE_BIRTH_RECORD_IDENTITY: FieldId = 30;
    pub const GROOM_BIRTH_RECORD_IDENTITY: FieldId = 31;

    pub const FIELD_COUNT: usize = 32;
}

/// Field ids for death records.
pub mod death {
    use super::FieldId;

    pub const STANDARDISED_ID: FieldId = 0;
    pub const ORIGINAL_ID: FieldId = 1;
    pub const FORENAME: FieldId = 2;
    pub const SURNAME: FieldId = 3;
    pub const SEX: FieldId = 4;
    pub const AGE_AT_DEATH: FieldId = 5;
    pub const DATE_OF_BIRTH: FieldId = 6;
    pub const OCCUPATION: FieldId = 7;
    pub const MARITAL_STATUS: FieldId = 8;
    pub const SPOUSE_NAMES: FieldId = 9;
    pub const FATHER_FORENAME: FieldId = 10;
    pub const FATHER_SURNAME: FieldId = 11;
    pub const MOTHER_FORENAME: FieldId = 12;
    pub const MOTHER_MAIDEN_SURNAME: FieldId = 13;
    pub const DEATH_DAY: FieldId = 14;
    pub const DEATH_MONTH: FieldId = 15;
    pub const DEATH_YEAR: FieldId = 16;
    pub const PLACE_OF_DEATH: FieldId = 17;
    pub const DECEASED_IDENTITY: FieldId = 18;
    pub const FATHER_IDENTITY: FieldId = 19;
    pub const MOTHER_IDENTITY: FieldId = 20;
    pub const SPOUSE_IDENTITY: FieldId = 21;
    pub const BIRTH_RECORD_IDENTITY: FieldId = 22;

    pub const FIELD_COUNT: usize = 23;
}

/// A single vital-event record.
///
/// Records are immutable once built. The linkage engine only ever borrows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    kind: RecordKind,
    fields: Vec<String>,
}

impl Record {
    /// Create a record with every field empty.
    pub fn new(id: RecordId, kind: RecordKind) -> Self {
        Self {
            id,
            kind,
            fields: vec![String::new(); kind.field_count()],
        }
    }

    /// Build a record from a full field vector, as an importer would.
    ///
    /// Shorter vectors are padded with empty fields; longer ones are rejected.
    pub fn from_fields(id: RecordId, kind: RecordKind, mut fields: Vec<String>) -> Result<Self> {
        if fields.len() > kind.field_count() {
            return Err(Error::UnknownField {
                kind,
                field: fields.len() - 1,
            });
        }
        fields.resize(kind.field_count(), String::new());
        Ok(Self { id, kind, fields })
    }

    /// Set a field while building.
    ///
    /// # Panics
    ///
    /// Panics if `field` is not part of this record's schema. Use
    /// [`Record::try_with_field`] when field ids come from external input.
    pub fn with_field(mut self, field: FieldId, value: impl Into<String>) -> Self {
        assert!(
            field < self.fields.len(),
            "field {field} is not defined for {} records",
            self.kind
        );
        self.fields[field] = value.into();
        self
    }

    /// Set a field while building, rejecting ids outside the schema.
    pub fn try_with_field(mut self, field: FieldId, value: impl Into<String>) -> Result<Self> {
        self.kind.check_field(field)?;
        self.fields[field] = value.into();
        Ok(self)
    }

    /// Storage identity.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Record kind.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Field value; empty when absent or outside the schema.
    #[inline]
    pub fn field(&self, field: FieldId) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    /// Field value, or `None` for an id outside the schema.
    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Id assigned by the source dataset (the `ORIGINAL_ID` field).
    pub fn original_id(&self) -> &str {
        // ORIGINAL_ID is the same slot for every kind.
        self.field(birth::ORIGINAL_ID)
    }
}

/// Well-known role names.
pub mod roles {
    pub const BABY: &str = "baby";
    pub const FATHER: &str = "father";
    pub const MOTHER: &str = "mother";
    pub const BRIDE: &str = "bride";
    pub const GROOM: &str = "groom";
    pub const DECEASED: &str = "deceased";
}

/// How a record participates in one linkage task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Role {
    kind: RecordKind,
    name: Arc<str>,
}

impl Role {
    /// Create a role.
    pub fn new(kind: RecordKind, name: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Child on a birth record.
    pub fn baby() -> Self {
        Self::new(RecordKind::Birth, roles::BABY)
    }

    /// Bride on a marriage record.
    pub fn bride() -> Self {
        Self::new(RecordKind::Marriage, roles::BRIDE)
    }

    /// Groom on a marriage record.
    pub fn groom() -> Self {
        Self::new(RecordKind::Marriage, roles::GROOM)
    }

    /// Deceased on a death record.
    pub fn deceased() -> Self {
        Self::new(RecordKind::Death, roles::DECEASED)
    }

    /// Record kind this role applies to.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Role label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity field of the person playing this role, if the schema has one.
    pub fn identity_field(&self) -> Option<FieldId> {
        match (self.kind, self.name()) {
            (RecordKind::Birth, roles::BABY) => Some(birth::CHILD_IDENTITY),
            (RecordKind::Birth, roles::FATHER) => Some(birth::FATHER_IDENTITY),
            (RecordKind::Birth, roles::MOTHER) => Some(birth::MOTHER_IDENTITY),
            (RecordKind::Marriage, roles::BRIDE) => Some(marriage::BRIDE_IDENTITY),
            (RecordKind::Marriage, roles::GROOM) => Some(marriage::GROOM_IDENTITY),
            (RecordKind::Death, roles::DECEASED) => Some(death::DECEASED_IDENTITY),
            _ => None,
        }
    }

    /// `(father, mother)` identity fields of the person playing this role, if known.
    pub fn parent_identity_fields(&self) -> Option<(FieldId, FieldId)> {
        match (self.kind, self.name()) {
            (RecordKind::Birth, roles::BABY) => {
                Some((birth::FATHER_IDENTITY, birth::MOTHER_IDENTITY))
            }
            (RecordKind::Marriage, roles::BRIDE) => Some((
                marriage::BRIDE_FATHER_IDENTITY,
                marriage::BRIDE_MOTHER_IDENTITY,
            )),
            (RecordKind::Marriage, roles::GROOM) => Some((
                marriage::GROOM_FATHER_IDENTITY,
                marriage::GROOM_MOTHER_IDENTITY,
            )),
            (RecordKind::Death, roles::DECEASED) => {
                Some((death::FATHER_IDENTITY, death::MOTHER_IDENTITY))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// Whether a field value counts as missing.
///
/// Empty (after trimming) always counts. With `markers` set, the transcription markers found
/// in the source data also count: `--`, `----`, and anything containing "missing".
pub fn is_missing(value: &str, markers: bool) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    markers
        && (value == "--"
            || value == "----"
            || value.to_ascii_lowercase().contains("missing"))
}
