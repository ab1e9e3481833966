use thiserror::Error;

use crate::record::{FieldId, RecordKind};

/// Result alias for `kinlink`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by linkage construction and execution.
///
/// Only configuration defects and upstream repository failures surface here. Missing or
/// unparseable record data is never an error: it yields `LinkStatus::Unknown` or a viable
/// verdict instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty where at least one record is required.
    #[error("empty input provided")]
    EmptyInput,

    /// The two sides of a comparison have field lists of different lengths.
    #[error("field set length mismatch: expected {expected}, found {found}")]
    FieldSetLengthMismatch {
        /// Length of the side-1 field list.
        expected: usize,
        /// Length of the side-2 field list.
        found: usize,
    },

    /// A field id is outside the schema of the record kind it is used with.
    #[error("field {field} is not defined for {kind} records")]
    UnknownField {
        /// Record kind the field was checked against.
        kind: RecordKind,
        /// Offending field id.
        field: FieldId,
    },

    /// A record of the wrong kind was handed to a component configured for another kind.
    #[error("record kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Kind the component was configured for.
        expected: RecordKind,
        /// Kind of the record actually supplied.
        found: RecordKind,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Operation attempted in a lifecycle state that does not permit it.
    #[error("cannot {operation} while linker is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the linker was in.
        state: &'static str,
    },

    /// The record repository failed. The upstream error is kept as the source.
    #[error("record repository failure")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an upstream repository error without altering it.
    pub fn repository<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Repository(Box::new(err))
    }

    /// True for errors caused by configuration or programming defects.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput
                | Error::FieldSetLengthMismatch { .. }
                | Error::UnknownField { .. }
                | Error::KindMismatch { .. }
                | Error::InvalidParameter { .. }
        )
    }
}
