//! Error taxonomy shared across the subsystems. Guards, the data layer
//! and the coordinators all surface one of these kinds; the view layer
//! branches on the kind to render a specific embed and nothing else
//! escapes to the platform.

use crate::utils::validate::{BattleTagError, CountryError, NameError};
use thiserror::Error;

pub type LadderResult<T> = Result<T, LadderError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LadderError {
    /// Input failed a guard or validator
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requested transition is not allowed from the current state
    #[error("{0}")]
    State(&'static str),

    /// Abort requested with no remaining abort quota
    #[error("no aborts remaining this month")]
    Quota,

    /// Replay hash collision across different matches
    #[error("{0}")]
    Conflict(String),

    /// Persistent-store or object-store failure
    #[error("{0}")]
    Upstream(String),

    /// The running task was cancelled
    #[error("cancelled")]
    Cancelled,
}

impl From<NameError> for LadderError {
    fn from(value: NameError) -> Self {
        LadderError::Validation(value.to_string())
    }
}

impl From<BattleTagError> for LadderError {
    fn from(value: BattleTagError) -> Self {
        LadderError::Validation(value.to_string())
    }
}

impl From<CountryError> for LadderError {
    fn from(value: CountryError) -> Self {
        LadderError::Validation(value.to_string())
    }
}
