//! Error taxonomy for page and console operations.

use thiserror::Error;

use crate::fields::EntityKind;

pub type Result<T> = std::result::Result<T, SnipError>;

#[derive(Debug, Error)]
pub enum SnipError {
    /// Rejected input: blank title or tag, unknown field, mismatched value.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A store call failed. Shown to the user; never retried automatically.
    #[error("could not save changes: {0:#}")]
    Persistence(anyhow::Error),

    /// The initial bulk fetch failed. The view stays blocked until a reload succeeds.
    #[error("could not load pages: {0:#}")]
    Load(anyhow::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
}

impl SnipError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        SnipError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Validation failures are dropped silently by interactive callers.
    pub fn is_validation(&self) -> bool {
        matches!(self, SnipError::Validation(_))
    }
}
