//! Error type for engine operations
//!
//! Structural failures (a missing project, requirement, suite or report)
//! abort the call with `NotFound`. Malformed enum values rejected at the
//! ingestion boundary surface as `InvalidInput`. Anything raised by a
//! storage backend is carried through as `Storage`.

use thiserror::Error;

/// Errors that can occur while building matrices, reports or mutating a project
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid {field}: '{value}'")]
    InvalidInput { field: &'static str, value: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field,
            value: value.into(),
        }
    }

    /// Returns true for the NotFound family, which callers render as "retry".
    /// Also sees through a NotFound raised inside a storage backend.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::NotFound { .. } => true,
            EngineError::Storage(inner) => inner
                .downcast_ref::<EngineError>()
                .is_some_and(EngineError::is_not_found),
            EngineError::InvalidInput { .. } => false,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found("Project", "alpha");
        assert_eq!(err.to_string(), "Project not found: alpha");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_input_message() {
        let err = EngineError::invalid("priority", "Urgentish");
        assert_eq!(err.to_string(), "Invalid priority: 'Urgentish'");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_storage_from_anyhow() {
        let err: EngineError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "Storage error: disk full");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_through_storage() {
        let inner: anyhow::Error = EngineError::not_found("Project", "ghost").into();
        let err = EngineError::from(inner);
        assert!(err.is_not_found());
    }
}
