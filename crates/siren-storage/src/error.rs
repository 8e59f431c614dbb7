use thiserror::Error;

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Revision conflict: {kind}/{id}")]
    RevisionConflict { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
}

impl StorageError {
    /// Create a new Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new RevisionConflict error
    pub fn revision_conflict(kind: &'static str, id: impl Into<String>) -> Self {
        Self::RevisionConflict {
            kind,
            id: id.into(),
        }
    }

    /// Create a new AlreadyExists error
    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// A concurrent writer got there first; the caller may re-read and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::RevisionConflict { .. } | Self::AlreadyExists { .. }
        )
    }
}

// Storage failures surface to callers as the core taxonomy's storage
// category; the message keeps the backend detail for logs.
impl From<StorageError> for siren_core::DispatchError {
    fn from(err: StorageError) -> Self {
        siren_core::DispatchError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StorageError::revision_conflict("AmbulanceUnit", "AMB-1");
        assert_eq!(err.to_string(), "Revision conflict: AmbulanceUnit/AMB-1");
        assert!(err.is_conflict());

        let err = StorageError::unavailable("connection refused");
        assert_eq!(err.to_string(), "Storage unavailable: connection refused");
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_already_exists_is_conflict() {
        assert!(StorageError::already_exists("Incident", "INC-1").is_conflict());
    }
}
