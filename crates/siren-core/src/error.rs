use thiserror::Error;

/// Core error types for dispatch operations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No ambulance units configured")]
    NoUnitsConfigured,

    #[error("Unit reservation lost to concurrent dispatches, please retry")]
    ReservationContention,

    #[error("No available ambulance units nearby")]
    NoAvailableUnit,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DispatchError {
    /// Create a new Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new NotFound error for an incident id
    pub fn incident_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Incident",
            id: id.into(),
        }
    }

    /// Create a new NotFound error for an ambulance unit id
    pub fn unit_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "AmbulanceUnit",
            id: id.into(),
        }
    }

    /// Create a new InvalidTransition error
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new Storage error from context
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::InvalidTransition { .. }
                | Self::NoUnitsConfigured
                | Self::NoAvailableUnit
        )
    }

    /// Check if this error is a server error (5xx category)
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Json(_) | Self::ReservationContention
        )
    }

    /// The operation failed only because of concurrent writers and is safe
    /// to retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReservationContention)
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidTransition { .. } => ErrorCategory::Transition,
            Self::NoUnitsConfigured | Self::NoAvailableUnit => ErrorCategory::Capacity,
            Self::ReservationContention => ErrorCategory::Contention,
            Self::Json(_) => ErrorCategory::Serialization,
            Self::Storage(_) => ErrorCategory::Storage,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Transition,
    Capacity,
    Contention,
    Serialization,
    Storage,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Transition => write!(f, "transition"),
            Self::Capacity => write!(f, "capacity"),
            Self::Contention => write!(f, "contention"),
            Self::Serialization => write!(f, "serialization"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, DispatchError>;
