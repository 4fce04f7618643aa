//! Error types for the audit engine

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Top-level error for the audit engine.
///
/// Only a handful of conditions are fatal for a scan; adapter and
/// normalization failures are recovered locally and recorded in the
/// result instead of surfacing here.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Request rejected before admission
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Admission gate is full
    #[error("too many active scans ({active}/{max})")]
    TooManyActiveScans {
        /// Currently active scans
        active: usize,
        /// Configured limit
        max: usize,
    },

    /// Unknown scan id
    #[error("scan {0} not found")]
    NotFound(Uuid),

    /// Operation requires a non-terminal scan
    #[error("scan {0} is already in a terminal state")]
    AlreadyTerminal(Uuid),

    /// The seed page could not be fetched, so there is nothing to scan
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Zero scanner runs succeeded across the whole scan
    #[error("all scanner runs failed")]
    AllScannersFailed,

    /// Unexpected invariant violation; details go to logs, not clients
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Coarse-grained failure string exposed to clients.
    ///
    /// Precise diagnostics stay in the logs and on-disk artifacts.
    pub fn client_reason(&self) -> &'static str {
        match self {
            AuditError::Validation(_) => "invalid_request",
            AuditError::TooManyActiveScans { .. } => "too_many_active_scans",
            AuditError::NotFound(_) => "not_found",
            AuditError::AlreadyTerminal(_) => "already_terminal",
            AuditError::Discovery(_) => "seed_unreachable",
            AuditError::AllScannersFailed => "scanner_unavailable",
            AuditError::Internal(_) => "internal_error",
        }
    }
}

/// Request validation failure with per-field details
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub struct ValidationError {
    /// Summary message
    pub message: String,
    /// Field-level details
    pub details: Vec<ValidationErrorDetail>,
}

impl ValidationError {
    /// Create an empty validation error with a summary message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Append a field-level detail
    pub fn push(&mut self, detail: ValidationErrorDetail) {
        self.details.push(detail);
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for d in &self.details {
            write!(f, "; {}: {}", d.field, d.message)?;
        }
        Ok(())
    }
}

/// One field that failed validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field name
    pub field: String,
    /// What was wrong with it
    pub message: String,
}

impl ValidationErrorDetail {
    /// Create a detail record
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_reasons() {
        assert_eq!(
            AuditError::Discovery("dns".into()).client_reason(),
            "seed_unreachable"
        );
        assert_eq!(AuditError::AllScannersFailed.client_reason(), "scanner_unavailable");
        assert_eq!(
            AuditError::TooManyActiveScans { active: 10, max: 10 }.client_reason(),
            "too_many_active_scans"
        );
    }

    #[test]
    fn test_validation_display() {
        let mut err = ValidationError::new("invalid scan request");
        err.push(ValidationErrorDetail::new("url", "missing"));
        assert_eq!(err.to_string(), "invalid scan request; url: missing");
    }
}
