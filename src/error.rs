// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for network operations

/// Failures raised by network operations.
///
/// Structural oddities (cycles, duplicates, unmet demand) are never errors;
/// they come back as [`crate::findings::Finding`]s.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// An argument is out of its valid range
    #[error("invalid {what}: {reason}")]
    Validation {
        /// Which argument
        what: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// No node with this name (or not of the expected kind)
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No pipe in this direction
    #[error("pipe not found: {from} -> {to}")]
    PipeNotFound {
        /// Upstream node
        from: String,
        /// Downstream node
        to: String,
    },

    /// The element already exists
    #[error("already exists: {0}")]
    Conflict(String),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad argument
    Validation,
    /// Missing node or pipe
    NotFound,
    /// Duplicate element
    Conflict,
}

impl NetworkError {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NodeNotFound(_) | Self::PipeNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

/// Result alias for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Reject negative or non-finite quantities
pub(crate) fn check_quantity(what: &'static str, value: f64) -> NetworkResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(NetworkError::Validation {
            what,
            reason: format!("{value} must be a finite, non-negative number"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(NetworkError::NodeNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            NetworkError::PipeNotFound { from: "a".into(), to: "b".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(NetworkError::Conflict("x".into()).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_check_quantity() {
        assert!(check_quantity("demand", 0.0).is_ok());
        assert!(check_quantity("demand", -1.0).is_err());
        assert!(check_quantity("demand", f64::NAN).is_err());
        assert!(check_quantity("demand", f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        let err = NetworkError::PipeNotFound { from: "T".into(), to: "H".into() };
        assert_eq!(err.to_string(), "pipe not found: T -> H");
    }
}
