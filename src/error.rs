//! Error types for fingerprinting resistance
//!
//! This module provides the error taxonomy shared by the override catalog,
//! the applier and both host bindings:
//! - Installation failures (a capability is absent or refuses redefinition)
//! - Catalog mis-specification (caught at construction/test time)
//! - Consent prompt failures (always resolved as a denial)
//! - Error codes for programmatic handling

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::fingerprint_defense::capability::TargetType;

pub type Result<T> = std::result::Result<T, ResistError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Installation errors (1xx)
    TargetUnavailable = 100,
    MissingOriginal = 101,
    TypeMismatch = 102,
    NotConfigurable = 103,
    NotWritable = 104,
    HostFailure = 105,
    InjectedFailure = 106,
    AlreadyInstalled = 107,

    // Catalog errors (2xx)
    DuplicateEntry = 200,
    InvalidCatalog = 201,

    // Consent errors (3xx)
    ConsentUnavailable = 300,

    // Configuration errors (4xx)
    ConfigError = 400,
}

/// Main error type for fingerprinting resistance
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResistError {
    // ===== Installation Errors =====
    #[error("{0} is not available on this host")]
    TargetUnavailable(TargetType),

    #[error("{target}.{member} has no original to delegate to")]
    MissingOriginal { target: TargetType, member: String },

    #[error("{target}.{member}: {reason}")]
    TypeMismatch {
        target: TargetType,
        member: String,
        reason: String,
    },

    #[error("{target}.{member} is not configurable")]
    NotConfigurable { target: TargetType, member: String },

    #[error("{target}.{member} is read-only")]
    NotWritable { target: TargetType, member: String },

    #[error("Host error: {0}")]
    Host(String),

    /// A value thrown by host code, kept as-is so it can be rethrown.
    #[error("Host threw: {}", thrown_message(.0))]
    Thrown(JsValue),

    #[error("Injected failure at {target}.{member}")]
    InjectedFailure { target: TargetType, member: String },

    #[error("Overrides are already installed")]
    AlreadyInstalled,

    // ===== Catalog Errors =====
    #[error("Duplicate catalog entry {target}.{member}")]
    DuplicateEntry { target: TargetType, member: String },

    #[error("Invalid catalog entry {target}.{member}: {reason}")]
    InvalidCatalog {
        target: TargetType,
        member: String,
        reason: String,
    },

    // ===== Consent Errors =====
    #[error("Consent prompt unavailable: {0}")]
    ConsentUnavailable(String),

    // ===== Configuration Errors =====
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ResistError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            ResistError::TargetUnavailable(_) => ErrorCode::TargetUnavailable,
            ResistError::MissingOriginal { .. } => ErrorCode::MissingOriginal,
            ResistError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            ResistError::NotConfigurable { .. } => ErrorCode::NotConfigurable,
            ResistError::NotWritable { .. } => ErrorCode::NotWritable,
            ResistError::Host(_) | ResistError::Thrown(_) => ErrorCode::HostFailure,
            ResistError::InjectedFailure { .. } => ErrorCode::InjectedFailure,
            ResistError::AlreadyInstalled => ErrorCode::AlreadyInstalled,

            ResistError::DuplicateEntry { .. } => ErrorCode::DuplicateEntry,
            ResistError::InvalidCatalog { .. } => ErrorCode::InvalidCatalog,

            ResistError::ConsentUnavailable(_) => ErrorCode::ConsentUnavailable,

            ResistError::InvalidConfig(_) => ErrorCode::ConfigError,
        }
    }

    /// Whether this error came from installing a single catalog entry.
    ///
    /// These are contained by the installation boundary and never reach the page.
    pub fn is_installation_failure(&self) -> bool {
        matches!(
            self,
            ResistError::TargetUnavailable(_)
                | ResistError::MissingOriginal { .. }
                | ResistError::TypeMismatch { .. }
                | ResistError::NotConfigurable { .. }
                | ResistError::NotWritable { .. }
                | ResistError::Host(_)
                | ResistError::Thrown(_)
                | ResistError::InjectedFailure { .. }
        )
    }

    /// Whether this error is a mis-specified catalog.
    ///
    /// Catalog errors are programming errors and are expected to surface in tests.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            ResistError::DuplicateEntry { .. } | ResistError::InvalidCatalog { .. }
        )
    }
}

/// Host-thrown values go back to the page unchanged; errors raised here
/// become `TypeError`s, as a host method does for a bad receiver.
impl From<ResistError> for JsValue {
    fn from(err: ResistError) -> Self {
        match err {
            ResistError::Thrown(value) => value,
            other => js_sys::TypeError::new(&other.to_string()).into(),
        }
    }
}

impl From<JsValue> for ResistError {
    fn from(value: JsValue) -> Self {
        ResistError::Thrown(value)
    }
}

fn thrown_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_failures() {
        assert!(ResistError::TargetUnavailable(TargetType::ScreenOrientation)
            .is_installation_failure());
        assert!(ResistError::Host("boom".into()).is_installation_failure());
        assert!(ResistError::NotConfigurable {
            target: TargetType::Navigator,
            member: "language".into(),
        }
        .is_installation_failure());

        assert!(!ResistError::AlreadyInstalled.is_installation_failure());
        assert!(!ResistError::ConsentUnavailable("no window".into()).is_installation_failure());
    }

    #[test]
    fn test_catalog_errors() {
        assert!(ResistError::DuplicateEntry {
            target: TargetType::Date,
            member: "getHours".into(),
        }
        .is_catalog_error());
        assert!(!ResistError::Host("x".into()).is_catalog_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ResistError::TargetUnavailable(TargetType::Screen).code(),
            ErrorCode::TargetUnavailable
        );
        assert_eq!(ResistError::AlreadyInstalled.code(), ErrorCode::AlreadyInstalled);
        assert_eq!(
            ResistError::ConsentUnavailable("x".into()).code(),
            ErrorCode::ConsentUnavailable
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ResistError::MissingOriginal {
            target: TargetType::Performance,
            member: "now".into(),
        };
        assert_eq!(err.to_string(), "Performance.now has no original to delegate to");
        assert_eq!(err.code() as u32, 101);
    }
}
