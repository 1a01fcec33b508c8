//! Error types for notebook cache operations.
//!
//! This module defines [`CacheError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Resolution errors abort the single event that hit them
//! - Populate and relocate errors are returned to the caller
//! - Cleanup failures are logged and reported through outcome values, never
//!   raised to the event dispatcher
//! - Use `anyhow::Error` (via `CacheError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for notebook cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The document registry has no document with this id.
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    /// A document path could not be mapped to a short id.
    #[error("Cannot resolve id for {path}: {message}")]
    PathIdUnresolved { path: PathBuf, message: String },

    /// A short id has no recorded path in the given context.
    #[error("Unknown short id '{id}' in context '{context}'")]
    ShortIdUnknown { id: String, context: String },

    /// An archive could not be rehydrated into a cache folder.
    #[error("Failed to populate cache from {archive}: {message}")]
    Populate { archive: PathBuf, message: String },

    /// A cache folder could not be carried over to its new location.
    #[error("Failed to relocate cache {from} -> {to}: {message}")]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// The retention sweeper could not be scheduled.
    #[error("Failed to schedule cache sweeper: {message}")]
    Schedule { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for notebook cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_not_found_displays_id() {
        let err = CacheError::DocumentNotFound { id: "A1B2".into() };
        assert!(err.to_string().contains("A1B2"));
    }

    #[test]
    fn path_id_unresolved_displays_path_and_message() {
        let err = CacheError::PathIdUnresolved {
            path: PathBuf::from("/work/report.Rmd"),
            message: "index unreadable".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/work/report.Rmd"));
        assert!(msg.contains("index unreadable"));
    }

    #[test]
    fn short_id_unknown_displays_id_and_context() {
        let err = CacheError::ShortIdUnknown {
            id: "0badc0de".into(),
            context: "ctx1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("0badc0de"));
        assert!(msg.contains("ctx1"));
    }

    #[test]
    fn populate_displays_archive() {
        let err = CacheError::Populate {
            archive: PathBuf::from("/work/report.Rnb"),
            message: "truncated".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/work/report.Rnb"));
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn relocate_displays_both_paths() {
        let err = CacheError::Relocate {
            from: PathBuf::from("/a"),
            to: PathBuf::from("/b"),
            message: "disk full".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/a -> /b"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: CacheError = io_err.into();
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(CacheError::ConfigValidationError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
