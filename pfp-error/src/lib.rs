//! Unified error handling for pfp
//!
//! This crate provides the single error type shared by the engine and the
//! command line front end. Topology inconsistencies are not errors: the
//! engine reports them as values and keeps going.

use std::io;
use std::path::PathBuf;

/// Result type alias using PfpError
pub type Result<T> = std::result::Result<T, PfpError>;

/// Unified error type for all pfp operations
#[derive(thiserror::Error, Debug)]
pub enum PfpError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Bus Access Errors
    // ============================================================================
    #[error("PCI bus access failed: {0}")]
    BusAccess(String),

    // ============================================================================
    // Fingerprint Format Errors
    // ============================================================================
    #[error("Malformed stanza at line {line}: {reason}")]
    MalformedStanza {
        line: usize,
        reason: String,
    },

    #[error("Invalid PCI address: {0}")]
    InvalidAddress(String),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl PfpError {
    /// Create a bus access error from a string
    pub fn bus_access(msg: impl Into<String>) -> Self {
        Self::BusAccess(msg.into())
    }

    /// Create a malformed stanza error for the given 1-based line
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedStanza {
            line,
            reason: reason.into(),
        }
    }

    /// Create an invalid address error
    pub fn invalid_address(addr: impl Into<String>) -> Self {
        Self::InvalidAddress(addr.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a file read error carrying the offending path
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}
