// In: src/error.rs

//! This module defines the single, unified error type for the eaggr bindings.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ReturnCode;

#[derive(Error, Debug)]
pub enum EaggrError {
    // =========================================================================
    // === Host-Detected Errors (raised before any boundary crossing)
    // =========================================================================
    /// A caller-supplied value cannot be represented on the wire.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Wire data or an internal discriminant is inconsistent.
    #[error("Invalid state (this is a bug): {0}")]
    InvalidState(String),

    // =========================================================================
    // === Engine Errors
    // =========================================================================
    /// A native entry point returned a status other than `DGGS_SUCCESS`.
    #[error("{message} ({code})")]
    Engine { code: ReturnCode, message: String },

    /// The native library (or one of its dependencies) could not be opened,
    /// or a required symbol was missing from it.
    #[error("Failed to load native library '{}': {reason}", path.display())]
    LibraryLoad { path: PathBuf, reason: String },

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while reading configuration.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl EaggrError {
    /// The native status behind this error, if it came from the engine.
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            EaggrError::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn engine(code: ReturnCode, message: impl Into<String>) -> Self {
        EaggrError::Engine {
            code,
            message: message.into(),
        }
    }
}

// =============================================================================
// === Python Conversion ===
// =============================================================================

#[cfg(feature = "python")]
impl From<EaggrError> for pyo3::PyErr {
    fn from(err: EaggrError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};

        match err {
            EaggrError::Engine { code, message } => {
                pyo3::PyErr::new::<crate::ffi::python::EaggrException, _>((code.to_raw(), message))
            }
            EaggrError::InvalidArgument(_) | EaggrError::Config(_) | EaggrError::SerdeJson(_) => {
                PyValueError::new_err(err.to_string())
            }
            EaggrError::LibraryLoad { .. } | EaggrError::Io(_) => PyIOError::new_err(err.to_string()),
            EaggrError::InvalidState(_) => PyRuntimeError::new_err(err.to_string()),
        }
    }
}
