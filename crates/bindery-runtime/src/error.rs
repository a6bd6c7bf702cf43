//! Public error type
//!
//! Recoverable failures only. Contract violations (a destroyed handle, a
//! short record buffer, an illegal tree transition) panic instead.

use crate::ffi::{CodecError, LoadError};
use bindery_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BinderyError {
    /// A native call reported failure; `message` is the library's error string
    #[error("{operation} failed: {message}")]
    Native { operation: &'static str, message: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A string argument contained an interior NUL
    #[error("{operation}: argument contains an interior NUL byte")]
    InteriorNul { operation: &'static str },
}

impl BinderyError {
    pub fn native(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Native {
            operation,
            message: message.into(),
        }
    }

    /// The native operation that failed, if this is a native failure
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Native { operation, .. } | Self::InteriorNul { operation } => Some(operation),
            _ => None,
        }
    }
}

pub type BinderyResult<T> = Result<T, BinderyError>;
