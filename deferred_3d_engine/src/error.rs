//! Error types for the deferred engine
//!
//! Every fallible operation in the core crate and in the backends returns
//! [`Result`]. Most errors are fatal configuration problems (missing shader
//! binary, failed pipeline creation, malformed baked model) and bubble up to
//! the application entry point.

use std::fmt;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan call failed, command list misuse, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource or descriptor (mismatched attachments, unknown key, ...)
    InvalidResource(String),

    /// Initialization failed (engine, renderer, subsystems)
    InitializationFailed(String),

    /// Asset could not be read or decoded (baked model, texture, shader binary)
    AssetError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetError(msg) => write!(f, "Asset error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::AssetError(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
