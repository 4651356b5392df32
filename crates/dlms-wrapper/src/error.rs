//! Error type for WRAPPER framing.

use thiserror::Error;

/// Errors raised decoding or encoding a WRAPPER frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WrapperError {
    /// Buffer shorter than the fixed 8-byte header.
    #[error("buffer too short for a WRAPPER header: need 8 bytes, have {0}")]
    HeaderTooShort(usize),

    /// `version` field was not `0x0001`.
    #[error("unsupported WRAPPER version: {0:#06x}")]
    UnsupportedVersion(u16),

    /// Declared payload length ran past the end of the buffer.
    #[error("payload length {declared} exceeds available {available} bytes")]
    PayloadTooShort {
        /// Length declared in the header.
        declared: u16,
        /// Bytes actually available after the header.
        available: usize,
    },

    /// `decode` did not consume the entire buffer — a WRAPPER frame carries
    /// exactly one APDU.
    #[error("trailing bytes after the declared payload: {0}")]
    TrailingBytes(usize),
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, WrapperError>;
