//! Error types for the A-XDR codec.
//!
//! All decode failures are reported through a single enum so callers at the
//! APDU layer can map them onto a `data-access-result` without inspecting
//! strings.

use thiserror::Error;

/// Errors that can occur while encoding or decoding an A-XDR [`crate::Value`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AxdrError {
    /// Tag byte did not match any known variant.
    #[error("unsupported tag: {tag:#04x}")]
    UnsupportedTag {
        /// The tag byte that was read.
        tag: u8,
    },

    /// A declared length ran past the end of the buffer.
    #[error("length overflow: need {needed} bytes, have {available}")]
    LengthOverflow {
        /// Bytes the decoder needed to continue.
        needed: usize,
        /// Bytes actually remaining in the buffer.
        available: usize,
    },

    /// A length-prefixed-by-u8 form (string, octet-string, array, structure)
    /// was asked to encode more than 255 elements/bytes.
    #[error("length {0} exceeds the single-byte length prefix limit of 255")]
    LengthTooLarge(usize),

    /// A calendar field held a non-sentinel value outside its valid range.
    #[error("calendar field {field} out of range: {value}")]
    RangeViolation {
        /// Name of the offending field (e.g. "month", "hour").
        field: &'static str,
        /// The out-of-range value.
        value: i64,
    },

    /// A compact array declared an element tag that is itself compound
    /// (array, structure, or compact-array) or otherwise unsupported.
    #[error("compact-array element tag {tag:#04x} is not a primitive type")]
    NonPrimitiveCompactElement {
        /// The offending element tag.
        tag: u8,
    },

    /// `decode` did not consume the entire buffer.
    #[error("trailing bytes after decode: {0} byte(s) unconsumed")]
    TrailingBytes(usize),
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, AxdrError>;
