//! Security-engine error taxonomy.
//!
//! Per §7, these are fatal to the *request* that triggered them, never to
//! the connection — the next request on the same link may still succeed.

use thiserror::Error;

/// Errors raised by the security engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// `frame_counter` was not strictly greater than `last_inbound_frame_counter`.
    #[error("replay detected: frame counter {counter} is not greater than last inbound {last_inbound}")]
    ReplayAttack {
        /// Counter carried by the rejected frame.
        counter: u32,
        /// Highest counter previously accepted.
        last_inbound: u32,
    },

    /// GCM/GMAC/CMAC tag verification failed.
    #[error("authentication tag mismatch")]
    AuthenticationFailed,

    /// PKCS#7 unpadding rejected the plaintext (zero padding, padding larger
    /// than the block size, or an inconsistent pad byte).
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,

    /// ECDH key agreement failed (invalid peer public key).
    #[error("key agreement failed")]
    KeyAgreementFailed,

    /// A digital signature failed to verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// Policy required a capability this core does not implement (the
    /// "digitally signed" policy flag).
    #[error("policy requires a capability not supported by this core: {0}")]
    UnsupportedPolicy(&'static str),

    /// Ciphertext too short to contain its trailing authentication tag.
    #[error("ciphertext shorter than the required tag length")]
    CiphertextTooShort,
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, SecurityError>;
