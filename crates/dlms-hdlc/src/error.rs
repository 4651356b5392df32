//! HDLC error taxonomy.
//!
//! Every variant carries a `fatal()` hint per the connection-loop contract:
//! fatal errors close the transport and dispose of the connection state;
//! non-fatal errors are logged and the receive loop continues.

use thiserror::Error;

/// Errors raised by the HDLC engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HdlcError {
    /// A frame failed to parse: bad flags, bad format field, or a truncated
    /// body.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// FCS (or HCS) did not match the frame contents.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// An address field was not 1, 2, or 4 octets, or never terminated.
    #[error("invalid address encoding")]
    InvalidAddress,

    /// `Connecting` received anything other than UA.
    #[error("expected UA during connection setup")]
    InvalidUa,

    /// Peer sent FRMR: fatal per the connection state table.
    #[error("peer rejected a frame (FRMR)")]
    FrameRejected,

    /// `send` was attempted while the outstanding window was full.
    #[error("send window is full")]
    WindowFull,

    /// No frames accepted within `inactivity_timeout` while Connected.
    #[error("connection inactive past the configured timeout")]
    InactivityTimeout,

    /// `segment_buffer` exceeded its configured maximum before reassembly
    /// completed.
    #[error("segment reassembly exceeded the configured maximum of {max} bytes")]
    SegmentBufferOverflow {
        /// Configured maximum, in bytes.
        max: usize,
    },

    /// A segmented PDU was not completed within `frame_assembly_timeout`.
    #[error("frame assembly timed out")]
    FrameAssemblyTimeout,
}

impl HdlcError {
    /// Whether this error must tear down the whole connection, per §7.
    #[must_use]
    pub fn fatal(&self) -> bool {
        matches!(
            self,
            HdlcError::FrameRejected
                | HdlcError::InactivityTimeout
                | HdlcError::SegmentBufferOverflow { .. }
                | HdlcError::FrameAssemblyTimeout
        )
    }
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, HdlcError>;
