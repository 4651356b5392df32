//! Explicit, caller-supplied configuration for an HDLC connection.
//!
//! No value here is a module-level default reached for at runtime; every
//! [`Connection`](crate::connection::Connection) is constructed with one of
//! these.

use std::time::Duration;

/// Tuning knobs for one HDLC connection, per the external-interfaces table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdlcConfig {
    /// Max outstanding I-frames before `send` refuses. Hard-capped at 7.
    pub window_size: u8,
    /// Maximum info-field bytes per I-frame; drives segmentation.
    pub max_frame_size: usize,
    /// Idle time after which a Connected link fails its next receive.
    pub inactivity_timeout: Duration,
    /// Upper bound on segmented-PDU assembly.
    pub frame_assembly_timeout: Duration,
    /// Age threshold for the retransmission daemon.
    pub retransmission_timeout: Duration,
    /// Maximum bytes the segment-reassembly buffer may hold.
    pub max_segment_buffer: usize,
    /// This side's HDLC address.
    pub src_addr: Vec<u8>,
    /// The peer's HDLC address.
    pub dest_addr: Vec<u8>,
}

impl Default for HdlcConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            max_frame_size: 128,
            inactivity_timeout: Duration::from_secs(30),
            frame_assembly_timeout: Duration::from_secs(2),
            retransmission_timeout: Duration::from_secs(5),
            max_segment_buffer: 64 * 1024,
            src_addr: vec![0x02],
            dest_addr: vec![0x01],
        }
    }
}
