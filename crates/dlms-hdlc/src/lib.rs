//! HDLC data-link engine for DLMS/COSEM: frame codec, CRC-16/X-25, and the
//! connection state machine driving segmentation, the sliding window, and
//! retransmission.
//!
//! The state machine (`connection`) never performs I/O itself; every
//! transition returns the [`connection::ConnectionAction`]s the caller must
//! carry out, keeping the engine deterministic and trivially testable with a
//! virtual clock.

pub mod address;
pub mod config;
pub mod connection;
pub mod control;
pub mod crc;
pub mod error;
pub mod frame;

pub use config::HdlcConfig;
pub use connection::{Clock, Connection, ConnectionAction, ConnectionState};
pub use control::Control;
pub use error::{HdlcError, Result};
pub use frame::Frame;
