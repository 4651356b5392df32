//! WRAPPER framing: the fixed 8-byte TCP/UDP transport header used when
//! HDLC's bit-oriented framing isn't the underlying transport.

pub mod error;
pub mod frame;

pub use error::{Result, WrapperError};
pub use frame::{WrapperFrame, HEADER_SIZE, VERSION};
