//! A-XDR: the self-describing, tagged value codec used by DLMS/COSEM APDUs.
//!
//! Every value on the wire carries its own type tag, so a decoder never needs
//! out-of-band schema information to walk a buffer. [`Value`] covers every
//! tag in the type table (`0x00`-`0x21`), including the single-byte
//! length-prefixed forms (octet-string, visible-string, array, structure,
//! compact-array), which this codec caps at 255 elements/bytes per value
//! rather than supporting a multi-byte extended form; [`calendar`] holds the
//! `Date`/`Time`/`DateTime` types with their sentinel-based "undefined"
//! fields.

pub mod calendar;
pub mod error;
pub mod value;

pub use calendar::{Date, DateTime, Time};
pub use error::{AxdrError, Result};
pub use value::{decode_value, tag, Value};
