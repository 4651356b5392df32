//! The `Value` enum: every A-XDR primitive and compound type, tags 0x00-0x21.
//!
//! [`Value::encode`]/[`Value::decode`] operate on a whole buffer and reject
//! trailing bytes; [`decode_value`] performs a single partial decode and
//! hands back the unconsumed remainder, which is what the APDU layer needs
//! when a `Value` is embedded inside a larger structure.

use crate::calendar::{Date, DateTime, Time};
use crate::error::{AxdrError, Result};

/// Tag bytes for every `Value` variant, per the A-XDR type table.
pub mod tag {
    pub const NULL: u8 = 0x00;
    pub const ARRAY: u8 = 0x01;
    pub const STRUCTURE: u8 = 0x02;
    pub const BOOLEAN: u8 = 0x03;
    pub const BIT_STRING: u8 = 0x04;
    pub const INT32: u8 = 0x05;
    pub const UINT32: u8 = 0x06;
    pub const OCTET_STRING: u8 = 0x09;
    pub const VISIBLE_STRING: u8 = 0x0A;
    pub const BCD: u8 = 0x0D;
    pub const INT8: u8 = 0x0F;
    pub const INT16: u8 = 0x10;
    pub const UINT8: u8 = 0x11;
    pub const UINT16: u8 = 0x12;
    pub const COMPACT_ARRAY: u8 = 0x13;
    pub const INT64: u8 = 0x14;
    pub const UINT64: u8 = 0x15;
    pub const ENUM: u8 = 0x16;
    pub const FLOAT32: u8 = 0x17;
    pub const FLOAT64: u8 = 0x18;
    pub const DATE_TIME: u8 = 0x19;
    pub const DATE: u8 = 0x1A;
    pub const TIME: u8 = 0x1B;
    pub const DELTA_INT8: u8 = 0x1C;
    pub const DELTA_INT16: u8 = 0x1D;
    pub const DELTA_INT32: u8 = 0x1E;
    pub const DELTA_UINT8: u8 = 0x1F;
    pub const DELTA_UINT16: u8 = 0x20;
    pub const DELTA_UINT32: u8 = 0x21;
}

/// A tagged, self-describing A-XDR value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `0x00` null, carries no payload.
    Null,
    /// `0x01` array: an ordered sequence of tagged values.
    Array(Vec<Value>),
    /// `0x02` structure: an ordered, heterogeneous sequence of tagged values.
    Structure(Vec<Value>),
    /// `0x03` boolean.
    Boolean(bool),
    /// `0x04` bit-string: `bit_length` significant bits packed big-endian,
    /// unused trailing bits in the last byte are zero.
    BitString {
        /// Number of significant bits.
        bit_length: u8,
        /// Packed bits, `ceil(bit_length / 8)` bytes.
        bits: Vec<u8>,
    },
    /// `0x05` signed 32-bit integer.
    Int32(i32),
    /// `0x06` unsigned 32-bit integer.
    Uint32(u32),
    /// `0x09` octet-string, length-prefixed by one byte.
    OctetString(Vec<u8>),
    /// `0x0A` visible-string (ASCII), length-prefixed by one byte.
    VisibleString(Vec<u8>),
    /// `0x0D` binary-coded decimal: `digit_count` nibbles, high nibble first.
    Bcd {
        /// Number of decimal digits encoded.
        digit_count: u8,
        /// Packed nibbles, `ceil(digit_count / 2)` bytes.
        digits: Vec<u8>,
    },
    /// `0x0F` signed 8-bit integer.
    Int8(i8),
    /// `0x10` signed 16-bit integer.
    Int16(i16),
    /// `0x11` unsigned 8-bit integer.
    Uint8(u8),
    /// `0x12` unsigned 16-bit integer.
    Uint16(u16),
    /// `0x13` compact-array: one element tag, then untagged payloads.
    CompactArray {
        /// Tag shared by every element; must be a primitive (non-compound) tag.
        element_tag: u8,
        /// Decoded elements, all sharing `element_tag`.
        elements: Vec<Value>,
    },
    /// `0x14` signed 64-bit integer.
    Int64(i64),
    /// `0x15` unsigned 64-bit integer.
    Uint64(u64),
    /// `0x16` enumeration value.
    Enum(u8),
    /// `0x17` IEEE-754 single precision.
    Float32(f32),
    /// `0x18` IEEE-754 double precision.
    Float64(f64),
    /// `0x19` full timestamp.
    DateTime(DateTime),
    /// `0x1A` calendar date.
    Date(Date),
    /// `0x1B` time of day.
    Time(Time),
    /// `0x1C` delta-encoded signed 8-bit integer.
    DeltaInt8(i8),
    /// `0x1D` delta-encoded signed 16-bit integer.
    DeltaInt16(i16),
    /// `0x1E` delta-encoded signed 32-bit integer.
    DeltaInt32(i32),
    /// `0x1F` delta-encoded unsigned 8-bit integer.
    DeltaUint8(u8),
    /// `0x20` delta-encoded unsigned 16-bit integer.
    DeltaUint16(u16),
    /// `0x21` delta-encoded unsigned 32-bit integer.
    DeltaUint32(u32),
}

/// Whether `t` is a primitive (non-compound) tag, i.e. a valid
/// `CompactArray` element tag.
fn is_primitive_tag(t: u8) -> bool {
    !matches!(t, tag::ARRAY | tag::STRUCTURE | tag::COMPACT_ARRAY)
}

impl Value {
    /// Tag byte for this value's variant.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Value::Null => tag::NULL,
            Value::Array(_) => tag::ARRAY,
            Value::Structure(_) => tag::STRUCTURE,
            Value::Boolean(_) => tag::BOOLEAN,
            Value::BitString { .. } => tag::BIT_STRING,
            Value::Int32(_) => tag::INT32,
            Value::Uint32(_) => tag::UINT32,
            Value::OctetString(_) => tag::OCTET_STRING,
            Value::VisibleString(_) => tag::VISIBLE_STRING,
            Value::Bcd { .. } => tag::BCD,
            Value::Int8(_) => tag::INT8,
            Value::Int16(_) => tag::INT16,
            Value::Uint8(_) => tag::UINT8,
            Value::Uint16(_) => tag::UINT16,
            Value::CompactArray { .. } => tag::COMPACT_ARRAY,
            Value::Int64(_) => tag::INT64,
            Value::Uint64(_) => tag::UINT64,
            Value::Enum(_) => tag::ENUM,
            Value::Float32(_) => tag::FLOAT32,
            Value::Float64(_) => tag::FLOAT64,
            Value::DateTime(_) => tag::DATE_TIME,
            Value::Date(_) => tag::DATE,
            Value::Time(_) => tag::TIME,
            Value::DeltaInt8(_) => tag::DELTA_INT8,
            Value::DeltaInt16(_) => tag::DELTA_INT16,
            Value::DeltaInt32(_) => tag::DELTA_INT32,
            Value::DeltaUint8(_) => tag::DELTA_UINT8,
            Value::DeltaUint16(_) => tag::DELTA_UINT16,
            Value::DeltaUint32(_) => tag::DELTA_UINT32,
        }
    }

    /// Encode this value, including its leading tag byte, into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Encode this value, including its tag byte, appending to `out`.
    ///
    /// Fails with [`AxdrError::LengthTooLarge`] if a length-prefixed-by-u8
    /// form (octet-string, visible-string, array, structure, compact-array)
    /// holds more than 255 elements/bytes, and propagates calendar
    /// validation failures from `DateTime`/`Date`/`Time`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.tag());
        match self {
            Value::Null => {}
            Value::Array(items) | Value::Structure(items) => {
                let len = u8::try_from(items.len()).map_err(|_| AxdrError::LengthTooLarge(items.len()))?;
                out.push(len);
                for item in items {
                    item.encode_into(out)?;
                }
            }
            Value::Boolean(b) => out.push(u8::from(*b)),
            Value::BitString { bit_length, bits } => {
                out.push(*bit_length);
                out.extend_from_slice(bits);
            }
            Value::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Uint32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::OctetString(bytes) => {
                let len = u8::try_from(bytes.len()).map_err(|_| AxdrError::LengthTooLarge(bytes.len()))?;
                out.push(len);
                out.extend_from_slice(bytes);
            }
            Value::VisibleString(bytes) => {
                let len = u8::try_from(bytes.len()).map_err(|_| AxdrError::LengthTooLarge(bytes.len()))?;
                out.push(len);
                out.extend_from_slice(bytes);
            }
            Value::Bcd { digit_count, digits } => {
                out.push(*digit_count);
                out.extend_from_slice(digits);
            }
            Value::Int8(v) => out.push(*v as u8),
            Value::Int16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Uint8(v) => out.push(*v),
            Value::Uint16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::CompactArray { element_tag, elements } => {
                let len = u8::try_from(elements.len()).map_err(|_| AxdrError::LengthTooLarge(elements.len()))?;
                out.push(len);
                out.push(*element_tag);
                for element in elements {
                    let encoded = element.encode()?;
                    // strip the per-element tag byte: compact-array elements
                    // are untagged payloads sharing `element_tag`.
                    out.extend_from_slice(&encoded[1..]);
                }
            }
            Value::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Uint64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Enum(v) => out.push(*v),
            Value::Float32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Float64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::DateTime(dt) => dt.encode(out)?,
            Value::Date(d) => d.encode(out)?,
            Value::Time(t) => t.encode(out)?,
            Value::DeltaInt8(v) => out.push(*v as u8),
            Value::DeltaInt16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::DeltaInt32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::DeltaUint8(v) => out.push(*v),
            Value::DeltaUint16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::DeltaUint32(v) => out.extend_from_slice(&v.to_be_bytes()),
        }
        Ok(())
    }

    /// Decode a `Value` from a buffer that must be fully consumed.
    pub fn decode(buf: &[u8]) -> Result<Value> {
        let (value, rest) = decode_value(buf)?;
        if !rest.is_empty() {
            return Err(AxdrError::TrailingBytes(rest.len()));
        }
        Ok(value)
    }
}

fn need(buf: &[u8], n: usize) -> Result<()> {
    if buf.len() < n {
        Err(AxdrError::LengthOverflow { needed: n, available: buf.len() })
    } else {
        Ok(())
    }
}

/// Decode one tagged `Value` from the front of `buf`, returning it together
/// with the unconsumed remainder.
pub fn decode_value(buf: &[u8]) -> Result<(Value, &[u8])> {
    let &t = buf.first().ok_or(AxdrError::LengthOverflow { needed: 1, available: 0 })?;
    let rest = &buf[1..];
    match t {
        tag::NULL => Ok((Value::Null, rest)),
        tag::ARRAY | tag::STRUCTURE => {
            need(rest, 1)?;
            let count = usize::from(rest[0]);
            let mut cursor = &rest[1..];
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (item, next) = decode_value(cursor)?;
                items.push(item);
                cursor = next;
            }
            let value = if t == tag::ARRAY { Value::Array(items) } else { Value::Structure(items) };
            Ok((value, cursor))
        }
        tag::BOOLEAN => {
            need(rest, 1)?;
            Ok((Value::Boolean(rest[0] != 0), &rest[1..]))
        }
        tag::BIT_STRING => {
            need(rest, 1)?;
            let bit_length = rest[0];
            let byte_len = (usize::from(bit_length) + 7) / 8;
            need(&rest[1..], byte_len)?;
            let bits = rest[1..1 + byte_len].to_vec();
            Ok((Value::BitString { bit_length, bits }, &rest[1 + byte_len..]))
        }
        tag::INT32 => {
            need(rest, 4)?;
            Ok((Value::Int32(i32::from_be_bytes(rest[0..4].try_into().unwrap_or_default())), &rest[4..]))
        }
        tag::UINT32 => {
            need(rest, 4)?;
            Ok((Value::Uint32(u32::from_be_bytes(rest[0..4].try_into().unwrap_or_default())), &rest[4..]))
        }
        tag::OCTET_STRING => {
            need(rest, 1)?;
            let len = usize::from(rest[0]);
            need(&rest[1..], len)?;
            Ok((Value::OctetString(rest[1..1 + len].to_vec()), &rest[1 + len..]))
        }
        tag::VISIBLE_STRING => {
            need(rest, 1)?;
            let len = usize::from(rest[0]);
            need(&rest[1..], len)?;
            Ok((Value::VisibleString(rest[1..1 + len].to_vec()), &rest[1 + len..]))
        }
        tag::BCD => {
            need(rest, 1)?;
            let digit_count = rest[0];
            let byte_len = (usize::from(digit_count) + 1) / 2;
            need(&rest[1..], byte_len)?;
            let digits = rest[1..1 + byte_len].to_vec();
            Ok((Value::Bcd { digit_count, digits }, &rest[1 + byte_len..]))
        }
        tag::INT8 => {
            need(rest, 1)?;
            Ok((Value::Int8(rest[0] as i8), &rest[1..]))
        }
        tag::INT16 => {
            need(rest, 2)?;
            Ok((Value::Int16(i16::from_be_bytes(rest[0..2].try_into().unwrap_or_default())), &rest[2..]))
        }
        tag::UINT8 => {
            need(rest, 1)?;
            Ok((Value::Uint8(rest[0]), &rest[1..]))
        }
        tag::UINT16 => {
            need(rest, 2)?;
            Ok((Value::Uint16(u16::from_be_bytes(rest[0..2].try_into().unwrap_or_default())), &rest[2..]))
        }
        tag::COMPACT_ARRAY => {
            need(rest, 2)?;
            let count = usize::from(rest[0]);
            let element_tag = rest[1];
            if !is_primitive_tag(element_tag) {
                return Err(AxdrError::NonPrimitiveCompactElement { tag: element_tag });
            }
            let mut cursor = &rest[2..];
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                let mut untagged = vec![element_tag];
                untagged.extend_from_slice(cursor);
                let (element, next) = decode_value(&untagged)?;
                let consumed = untagged.len() - next.len() - 1;
                elements.push(element);
                cursor = &cursor[consumed..];
            }
            Ok((Value::CompactArray { element_tag, elements }, cursor))
        }
        tag::INT64 => {
            need(rest, 8)?;
            Ok((Value::Int64(i64::from_be_bytes(rest[0..8].try_into().unwrap_or_default())), &rest[8..]))
        }
        tag::UINT64 => {
            need(rest, 8)?;
            Ok((Value::Uint64(u64::from_be_bytes(rest[0..8].try_into().unwrap_or_default())), &rest[8..]))
        }
        tag::ENUM => {
            need(rest, 1)?;
            Ok((Value::Enum(rest[0]), &rest[1..]))
        }
        tag::FLOAT32 => {
            need(rest, 4)?;
            Ok((Value::Float32(f32::from_be_bytes(rest[0..4].try_into().unwrap_or_default())), &rest[4..]))
        }
        tag::FLOAT64 => {
            need(rest, 8)?;
            Ok((Value::Float64(f64::from_be_bytes(rest[0..8].try_into().unwrap_or_default())), &rest[8..]))
        }
        tag::DATE_TIME => {
            need(rest, DateTime::SIZE)?;
            Ok((Value::DateTime(DateTime::decode(&rest[..DateTime::SIZE])?), &rest[DateTime::SIZE..]))
        }
        tag::DATE => {
            need(rest, Date::SIZE)?;
            Ok((Value::Date(Date::decode(&rest[..Date::SIZE])?), &rest[Date::SIZE..]))
        }
        tag::TIME => {
            need(rest, Time::SIZE)?;
            Ok((Value::Time(Time::decode(&rest[..Time::SIZE])?), &rest[Time::SIZE..]))
        }
        tag::DELTA_INT8 => {
            need(rest, 1)?;
            Ok((Value::DeltaInt8(rest[0] as i8), &rest[1..]))
        }
        tag::DELTA_INT16 => {
            need(rest, 2)?;
            Ok((Value::DeltaInt16(i16::from_be_bytes(rest[0..2].try_into().unwrap_or_default())), &rest[2..]))
        }
        tag::DELTA_INT32 => {
            need(rest, 4)?;
            Ok((Value::DeltaInt32(i32::from_be_bytes(rest[0..4].try_into().unwrap_or_default())), &rest[4..]))
        }
        tag::DELTA_UINT8 => {
            need(rest, 1)?;
            Ok((Value::DeltaUint8(rest[0]), &rest[1..]))
        }
        tag::DELTA_UINT16 => {
            need(rest, 2)?;
            Ok((Value::DeltaUint16(u16::from_be_bytes(rest[0..2].try_into().unwrap_or_default())), &rest[2..]))
        }
        tag::DELTA_UINT32 => {
            need(rest, 4)?;
            Ok((Value::DeltaUint32(u32::from_be_bytes(rest[0..4].try_into().unwrap_or_default())), &rest[4..]))
        }
        other => Err(AxdrError::UnsupportedTag { tag: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn null_round_trip() {
        let v = Value::Null;
        let bytes = v.encode().expect("should encode");
        assert_eq!(bytes, vec![0x00]);
        assert_eq!(Value::decode(&bytes).expect("should decode"), v);
    }

    #[test]
    fn structure_round_trip() {
        let v = Value::Structure(vec![Value::Uint8(7), Value::Boolean(true)]);
        let bytes = v.encode().expect("should encode");
        assert_eq!(Value::decode(&bytes).expect("should decode"), v);
    }

    #[test]
    fn octet_string_round_trip() {
        let v = Value::OctetString(vec![0, 0, 1, 0, 1, 255]);
        let bytes = v.encode().expect("should encode");
        assert_eq!(bytes, vec![0x09, 0x06, 0, 0, 1, 0, 1, 255]);
        assert_eq!(Value::decode(&bytes).expect("should decode"), v);
    }

    #[test]
    fn octet_string_rejects_length_over_255() {
        let v = Value::OctetString(vec![0u8; 256]);
        assert_eq!(v.encode(), Err(AxdrError::LengthTooLarge(256)));
    }

    #[test]
    fn compact_array_round_trip() {
        let v = Value::CompactArray {
            element_tag: tag::UINT16,
            elements: vec![Value::Uint16(1), Value::Uint16(2), Value::Uint16(3)],
        };
        let bytes = v.encode().expect("should encode");
        assert_eq!(bytes, vec![0x13, 0x03, 0x12, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);
        assert_eq!(Value::decode(&bytes).expect("should decode"), v);
    }

    #[test]
    fn compact_array_rejects_compound_element_tag() {
        let bytes = vec![0x13, 0x01, tag::STRUCTURE];
        assert!(matches!(
            Value::decode(&bytes),
            Err(AxdrError::NonPrimitiveCompactElement { tag: tag::STRUCTURE })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let bytes = vec![0x00, 0xFF];
        assert_eq!(Value::decode(&bytes), Err(AxdrError::TrailingBytes(1)));
    }

    #[test]
    fn unsupported_tag_rejected() {
        assert_eq!(Value::decode(&[0x7F]), Err(AxdrError::UnsupportedTag { tag: 0x7F }));
    }

    fn arb_primitive() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Boolean),
            any::<i32>().prop_map(Value::Int32),
            any::<u32>().prop_map(Value::Uint32),
            any::<i8>().prop_map(Value::Int8),
            any::<i16>().prop_map(Value::Int16),
            any::<u8>().prop_map(Value::Uint8),
            any::<u16>().prop_map(Value::Uint16),
            any::<i64>().prop_map(Value::Int64),
            any::<u64>().prop_map(Value::Uint64),
            any::<u8>().prop_map(Value::Enum),
            prop::collection::vec(any::<u8>(), 0..20).prop_map(Value::OctetString),
        ]
    }

    proptest! {
        #[test]
        fn prop_primitive_round_trip(v in arb_primitive()) {
            let bytes = v.encode().expect("should encode");
            let decoded = Value::decode(&bytes).expect("should decode");
            prop_assert_eq!(decoded, v);
        }

        #[test]
        fn prop_array_round_trip(values in prop::collection::vec(arb_primitive(), 0..8)) {
            let v = Value::Array(values);
            let bytes = v.encode().expect("should encode");
            let decoded = Value::decode(&bytes).expect("should decode");
            prop_assert_eq!(decoded, v);
        }
    }
}
