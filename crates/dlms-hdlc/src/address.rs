//! HDLC address encoding: 1, 2, or 4 octets, each octet's logical value
//! shifted left one bit, with the LSB of the final octet set to mark
//! end-of-address.

use crate::error::{HdlcError, Result};

/// Encode a logical address value, given as 1, 2, or 4 big-endian bytes,
/// into its on-wire shifted-with-terminator form.
pub fn encode_address(logical: &[u8]) -> Result<Vec<u8>> {
    if !matches!(logical.len(), 1 | 2 | 4) {
        return Err(HdlcError::InvalidAddress);
    }
    let last = logical.len() - 1;
    Ok(logical
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            let shifted = b << 1;
            if i == last { shifted | 0x01 } else { shifted & !0x01 }
        })
        .collect())
}

/// Decode an on-wire address from the front of `buf`, scanning for the
/// end-of-address terminator (LSB set). Returns the logical address bytes
/// and the unconsumed remainder.
pub fn decode_address(buf: &[u8]) -> Result<(Vec<u8>, &[u8])> {
    let mut logical = Vec::new();
    for (i, &byte) in buf.iter().enumerate().take(4) {
        logical.push(byte >> 1);
        if byte & 0x01 != 0 {
            let len = i + 1;
            if !matches!(len, 1 | 2 | 4) {
                return Err(HdlcError::InvalidAddress);
            }
            return Ok((logical, &buf[len..]));
        }
    }
    Err(HdlcError::InvalidAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_round_trip() {
        let encoded = encode_address(&[0x01]).expect("should encode");
        assert_eq!(encoded, vec![0x03]);
        let (decoded, rest) = decode_address(&encoded).expect("should decode");
        assert_eq!(decoded, vec![0x01]);
        assert!(rest.is_empty());
    }

    #[test]
    fn two_byte_round_trip() {
        let encoded = encode_address(&[0x00, 0x7F]).expect("should encode");
        let (decoded, rest) = decode_address(&encoded).expect("should decode");
        assert_eq!(decoded, vec![0x00, 0x7F]);
        assert!(rest.is_empty());
    }

    #[test]
    fn four_byte_round_trip() {
        let encoded = encode_address(&[0x01, 0x02, 0x03, 0x04]).expect("should encode");
        let (decoded, rest) = decode_address(&encoded).expect("should decode");
        assert_eq!(decoded, vec![0x01, 0x02, 0x03, 0x04]);
        assert!(rest.is_empty());
    }

    #[test]
    fn rejects_invalid_length() {
        assert!(encode_address(&[0x01, 0x02, 0x03]).is_err());
    }

    #[test]
    fn rejects_missing_terminator() {
        assert_eq!(decode_address(&[0x02, 0x04, 0x06, 0x08]), Err(HdlcError::InvalidAddress));
    }

    #[test]
    fn trailing_bytes_preserved() {
        let (decoded, rest) = decode_address(&[0x03, 0xAA, 0xBB]).expect("should decode");
        assert_eq!(decoded, vec![0x01]);
        assert_eq!(rest, &[0xAA, 0xBB]);
    }
}
