//! WRAPPER frame: a fixed 8-byte header followed by exactly one APDU.

use crate::error::{Result, WrapperError};

/// The only version this core understands.
pub const VERSION: u16 = 0x0001;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 8;

/// A WRAPPER frame: `{version, src, dst, len}` followed by `len` payload
/// bytes, carrying exactly one APDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperFrame {
    /// Source WPORT address.
    pub src: u16,
    /// Destination WPORT address.
    pub dst: u16,
    /// The single APDU carried by this frame.
    pub apdu: Vec<u8>,
}

impl WrapperFrame {
    /// Encode this frame to its full wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.apdu.len());
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&self.src.to_be_bytes());
        out.extend_from_slice(&self.dst.to_be_bytes());
        out.extend_from_slice(&(self.apdu.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.apdu);
        out
    }

    /// Decode a frame from a buffer that must be fully consumed.
    pub fn decode(buf: &[u8]) -> Result<WrapperFrame> {
        if buf.len() < HEADER_SIZE {
            return Err(WrapperError::HeaderTooShort(buf.len()));
        }
        let version = u16::from_be_bytes([buf[0], buf[1]]);
        if version != VERSION {
            return Err(WrapperError::UnsupportedVersion(version));
        }
        let src = u16::from_be_bytes([buf[2], buf[3]]);
        let dst = u16::from_be_bytes([buf[4], buf[5]]);
        let len = u16::from_be_bytes([buf[6], buf[7]]);

        let rest = &buf[HEADER_SIZE..];
        if rest.len() < usize::from(len) {
            return Err(WrapperError::PayloadTooShort { declared: len, available: rest.len() });
        }
        if rest.len() > usize::from(len) {
            return Err(WrapperError::TrailingBytes(rest.len() - usize::from(len)));
        }

        Ok(WrapperFrame { src, dst, apdu: rest.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let frame = WrapperFrame { src: 1, dst: 2, apdu: vec![0xC0, 0x01, 0x02] };
        let wire = frame.encode();
        assert_eq!(&wire[0..2], &[0x00, 0x01]);
        assert_eq!(WrapperFrame::decode(&wire).expect("should decode"), frame);
    }

    #[test]
    fn empty_apdu_round_trip() {
        let frame = WrapperFrame { src: 0, dst: 0, apdu: vec![] };
        let wire = frame.encode();
        assert_eq!(wire.len(), HEADER_SIZE);
        assert_eq!(WrapperFrame::decode(&wire).expect("should decode"), frame);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut wire = WrapperFrame { src: 1, dst: 2, apdu: vec![] }.encode();
        wire[1] = 0x02;
        assert_eq!(WrapperFrame::decode(&wire), Err(WrapperError::UnsupportedVersion(0x0002)));
    }

    #[test]
    fn rejects_short_header() {
        assert_eq!(WrapperFrame::decode(&[0x00, 0x01, 0x00]), Err(WrapperError::HeaderTooShort(3)));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut wire = WrapperFrame { src: 1, dst: 2, apdu: vec![0xAA] }.encode();
        wire.push(0xBB);
        assert_eq!(WrapperFrame::decode(&wire), Err(WrapperError::TrailingBytes(1)));
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(src: u16, dst: u16, apdu in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..300)) {
            let frame = WrapperFrame { src, dst, apdu };
            let wire = frame.encode();
            let decoded = WrapperFrame::decode(&wire).expect("should decode");
            proptest::prop_assert_eq!(decoded, frame);
        }
    }
}
