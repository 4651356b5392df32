//! PKCS#7 padding for the CBC-mode suites.
//!
//! Always at least one byte of padding; the padding value equals the
//! padding length. The verifier rejects zero-length padding, padding
//! larger than the block size, and any mismatched byte in the pad region.

use crate::error::{Result, SecurityError};

const BLOCK_SIZE: usize = 16;

/// Pad `data` to a multiple of the block size, PKCS#7 style.
#[must_use]
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    out
}

/// Strip and validate PKCS#7 padding.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(SecurityError::InvalidPadding);
    }
    let pad_len = usize::from(*data.last().unwrap_or(&0));
    if pad_len == 0 || pad_len > BLOCK_SIZE {
        return Err(SecurityError::InvalidPadding);
    }
    let (plaintext, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| usize::from(b) != pad_len) {
        return Err(SecurityError::InvalidPadding);
    }
    Ok(plaintext)
}
