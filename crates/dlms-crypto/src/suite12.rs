//! Suites 1 and 2: AES-CBC encryption with a separate GMAC authentication
//! tag.
//!
//! Suite 1 uses AES-128 (16-byte keys) for both encryption and MAC; Suite 2
//! uses AES-256 (32-byte keys). The IV for CBC is `AES-encrypt(system_title
//! ‖ frame_counter ‖ 0x00000000)` under the encryption key — block-aligned,
//! unlike the raw GCM nonce Suite 0 uses directly. The plaintext is
//! PKCS#7-padded before CBC; the tag is GMAC (an AES-GCM tag computed over
//! `header ‖ ciphertext` with an empty plaintext) under the auth key.

use aes::cipher::{BlockEncrypt, KeyInit as BlockKeyInit};
use aes::{Aes128, Aes256};
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{AesGcm, Nonce};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use generic_array::typenum::U12;
use generic_array::GenericArray;
use subtle::ConstantTimeEq;

use crate::error::{Result, SecurityError};
use crate::header::SecurityHeader;
use crate::padding::{pad, unpad};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

type Aes128GcmFullTag = AesGcm<Aes128, U12>;
type Aes256GcmFullTag = AesGcm<Aes256, U12>;

const TAG_SIZE: usize = 16;

fn cbc_iv(system_title: &[u8; 8], frame_counter: u32, key: &[u8]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..8].copy_from_slice(system_title);
    block[8..12].copy_from_slice(&frame_counter.to_be_bytes());
    match key.len() {
        16 => {
            let cipher = Aes128::new(GenericArray::from_slice(key));
            let mut ga = GenericArray::clone_from_slice(&block);
            cipher.encrypt_block(&mut ga);
            ga.into()
        }
        32 => {
            let cipher = Aes256::new(GenericArray::from_slice(key));
            let mut ga = GenericArray::clone_from_slice(&block);
            cipher.encrypt_block(&mut ga);
            ga.into()
        }
        _ => unreachable!("key length validated by caller"),
    }
}

fn gmac_tag(auth_key: &[u8], nonce: &[u8; 12], aad: &[u8]) -> Result<Vec<u8>> {
    match auth_key.len() {
        16 => {
            let cipher = Aes128GcmFullTag::new(GenericArray::from_slice(auth_key));
            cipher
                .encrypt(Nonce::<Aes128GcmFullTag>::from_slice(nonce), Payload { msg: &[], aad })
                .map_err(|_| SecurityError::AuthenticationFailed)
        }
        32 => {
            let cipher = Aes256GcmFullTag::new(GenericArray::from_slice(auth_key));
            cipher
                .encrypt(Nonce::<Aes256GcmFullTag>::from_slice(nonce), Payload { msg: &[], aad })
                .map_err(|_| SecurityError::AuthenticationFailed)
        }
        _ => Err(SecurityError::AuthenticationFailed),
    }
}

fn cbc_encrypt(key: &[u8], iv: &[u8; 16], padded: &[u8]) -> Vec<u8> {
    let mut buf = padded.to_vec();
    match key.len() {
        16 => {
            let enc = Aes128CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
            enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, padded.len())
                .expect("length is block-aligned");
        }
        32 => {
            let enc = Aes256CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
            enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, padded.len())
                .expect("length is block-aligned");
        }
        _ => unreachable!("key length validated by caller"),
    }
    buf
}

fn cbc_decrypt(key: &[u8], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = ciphertext.to_vec();
    let out = match key.len() {
        16 => {
            let dec = Aes128CbcDec::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
            dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                .map_err(|_| SecurityError::InvalidPadding)?
        }
        32 => {
            let dec = Aes256CbcDec::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
            dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                .map_err(|_| SecurityError::InvalidPadding)?
        }
        _ => unreachable!("key length validated by caller"),
    };
    Ok(out.to_vec())
}

/// Encrypt and tag `plaintext`. `enc_key`/`auth_key` must both be 16 bytes
/// (Suite 1) or both 32 bytes (Suite 2).
pub fn encrypt_and_tag(
    enc_key: &[u8],
    auth_key: &[u8],
    system_title: &[u8; 8],
    header: SecurityHeader,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let iv = cbc_iv(system_title, header.frame_counter, enc_key);
    let padded = pad(plaintext);
    let ciphertext = cbc_encrypt(enc_key, &iv, &padded);

    let mut aad = header.encode().to_vec();
    aad.extend_from_slice(&ciphertext);
    let tag = gmac_tag(auth_key, &iv[..12].try_into().expect("12 of 16 bytes"), &aad)?;

    let mut out = ciphertext;
    out.extend_from_slice(&tag[..TAG_SIZE]);
    Ok(out)
}

/// Decrypt and verify `ciphertext ‖ tag(16)`, enforcing replay protection.
pub fn decrypt_and_verify(
    enc_key: &[u8],
    auth_key: &[u8],
    system_title: &[u8; 8],
    header: SecurityHeader,
    sealed: &[u8],
    last_inbound_frame_counter: u32,
) -> Result<Vec<u8>> {
    if header.frame_counter <= last_inbound_frame_counter {
        return Err(SecurityError::ReplayAttack {
            counter: header.frame_counter,
            last_inbound: last_inbound_frame_counter,
        });
    }
    if sealed.len() < TAG_SIZE {
        return Err(SecurityError::CiphertextTooShort);
    }
    let (ciphertext, received_tag) = sealed.split_at(sealed.len() - TAG_SIZE);

    let iv = cbc_iv(system_title, header.frame_counter, enc_key);
    let mut aad = header.encode().to_vec();
    aad.extend_from_slice(ciphertext);
    let expected_tag = gmac_tag(auth_key, &iv[..12].try_into().expect("12 of 16 bytes"), &aad)?;

    if expected_tag[..TAG_SIZE].ct_eq(received_tag).unwrap_u8() != 1 {
        return Err(SecurityError::AuthenticationFailed);
    }

    let padded = cbc_decrypt(enc_key, &iv, ciphertext)?;
    unpad(&padded).map(<[u8]>::to_vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(counter: u32) -> SecurityHeader {
        SecurityHeader { security_control: crate::header::SC_AUTH_ENCRYPTED, frame_counter: counter }
    }

    #[test]
    fn suite1_round_trip() {
        let enc_key = [0x11; 16];
        let auth_key = [0x22; 16];
        let title = *b"SERVER01";
        let plaintext = b"Hello, COSEM!";

        let sealed = encrypt_and_tag(&enc_key, &auth_key, &title, header(1), plaintext).expect("should encrypt");
        let decrypted =
            decrypt_and_verify(&enc_key, &auth_key, &title, header(1), &sealed, 0).expect("should decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn suite2_round_trip() {
        let enc_key = [0x33; 32];
        let auth_key = [0x44; 32];
        let title = *b"METER001";
        let plaintext = b"a longer payload spanning more than one AES block of data";

        let sealed = encrypt_and_tag(&enc_key, &auth_key, &title, header(7), plaintext).expect("should encrypt");
        let decrypted =
            decrypt_and_verify(&enc_key, &auth_key, &title, header(7), &sealed, 6).expect("should decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn replay_rejected() {
        let enc_key = [0x11; 16];
        let auth_key = [0x22; 16];
        let title = *b"SERVER01";
        let sealed = encrypt_and_tag(&enc_key, &auth_key, &title, header(5), b"x").expect("should encrypt");
        assert_eq!(
            decrypt_and_verify(&enc_key, &auth_key, &title, header(5), &sealed, 5),
            Err(SecurityError::ReplayAttack { counter: 5, last_inbound: 5 })
        );
    }

    #[test]
    fn tampered_tag_rejected() {
        let enc_key = [0x11; 16];
        let auth_key = [0x22; 16];
        let title = *b"SERVER01";
        let mut sealed = encrypt_and_tag(&enc_key, &auth_key, &title, header(1), b"payload").expect("encrypt");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert_eq!(
            decrypt_and_verify(&enc_key, &auth_key, &title, header(1), &sealed, 0),
            Err(SecurityError::AuthenticationFailed)
        );
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let enc_key = [0x11; 16];
        let auth_key = [0x22; 16];
        let title = *b"SERVER01";
        let mut sealed = encrypt_and_tag(&enc_key, &auth_key, &title, header(1), b"payload!!").expect("encrypt");
        sealed[0] ^= 0xFF;
        assert_eq!(
            decrypt_and_verify(&enc_key, &auth_key, &title, header(1), &sealed, 0),
            Err(SecurityError::AuthenticationFailed)
        );
    }
}
