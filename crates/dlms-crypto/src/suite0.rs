//! Suite 0: AES-GCM-128.
//!
//! Key is the 16-byte GUEK. Nonce = `system_title(8) ‖ frame_counter(4)`.
//! AAD is the 5-byte security header. Output is `ciphertext ‖ tag(12)` — this
//! suite truncates the standard 128-bit GCM tag to 96 bits, as DLMS/COSEM
//! requires.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes128;
use aes_gcm::{AesGcm, Nonce};
use generic_array::typenum::U12;
use generic_array::GenericArray;

use crate::error::{Result, SecurityError};
use crate::header::{nonce_base, SecurityHeader};

/// AES-128-GCM with a 96-bit tag, per DLMS Suite 0.
type Aes128Gcm96 = AesGcm<Aes128, U12, U12>;

/// Encrypt `plaintext` under `key`/`system_title`/`header`, returning
/// `ciphertext ‖ tag(12)`.
pub fn encrypt_and_tag(
    key: &[u8; 16],
    system_title: &[u8; 8],
    header: SecurityHeader,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm96::new(GenericArray::from_slice(key));
    let nonce_bytes = nonce_base(system_title, header.frame_counter);
    let nonce = Nonce::<Aes128Gcm96>::from_slice(&nonce_bytes);
    let aad = header.encode();
    cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &aad })
        .map_err(|_| SecurityError::AuthenticationFailed)
}

/// Decrypt `ciphertext ‖ tag(12)`, enforcing strict counter monotonicity.
pub fn decrypt_and_verify(
    key: &[u8; 16],
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
    if sealed.len() < 12 {
        return Err(SecurityError::CiphertextTooShort);
    }

    let cipher = Aes128Gcm96::new(GenericArray::from_slice(key));
    let nonce_bytes = nonce_base(system_title, header.frame_counter);
    let nonce = Nonce::<Aes128Gcm96>::from_slice(&nonce_bytes);
    let aad = header.encode();

    cipher
        .decrypt(nonce, Payload { msg: sealed, aad: &aad })
        .map_err(|_| SecurityError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(counter: u32) -> SecurityHeader {
        SecurityHeader { security_control: crate::header::SC_AUTH_ENCRYPTED, frame_counter: counter }
    }

    /// Scenario S6: encrypt "Hello, COSEM!" under a literal key/title at
    /// counter=1; decrypting twice with the same `last_inbound` the second
    /// time must fail with ReplayAttack.
    #[test]
    fn s6_replay_protection() {
        let key = *b"0123456789ABCDEF";
        let title = *b"SERVER01";
        let plaintext = b"Hello, COSEM!";

        let sealed = encrypt_and_tag(&key, &title, header(1), plaintext).expect("should encrypt");

        let decrypted =
            decrypt_and_verify(&key, &title, header(1), &sealed, 0).expect("should decrypt at counter 1");
        assert_eq!(decrypted, plaintext);

        let err = decrypt_and_verify(&key, &title, header(1), &sealed, 1).expect_err("must reject replay");
        assert_eq!(err, SecurityError::ReplayAttack { counter: 1, last_inbound: 1 });
    }

    #[test]
    fn tamper_detected() {
        let key = [0x11; 16];
        let title = *b"SERVER01";
        let mut sealed = encrypt_and_tag(&key, &title, header(1), b"payload").expect("should encrypt");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert_eq!(
            decrypt_and_verify(&key, &title, header(1), &sealed, 0),
            Err(SecurityError::AuthenticationFailed)
        );
    }

    #[test]
    fn wrong_key_rejected() {
        let key = [0x11; 16];
        let wrong_key = [0x22; 16];
        let title = *b"SERVER01";
        let sealed = encrypt_and_tag(&key, &title, header(1), b"payload").expect("should encrypt");
        assert_eq!(
            decrypt_and_verify(&wrong_key, &title, header(1), &sealed, 0),
            Err(SecurityError::AuthenticationFailed)
        );
    }
}
