//! Security suites for DLMS/COSEM: AEAD encrypt/decrypt for Suites 0-3, and
//! the ECDH + SHA-256 key derivation used during HLS authentication.
//!
//! [`SecuritySetup`] bundles the keys and per-association counters; its
//! [`SecuritySetup::encrypt_and_tag`]/[`SecuritySetup::decrypt_and_verify`]
//! dispatch to the suite-specific module. None of these modules perform I/O
//! or know about APDU framing — they operate purely on byte slices.

pub mod ecdh;
pub mod error;
pub mod header;
pub mod padding;
mod suite0;
mod suite12;
mod suite3;

pub use ecdh::{DerivedKeys, EphemeralKeyAgreement};
pub use error::{Result, SecurityError};
pub use header::{SecurityHeader, SC_AUTHENTICATED, SC_AUTH_ENCRYPTED, SC_ENCRYPTED};
pub use suite3::{derive_keys as derive_suite3_keys, Suite3Keys};

/// The numbered security profile, per the GLOSSARY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// AES-GCM-128, 12-byte truncated tag.
    Gcm128,
    /// AES-CBC-128 + GMAC.
    Cbc128Gmac,
    /// AES-CBC-256 + GMAC.
    Cbc256Gmac,
    /// Kuznyechik + CMAC, GOST key derivation.
    Kuznyechik,
}

/// Keys and replay-protection state for one secured association.
///
/// Constructed explicitly by the caller from negotiated key material; never
/// a global or thread-local.
pub struct SecuritySetup {
    pub suite: Suite,
    pub client_system_title: [u8; 8],
    pub server_system_title: [u8; 8],
    /// Encryption key. 16 bytes for [`Suite::Gcm128`]/[`Suite::Cbc128Gmac`],
    /// 32 bytes for [`Suite::Cbc256Gmac`], unused for [`Suite::Kuznyechik`]
    /// (use `suite3_keys` instead).
    pub encryption_key: Vec<u8>,
    /// Authentication key, same sizing rule as `encryption_key`. For
    /// [`Suite::Gcm128`] this equals `encryption_key` (GCM has no separate
    /// MAC key).
    pub authentication_key: Vec<u8>,
    /// Derived Suite-3 keys, populated only when `suite == Suite::Kuznyechik`.
    pub suite3_keys: Option<suite3::Suite3Keys>,
    /// Highest frame counter accepted from the peer so far.
    pub last_inbound_frame_counter: u32,
    /// Next frame counter to use on outbound frames.
    pub next_outbound_frame_counter: u32,
}

impl SecuritySetup {
    /// Encrypt and tag `plaintext` against the peer identified by
    /// `to_server`, consuming and advancing the outbound frame counter.
    pub fn encrypt_and_tag(&mut self, to_server: bool, plaintext: &[u8]) -> Result<Vec<u8>> {
        let header = SecurityHeader {
            security_control: SC_AUTH_ENCRYPTED,
            frame_counter: self.next_outbound_frame_counter,
        };
        let sender_title = if to_server { self.client_system_title } else { self.server_system_title };

        let sealed = match self.suite {
            Suite::Gcm128 => {
                let key: [u8; 16] = self.encryption_key.clone().try_into().map_err(|_| SecurityError::AuthenticationFailed)?;
                suite0::encrypt_and_tag(&key, &sender_title, header, plaintext)?
            }
            Suite::Cbc128Gmac | Suite::Cbc256Gmac => suite12::encrypt_and_tag(
                &self.encryption_key,
                &self.authentication_key,
                &sender_title,
                header,
                plaintext,
            )?,
            Suite::Kuznyechik => {
                let keys = self.suite3_keys.as_ref().ok_or(SecurityError::AuthenticationFailed)?;
                suite3::encrypt_and_tag(keys, &sender_title, header, plaintext)?
            }
        };

        self.next_outbound_frame_counter += 1;
        Ok(sealed)
    }

    /// Decrypt and verify a secured APDU received from the peer identified
    /// by `from_server`, checking the replay counter against
    /// `last_inbound_frame_counter` and advancing it on success.
    pub fn decrypt_and_verify(&mut self, from_server: bool, header: SecurityHeader, sealed: &[u8]) -> Result<Vec<u8>> {
        let sender_title = if from_server { self.server_system_title } else { self.client_system_title };

        let plaintext = match self.suite {
            Suite::Gcm128 => {
                let key: [u8; 16] = self.encryption_key.clone().try_into().map_err(|_| SecurityError::AuthenticationFailed)?;
                suite0::decrypt_and_verify(&key, &sender_title, header, sealed, self.last_inbound_frame_counter)?
            }
            Suite::Cbc128Gmac | Suite::Cbc256Gmac => suite12::decrypt_and_verify(
                &self.encryption_key,
                &self.authentication_key,
                &sender_title,
                header,
                sealed,
                self.last_inbound_frame_counter,
            )?,
            Suite::Kuznyechik => {
                let keys = self.suite3_keys.as_ref().ok_or(SecurityError::AuthenticationFailed)?;
                suite3::decrypt_and_verify(keys, &sender_title, header, sealed, self.last_inbound_frame_counter)?
            }
        };

        self.last_inbound_frame_counter = header.frame_counter;
        Ok(plaintext)
    }
}
