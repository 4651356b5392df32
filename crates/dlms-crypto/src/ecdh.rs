//! HLS (High-Level Security) key agreement: ephemeral P-256 ECDH followed by
//! an SHA-256 split into the Global Unicast Encryption Key (GUEK) and Global
//! Authentication Key (GAK).
//!
//! `shared_secret = ECDH(local_ephemeral, peer_public)`, then
//! `guek ‖ gak = SHA-256(shared_secret)[..16] ‖ SHA-256(shared_secret)[16..]`
//! — the digest is exactly 32 bytes, so the split is exhaustive with no
//! further stretching.

use p256::ecdh::EphemeralSecret;
use p256::PublicKey;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{Result, SecurityError};

/// One side of an ephemeral ECDH exchange.
pub struct EphemeralKeyAgreement {
    secret: EphemeralSecret,
}

/// Derived key material from a completed exchange.
pub struct DerivedKeys {
    /// Global Unicast Encryption Key.
    pub guek: [u8; 16],
    /// Global Authentication Key.
    pub gak: [u8; 16],
}

impl EphemeralKeyAgreement {
    /// Generate a fresh ephemeral keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self { secret: EphemeralSecret::random(&mut OsRng) }
    }

    /// The encoded (uncompressed) public key to send to the peer.
    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.secret.public_key().to_encoded_point(false).as_bytes().to_vec()
    }

    /// Complete the exchange against the peer's encoded public key, deriving
    /// GUEK and GAK.
    pub fn derive(&self, peer_public_key: &[u8]) -> Result<DerivedKeys> {
        let peer_public =
            PublicKey::from_sec1_bytes(peer_public_key).map_err(|_| SecurityError::KeyAgreementFailed)?;

        let shared = self.secret.diffie_hellman(&peer_public);
        let mut digest = Sha256::digest(shared.raw_secret_bytes());

        let mut guek = [0u8; 16];
        let mut gak = [0u8; 16];
        guek.copy_from_slice(&digest[..16]);
        gak.copy_from_slice(&digest[16..]);
        digest.zeroize();

        Ok(DerivedKeys { guek, gak })
    }
}
