//! Hybrid encrypt/decrypt.
//!
//! Messages are sealed with XChaCha20-Poly1305 under a per-peer session key;
//! the session key travels wrapped in the second envelope field (see
//! [`keywrap`](crate::keywrap)). Every message gets a fresh random 24-byte
//! nonce, so nonce reuse under a cached key is not a practical concern.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use tracing::warn;

use crate::envelope::{Envelope, SealedField};
use crate::error::{CryptoError, Result};
use crate::identity::Identity;
use crate::keywrap::random_bytes;
use crate::session::peer_tag;

/// Nonce length of the message cipher (XChaCha20-Poly1305).
pub const MESSAGE_NONCE_SIZE: usize = 24;

impl Identity {
    /// Encrypt `plaintext` for `peer_public`, reusing cached session keys
    /// according to the configured default.
    pub fn encrypt(&self, plaintext: &str, peer_public: &str) -> Result<String> {
        self.encrypt_with_reuse(plaintext, peer_public, self.config().reuse_session_keys)
    }

    /// Encrypt `plaintext` for `peer_public`.
    ///
    /// With `reuse`, consecutive envelopes to the same peer share the
    /// wrapped-key field; without it every envelope carries a new key.
    pub fn encrypt_with_reuse(
        &self,
        plaintext: &str,
        peer_public: &str,
        reuse: bool,
    ) -> Result<String> {
        let session = self
            .sessions()
            .get_or_create(peer_public, self.key_pair(), reuse)?;
        let key = session.raw_bytes().ok_or_else(|| {
            CryptoError::KeyResolutionFailed("session key is not 32 bytes".into())
        })?;

        let nonce = random_bytes::<MESSAGE_NONCE_SIZE>();
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let envelope = Envelope::new(SealedField::new(&nonce, &ciphertext), session.wrapped())?;
        Ok(envelope.to_string())
    }

    /// Decrypt an envelope from `peer_public`, reusing cached session keys
    /// according to the configured default.
    pub fn decrypt(&self, envelope: &str, peer_public: &str) -> Result<String> {
        self.decrypt_with_reuse(envelope, peer_public, self.config().reuse_session_keys)
    }

    /// Decrypt an envelope from `peer_public`.
    ///
    /// The envelope is fully parsed before any cryptography runs, so framing
    /// errors are always `MalformedEnvelope`.
    pub fn decrypt_with_reuse(
        &self,
        envelope: &str,
        peer_public: &str,
        reuse: bool,
    ) -> Result<String> {
        let limit = self.config().max_envelope_bytes;
        if envelope.len() > limit {
            return Err(CryptoError::MalformedEnvelope(format!(
                "envelope is {} bytes, limit is {limit}",
                envelope.len()
            )));
        }
        let envelope = Envelope::parse(envelope)?;

        let key = self
            .sessions()
            .resolve_inbound(
                peer_public,
                envelope.wrapped_key(),
                envelope.wrapped_key_text(),
                self.key_pair(),
                reuse,
            )
            .inspect_err(|_| warn!(peer = peer_tag(peer_public), "session key unwrap failed"))?;

        let message = envelope.message();
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(message.nonce()), message.body())
            .map_err(|_| {
                warn!(peer = peer_tag(peer_public), "message authentication failed");
                CryptoError::DecryptionFailed
            })?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}
