//! Asymmetric layer: protecting a session key under an X25519 shared secret.
//!
//! The raw ECDH output is passed through HKDF-SHA256 and the result keys an
//! XChaCha20-Poly1305 cipher. The wrapped payload is the JSON record
//! `{"key": "<base64 session key>"}`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::PublicKey;
use zeroize::{Zeroize, Zeroizing};

use crate::envelope::SealedField;
use crate::error::{CryptoError, Result};
use crate::identity::KeyPair;
use crate::session::SessionKey;

/// Length of X25519 keys and of session keys.
pub const KEY_SIZE: usize = 32;

/// Nonce length of the key-wrap cipher (XChaCha20-Poly1305).
pub const WRAP_NONCE_SIZE: usize = 24;

/// Poly1305 tag length appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// HKDF info string for the key-wrap key.
const HKDF_INFO: &[u8] = b"securemessage-keywrap-v1";

/// HKDF salt for domain separation (recommended by RFC 5869).
const HKDF_SALT: &[u8] = b"securemessage-keywrap-salt-v1";

#[derive(Serialize, Deserialize)]
struct WrappedKeyPayload {
    key: String,
}

impl Drop for WrappedKeyPayload {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Fill an array from the OS RNG.
pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Decode a base64 key that must be exactly [`KEY_SIZE`] bytes.
pub(crate) fn decode_key(encoded: &str) -> Option<Zeroizing<[u8; KEY_SIZE]>> {
    let decoded = Zeroizing::new(STANDARD.decode(encoded).ok()?);
    let arr: [u8; KEY_SIZE] = decoded.as_slice().try_into().ok()?;
    Some(Zeroizing::new(arr))
}

/// ECDH(own private, peer public) → HKDF-SHA256 → 32-byte cipher key.
///
/// Both sides of a conversation derive the same value. `None` when either key
/// does not decode or the peer key is a low-order point.
fn derive_wrap_key(keys: &KeyPair, peer_public: &str) -> Option<Zeroizing<[u8; KEY_SIZE]>> {
    let peer = PublicKey::from(*decode_key(peer_public)?);
    let secret = keys.secret()?;
    let shared = secret.diffie_hellman(&peer);
    if !shared.was_contributory() {
        return None;
    }

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, &mut key[..]).ok()?;
    Some(key)
}

/// Generate a fresh session key and wrap it for `peer_public`.
pub fn wrap_key(peer_public: &str, keys: &KeyPair) -> Result<SessionKey> {
    let raw = Zeroizing::new(random_bytes::<KEY_SIZE>());
    let wrap_key = derive_wrap_key(keys, peer_public).ok_or_else(|| {
        CryptoError::KeyResolutionFailed("no shared secret with this peer key".into())
    })?;

    let payload = WrappedKeyPayload {
        key: STANDARD.encode(&raw[..]),
    };
    let plaintext = Zeroizing::new(
        serde_json::to_vec(&payload)
            .map_err(|e| CryptoError::KeyResolutionFailed(e.to_string()))?,
    );

    let nonce = random_bytes::<WRAP_NONCE_SIZE>();
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&wrap_key[..]));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|e| CryptoError::KeyResolutionFailed(e.to_string()))?;

    Ok(SessionKey::new(
        Zeroizing::new(payload.key.clone()),
        SealedField::new(&nonce, &ciphertext).encode(),
    ))
}

/// Recover the base64 session key carried in a wrapped-key field.
///
/// A field too short for its nonce is `MalformedEnvelope`; every other
/// failure, cryptographic or structural, is `KeyUnwrapFailed`.
pub fn unwrap_key(
    wrapped_field: &str,
    peer_public: &str,
    keys: &KeyPair,
) -> Result<Zeroizing<String>> {
    let sealed = SealedField::decode(wrapped_field, WRAP_NONCE_SIZE)?;
    unwrap_sealed(&sealed, peer_public, keys)
}

pub(crate) fn unwrap_sealed(
    sealed: &SealedField,
    peer_public: &str,
    keys: &KeyPair,
) -> Result<Zeroizing<String>> {
    let wrap_key = derive_wrap_key(keys, peer_public).ok_or(CryptoError::KeyUnwrapFailed)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&wrap_key[..]));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(XNonce::from_slice(sealed.nonce()), sealed.body())
            .map_err(|_| CryptoError::KeyUnwrapFailed)?,
    );

    let payload: WrappedKeyPayload =
        serde_json::from_slice(&plaintext).map_err(|_| CryptoError::KeyUnwrapFailed)?;
    if decode_key(&payload.key).is_none() {
        return Err(CryptoError::KeyUnwrapFailed);
    }
    Ok(Zeroizing::new(payload.key.clone()))
}
