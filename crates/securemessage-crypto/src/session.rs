//! Per-peer session-key cache.
//!
//! Two independent maps, both keyed by the remote peer's base64 public key:
//!
//! - **outbound**: session keys this identity generated and wrapped for a
//!   peer, reused by `encrypt` so the asymmetric layer runs once per peer.
//! - **inbound**: session keys recovered from a peer's envelopes, stored with
//!   the exact wrapped-key field they came from.
//!
//! Each map sits behind its own mutex, held across get-or-create, so an entry
//! is always a complete `{raw, wrapped}` pair. A refresh replaces an entry
//! wholesale; the last writer wins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use zeroize::Zeroizing;

use crate::envelope::SealedField;
use crate::error::{CryptoError, Result};
use crate::identity::KeyPair;
use crate::keywrap::{self, KEY_SIZE};

/// A symmetric session key and its wrapped form.
#[derive(Clone)]
pub struct SessionKey {
    raw: Zeroizing<String>,
    wrapped: String,
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("raw", &"[REDACTED]")
            .field("wrapped", &self.wrapped)
            .finish()
    }
}

impl SessionKey {
    pub(crate) const fn new(raw: Zeroizing<String>, wrapped: String) -> Self {
        Self { raw, wrapped }
    }

    /// The base64 raw key. Handle with care.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The base64 `nonce ‖ ciphertext` of the raw key under the shared secret.
    pub fn wrapped(&self) -> &str {
        &self.wrapped
    }

    pub(crate) fn raw_bytes(&self) -> Option<Zeroizing<[u8; KEY_SIZE]>> {
        keywrap::decode_key(&self.raw)
    }
}

/// Session keys for every peer an [`Identity`](crate::Identity) talks to.
#[derive(Default)]
pub struct SessionKeyCache {
    outbound: Mutex<HashMap<String, SessionKey>>,
    inbound: Mutex<HashMap<String, SessionKey>>,
}

impl std::fmt::Debug for SessionKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyCache")
            .field("outbound", &self.outbound_len())
            .field("inbound", &self.inbound_len())
            .finish_non_exhaustive()
    }
}

/// A map entry is always complete, so a panic elsewhere while the lock was
/// held cannot leave it half-written.
fn lock(map: &Mutex<HashMap<String, SessionKey>>) -> MutexGuard<'_, HashMap<String, SessionKey>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Short, non-secret label for a peer in log lines.
pub(crate) fn peer_tag(peer_public: &str) -> &str {
    peer_public.get(..8).unwrap_or(peer_public)
}

impl SessionKeyCache {
    /// Session key for sending to `peer_public`.
    ///
    /// With `reuse`, a cached key is returned unchanged; on a miss a new key
    /// is wrapped and stored. Without `reuse`, a new key is wrapped every
    /// call and the cache is left untouched.
    pub fn get_or_create(
        &self,
        peer_public: &str,
        keys: &KeyPair,
        reuse: bool,
    ) -> Result<SessionKey> {
        if !reuse {
            debug!(peer = peer_tag(peer_public), "wrapping single-use session key");
            return keywrap::wrap_key(peer_public, keys);
        }

        let mut outbound = lock(&self.outbound);
        if let Some(existing) = outbound.get(peer_public) {
            debug!(peer = peer_tag(peer_public), "outbound session key cache hit");
            return Ok(existing.clone());
        }

        let fresh = keywrap::wrap_key(peer_public, keys)?;
        debug!(peer = peer_tag(peer_public), "stored new outbound session key");
        outbound.insert(peer_public.to_owned(), fresh.clone());
        Ok(fresh)
    }

    /// Cached outbound session key for `peer_public`, if any.
    pub fn lookup_outbound(&self, peer_public: &str) -> Option<SessionKey> {
        lock(&self.outbound).get(peer_public).cloned()
    }

    /// Session key last recovered from `peer_public`'s envelopes, if any.
    ///
    /// A miss means the receiver has to unwrap the key carried in the
    /// incoming envelope; it never generates one of its own.
    pub fn lookup_wrapped(&self, peer_public: &str) -> Option<SessionKey> {
        lock(&self.inbound).get(peer_public).cloned()
    }

    /// Raw key for decrypting an envelope from `peer_public`.
    ///
    /// With `reuse`, a cached key is used when it was recovered from the same
    /// wrapped-key text; otherwise the field is unwrapped and, with `reuse`,
    /// stored. A failed unwrap leaves the cache as it was.
    pub(crate) fn resolve_inbound(
        &self,
        peer_public: &str,
        wrapped: &SealedField,
        wrapped_text: &str,
        keys: &KeyPair,
        reuse: bool,
    ) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        if !reuse {
            let raw = keywrap::unwrap_sealed(wrapped, peer_public, keys)?;
            return keywrap::decode_key(&raw).ok_or(CryptoError::KeyUnwrapFailed);
        }

        let mut inbound = lock(&self.inbound);
        if let Some(existing) = inbound.get(peer_public) {
            if existing.wrapped == wrapped_text {
                debug!(peer = peer_tag(peer_public), "inbound session key cache hit");
                return existing.raw_bytes().ok_or(CryptoError::KeyUnwrapFailed);
            }
            debug!(peer = peer_tag(peer_public), "peer sent a new session key");
        }

        let raw = keywrap::unwrap_sealed(wrapped, peer_public, keys)?;
        let entry = SessionKey::new(raw, wrapped_text.to_owned());
        let bytes = entry.raw_bytes().ok_or(CryptoError::KeyUnwrapFailed)?;
        debug!(peer = peer_tag(peer_public), "stored inbound session key");
        inbound.insert(peer_public.to_owned(), entry);
        Ok(bytes)
    }

    /// Drop both directions' keys for one peer. Returns whether anything was
    /// cached.
    pub fn forget(&self, peer_public: &str) -> bool {
        let had_outbound = lock(&self.outbound).remove(peer_public).is_some();
        let had_inbound = lock(&self.inbound).remove(peer_public).is_some();
        had_outbound || had_inbound
    }

    pub fn clear(&self) {
        lock(&self.outbound).clear();
        lock(&self.inbound).clear();
    }

    pub fn outbound_len(&self) -> usize {
        lock(&self.outbound).len()
    }

    pub fn inbound_len(&self) -> usize {
        lock(&self.inbound).len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound_len() == 0 && self.inbound_len() == 0
    }
}
