//! Identity keypair management.
//!
//! An [`Identity`] is one principal's long-lived X25519 keypair together with
//! its per-peer session-key cache. Keys travel as standard base64 strings.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::config::CodecConfig;
use crate::error::{CryptoError, Result};
use crate::keywrap::KEY_SIZE;
use crate::session::SessionKeyCache;

/// A base64-encoded X25519 keypair.
///
/// Keys supplied by the caller are kept verbatim; they are only decoded when
/// a key-wrap or unwrap needs them.
pub struct KeyPair {
    public: String,
    private: Zeroizing<String>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        let mut secret_bytes = secret.to_bytes();
        let private = Zeroizing::new(STANDARD.encode(secret_bytes));
        secret_bytes.zeroize();
        Self {
            public: STANDARD.encode(public.as_bytes()),
            private,
        }
    }

    /// Wrap caller-supplied base64 keys without validating them.
    pub fn from_base64(public: &str, private: &str) -> Self {
        Self {
            public: public.to_owned(),
            private: Zeroizing::new(private.to_owned()),
        }
    }

    /// The base64 public key.
    pub fn public_key(&self) -> &str {
        &self.public
    }

    /// Decode the private key for ECDH. `None` if it is not 32 bytes of
    /// valid base64.
    pub(crate) fn secret(&self) -> Option<StaticSecret> {
        let decoded = Zeroizing::new(STANDARD.decode(self.private.as_bytes()).ok()?);
        let mut arr: [u8; KEY_SIZE] = decoded.as_slice().try_into().ok()?;
        let secret = StaticSecret::from(arr);
        arr.zeroize();
        Some(secret)
    }
}

/// One principal: a keypair, its session-key cache and codec settings.
///
/// `Identity` is `Send + Sync`; share one across threads as a
/// [`SharedIdentity`].
pub struct Identity {
    keys: KeyPair,
    sessions: SessionKeyCache,
    config: CodecConfig,
}

/// Shared handle to an [`Identity`], passed explicitly to whatever needs it.
pub type SharedIdentity = std::sync::Arc<Identity>;

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("keys", &self.keys)
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish()
    }
}

impl Identity {
    /// Build an identity from optional base64 keys.
    ///
    /// Both keys given: wrapped verbatim. Neither: a fresh keypair is
    /// generated. Exactly one is a caller bug and fails with
    /// `InvalidArguments`.
    pub fn new(public_key: Option<&str>, private_key: Option<&str>) -> Result<Self> {
        match (public_key, private_key) {
            (Some(public), Some(private)) => Ok(Self::from_base64(public, private)),
            (None, None) => Ok(Self::generate()),
            (Some(_), None) => Err(CryptoError::InvalidArguments(
                "public key supplied without its private key".into(),
            )),
            (None, Some(_)) => Err(CryptoError::InvalidArguments(
                "private key supplied without its public key".into(),
            )),
        }
    }

    /// Generate an identity with a new random keypair.
    pub fn generate() -> Self {
        Self::from_key_pair(KeyPair::generate())
    }

    /// Restore an identity from base64 keys, e.g. loaded from storage.
    pub fn from_base64(public_key: &str, private_key: &str) -> Self {
        Self::from_key_pair(KeyPair::from_base64(public_key, private_key))
    }

    fn from_key_pair(keys: KeyPair) -> Self {
        Self {
            keys,
            sessions: SessionKeyCache::default(),
            config: CodecConfig::default(),
        }
    }

    /// Replace the codec settings.
    #[must_use]
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// The base64 public key. Safe to hand out over any channel.
    pub fn public_key(&self) -> &str {
        self.keys.public_key()
    }

    pub const fn key_pair(&self) -> &KeyPair {
        &self.keys
    }

    pub const fn sessions(&self) -> &SessionKeyCache {
        &self.sessions
    }

    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }
}
