//! `SecureMessage` hybrid encryption library
//!
//! Peer-to-peer authenticated encryption for short text messages. Each
//! message is sealed under a random session key; the session key is sealed
//! under a key derived from the two peers' X25519 keys and sent alongside.
//!
//! ## Crypto primitives
//!
//! - **Identity**: X25519 static keypair per principal, base64 on the wire
//! - **Key wrap**: X25519 ECDH → HKDF-SHA256 → XChaCha20-Poly1305, 24-byte random nonce
//! - **Message**: XChaCha20-Poly1305 under the session key, 24-byte random nonce
//!
//! ## Wire format
//!
//! `base64(nonce ‖ ciphertext) "." base64(nonce ‖ wrapped key)`
//!
//! ```no_run
//! use securemessage_crypto::Identity;
//!
//! let alice = Identity::generate();
//! let bob = Identity::generate();
//!
//! let envelope = alice.encrypt("hello", bob.public_key())?;
//! assert_eq!(bob.decrypt(&envelope, alice.public_key())?, "hello");
//! # Ok::<(), securemessage_crypto::CryptoError>(())
//! ```

pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod keywrap;
pub mod session;

pub use codec::MESSAGE_NONCE_SIZE;
pub use config::CodecConfig;
pub use envelope::{Envelope, FIELD_SEPARATOR, SealedField};
pub use error::{CryptoError, Result};
pub use identity::{Identity, KeyPair, SharedIdentity};
pub use keywrap::{KEY_SIZE, TAG_SIZE, WRAP_NONCE_SIZE, unwrap_key, wrap_key};
pub use session::{SessionKey, SessionKeyCache};
