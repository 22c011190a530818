//! Wire framing.
//!
//! An envelope is `base64(nonce ‖ ciphertext) "." base64(nonce ‖ wrapped key)`,
//! both fields standard base64 with padding. The separator never occurs in
//! base64 output, so exactly one `.` is allowed.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::codec::MESSAGE_NONCE_SIZE;
use crate::error::{CryptoError, Result};
use crate::keywrap::WRAP_NONCE_SIZE;

/// Separator between the message field and the wrapped-key field.
pub const FIELD_SEPARATOR: char = '.';

/// One decoded envelope field: a nonce followed by an AEAD ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedField {
    bytes: Vec<u8>,
    nonce_len: usize,
}

impl SealedField {
    pub(crate) fn new(nonce: &[u8], body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(nonce.len() + body.len());
        bytes.extend_from_slice(nonce);
        bytes.extend_from_slice(body);
        Self {
            bytes,
            nonce_len: nonce.len(),
        }
    }

    /// Decode a base64 field whose first `nonce_len` bytes are the nonce.
    ///
    /// Fields too short to hold the nonce are rejected here rather than left
    /// to slicing.
    pub fn decode(field: &str, nonce_len: usize) -> Result<Self> {
        let bytes = STANDARD
            .decode(field)
            .map_err(|e| CryptoError::MalformedEnvelope(format!("invalid base64: {e}")))?;
        if bytes.len() < nonce_len {
            return Err(CryptoError::MalformedEnvelope(format!(
                "field is {} bytes, shorter than the {nonce_len}-byte nonce",
                bytes.len()
            )));
        }
        Ok(Self { bytes, nonce_len })
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn nonce(&self) -> &[u8] {
        &self.bytes[..self.nonce_len]
    }

    pub fn body(&self) -> &[u8] {
        &self.bytes[self.nonce_len..]
    }
}

/// A parsed envelope.
///
/// The wrapped-key field is kept as received as well as decoded; the inbound
/// session cache matches on the exact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    message: SealedField,
    wrapped_key: SealedField,
    wrapped_key_text: String,
}

impl Envelope {
    pub(crate) fn new(message: SealedField, wrapped_key_text: &str) -> Result<Self> {
        let wrapped_key = SealedField::decode(wrapped_key_text, WRAP_NONCE_SIZE)?;
        Ok(Self {
            message,
            wrapped_key,
            wrapped_key_text: wrapped_key_text.to_owned(),
        })
    }

    /// Split and decode a wire string. No cryptography happens here.
    pub fn parse(input: &str) -> Result<Self> {
        let fields: Vec<&str> = input.split(FIELD_SEPARATOR).collect();
        let [message, wrapped_key] = fields.as_slice() else {
            return Err(CryptoError::MalformedEnvelope(format!(
                "expected 2 fields separated by '{FIELD_SEPARATOR}', found {}",
                fields.len()
            )));
        };
        let message = SealedField::decode(message, MESSAGE_NONCE_SIZE)?;
        Self::new(message, wrapped_key)
    }

    pub const fn message(&self) -> &SealedField {
        &self.message
    }

    pub const fn wrapped_key(&self) -> &SealedField {
        &self.wrapped_key
    }

    /// The wrapped-key field exactly as it appears on the wire.
    pub fn wrapped_key_text(&self) -> &str {
        &self.wrapped_key_text
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}",
            self.message.encode(),
            self.wrapped_key_text
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn field(nonce_len: usize, body_len: usize) -> String {
        SealedField::new(&vec![7u8; nonce_len], &vec![9u8; body_len]).encode()
    }

    #[test]
    fn parse_splits_nonce_and_body() {
        let wire = format!(
            "{}.{}",
            field(MESSAGE_NONCE_SIZE, 5),
            field(WRAP_NONCE_SIZE, 40)
        );
        let envelope = Envelope::parse(&wire).unwrap();

        assert_eq!(envelope.message().nonce(), &[7u8; MESSAGE_NONCE_SIZE]);
        assert_eq!(envelope.message().body(), &[9u8; 5]);
        assert_eq!(envelope.wrapped_key().nonce().len(), WRAP_NONCE_SIZE);
        assert_eq!(envelope.wrapped_key().body().len(), 40);
        assert_eq!(envelope.to_string(), wire);
    }

    #[test]
    fn single_field_is_malformed() {
        let result = Envelope::parse("onlyonefield");
        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn three_fields_are_malformed() {
        let result = Envelope::parse("a.b.c");
        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(
            Envelope::parse(""),
            Err(CryptoError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Envelope::parse("."),
            Err(CryptoError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn field_shorter_than_nonce_is_malformed() {
        let wire = format!(
            "{}.{}",
            field(MESSAGE_NONCE_SIZE - 1, 0),
            field(WRAP_NONCE_SIZE, 40)
        );
        let err = Envelope::parse(&wire).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEnvelope(_)));

        let wire = format!(
            "{}.{}",
            field(MESSAGE_NONCE_SIZE, 16),
            field(WRAP_NONCE_SIZE - 1, 0)
        );
        let err = Envelope::parse(&wire).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEnvelope(_)));
    }

    #[test]
    fn field_of_exactly_nonce_length_parses_with_empty_body() {
        let wire = format!(
            "{}.{}",
            field(MESSAGE_NONCE_SIZE, 0),
            field(WRAP_NONCE_SIZE, 0)
        );
        let envelope = Envelope::parse(&wire).unwrap();
        assert!(envelope.message().body().is_empty());
        assert!(envelope.wrapped_key().body().is_empty());
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let wire = format!("!!!!.{}", field(WRAP_NONCE_SIZE, 40));
        let err = Envelope::parse(&wire).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEnvelope(_)));
    }

    #[test]
    fn unpadded_base64_is_malformed() {
        // 25 bytes encode with one '=' of padding; strip it.
        let padded = field(MESSAGE_NONCE_SIZE, 1);
        assert!(padded.ends_with('='));
        let wire = format!(
            "{}.{}",
            padded.trim_end_matches('='),
            field(WRAP_NONCE_SIZE, 40)
        );
        assert!(matches!(
            Envelope::parse(&wire),
            Err(CryptoError::MalformedEnvelope(_))
        ));
    }
}
