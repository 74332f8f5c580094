//! Ed25519 webhook signature validation, as used by Discord HTTP interactions.

use std::collections::HashMap;

use ed25519_dalek::{Signature, VerifyingKey};

use super::WebhookValidator;
use crate::error::{signature_error, Error, SignatureErrorKind};

/// Header carrying the hex-encoded signature.
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
/// Header carrying the timestamp that prefixes the signed message.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Ed25519 webhook validator.
///
/// The signed message is the timestamp header value followed by the raw body.
pub struct Ed25519WebhookValidator {
    public_key: VerifyingKey,
}

impl Ed25519WebhookValidator {
    /// Create a validator from the application's hex-encoded public key.
    pub fn from_hex(public_key: &str) -> Result<Self, Error> {
        let bytes: [u8; 32] = hex::decode(public_key.trim())
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                signature_error(SignatureErrorKind::InvalidKey, "Public key must be 32 hex-encoded bytes")
            })?;

        let public_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| signature_error(SignatureErrorKind::InvalidKey, "Invalid Ed25519 public key"))?;

        Ok(Self { public_key })
    }
}

impl WebhookValidator for Ed25519WebhookValidator {
    fn validate(&self, headers: &HashMap<String, String>, body: &[u8]) -> Result<bool, Error> {
        let (signature, timestamp) = match (headers.get(SIGNATURE_HEADER), headers.get(TIMESTAMP_HEADER)) {
            (Some(signature), Some(timestamp)) => (signature, timestamp),
            _ => {
                return Err(signature_error(
                    SignatureErrorKind::MissingSignature,
                    "Missing signature or timestamp header",
                ))
            }
        };

        let signature_bytes: [u8; 64] = hex::decode(signature)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                signature_error(SignatureErrorKind::MalformedSignature, "Invalid signature format")
            })?;
        let signature = Signature::from_bytes(&signature_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        Ok(self.public_key.verify_strict(&message, &signature).is_ok())
    }
}
