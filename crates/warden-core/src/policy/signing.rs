//! Ed25519 signing and verification of policy documents

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use super::PolicyError;
use super::document::ExecutionPolicy;

/// Decode a base64 32-byte Ed25519 public key
pub fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey, PolicyError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| PolicyError::InvalidKey(format!("public key is not base64: {}", e)))?;
    let array: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| PolicyError::InvalidKey(format!("public key must be 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&array).map_err(|e| PolicyError::InvalidKey(e.to_string()))
}

/// Decode a base64 32-byte Ed25519 secret seed
pub fn decode_signing_key(encoded: &str) -> Result<SigningKey, PolicyError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| PolicyError::InvalidKey(format!("signing key is not base64: {}", e)))?;
    let array: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| PolicyError::InvalidKey(format!("signing key must be 32 bytes, got {}", bytes.len())))?;
    Ok(SigningKey::from_bytes(&array))
}

/// Return a copy of `policy` carrying a signature made with `key`
pub fn sign_policy(policy: &ExecutionPolicy, key: &SigningKey) -> ExecutionPolicy {
    let signature = key.sign(policy.canonical_json().as_bytes());
    let mut signed = policy.clone();
    signed.signature = Some(BASE64.encode(signature.to_bytes()));
    signed
}

/// Check the policy's signature against `key`
///
/// Returns `false` for a missing, malformed or non-matching signature.
pub fn verify_policy_signature(policy: &ExecutionPolicy, key: &VerifyingKey) -> bool {
    let Some(encoded) = policy.signature.as_deref() else {
        return false;
    };
    let Ok(bytes) = BASE64.decode(encoded) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(policy.canonical_json().as_bytes(), &signature).is_ok()
}
