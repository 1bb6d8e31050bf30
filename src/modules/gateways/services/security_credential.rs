use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

use crate::core::{AppError, Result};

/// Parse an RSA public key from PEM text.
///
/// Accepts a SubjectPublicKeyInfo block (`PUBLIC KEY`) or a PKCS#1 block
/// (`RSA PUBLIC KEY`). Anything else, including non-RSA SPKI keys, is a crypto error.
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
        return Ok(key);
    }

    RsaPublicKey::from_pkcs1_pem(pem)
        .map_err(|e| AppError::crypto(format!("Invalid RSA public key: {}", e)))
}

/// Encrypt the initiator password for the reversal `SecurityCredential` field
pub fn encrypt_with_key(key: &RsaPublicKey, secret: &str) -> Result<String> {
    let mut rng = rand::thread_rng();
    let encrypted = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, secret.as_bytes())
        .map_err(|e| AppError::crypto(format!("Failed to encrypt credential: {}", e)))?;

    Ok(STANDARD.encode(encrypted))
}

/// Read the gateway certificate from disk and encrypt the initiator password
pub async fn encrypt_security_credential(public_key_path: &Path, secret: &str) -> Result<String> {
    let pem = tokio::fs::read_to_string(public_key_path)
        .await
        .map_err(|e| {
            AppError::crypto(format!(
                "Failed to read public key {}: {}",
                public_key_path.display(),
                e
            ))
        })?;

    let key = parse_public_key(&pem)?;
    encrypt_with_key(&key, secret)
}
