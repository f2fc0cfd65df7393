#[cfg(not(debug_assertions))]
compile_error!("The insecure-dev-cipher feature stores credentials unencrypted and cannot be used in release builds");

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::*;

use crate::{stl_api::errors::CipherError, traits::EnvelopeCipher};

pub const PASSTHROUGH_KEY_NAME: &str = "insecure-passthrough";

/// Base64 "encryption" for local development without a key service. Anyone with read access to the store can read
/// the credentials.
#[derive(Debug, Clone, Default)]
pub struct PassthroughCipher;

impl PassthroughCipher {
    pub fn new() -> Self {
        warn!("🔓️ Tenant credentials are being stored WITHOUT encryption. Never do this outside local development.");
        Self
    }
}

impl EnvelopeCipher for PassthroughCipher {
    fn key_name(&self) -> String {
        PASSTHROUGH_KEY_NAME.to_string()
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        Ok(format!("plain:{}", BASE64.encode(plaintext)))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError> {
        let encoded = ciphertext
            .strip_prefix("plain:")
            .ok_or_else(|| CipherError::InvalidPayload("not produced by the passthrough cipher".into()))?;
        BASE64.decode(encoded).map_err(|e| CipherError::InvalidPayload(e.to_string()))
    }
}
