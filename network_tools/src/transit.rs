//! OpenBao/Vault Transit client for encrypt and decrypt operations.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::*;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    http::{build_client, send_json},
    HttpSettings,
    NetworkApiError,
    TransitConfig,
};

/// HTTP client for the transit secrets engine. The server holds the key material; this client only ever sees
/// plaintext it was handed and ciphertext of the form `vault:v1:...`.
#[derive(Clone)]
pub struct TransitApi {
    config: TransitConfig,
    client: Arc<Client>,
}

impl TransitApi {
    pub fn new(config: TransitConfig, settings: &HttpSettings) -> Result<Self, NetworkApiError> {
        let client = build_client(settings)?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn key_name(&self) -> &str {
        self.config.key_name.as_str()
    }

    /// Encrypt `plaintext` under the configured transit key.
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<String, NetworkApiError> {
        let url = format!("{}/v1/transit/encrypt/{}", self.config.addr, self.config.key_name);
        let body = serde_json::json!({ "plaintext": BASE64.encode(plaintext) });
        let req = self.client.post(url).header("X-Vault-Token", self.config.token.reveal().as_str()).json(&body);
        let parsed = send_json::<EncryptResponse>(req, "transit encrypt").await?;
        trace!("🔐️ Payload encrypted with transit key {}", self.config.key_name);
        Ok(parsed.data.ciphertext)
    }

    /// Decrypt a `vault:v1:...` ciphertext produced by [`Self::encrypt`].
    pub async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, NetworkApiError> {
        let url = format!("{}/v1/transit/decrypt/{}", self.config.addr, self.config.key_name);
        let body = serde_json::json!({ "ciphertext": ciphertext });
        let req = self.client.post(url).header("X-Vault-Token", self.config.token.reveal().as_str()).json(&body);
        let parsed = send_json::<DecryptResponse>(req, "transit decrypt").await?;
        BASE64
            .decode(parsed.data.plaintext.as_bytes())
            .map_err(|e| NetworkApiError::JsonError(format!("transit plaintext is not valid base64. {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct EncryptResponse {
    data: EncryptData,
}

#[derive(Debug, Deserialize)]
struct EncryptData {
    ciphertext: String,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    data: DecryptData,
}

#[derive(Debug, Deserialize)]
struct DecryptData {
    plaintext: String,
}
