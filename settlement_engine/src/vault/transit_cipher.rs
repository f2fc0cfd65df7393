use network_tools::{HttpSettings, NetworkApiError, TransitApi, TransitConfig};

use crate::{
    stl_api::errors::{CipherError, SettlementError},
    traits::EnvelopeCipher,
};

/// [`EnvelopeCipher`] backed by the transit engine of an OpenBao/Vault server.
#[derive(Clone)]
pub struct TransitCipher {
    api: TransitApi,
}

impl TransitCipher {
    pub fn new(config: TransitConfig, settings: &HttpSettings) -> Result<Self, SettlementError> {
        let api = TransitApi::new(config, settings)?;
        Ok(Self { api })
    }
}

impl From<NetworkApiError> for CipherError {
    fn from(e: NetworkApiError) -> Self {
        match e {
            NetworkApiError::Transport(msg) => Self::Unreachable(msg),
            NetworkApiError::JsonError(msg) | NetworkApiError::MissingField(msg) => Self::InvalidPayload(msg),
            other => Self::Rejected(other.to_string()),
        }
    }
}

impl EnvelopeCipher for TransitCipher {
    fn key_name(&self) -> String {
        self.api.key_name().to_string()
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        Ok(self.api.encrypt(plaintext).await?)
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError> {
        Ok(self.api.decrypt(ciphertext).await?)
    }
}

#[cfg(test)]
mod test {
    use stl_common::Secret;
    use wiremock::{
        matchers::{method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    fn cipher(addr: String) -> TransitCipher {
        let config = TransitConfig { addr, token: Secret::new("s.dev".into()), key_name: "creds".into() };
        TransitCipher::new(config, &HttpSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn sealed_server_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).mount(&server).await;
        let err = cipher(server.uri()).decrypt("vault:v1:xyz").await.unwrap_err();
        assert!(matches!(err, CipherError::Unreachable(_)));
    }

    #[tokio::test]
    async fn bad_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transit/encrypt/creds"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let err = cipher(server.uri()).encrypt(b"{}").await.unwrap_err();
        assert!(matches!(err, CipherError::Rejected(_)));
    }
}
