use std::sync::Arc;

use log::*;
use reqwest::Client;
use url::Url;

use crate::{
    data_objects::{PreferenceRequest, PreferenceResponse, TokenGrant},
    http::{build_client, send_json},
    CardNetworkConfig,
    HttpSettings,
    NetworkApiError,
};

/// Client for the OAuth-linked card network: marketplace authorization, token exchange and checkout preferences.
#[derive(Clone)]
pub struct CardNetworkApi {
    config: CardNetworkConfig,
    client: Arc<Client>,
}

impl CardNetworkApi {
    pub fn new(config: CardNetworkConfig, settings: &HttpSettings) -> Result<Self, NetworkApiError> {
        let client = build_client(settings)?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &CardNetworkConfig {
        &self.config
    }

    /// The URL a merchant visits to link their account to the platform's marketplace application.
    pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, NetworkApiError> {
        let base = format!("{}/authorization", self.config.auth_base_url);
        let url = Url::parse_with_params(&base, &[
            ("client_id", self.config.client_id.as_str()),
            ("response_type", "code"),
            ("platform_id", "mp"),
            ("state", state),
            ("redirect_uri", redirect_uri),
        ])
        .map_err(|e| NetworkApiError::InvalidUrl(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Exchange a one-time authorization code for the merchant's tokens.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, NetworkApiError> {
        let body = serde_json::json!({
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret.reveal(),
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": redirect_uri,
        });
        debug!("💳️ Exchanging authorization code");
        let req = self.client.post(self.url("/oauth/token")).json(&body);
        send_json::<TokenGrant>(req, "authorization code exchange").await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, NetworkApiError> {
        let body = serde_json::json!({
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret.reveal(),
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });
        debug!("💳️ Refreshing merchant access token");
        let req = self.client.post(self.url("/oauth/token")).json(&body);
        send_json::<TokenGrant>(req, "token refresh").await
    }

    /// Create a checkout preference on behalf of the merchant who owns `access_token`. `idempotency_key` is sent so
    /// that the network can de-duplicate retries by the caller.
    pub async fn create_preference(
        &self,
        access_token: &str,
        idempotency_key: &str,
        preference: &PreferenceRequest,
    ) -> Result<PreferenceResponse, NetworkApiError> {
        let req = self
            .client
            .post(self.url("/checkout/preferences"))
            .bearer_auth(access_token)
            .header("X-Idempotency-Key", idempotency_key)
            .json(preference);
        let result = send_json::<PreferenceResponse>(req, "create preference").await?;
        info!("💳️ Checkout preference {} created for {}", result.id, preference.external_reference);
        Ok(result)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base_url)
    }
}
