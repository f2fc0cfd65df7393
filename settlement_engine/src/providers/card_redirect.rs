use chrono::{Duration, Utc};
use log::*;
use network_tools::{
    data_objects::{PreferenceItem, PreferenceRequest, TokenGrant},
    CardNetworkApi,
};
use serde_json::{json, Map, Value};

use super::{check_destination, CheckoutParams, CheckoutSession, PaymentProvider, SessionTarget};
use crate::{credentials::DecryptedCredentials, stl_api::errors::SettlementError};

pub const CARD_REDIRECT_PROVIDER_ID: &str = "cardNetworkA";
/// Merchant tokens are refreshed when they expire within this window.
const REFRESH_WINDOW_HOURS: i64 = 24;

/// Card network with OAuth merchant linking. The platform's cut travels as the preference's `marketplace_fee`.
#[derive(Clone)]
pub struct CardRedirectAdapter {
    api: CardNetworkApi,
    redirect_uri: String,
}

impl CardRedirectAdapter {
    pub fn new(api: CardNetworkApi, redirect_uri: &str) -> Self {
        Self { api, redirect_uri: redirect_uri.to_string() }
    }

    fn credentials_from_grant(
        grant: TokenGrant,
        fallback_account: Option<&str>,
    ) -> Result<DecryptedCredentials, SettlementError> {
        let account_id = grant.account_id().or_else(|| fallback_account.map(String::from)).ok_or_else(|| {
            SettlementError::UpstreamAuthError("The token grant did not identify the merchant account".into())
        })?;
        Ok(DecryptedCredentials {
            expires_at: grant.lifetime().map(|lifetime| Utc::now() + lifetime),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            account_id,
            public_key: grant.public_key,
            client_id: None,
            client_secret: None,
            api_key: None,
        })
    }
}

impl PaymentProvider for CardRedirectAdapter {
    fn provider_id(&self) -> &'static str {
        CARD_REDIRECT_PROVIDER_ID
    }

    fn onboarding_url(&self, state: &str, redirect_uri: &str) -> Result<String, SettlementError> {
        Ok(self.api.authorization_url(state, redirect_uri)?)
    }

    async fn authorize_tenant(&self, code: &str) -> Result<DecryptedCredentials, SettlementError> {
        let grant = self
            .api
            .exchange_code(code, &self.redirect_uri)
            .await
            .map_err(SettlementError::from_auth_failure)?;
        let credentials = Self::credentials_from_grant(grant, None)?;
        info!("💳️ Merchant account {} linked", credentials.account_id);
        Ok(credentials)
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
        credentials: &DecryptedCredentials,
    ) -> Result<CheckoutSession, SettlementError> {
        check_destination(params, credentials)?;
        let mut metadata = params.provider_metadata.iter().map(|(k, v)| (k.clone(), json!(v))).collect::<Map<_, _>>();
        metadata.insert("tenant_id".into(), json!(params.tenant_id));
        let preference = PreferenceRequest {
            items: vec![PreferenceItem {
                title: params.description.clone(),
                quantity: 1,
                unit_price: params.amount.value(),
                currency_id: params.currency.to_string(),
            }],
            external_reference: params.order_id.to_string(),
            marketplace_fee: params.commission.value(),
            notification_url: self.api.config().notification_url.clone(),
            metadata: Value::Object(metadata),
        };
        let response = self
            .api
            .create_preference(credentials.access_token.reveal(), params.order_id.as_str(), &preference)
            .await?;
        let target = SessionTarget::Redirect { checkout_url: response.init_point, session_id: response.id };
        Ok(CheckoutSession::new(self.provider_id(), params, target))
    }

    async fn refresh_token_if_needed(
        &self,
        credentials: &DecryptedCredentials,
    ) -> Result<Option<DecryptedCredentials>, SettlementError> {
        let Some(expires_at) = credentials.expires_at else {
            return Ok(None);
        };
        if expires_at - Duration::hours(REFRESH_WINDOW_HOURS) > Utc::now() {
            return Ok(None);
        }
        let Some(refresh_token) = &credentials.refresh_token else {
            warn!(
                "💳️ Access token for merchant {} expires at {expires_at} and there is no refresh token",
                credentials.account_id
            );
            return Ok(None);
        };
        debug!("💳️ Access token for merchant {} expires at {expires_at}. Refreshing.", credentials.account_id);
        let grant = self.api.refresh(refresh_token.reveal()).await.map_err(SettlementError::from_auth_failure)?;
        let mut refreshed = Self::credentials_from_grant(grant, Some(&credentials.account_id))?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = credentials.refresh_token.clone();
        }
        if refreshed.public_key.is_none() {
            refreshed.public_key = credentials.public_key.clone();
        }
        info!("💳️ Access token for merchant {} refreshed", refreshed.account_id);
        Ok(Some(refreshed))
    }
}
