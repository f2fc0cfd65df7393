use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stl_common::{secret_string, Secret};

/// Longest token lifetime accepted from a token endpoint. Longer lifetimes are clamped to this.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 366 * 24 * 60 * 60;

//-----------------------------------------------  OAuth  ------------------------------------------------------------
/// Token grant as returned by an OAuth token endpoint (authorization-code, refresh or client-credentials grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(with = "secret_string")]
    pub access_token: Secret<String>,
    #[serde(default, with = "secret_string::option")]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Networks return the linked account id as either a number or a string
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub public_key: Option<String>,
}

impl TokenGrant {
    pub fn account_id(&self) -> Option<String> {
        match &self.user_id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    /// The reported lifetime, clamped to `0..=MAX_TOKEN_LIFETIME_SECS`.
    pub fn lifetime(&self) -> Option<Duration> {
        self.expires_in.and_then(|secs| Duration::try_seconds(secs.clamp(0, MAX_TOKEN_LIFETIME_SECS)))
    }
}

//-----------------------------------------------  Card network  -----------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub currency_id: String,
}

/// Checkout preference with the platform's cut expressed as `marketplace_fee`, which the network deducts before
/// settling with the merchant.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub external_reference: String,
    pub marketplace_fee: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceResponse {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

//-----------------------------------------------  Hosted checkout  --------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct PlatformFeeSplit {
    pub amount_in_cents: i64,
    pub merchant_account_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLinkRequest {
    pub name: String,
    pub description: String,
    pub single_use: bool,
    pub collect_shipping: bool,
    pub currency: String,
    pub amount_in_cents: i64,
    pub reference: String,
    pub split: PlatformFeeSplit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentLink {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaymentLinkEnvelope {
    pub data: PaymentLink,
}

//-----------------------------------------------  Push network  -----------------------------------------------------
/// Credentials attached to every push network request: a bearer token from the client-credentials grant plus the
/// merchant's API key.
#[derive(Debug, Clone)]
pub struct PushAuth {
    pub bearer: Secret<String>,
    pub api_key: Secret<String>,
    pub client_id: String,
}

#[derive(Debug, Clone)]
pub struct PushPaymentRequest {
    pub phone_number: String,
    /// Merchant (commerce) code at the network
    pub commerce_code: String,
    pub value: i64,
    /// Caller correlation id. The order id, so retried requests can be matched up by the network.
    pub reference: String,
}

/// Raw transaction status as reported by the network. Interpretation of `status` is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushStatusRecord {
    pub status: String,
    pub value: Option<i64>,
    pub transaction_id: Option<String>,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn token_lifetimes_are_clamped() {
        let grant = |expires_in: Value| {
            serde_json::from_value::<TokenGrant>(json!({ "access_token": "tok", "expires_in": expires_in })).unwrap()
        };
        assert_eq!(grant(json!(3600)).lifetime(), Some(Duration::seconds(3600)));
        assert_eq!(grant(json!(i64::MAX)).lifetime(), Some(Duration::seconds(MAX_TOKEN_LIFETIME_SECS)));
        assert_eq!(grant(json!(-5)).lifetime(), Some(Duration::zero()));
        assert_eq!(grant(Value::Null).lifetime(), None);
    }

    #[test]
    fn grants_do_not_print_tokens() {
        let grant = serde_json::from_value::<TokenGrant>(
            json!({ "access_token": "APP_USR-1", "refresh_token": "TG-1", "expires_in": 60 }),
        )
        .unwrap();
        let printed = format!("{grant:?}");
        assert!(!printed.contains("APP_USR-1"));
        assert!(!printed.contains("TG-1"));
        assert_eq!(grant.access_token.reveal(), "APP_USR-1");
    }
}
