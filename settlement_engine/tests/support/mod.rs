#![allow(dead_code)]
use std::{sync::Arc, time::Duration};

use serde_json::{json, Value};
use settlement_engine::{
    push_payment::RetryPolicy,
    traits::EnvelopeCipher,
    CheckoutApi,
    CipherError,
    CommissionPolicy,
    ProviderFactory,
    ProviderSettings,
    SqliteStore,
    TokenCache,
};
use wiremock::MockServer;

pub const PUSH_PATH: &str = "/payments/v2/-services-paymentservice-unregisteredpayment";
pub const STATUS_PATH: &str = "/payments/v2/-services-paymentservice-getstatuspayment";
pub const CANCEL_PATH: &str = "/payments/v2/-services-paymentservice-cancelunregisteredpayment";
pub const REVERSE_PATH: &str = "/payments/v2/-services-reverseservices-reversetransaction";
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Hex-encodes the plaintext with every byte flipped, so nothing readable ever reaches the store.
#[derive(Clone, Default)]
pub struct HexCipher;

impl EnvelopeCipher for HexCipher {
    fn key_name(&self) -> String {
        "integration-test-key".into()
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        Ok(plaintext.iter().map(|b| format!("{:02x}", !b)).collect())
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() % 2 != 0 {
            return Err(CipherError::InvalidPayload("odd length".into()));
        }
        (0..ciphertext.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&ciphertext[i..i + 2], 16).map(|b| !b))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| CipherError::InvalidPayload(e.to_string()))
    }
}

/// Provider settings with every network pointed at the mock server and a retry policy fast enough for tests.
pub fn settings_for(server: &MockServer) -> ProviderSettings {
    let mut settings = ProviderSettings::default();
    settings.card.auth_base_url = "https://auth.example.com".into();
    settings.card.api_base_url = server.uri();
    settings.card.client_id = "platform-app".into();
    settings.hosted.api_base_url = server.uri();
    settings.hosted.checkout_base_url = "https://checkout.example.com".into();
    settings.push.api_base_url = server.uri();
    settings.push.auth_url = format!("{}{TOKEN_PATH}", server.uri());
    settings.push.channel = "PNP04-C001".into();
    settings.redirect_uri = "https://platform.example.com/onboarding/callback".into();
    settings.retry = RetryPolicy::new(3, Duration::from_millis(10));
    settings
}

pub async fn sqlite_store() -> SqliteStore {
    SqliteStore::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}

pub fn api_with<C: EnvelopeCipher>(
    store: SqliteStore,
    cipher: C,
    server: &MockServer,
    commission_bps: u32,
) -> CheckoutApi<SqliteStore, C> {
    let settings = settings_for(server);
    let tokens = Arc::new(TokenCache::new(&settings.http).expect("Error creating token cache"));
    let factory = ProviderFactory::new(settings, tokens).expect("Error creating provider factory");
    CheckoutApi::new(store, cipher, factory, CommissionPolicy::new(commission_bps))
}

pub async fn setup(server: &MockServer, commission_bps: u32) -> (SqliteStore, CheckoutApi<SqliteStore, HexCipher>) {
    let _ = env_logger::try_init();
    let store = sqlite_store().await;
    let api = api_with(store.clone(), HexCipher, server, commission_bps);
    (store, api)
}

pub fn token_response() -> Value {
    json!({ "access_token": "push-bearer-1", "token_type": "bearer", "expires_in": 3600 })
}

pub fn push_ok(key: &str, body: Value) -> Value {
    json!({
        "ResponseMessage": {
            "ResponseHeader": { "Status": { "StatusCode": "0", "StatusDesc": "SUCCESS" } },
            "ResponseBody": { "any": { key: body } }
        }
    })
}

pub fn push_rejected(code: &str, desc: &str) -> Value {
    json!({
        "ResponseMessage": {
            "ResponseHeader": { "Status": { "StatusCode": code, "StatusDesc": desc } },
            "ResponseBody": { "any": {} }
        }
    })
}

pub fn status_response(code: &str, value: &str) -> Value {
    push_ok("getStatusPaymentRS", json!({ "status": code, "value": value, "trnId": "tx-1" }))
}
