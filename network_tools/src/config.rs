use std::{env, time::Duration};

use log::*;
use stl_common::{helpers::normalize_base_url, Secret};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

fn env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{name} not set, using {default} as default");
        default.to_string()
    })
}

//-----------------------------------------------  HttpSettings  -----------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    /// Upper bound for a single outbound request, including connect time. Exceeding it is a transport failure.
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS) }
    }
}

impl HttpSettings {
    pub fn new_from_env_or_default() -> Self {
        let timeout = env::var("STL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for STL_HTTP_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        Self { timeout }
    }
}

//-----------------------------------------------  CardNetworkConfig  ------------------------------------------------
/// Platform application settings for the OAuth-linked card network. The client id and secret identify the
/// platform's marketplace application, not an individual merchant.
#[derive(Debug, Clone, Default)]
pub struct CardNetworkConfig {
    pub auth_base_url: String,
    pub api_base_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub notification_url: Option<String>,
}

impl CardNetworkConfig {
    pub fn new_from_env_or_default() -> Self {
        let auth_base_url =
            normalize_base_url(&env_or_default("STL_CARD_AUTH_BASE_URL", "https://auth.mercadopago.com.co"));
        let api_base_url = normalize_base_url(&env_or_default("STL_CARD_API_BASE_URL", "https://api.mercadopago.com"));
        let client_id = env::var("STL_CARD_CLIENT_ID").unwrap_or_else(|_| {
            warn!("STL_CARD_CLIENT_ID not set. Merchant onboarding for the card network will not work.");
            String::default()
        });
        let client_secret = Secret::new(env::var("STL_CARD_CLIENT_SECRET").unwrap_or_else(|_| {
            warn!("STL_CARD_CLIENT_SECRET not set. Merchant onboarding for the card network will not work.");
            String::default()
        }));
        let notification_url = env::var("STL_CARD_NOTIFICATION_URL").ok();
        Self { auth_base_url, api_base_url, client_id, client_secret, notification_url }
    }
}

//-----------------------------------------------  HostedCheckoutConfig  ---------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct HostedCheckoutConfig {
    pub api_base_url: String,
    /// Payment links are rendered at `{checkout_base_url}/l/{link_id}`
    pub checkout_base_url: String,
}

impl HostedCheckoutConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base_url =
            normalize_base_url(&env_or_default("STL_HOSTED_API_BASE_URL", "https://production.wompi.co/v1"));
        let checkout_base_url =
            normalize_base_url(&env_or_default("STL_HOSTED_CHECKOUT_BASE_URL", "https://checkout.wompi.co"));
        Self { api_base_url, checkout_base_url }
    }
}

//-----------------------------------------------  PushNetworkConfig  ------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct PushNetworkConfig {
    pub api_base_url: String,
    /// Client-credentials token endpoint
    pub auth_url: String,
    /// Channel identifier sent in every request header
    pub channel: String,
}

impl PushNetworkConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base_url =
            normalize_base_url(&env_or_default("STL_PUSH_API_BASE_URL", "https://api.sandbox.nequi.com"));
        let auth_url = env_or_default(
            "STL_PUSH_AUTH_URL",
            "https://oauth.sandbox.nequi.com/oauth2/token?grant_type=client_credentials",
        );
        let channel = env_or_default("STL_PUSH_CHANNEL", "PNP04-C001");
        Self { api_base_url, auth_url, channel }
    }
}

//-----------------------------------------------  TransitConfig  ----------------------------------------------------
/// Connection settings for the transit (envelope encryption) engine of an OpenBao/Vault server.
#[derive(Debug, Clone, Default)]
pub struct TransitConfig {
    /// Server address, e.g. `"http://localhost:8200"`.
    pub addr: String,
    pub token: Secret<String>,
    /// Name of the transit key that encrypts tenant credentials.
    pub key_name: String,
}

impl TransitConfig {
    /// Returns `None` when no transit address has been configured.
    pub fn from_env() -> Option<Self> {
        let addr = env::var("STL_TRANSIT_ADDR").ok().map(|s| normalize_base_url(&s))?;
        let token = Secret::new(env::var("STL_TRANSIT_TOKEN").unwrap_or_else(|_| {
            warn!("STL_TRANSIT_TOKEN not set. Requests to the transit engine will be refused.");
            String::default()
        }));
        let key_name = env_or_default("STL_TRANSIT_KEY", "tenant-credentials");
        Some(Self { addr, token, key_name })
    }
}
