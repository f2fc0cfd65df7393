//! In-process cache of client-credentials access tokens.
//!
//! One [`TokenCache`] is built at start-up and shared (behind an `Arc`) by every component that talks to a
//! client-credentials network. Reads only take the map's read lock. On a miss, callers for the same client id queue
//! on a per-key async mutex and re-check the map once they hold it, so a burst of concurrent misses produces exactly
//! one token exchange.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use log::*;
use network_tools::{ClientCredentialsApi, HttpSettings};
use sha2::{Digest, Sha256};
use stl_common::Secret;

use crate::stl_api::errors::SettlementError;

/// Tokens are refreshed when they have less than this much life left.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 120;
/// Assumed lifetime when the token endpoint does not say.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Clone)]
pub struct CachedToken {
    pub client_id: String,
    pub token: Secret<String>,
    pub expires_at: DateTime<Utc>,
    secret_fingerprint: [u8; 32],
}

impl CachedToken {
    fn is_fresh_for(&self, fingerprint: &[u8; 32], margin: Duration) -> bool {
        self.secret_fingerprint == *fingerprint && self.expires_at - margin > Utc::now()
    }
}

pub struct TokenCache {
    api: ClientCredentialsApi,
    tokens: RwLock<HashMap<String, CachedToken>>,
    refresh_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    safety_margin: Duration,
}

impl TokenCache {
    pub fn new(settings: &HttpSettings) -> Result<Self, SettlementError> {
        let api = ClientCredentialsApi::new(settings)?;
        Ok(Self::with_api(api))
    }

    pub fn with_api(api: ClientCredentialsApi) -> Self {
        Self {
            api,
            tokens: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
        }
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Return a bearer token for `client_id`, exchanging the client credentials at `auth_url` if the cached token is
    /// missing, about to expire, or was issued for a different secret.
    pub async fn get_token(
        &self,
        client_id: &str,
        client_secret: &str,
        auth_url: &str,
    ) -> Result<Secret<String>, SettlementError> {
        let fingerprint = fingerprint(client_id, client_secret);
        if let Some(token) = self.fresh_token(client_id, &fingerprint) {
            trace!("🔑️ Using cached token for {client_id}");
            return Ok(token);
        }
        let lock = self.refresh_lock(client_id);
        let _guard = lock.lock().await;
        // Someone else may have refreshed the token while we were waiting
        if let Some(token) = self.fresh_token(client_id, &fingerprint) {
            trace!("🔑️ Token for {client_id} was refreshed by a concurrent request");
            return Ok(token);
        }
        let grant = self
            .api
            .exchange(auth_url, client_id, client_secret)
            .await
            .map_err(SettlementError::from_auth_failure)?;
        let lifetime = grant.lifetime().unwrap_or_else(|| {
            debug!("🔑️ Token endpoint did not report a lifetime. Assuming {DEFAULT_TOKEN_LIFETIME_SECS}s");
            Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
        });
        let cached = CachedToken {
            client_id: client_id.to_string(),
            expires_at: Utc::now() + lifetime,
            token: grant.access_token,
            secret_fingerprint: fingerprint,
        };
        let token = cached.token.clone();
        debug!("🔑️ Cached new token for {client_id}, valid until {}", cached.expires_at);
        self.tokens.write().unwrap_or_else(PoisonError::into_inner).insert(client_id.to_string(), cached);
        Ok(token)
    }

    /// Drop the cached token for `client_id`, e.g. after the network refused it.
    pub fn invalidate(&self, client_id: &str) {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner).remove(client_id);
    }

    fn fresh_token(&self, client_id: &str, fingerprint: &[u8; 32]) -> Option<Secret<String>> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.get(client_id).filter(|t| t.is_fresh_for(fingerprint, self.safety_margin)).map(|t| t.token.clone())
    }

    fn refresh_lock(&self, client_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.refresh_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(client_id.to_string()).or_default().clone()
    }
}

fn fingerprint(client_id: &str, client_secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(b":");
    hasher.update(client_secret.as_bytes());
    hasher.finalize().into()
}
