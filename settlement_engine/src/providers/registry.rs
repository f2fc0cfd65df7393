use std::{env, sync::Arc, time::Duration};

use log::*;
use network_tools::{
    CardNetworkApi,
    CardNetworkConfig,
    HostedCheckoutApi,
    HostedCheckoutConfig,
    HttpSettings,
    PushNetworkApi,
    PushNetworkConfig,
};

use super::{
    CardRedirectAdapter,
    HostedCheckoutAdapter,
    PaymentProvider,
    ProviderAdapter,
    PushAdapter,
    CARD_REDIRECT_PROVIDER_ID,
    HOSTED_CHECKOUT_PROVIDER_ID,
    PUSH_PROVIDER_ID,
};
use crate::{
    db_types::{TenantId, TenantProviderConfig},
    push_payment::{PushPaymentService, RetryPolicy},
    stl_api::errors::SettlementError,
    token_cache::TokenCache,
    traits::TenantConfigStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    CardRedirect,
    HostedCheckout,
    Push,
}

/// The static table of provider ids a tenant may select.
pub const REGISTERED_PROVIDERS: [(&str, ProviderKind); 3] = [
    (CARD_REDIRECT_PROVIDER_ID, ProviderKind::CardRedirect),
    (HOSTED_CHECKOUT_PROVIDER_ID, ProviderKind::HostedCheckout),
    (PUSH_PROVIDER_ID, ProviderKind::Push),
];

pub fn lookup_provider(provider_id: &str) -> Option<ProviderKind> {
    REGISTERED_PROVIDERS.iter().find(|(id, _)| *id == provider_id).map(|(_, kind)| *kind)
}

//--------------------------------------   ProviderSettings   --------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub http: HttpSettings,
    pub card: CardNetworkConfig,
    pub hosted: HostedCheckoutConfig,
    pub push: PushNetworkConfig,
    /// Where the card network sends merchants back to after they approve the link
    pub redirect_uri: String,
    pub retry: RetryPolicy,
}

impl ProviderSettings {
    pub fn new_from_env_or_default() -> Self {
        let redirect_uri = env::var("STL_ONBOARDING_REDIRECT_URI").unwrap_or_else(|_| {
            warn!("STL_ONBOARDING_REDIRECT_URI not set. OAuth onboarding will send merchants to an empty callback.");
            String::default()
        });
        let default_retry = RetryPolicy::default();
        let base_delay = env::var("STL_RETRY_BASE_DELAY_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("Invalid value for STL_RETRY_BASE_DELAY_MS ({s}). {e}")).ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(default_retry.base_delay);
        let max_attempts = env::var("STL_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>().map_err(|e| warn!("Invalid value for STL_RETRY_MAX_ATTEMPTS ({s}). {e}")).ok()
            })
            .unwrap_or(default_retry.max_attempts);
        Self {
            http: HttpSettings::new_from_env_or_default(),
            card: CardNetworkConfig::new_from_env_or_default(),
            hosted: HostedCheckoutConfig::new_from_env_or_default(),
            push: PushNetworkConfig::new_from_env_or_default(),
            redirect_uri,
            retry: RetryPolicy::new(max_attempts, base_delay),
        }
    }
}

//--------------------------------------   ProviderFactory    --------------------------------------------------------
/// Holds one HTTP client per network and hands out adapters that share them.
#[derive(Clone)]
pub struct ProviderFactory {
    card: CardNetworkApi,
    hosted: HostedCheckoutApi,
    push: PushPaymentService,
    redirect_uri: String,
}

impl ProviderFactory {
    pub fn new(settings: ProviderSettings, tokens: Arc<TokenCache>) -> Result<Self, SettlementError> {
        let card = CardNetworkApi::new(settings.card, &settings.http)?;
        let hosted = HostedCheckoutApi::new(settings.hosted, &settings.http)?;
        let push_api = PushNetworkApi::new(settings.push, &settings.http)?;
        let push = PushPaymentService::new(push_api, tokens, settings.retry);
        Ok(Self { card, hosted, push, redirect_uri: settings.redirect_uri })
    }

    pub fn build(&self, kind: ProviderKind) -> ProviderAdapter {
        match kind {
            ProviderKind::CardRedirect => {
                ProviderAdapter::CardRedirect(CardRedirectAdapter::new(self.card.clone(), &self.redirect_uri))
            },
            ProviderKind::HostedCheckout => {
                ProviderAdapter::HostedCheckout(HostedCheckoutAdapter::new(self.hosted.clone()))
            },
            ProviderKind::Push => ProviderAdapter::Push(PushAdapter::new(self.push.clone())),
        }
    }

    pub fn push_service(&self) -> &PushPaymentService {
        &self.push
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

//--------------------------------------   ProviderRegistry   --------------------------------------------------------
/// Resolves the adapter a tenant is configured to use. Only the public provider record is read; credentials are
/// the vault's business.
#[derive(Clone)]
pub struct ProviderRegistry<S> {
    store: S,
    factory: ProviderFactory,
}

impl<S> ProviderRegistry<S>
where S: TenantConfigStore
{
    pub fn new(store: S, factory: ProviderFactory) -> Self {
        Self { store, factory }
    }

    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    /// Returns the tenant's public record together with a fresh adapter for its active provider.
    pub async fn resolve(
        &self,
        tenant_id: &TenantId,
    ) -> Result<(TenantProviderConfig, ProviderAdapter), SettlementError> {
        let config = self
            .store
            .fetch_provider_config(tenant_id)
            .await?
            .ok_or_else(|| SettlementError::NoProviderConfigured(tenant_id.clone()))?;
        let adapter = self.resolve_with_config(&config)?;
        Ok((config, adapter))
    }

    pub fn resolve_with_config(&self, config: &TenantProviderConfig) -> Result<ProviderAdapter, SettlementError> {
        if !config.active {
            return Err(SettlementError::TenantInactive(config.tenant_id.clone()));
        }
        let kind = lookup_provider(&config.active_provider_id)
            .ok_or_else(|| SettlementError::ProviderNotImplemented(config.active_provider_id.clone()))?;
        let adapter = self.factory.build(kind);
        trace!("🗂️ Tenant {} resolved to {}", config.tenant_id, adapter.provider_id());
        Ok(adapter)
    }
}
