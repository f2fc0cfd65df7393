//! # Payment providers
//!
//! Every payment network the platform supports is wrapped in an adapter implementing [`PaymentProvider`]. The
//! orchestrator only ever sees this contract; each network's wire format stays inside its adapter.
//!
//! | Provider id       | Adapter                   | Onboarding          | Checkout                     |
//! |-------------------|---------------------------|---------------------|------------------------------|
//! | `cardNetworkA`    | [`CardRedirectAdapter`]   | OAuth redirect      | redirect to hosted preference|
//! | `hostedCheckoutB` | [`HostedCheckoutAdapter`] | manual key entry    | redirect to payment link     |
//! | `pushNetworkC`    | [`PushAdapter`]           | manual key entry    | push request to payer phone  |
//!
//! Adapters are cheap to construct (their HTTP clients are shared), so the registry builds a fresh one per request
//! from [`ProviderFactory`].
mod card_redirect;
mod hosted_checkout;
mod push;
mod registry;

use std::collections::BTreeMap;

pub use card_redirect::{CardRedirectAdapter, CARD_REDIRECT_PROVIDER_ID};
pub use hosted_checkout::{HostedCheckoutAdapter, HOSTED_CHECKOUT_PROVIDER_ID};
pub use push::{PushAdapter, PAYER_REFERENCE_KEY, PUSH_PROVIDER_ID, PUSH_SETTLEMENT_CURRENCY};
pub use registry::{
    lookup_provider,
    ProviderFactory,
    ProviderKind,
    ProviderRegistry,
    ProviderSettings,
    REGISTERED_PROVIDERS,
};
use serde::Serialize;
use stl_common::{Currency, MinorUnits};

use crate::{
    credentials::DecryptedCredentials,
    db_types::{OrderId, TenantId},
    stl_api::errors::SettlementError,
};

//--------------------------------------   PaymentProvider   ---------------------------------------------------------
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// The registry id of this provider. Always equal to the `active_provider_id` it was resolved from.
    fn provider_id(&self) -> &'static str;

    /// The URL a merchant visits to link their account. Networks without OAuth linking return
    /// [`SettlementError::UnsupportedOperation`].
    fn onboarding_url(&self, state: &str, redirect_uri: &str) -> Result<String, SettlementError>;

    /// Exchange a one-time authorization code for the merchant's credentials. An invalid or expired code is a
    /// [`SettlementError::UpstreamAuthError`].
    async fn authorize_tenant(&self, code: &str) -> Result<DecryptedCredentials, SettlementError>;

    /// Create the external checkout (or payment request) for an order. This call creates state at the network and is
    /// never retried here; the order id is sent as the idempotency key so that a caller may retry safely.
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
        credentials: &DecryptedCredentials,
    ) -> Result<CheckoutSession, SettlementError>;

    /// Refresh the merchant's access token if it is close to expiry. `Ok(None)` means the credentials are fine as
    /// they are, or cannot be refreshed.
    async fn refresh_token_if_needed(
        &self,
        credentials: &DecryptedCredentials,
    ) -> Result<Option<DecryptedCredentials>, SettlementError>;
}

//--------------------------------------   CheckoutParams    ---------------------------------------------------------
/// Everything an adapter needs to create a checkout. The commission has already been computed by the orchestrator;
/// adapters pass it through as the network's split or fee field.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub description: String,
    pub commission: MinorUnits,
    pub destination_account_id: String,
    /// Network-specific extras, e.g. the payer's phone number for push networks
    pub provider_metadata: BTreeMap<String, String>,
}

//--------------------------------------   CheckoutSession   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionTarget {
    /// Send the payer to `checkout_url`
    Redirect { checkout_url: String, session_id: String },
    /// A payment request was pushed to the payer; poll `transaction_id` for the outcome
    Push { transaction_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub provider_id: String,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub commission: MinorUnits,
    pub net_amount: MinorUnits,
    pub destination_account_id: String,
    pub target: SessionTarget,
}

impl CheckoutSession {
    pub fn new(provider_id: &str, params: &CheckoutParams, target: SessionTarget) -> Self {
        Self {
            tenant_id: params.tenant_id.clone(),
            order_id: params.order_id.clone(),
            provider_id: provider_id.to_string(),
            amount: params.amount,
            currency: params.currency.clone(),
            commission: params.commission,
            net_amount: params.amount - params.commission,
            destination_account_id: params.destination_account_id.clone(),
            target,
        }
    }

    pub fn checkout_url(&self) -> Option<&str> {
        match &self.target {
            SessionTarget::Redirect { checkout_url, .. } => Some(checkout_url.as_str()),
            SessionTarget::Push { .. } => None,
        }
    }

    pub fn push_transaction_id(&self) -> Option<&str> {
        match &self.target {
            SessionTarget::Push { transaction_id } => Some(transaction_id.as_str()),
            SessionTarget::Redirect { .. } => None,
        }
    }
}

//--------------------------------------   ProviderAdapter   ---------------------------------------------------------
/// The closed set of supported adapters.
#[derive(Clone)]
pub enum ProviderAdapter {
    CardRedirect(CardRedirectAdapter),
    HostedCheckout(HostedCheckoutAdapter),
    Push(PushAdapter),
}

impl std::fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProviderAdapter({})", self.provider_id())
    }
}

impl ProviderAdapter {
    pub fn as_push(&self) -> Option<&PushAdapter> {
        match self {
            Self::Push(adapter) => Some(adapter),
            _ => None,
        }
    }
}

impl PaymentProvider for ProviderAdapter {
    fn provider_id(&self) -> &'static str {
        match self {
            Self::CardRedirect(a) => a.provider_id(),
            Self::HostedCheckout(a) => a.provider_id(),
            Self::Push(a) => a.provider_id(),
        }
    }

    fn onboarding_url(&self, state: &str, redirect_uri: &str) -> Result<String, SettlementError> {
        match self {
            Self::CardRedirect(a) => a.onboarding_url(state, redirect_uri),
            Self::HostedCheckout(a) => a.onboarding_url(state, redirect_uri),
            Self::Push(a) => a.onboarding_url(state, redirect_uri),
        }
    }

    async fn authorize_tenant(&self, code: &str) -> Result<DecryptedCredentials, SettlementError> {
        match self {
            Self::CardRedirect(a) => a.authorize_tenant(code).await,
            Self::HostedCheckout(a) => a.authorize_tenant(code).await,
            Self::Push(a) => a.authorize_tenant(code).await,
        }
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
        credentials: &DecryptedCredentials,
    ) -> Result<CheckoutSession, SettlementError> {
        match self {
            Self::CardRedirect(a) => a.create_checkout_session(params, credentials).await,
            Self::HostedCheckout(a) => a.create_checkout_session(params, credentials).await,
            Self::Push(a) => a.create_checkout_session(params, credentials).await,
        }
    }

    async fn refresh_token_if_needed(
        &self,
        credentials: &DecryptedCredentials,
    ) -> Result<Option<DecryptedCredentials>, SettlementError> {
        match self {
            Self::CardRedirect(a) => a.refresh_token_if_needed(credentials).await,
            Self::HostedCheckout(a) => a.refresh_token_if_needed(credentials).await,
            Self::Push(a) => a.refresh_token_if_needed(credentials).await,
        }
    }
}

fn unsupported(provider: &str, operation: &'static str) -> SettlementError {
    SettlementError::UnsupportedOperation { provider: provider.to_string(), operation }
}

/// Settlement goes to the account the merchant linked, never to an arbitrary one.
fn check_destination(params: &CheckoutParams, credentials: &DecryptedCredentials) -> Result<(), SettlementError> {
    if credentials.account_id.trim().is_empty() {
        return Err(SettlementError::ProviderRejected("The merchant has not linked a settlement account".into()));
    }
    if params.destination_account_id != credentials.account_id {
        return Err(SettlementError::ProviderRejected(format!(
            "Destination account {} is not the merchant's verified account",
            params.destination_account_id
        )));
    }
    Ok(())
}
