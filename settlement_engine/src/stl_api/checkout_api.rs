use std::fmt::Debug;

use chrono::Utc;
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use stl_common::{Currency, MinorUnits};

use crate::{
    commission::CommissionPolicy,
    credentials::DecryptedCredentials,
    db_types::{NewPushTransaction, OrderId, PushTransaction, TenantId, TenantProviderConfig},
    providers::{
        lookup_provider,
        CheckoutParams,
        CheckoutSession,
        PaymentProvider,
        ProviderAdapter,
        ProviderFactory,
        ProviderRegistry,
        PAYER_REFERENCE_KEY,
        PUSH_SETTLEMENT_CURRENCY,
    },
    push_payment::{normalize_payer_reference, PushPaymentService, PushStatus, PushStatusReport, ReversalOutcome},
    stl_api::{
        checkout_objects::{CancelOutcome, NewCheckout, OnboardingRequest, ReconcileSummary, ReverseOutcome},
        errors::{SettlementError, StoreError},
    },
    traits::{EnvelopeCipher, SettlementStore},
    vault::CredentialVault,
};

const ONBOARDING_STATE_LEN: usize = 32;
/// Conditional status writes that lose a race are re-checked this many times before giving up.
const MAX_STATUS_UPDATE_ATTEMPTS: usize = 3;

/// `CheckoutApi` is the inbound interface of the settlement engine. It ties together provider resolution,
/// credential custody, commission and the push payment lifecycle.
///
/// Every method is an independent unit of work. Nothing decrypted outlives the call that revealed it.
pub struct CheckoutApi<S, C> {
    store: S,
    registry: ProviderRegistry<S>,
    vault: CredentialVault<S, C>,
    commission: CommissionPolicy,
}

impl<S, C> Debug for CheckoutApi<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<S, C> CheckoutApi<S, C>
where
    S: SettlementStore,
    C: EnvelopeCipher,
{
    pub fn new(store: S, cipher: C, factory: ProviderFactory, commission: CommissionPolicy) -> Self {
        let registry = ProviderRegistry::new(store.clone(), factory);
        let vault = CredentialVault::new(store.clone(), cipher);
        Self { store, registry, vault, commission }
    }

    pub fn registry(&self) -> &ProviderRegistry<S> {
        &self.registry
    }

    pub fn vault(&self) -> &CredentialVault<S, C> {
        &self.vault
    }

    fn push_service(&self) -> &PushPaymentService {
        self.registry.factory().push_service()
    }

    //--------------------------------------   Tenant lifecycle   ----------------------------------------------------

    /// Start linking a merchant account at `provider_id`. Nothing is stored until the onboarding completes.
    pub async fn request_onboarding(
        &self,
        tenant_id: &TenantId,
        provider_id: &str,
    ) -> Result<OnboardingRequest, SettlementError> {
        let adapter = self.adapter_for(provider_id)?;
        let state = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ONBOARDING_STATE_LEN)
            .map(char::from)
            .collect::<String>();
        let url = adapter.onboarding_url(&state, self.registry.factory().redirect_uri())?;
        debug!("🏪️ Onboarding at {provider_id} requested for tenant {tenant_id}");
        Ok(OnboardingRequest { tenant_id: tenant_id.clone(), provider_id: provider_id.to_string(), url, state })
    }

    /// Exchange the authorization code the network sent back for the merchant's credentials, store them, and make
    /// `provider_id` the tenant's active provider.
    pub async fn complete_onboarding(
        &self,
        tenant_id: &TenantId,
        provider_id: &str,
        code: &str,
    ) -> Result<TenantProviderConfig, SettlementError> {
        let adapter = self.adapter_for(provider_id)?;
        let credentials = adapter.authorize_tenant(code).await?;
        self.vault.store(tenant_id, &credentials).await?;
        let config = self.activate_provider(tenant_id, provider_id).await?;
        info!("🏪️ Tenant {tenant_id} onboarded at {provider_id} with account {}", credentials.account_id);
        Ok(config)
    }

    /// For networks without OAuth linking: store credentials the merchant entered by hand.
    pub async fn store_manual_credentials(
        &self,
        tenant_id: &TenantId,
        provider_id: &str,
        credentials: &DecryptedCredentials,
    ) -> Result<TenantProviderConfig, SettlementError> {
        self.adapter_for(provider_id)?;
        if credentials.account_id.trim().is_empty() {
            return Err(SettlementError::InvalidRequest("Credentials must identify the merchant account".into()));
        }
        self.vault.store(tenant_id, credentials).await?;
        let config = self.activate_provider(tenant_id, provider_id).await?;
        info!("🏪️ Manual credentials for {provider_id} stored for tenant {tenant_id}");
        Ok(config)
    }

    /// Switch the tenant to another registered provider. The tenant must already exist, and the credentials for the
    /// new provider must be stored separately.
    pub async fn set_active_provider(
        &self,
        tenant_id: &TenantId,
        provider_id: &str,
    ) -> Result<TenantProviderConfig, SettlementError> {
        self.adapter_for(provider_id)?;
        let mut config = self.fetch_config(tenant_id).await?;
        config.active_provider_id = provider_id.to_string();
        config.updated_at = Utc::now();
        self.store.upsert_provider_config(&config).await?;
        info!("🏪️ Tenant {tenant_id} now uses {provider_id}");
        Ok(config)
    }

    /// `None` returns the tenant to the platform's default rate.
    pub async fn set_commission_override(
        &self,
        tenant_id: &TenantId,
        commission_bps: Option<u32>,
    ) -> Result<TenantProviderConfig, SettlementError> {
        let mut config = self.fetch_config(tenant_id).await?;
        config.commission_bps = commission_bps;
        config.updated_at = Utc::now();
        self.store.upsert_provider_config(&config).await?;
        Ok(config)
    }

    pub async fn deactivate_tenant(&self, tenant_id: &TenantId) -> Result<TenantProviderConfig, SettlementError> {
        let mut config = self.fetch_config(tenant_id).await?;
        if config.active {
            config.active = false;
            config.updated_at = Utc::now();
            self.store.upsert_provider_config(&config).await?;
            info!("🏪️ Tenant {tenant_id} deactivated");
        }
        Ok(config)
    }

    async fn fetch_config(&self, tenant_id: &TenantId) -> Result<TenantProviderConfig, SettlementError> {
        self.store
            .fetch_provider_config(tenant_id)
            .await?
            .ok_or_else(|| SettlementError::NoProviderConfigured(tenant_id.clone()))
    }

    async fn activate_provider(
        &self,
        tenant_id: &TenantId,
        provider_id: &str,
    ) -> Result<TenantProviderConfig, SettlementError> {
        let config = match self.store.fetch_provider_config(tenant_id).await? {
            Some(mut config) => {
                config.active_provider_id = provider_id.to_string();
                config.active = true;
                config.updated_at = Utc::now();
                config
            },
            None => TenantProviderConfig::new(tenant_id.clone(), provider_id),
        };
        self.store.upsert_provider_config(&config).await?;
        Ok(config)
    }

    fn adapter_for(&self, provider_id: &str) -> Result<ProviderAdapter, SettlementError> {
        let kind = lookup_provider(provider_id)
            .ok_or_else(|| SettlementError::ProviderNotImplemented(provider_id.to_string()))?;
        Ok(self.registry.factory().build(kind))
    }

    //--------------------------------------       Checkout        -------------------------------------------------

    /// Create a checkout for an order with the tenant's active provider.
    ///
    /// The steps are strictly sequential and any failure aborts the whole call: resolve the provider, reveal the
    /// credentials, refresh (and re-store) them if they are about to expire, split the commission, and create the
    /// session at the network. Push sessions are also recorded so they can be polled later.
    pub async fn create_checkout(
        &self,
        tenant_id: &TenantId,
        checkout: NewCheckout,
    ) -> Result<CheckoutSession, SettlementError> {
        validate_checkout(&checkout)?;
        let (config, adapter) = self.registry.resolve(tenant_id).await?;
        let (session, _) = self.checkout_with(config, adapter, checkout).await?;
        Ok(session)
    }

    async fn checkout_with(
        &self,
        config: TenantProviderConfig,
        adapter: ProviderAdapter,
        checkout: NewCheckout,
    ) -> Result<(CheckoutSession, Option<PushTransaction>), SettlementError> {
        let tenant_id = &config.tenant_id;
        let mut credentials = self.vault.reveal(tenant_id).await?;
        if let Some(refreshed) = adapter.refresh_token_if_needed(&credentials).await? {
            self.vault.store(tenant_id, &refreshed).await?;
            credentials = refreshed;
        }
        let split = self.commission.split(checkout.amount, config.commission_bps);
        let params = CheckoutParams {
            tenant_id: tenant_id.clone(),
            order_id: checkout.order_id,
            amount: split.gross,
            currency: checkout.currency,
            description: checkout.description,
            commission: split.commission,
            destination_account_id: credentials.account_id.clone(),
            provider_metadata: checkout.provider_metadata,
        };
        let session = adapter.create_checkout_session(&params, &credentials).await?;
        info!(
            "🛒️ Checkout for order {} of tenant {tenant_id} created at {}. {} {} gross, {} commission",
            session.order_id, session.provider_id, session.amount, session.currency, session.commission
        );
        let transaction = match session.push_transaction_id() {
            Some(transaction_id) => Some(self.record_push_transaction(transaction_id, &params, &session).await?),
            None => None,
        };
        Ok((session, transaction))
    }

    async fn record_push_transaction(
        &self,
        transaction_id: &str,
        params: &CheckoutParams,
        session: &CheckoutSession,
    ) -> Result<PushTransaction, SettlementError> {
        let payer = params.provider_metadata.get(PAYER_REFERENCE_KEY).map(String::as_str).unwrap_or_default();
        let transaction = PushTransaction::from(NewPushTransaction {
            transaction_id: transaction_id.to_string(),
            tenant_id: params.tenant_id.clone(),
            provider_id: session.provider_id.clone(),
            payer_reference: normalize_payer_reference(payer)?,
            order_id: params.order_id.clone(),
            amount: params.amount,
            currency: params.currency.clone(),
        });
        self.store.insert_push_transaction(&transaction).await.map_err(|e| {
            error!(
                "📲️ Push payment {transaction_id} was sent to the network but could not be recorded. It will not be \
                 reconciled automatically. {e}"
            );
            SettlementError::from(e)
        })?;
        Ok(transaction)
    }

    //--------------------------------------     Push payments     -------------------------------------------------

    /// Send a payment request for an order to the payer's phone. The tenant's active provider must be a push
    /// network. Returns the recorded transaction.
    pub async fn initiate_push_payment(
        &self,
        tenant_id: &TenantId,
        payer_reference: &str,
        amount: MinorUnits,
        order_id: &OrderId,
    ) -> Result<PushTransaction, SettlementError> {
        let (config, adapter) = self.registry.resolve(tenant_id).await?;
        if adapter.as_push().is_none() {
            return Err(SettlementError::UnsupportedOperation {
                provider: adapter.provider_id().to_string(),
                operation: "push payments",
            });
        }
        let currency = PUSH_SETTLEMENT_CURRENCY
            .parse::<Currency>()
            .map_err(|e| SettlementError::Configuration(e.to_string()))?;
        let checkout = NewCheckout::new(order_id.as_str(), amount, currency, &format!("Order {order_id}"))
            .with_metadata(PAYER_REFERENCE_KEY, payer_reference);
        validate_checkout(&checkout)?;
        let (_, transaction) = self.checkout_with(config, adapter, checkout).await?;
        transaction.ok_or_else(|| SettlementError::UnexpectedResponse("No push transaction was created".into()))
    }

    pub async fn fetch_push_transaction(&self, transaction_id: &str) -> Result<PushTransaction, SettlementError> {
        self.store
            .fetch_push_transaction(transaction_id)
            .await?
            .ok_or_else(|| SettlementError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Ask the network for the transaction's status and apply it to the stored record.
    ///
    /// A reported status is only recorded if it is a valid next step for the record; otherwise the record is left
    /// alone and the report's `recorded_status` says what is stored. Unrecognised codes are recorded as `UNKNOWN`.
    pub async fn poll_push_payment(&self, transaction_id: &str) -> Result<PushStatusReport, SettlementError> {
        let transaction = self.fetch_push_transaction(transaction_id).await?;
        let credentials = self.vault.reveal(&transaction.tenant_id).await?;
        let mut report = self.push_service().check_status(&credentials, transaction_id).await?;
        let raw_code = Some(report.raw_code.as_str());
        report.recorded_status =
            match self.move_push_status(transaction_id, transaction.status, report.status, raw_code).await {
                Ok(status) => {
                    if status != transaction.status {
                        info!("📲️ Push payment {transaction_id} moved from {} to {status}", transaction.status);
                    }
                    status
                },
                Err(SettlementError::InvalidTransition { from, .. }) => {
                    warn!(
                        "📲️ Push payment {transaction_id} is recorded as {from} but the network reports {} (code {}). \
                         Ignoring.",
                        report.status, report.raw_code
                    );
                    from
                },
                Err(e) => return Err(e),
            };
        Ok(report)
    }

    /// Withdraw a payment request. Transactions that can no longer be cancelled are left untouched and reported as
    /// [`CancelOutcome::NoOp`].
    pub async fn cancel_push_payment(&self, transaction_id: &str) -> Result<CancelOutcome, SettlementError> {
        let transaction = self.fetch_push_transaction(transaction_id).await?;
        if !transaction.status.can_transition_to(PushStatus::Cancelled) {
            info!("📲️ Push payment {transaction_id} is {}. Nothing to cancel.", transaction.status);
            return Ok(CancelOutcome::NoOp { status: transaction.status });
        }
        let credentials = self.vault.reveal(&transaction.tenant_id).await?;
        self.push_service().cancel(&credentials, &transaction).await?;
        self.move_push_status(transaction_id, transaction.status, PushStatus::Cancelled, None).await?;
        info!("📲️ Push payment {transaction_id} cancelled");
        Ok(CancelOutcome::Cancelled)
    }

    /// Return the funds of a settled, failed or unknown transaction to the payer. This is the operator's remedy for
    /// transactions stuck in `UNKNOWN`.
    pub async fn reverse_push_payment(&self, transaction_id: &str) -> Result<ReverseOutcome, SettlementError> {
        let transaction = self.fetch_push_transaction(transaction_id).await?;
        if transaction.status == PushStatus::Reversed {
            return Ok(ReverseOutcome::NoOp { status: transaction.status });
        }
        if !transaction.status.can_transition_to(PushStatus::Reversed) {
            return Err(SettlementError::InvalidTransition { from: transaction.status, to: PushStatus::Reversed });
        }
        let credentials = self.vault.reveal(&transaction.tenant_id).await?;
        match self.push_service().reverse(&credentials, &transaction).await? {
            ReversalOutcome::Reversed => {
                self.move_push_status(transaction_id, transaction.status, PushStatus::Reversed, None).await?;
                info!("📲️ Push payment {transaction_id} reversed");
                Ok(ReverseOutcome::Reversed)
            },
            ReversalOutcome::NothingToReverse => {
                if transaction.status == PushStatus::Unknown {
                    // The payer was never debited, so the payment did not go through
                    let status =
                        self.move_push_status(transaction_id, transaction.status, PushStatus::Failed, None).await?;
                    info!("📲️ Push payment {transaction_id} was never debited. Recorded as {status}.");
                }
                Ok(ReverseOutcome::NothingToReverse)
            },
        }
    }

    /// Poll every open push transaction once. Individual failures are logged and counted; they do not stop the pass.
    pub async fn reconcile_open_push_payments(&self) -> Result<ReconcileSummary, SettlementError> {
        let open = self.store.fetch_open_push_transactions().await?;
        let mut summary = ReconcileSummary::default();
        for transaction in open {
            summary.polled += 1;
            let id = transaction.transaction_id.as_str();
            match self.poll_push_payment(id).await {
                Ok(report) => {
                    if report.recorded_status != transaction.status {
                        summary.updated += 1;
                    }
                    if report.recorded_status == PushStatus::Unknown {
                        warn!(
                            "📲️ Push payment {id} for order {} is still UNKNOWN. An operator should reverse it.",
                            transaction.order_id
                        );
                        summary.unknown.push(id.to_string());
                    }
                },
                Err(e) => {
                    warn!("📲️ Could not reconcile push payment {id}. {e}");
                    summary.failed += 1;
                },
            }
        }
        debug!(
            "📲️ Reconciliation pass complete. {} polled, {} updated, {} unknown, {} failed",
            summary.polled,
            summary.updated,
            summary.unknown.len(),
            summary.failed
        );
        Ok(summary)
    }

    /// Move a push transaction from the status it was read with to `status`. If another request changed the record
    /// in the meantime, the move is checked again against the status now stored. Returns the recorded status.
    async fn move_push_status(
        &self,
        transaction_id: &str,
        mut expected: PushStatus,
        status: PushStatus,
        raw_code: Option<&str>,
    ) -> Result<PushStatus, SettlementError> {
        for _ in 0..MAX_STATUS_UPDATE_ATTEMPTS {
            if expected == status {
                return Ok(status);
            }
            if !expected.can_transition_to(status) {
                return Err(SettlementError::InvalidTransition { from: expected, to: status });
            }
            match self.store.update_push_status(transaction_id, expected, status, raw_code).await {
                Ok(updated) => return Ok(updated.status),
                Err(StoreError::StatusChanged { actual, .. }) => {
                    debug!("📲️ Push payment {transaction_id} changed from {expected} to {actual} while in flight");
                    expected = actual;
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(SettlementError::InvalidTransition { from: expected, to: status })
    }
}

fn validate_checkout(checkout: &NewCheckout) -> Result<(), SettlementError> {
    if checkout.order_id.as_str().trim().is_empty() {
        return Err(SettlementError::InvalidRequest("The order id cannot be empty".into()));
    }
    if !checkout.amount.is_positive() {
        return Err(SettlementError::InvalidRequest(format!(
            "Checkout amount must be positive, got {}",
            checkout.amount
        )));
    }
    Ok(())
}
