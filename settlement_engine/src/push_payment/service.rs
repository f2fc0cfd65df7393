use std::{future::Future, sync::Arc};

use log::*;
use network_tools::{
    data_objects::{PushAuth, PushPaymentRequest},
    NetworkApiError,
    PushNetworkApi,
};
use stl_common::{MinorUnits, Secret};

use super::{normalize_payer_reference, PushStatus, PushStatusReport, RetryPolicy};
use crate::{
    credentials::DecryptedCredentials,
    db_types::{OrderId, PushTransaction},
    stl_api::errors::{PushBusinessErrorKind, SettlementError},
    token_cache::TokenCache,
};

/// What happened when a reversal was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalOutcome {
    Reversed,
    /// The network has no debit for the transaction, so there was nothing to return.
    NothingToReverse,
}

/// Talks to the push network on behalf of a merchant. Stateless apart from the shared [`TokenCache`]; callers are
/// responsible for persisting transaction state.
///
/// Every network call is retried on transient failures according to the [`RetryPolicy`], including the token
/// exchange that precedes it.
#[derive(Clone)]
pub struct PushPaymentService {
    api: PushNetworkApi,
    tokens: Arc<TokenCache>,
    retry: RetryPolicy,
}

struct PushCredentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    api_key: &'a str,
    commerce_code: &'a str,
}

impl<'a> PushCredentials<'a> {
    fn from_credentials(credentials: &'a DecryptedCredentials) -> Result<Self, SettlementError> {
        let missing = |field: &str| {
            SettlementError::CredentialUnavailable(format!("Push network credentials are missing the {field}"))
        };
        Ok(Self {
            client_id: credentials.client_id.as_deref().ok_or_else(|| missing("client id"))?,
            client_secret: credentials
                .client_secret
                .as_ref()
                .map(|s| s.reveal().as_str())
                .ok_or_else(|| missing("client secret"))?,
            api_key: credentials.api_key.as_ref().map(|s| s.reveal().as_str()).ok_or_else(|| missing("API key"))?,
            commerce_code: credentials.account_id.as_str(),
        })
    }
}

impl PushPaymentService {
    pub fn new(api: PushNetworkApi, tokens: Arc<TokenCache>, retry: RetryPolicy) -> Self {
        Self { api, tokens, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn auth(&self, creds: &PushCredentials<'_>) -> Result<PushAuth, SettlementError> {
        let bearer = self.tokens.get_token(creds.client_id, creds.client_secret, self.api.auth_url()).await?;
        Ok(PushAuth { bearer, api_key: Secret::from(creds.api_key), client_id: creds.client_id.to_string() })
    }

    /// Make one authenticated call. If the network refuses the bearer token (it may have been revoked before its
    /// expiry), the token is evicted from the cache and the call is repeated once with a fresh one.
    async fn authorized<T, F, Fut>(&self, creds: &PushCredentials<'_>, call: F) -> Result<T, SettlementError>
    where
        F: Fn(PushAuth) -> Fut,
        Fut: Future<Output = Result<T, NetworkApiError>>,
    {
        let auth = self.auth(creds).await?;
        match call(auth).await {
            Err(NetworkApiError::Unauthorized { status, .. }) => {
                warn!("🔑️ The push network refused the token for {} ({status}). Fetching a new one.", creds.client_id);
                self.tokens.invalidate(creds.client_id);
                let auth = self.auth(creds).await?;
                Ok(call(auth).await?)
            },
            result => Ok(result?),
        }
    }

    /// Ask the network to send a payment request to the payer's phone. Returns the network's transaction id.
    ///
    /// The order id is sent as the request reference, so that a retried request can be matched to the original.
    pub async fn initiate(
        &self,
        credentials: &DecryptedCredentials,
        payer_reference: &str,
        amount: MinorUnits,
        order_id: &OrderId,
    ) -> Result<String, SettlementError> {
        let phone_number = normalize_payer_reference(payer_reference)?;
        if !amount.is_positive() {
            return Err(SettlementError::InvalidRequest(format!("Push payment amount must be positive, got {amount}")));
        }
        let creds = PushCredentials::from_credentials(credentials)?;
        let request = PushPaymentRequest {
            phone_number,
            commerce_code: creds.commerce_code.to_string(),
            value: amount.value(),
            reference: order_id.to_string(),
        };
        let (service, creds, request) = (self, &creds, &request);
        let transaction_id = self
            .retry
            .run("Push payment request", move || {
                service.authorized(creds, move |auth| async move { service.api.request_push(&auth, request).await })
            })
            .await?;
        info!("📲️ Push payment {transaction_id} initiated for order {order_id}");
        Ok(transaction_id)
    }

    /// Query the network for the status of a transaction. Codes that are not in the status table map to
    /// [`PushStatus::Unknown`]; they are never an error.
    ///
    /// The returned report's `recorded_status` is simply the mapped status; the caller reconciles it with its own
    /// record.
    pub async fn check_status(
        &self,
        credentials: &DecryptedCredentials,
        transaction_id: &str,
    ) -> Result<PushStatusReport, SettlementError> {
        let creds = PushCredentials::from_credentials(credentials)?;
        let (service, creds) = (self, &creds);
        let record = self
            .retry
            .run("Push payment status query", move || {
                service.authorized(creds, move |auth| async move {
                    service.api.payment_status(&auth, transaction_id).await
                })
            })
            .await?;
        let status = PushStatus::from_network_code(&record.status);
        let error_message = match status {
            PushStatus::Unknown => {
                warn!("📲️ Push payment {transaction_id} reported unrecognised status code {}", record.status);
                Some(format!("Unrecognised status code {}", record.status))
            },
            _ => None,
        };
        debug!("📲️ Push payment {transaction_id} is {status} (code {})", record.status);
        Ok(PushStatusReport {
            transaction_id: transaction_id.to_string(),
            status,
            raw_code: record.status,
            amount: record.value.map(MinorUnits::from),
            error_message,
            recorded_status: status,
        })
    }

    /// Withdraw a payment request that the payer has not acted on yet.
    pub async fn cancel(
        &self,
        credentials: &DecryptedCredentials,
        transaction: &PushTransaction,
    ) -> Result<(), SettlementError> {
        let creds = PushCredentials::from_credentials(credentials)?;
        let (service, creds) = (self, &creds);
        self.retry
            .run("Push payment cancellation", move || {
                service.authorized(creds, move |auth| async move {
                    let (payer, id) = (&transaction.payer_reference, &transaction.transaction_id);
                    service.api.cancel_push(&auth, payer, creds.commerce_code, id).await
                })
            })
            .await
    }

    /// Return the funds of a transaction to the payer. If the network never debited the payer, there is nothing to
    /// return and the call still succeeds with [`ReversalOutcome::NothingToReverse`].
    pub async fn reverse(
        &self,
        credentials: &DecryptedCredentials,
        transaction: &PushTransaction,
    ) -> Result<ReversalOutcome, SettlementError> {
        let creds = PushCredentials::from_credentials(credentials)?;
        let (service, creds) = (self, &creds);
        let result = self
            .retry
            .run("Push payment reversal", move || {
                service.authorized(creds, move |auth| async move {
                    service
                        .api
                        .reverse_push(
                            &auth,
                            &transaction.payer_reference,
                            creds.commerce_code,
                            transaction.amount.value(),
                            &transaction.transaction_id,
                        )
                        .await
                })
            })
            .await;
        match result {
            Ok(()) => Ok(ReversalOutcome::Reversed),
            Err(SettlementError::PushPaymentBusinessError { kind: PushBusinessErrorKind::RecordNotFound, .. }) => {
                info!("📲️ The network has no debit for {}. Nothing to reverse.", transaction.transaction_id);
                Ok(ReversalOutcome::NothingToReverse)
            },
            Err(e) => Err(e),
        }
    }
}
