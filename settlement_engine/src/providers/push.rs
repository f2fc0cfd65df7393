use super::{unsupported, CheckoutParams, CheckoutSession, PaymentProvider, SessionTarget};
use crate::{
    credentials::DecryptedCredentials,
    push_payment::PushPaymentService,
    stl_api::errors::SettlementError,
};

pub const PUSH_PROVIDER_ID: &str = "pushNetworkC";
/// `provider_metadata` key holding the payer's mobile number.
pub const PAYER_REFERENCE_KEY: &str = "payer_reference";
/// The push network only settles in this currency.
pub const PUSH_SETTLEMENT_CURRENCY: &str = "COP";

/// Push network adapter. A checkout here is a payment request sent to the payer's phone, so the session carries a
/// transaction id to poll instead of a redirect URL.
#[derive(Clone)]
pub struct PushAdapter {
    service: PushPaymentService,
}

impl PushAdapter {
    pub fn new(service: PushPaymentService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &PushPaymentService {
        &self.service
    }
}

impl PaymentProvider for PushAdapter {
    fn provider_id(&self) -> &'static str {
        PUSH_PROVIDER_ID
    }

    fn onboarding_url(&self, _state: &str, _redirect_uri: &str) -> Result<String, SettlementError> {
        Err(unsupported(self.provider_id(), "OAuth onboarding"))
    }

    async fn authorize_tenant(&self, _code: &str) -> Result<DecryptedCredentials, SettlementError> {
        Err(unsupported(self.provider_id(), "OAuth onboarding"))
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
        credentials: &DecryptedCredentials,
    ) -> Result<CheckoutSession, SettlementError> {
        if params.currency.as_str() != PUSH_SETTLEMENT_CURRENCY {
            return Err(SettlementError::ProviderRejected(format!(
                "{} only settles in {PUSH_SETTLEMENT_CURRENCY}, not {}",
                self.provider_id(),
                params.currency
            )));
        }
        let payer = params
            .provider_metadata
            .get(PAYER_REFERENCE_KEY)
            .ok_or_else(|| SettlementError::InvalidPayerReference(String::new()))?;
        let transaction_id = self.service.initiate(credentials, payer, params.amount, &params.order_id).await?;
        Ok(CheckoutSession::new(self.provider_id(), params, SessionTarget::Push { transaction_id }))
    }

    async fn refresh_token_if_needed(
        &self,
        _credentials: &DecryptedCredentials,
    ) -> Result<Option<DecryptedCredentials>, SettlementError> {
        // Bearer tokens come from the shared token cache, not from the stored credentials
        Ok(None)
    }
}
