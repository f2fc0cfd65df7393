use network_tools::{
    data_objects::{PaymentLinkRequest, PlatformFeeSplit},
    HostedCheckoutApi,
};

use super::{check_destination, unsupported, CheckoutParams, CheckoutSession, PaymentProvider, SessionTarget};
use crate::{credentials::DecryptedCredentials, stl_api::errors::SettlementError};

pub const HOSTED_CHECKOUT_PROVIDER_ID: &str = "hostedCheckoutB";

/// Hosted payment links. Merchants enter their private key by hand; the platform's cut is sent as a split in favour
/// of the platform, with the remainder settled to the merchant.
#[derive(Clone)]
pub struct HostedCheckoutAdapter {
    api: HostedCheckoutApi,
}

impl HostedCheckoutAdapter {
    pub fn new(api: HostedCheckoutApi) -> Self {
        Self { api }
    }
}

impl PaymentProvider for HostedCheckoutAdapter {
    fn provider_id(&self) -> &'static str {
        HOSTED_CHECKOUT_PROVIDER_ID
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
        check_destination(params, credentials)?;
        let request = PaymentLinkRequest {
            name: format!("Order {}", params.order_id),
            description: params.description.clone(),
            single_use: true,
            collect_shipping: false,
            currency: params.currency.to_string(),
            amount_in_cents: params.amount.value(),
            reference: params.order_id.to_string(),
            split: PlatformFeeSplit {
                amount_in_cents: params.commission.value(),
                merchant_account_id: params.destination_account_id.clone(),
            },
        };
        let link = self.api.create_payment_link(credentials.access_token.reveal(), &request).await?;
        let target = SessionTarget::Redirect { checkout_url: self.api.checkout_url(&link), session_id: link.id };
        Ok(CheckoutSession::new(self.provider_id(), params, target))
    }

    async fn refresh_token_if_needed(
        &self,
        _credentials: &DecryptedCredentials,
    ) -> Result<Option<DecryptedCredentials>, SettlementError> {
        // Private keys do not expire
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use network_tools::{HostedCheckoutConfig, HttpSettings};
    use serde_json::json;
    use stl_common::{Currency, MinorUnits};
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;
    use crate::db_types::{OrderId, TenantId};

    fn adapter(server: &MockServer) -> HostedCheckoutAdapter {
        let config = HostedCheckoutConfig {
            api_base_url: server.uri(),
            checkout_base_url: "https://checkout.example.com".into(),
        };
        HostedCheckoutAdapter::new(HostedCheckoutApi::new(config, &HttpSettings::default()).unwrap())
    }

    #[tokio::test]
    async fn oauth_is_not_supported() {
        let server = MockServer::start().await;
        let adapter = adapter(&server);
        assert!(matches!(
            adapter.onboarding_url("state", "https://platform.example.com/cb"),
            Err(SettlementError::UnsupportedOperation { .. })
        ));
        assert!(matches!(adapter.authorize_tenant("code").await, Err(SettlementError::UnsupportedOperation { .. })));
    }

    #[tokio::test]
    async fn checkout_sends_the_platform_split() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .and(header("authorization", "Bearer prv_test_1"))
            .and(header("idempotency-key", "order-9"))
            .and(body_partial_json(json!({
                "amount_in_cents": 120000,
                "reference": "order-9",
                "split": { "amount_in_cents": 6000, "merchant_account_id": "m-42" }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "lnk_1"}})))
            .expect(1)
            .mount(&server)
            .await;
        let params = CheckoutParams {
            tenant_id: TenantId::from("t-2"),
            order_id: OrderId::from("order-9"),
            amount: MinorUnits::from(120_000),
            currency: "COP".parse::<Currency>().unwrap(),
            description: "VIP pass".into(),
            commission: MinorUnits::from(6_000),
            destination_account_id: "m-42".into(),
            provider_metadata: BTreeMap::new(),
        };
        let creds = DecryptedCredentials::new("prv_test_1", "m-42");
        let session = adapter(&server).create_checkout_session(&params, &creds).await.unwrap();
        assert_eq!(session.checkout_url(), Some("https://checkout.example.com/l/lnk_1"));
        assert_eq!(session.net_amount, MinorUnits::from(114_000));
    }

    #[tokio::test]
    async fn gateway_failures_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).expect(1).mount(&server).await;
        let params = CheckoutParams {
            tenant_id: TenantId::from("t-2"),
            order_id: OrderId::from("order-10"),
            amount: MinorUnits::from(1_000),
            currency: "COP".parse::<Currency>().unwrap(),
            description: "Entry".into(),
            commission: MinorUnits::from(50),
            destination_account_id: "m-42".into(),
            provider_metadata: BTreeMap::new(),
        };
        let creds = DecryptedCredentials::new("prv_test_1", "m-42");
        let err = adapter(&server).create_checkout_session(&params, &creds).await.unwrap_err();
        assert!(matches!(err, SettlementError::UpstreamUnavailable(_)));
    }
}
