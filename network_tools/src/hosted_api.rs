use std::sync::Arc;

use log::*;
use reqwest::Client;

use crate::{
    data_objects::{PaymentLink, PaymentLinkEnvelope, PaymentLinkRequest},
    http::{build_client, send_json},
    HostedCheckoutConfig,
    HttpSettings,
    NetworkApiError,
};

/// Client for the hosted-checkout network. Merchants paste their private key into the platform; there is no OAuth
/// linking.
#[derive(Clone)]
pub struct HostedCheckoutApi {
    config: HostedCheckoutConfig,
    client: Arc<Client>,
}

impl HostedCheckoutApi {
    pub fn new(config: HostedCheckoutConfig, settings: &HttpSettings) -> Result<Self, NetworkApiError> {
        let client = build_client(settings)?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn create_payment_link(
        &self,
        private_key: &str,
        link: &PaymentLinkRequest,
    ) -> Result<PaymentLink, NetworkApiError> {
        let req = self
            .client
            .post(format!("{}/payment_links", self.config.api_base_url))
            .bearer_auth(private_key)
            .header("Idempotency-Key", link.reference.as_str())
            .json(link);
        let envelope = send_json::<PaymentLinkEnvelope>(req, "create payment link").await?;
        info!("🧾️ Payment link {} created for {}", envelope.data.id, link.reference);
        Ok(envelope.data)
    }

    pub fn checkout_url(&self, link: &PaymentLink) -> String {
        format!("{}/l/{}", self.config.checkout_base_url, link.id)
    }
}

#[cfg(test)]
mod test {
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;
    use crate::data_objects::PlatformFeeSplit;

    fn link_request() -> PaymentLinkRequest {
        PaymentLinkRequest {
            name: "order-9".into(),
            description: "VIP pass".into(),
            single_use: true,
            collect_shipping: false,
            currency: "COP".into(),
            amount_in_cents: 12_000_000,
            reference: "order-9".into(),
            split: PlatformFeeSplit { amount_in_cents: 600_000, merchant_account_id: "m-42".into() },
        }
    }

    #[tokio::test]
    async fn creates_link_and_builds_checkout_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .and(header("authorization", "Bearer prv_test_1"))
            .and(body_partial_json(serde_json::json!({"split": {"amount_in_cents": 600000}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"data": {"id": "lnk_77"}})))
            .expect(1)
            .mount(&server)
            .await;
        let config = HostedCheckoutConfig {
            api_base_url: server.uri(),
            checkout_base_url: "https://checkout.example.com".into(),
        };
        let api = HostedCheckoutApi::new(config, &HttpSettings::default()).unwrap();
        let link = api.create_payment_link("prv_test_1", &link_request()).await.unwrap();
        assert_eq!(api.checkout_url(&link), "https://checkout.example.com/l/lnk_77");
    }

    #[tokio::test]
    async fn validation_errors_are_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("amount_in_cents must be positive"))
            .mount(&server)
            .await;
        let config = HostedCheckoutConfig { api_base_url: server.uri(), checkout_base_url: String::new() };
        let api = HostedCheckoutApi::new(config, &HttpSettings::default()).unwrap();
        let err = api.create_payment_link("prv_test_1", &link_request()).await.unwrap_err();
        assert!(matches!(err, NetworkApiError::Rejected { status: 422, .. }));
    }
}
