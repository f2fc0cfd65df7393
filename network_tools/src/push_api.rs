use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use log::*;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{
    data_objects::{PushAuth, PushPaymentRequest, PushStatusRecord},
    http::{build_client, send_json},
    HttpSettings,
    NetworkApiError,
    PushNetworkConfig,
};

/// Status code the push network uses in the response header for a request that was accepted.
pub const PUSH_STATUS_OK: &str = "0";

struct Operation {
    path: &'static str,
    service: &'static str,
    name: &'static str,
    request_key: &'static str,
    response_key: &'static str,
}

const REQUEST_PUSH: Operation = Operation {
    path: "/payments/v2/-services-paymentservice-unregisteredpayment",
    service: "PaymentsService",
    name: "unregisteredPayment",
    request_key: "unregisteredPaymentRQ",
    response_key: "unregisteredPaymentRS",
};

const PAYMENT_STATUS: Operation = Operation {
    path: "/payments/v2/-services-paymentservice-getstatuspayment",
    service: "PaymentsService",
    name: "getStatusPayment",
    request_key: "getStatusPaymentRQ",
    response_key: "getStatusPaymentRS",
};

const CANCEL_PUSH: Operation = Operation {
    path: "/payments/v2/-services-paymentservice-cancelunregisteredpayment",
    service: "PaymentsService",
    name: "cancelUnregisteredPayment",
    request_key: "cancelUnregisteredPaymentRQ",
    response_key: "cancelUnregisteredPaymentRS",
};

const REVERSE_PUSH: Operation = Operation {
    path: "/payments/v2/-services-reverseservices-reversetransaction",
    service: "ReverseServices",
    name: "reverseTransaction",
    request_key: "reversionRQ",
    response_key: "reversionRS",
};

/// Client for the push-payment network. Every call is wrapped in the network's request/response envelope; a
/// non-zero status code in the response header is returned as [`NetworkApiError::Business`].
///
/// The client makes exactly one attempt per call. Retrying is the caller's decision.
#[derive(Clone)]
pub struct PushNetworkApi {
    config: PushNetworkConfig,
    client: Arc<Client>,
}

impl PushNetworkApi {
    pub fn new(config: PushNetworkConfig, settings: &HttpSettings) -> Result<Self, NetworkApiError> {
        let client = build_client(settings)?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn auth_url(&self) -> &str {
        self.config.auth_url.as_str()
    }

    /// Send a payment request to the payer's phone. Returns the network's transaction id.
    pub async fn request_push(&self, auth: &PushAuth, request: &PushPaymentRequest) -> Result<String, NetworkApiError> {
        let body = json!({
            "phoneNumber": request.phone_number,
            "code": request.commerce_code,
            "value": request.value.to_string(),
            "reference1": request.reference,
            "reference2": "",
            "reference3": "",
        });
        let response = self.call(auth, &REQUEST_PUSH, body).await?;
        let transaction_id = response["transactionId"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NetworkApiError::MissingField("transactionId".into()))?;
        info!("📲️ Push payment {transaction_id} sent for {}", request.reference);
        Ok(transaction_id)
    }

    pub async fn payment_status(
        &self,
        auth: &PushAuth,
        transaction_id: &str,
    ) -> Result<PushStatusRecord, NetworkApiError> {
        let response = self.call(auth, &PAYMENT_STATUS, json!({ "codeQR": transaction_id })).await?;
        let status = match &response["status"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(NetworkApiError::MissingField("status".into())),
        };
        let value = match &response["value"] {
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        let transaction_id = response["trnId"].as_str().map(String::from);
        trace!("📲️ Push payment {transaction_id:?} has raw status {status}");
        Ok(PushStatusRecord { status, value, transaction_id })
    }

    pub async fn cancel_push(
        &self,
        auth: &PushAuth,
        phone_number: &str,
        commerce_code: &str,
        transaction_id: &str,
    ) -> Result<(), NetworkApiError> {
        let body = json!({
            "code": commerce_code,
            "phoneNumber": phone_number,
            "transactionId": transaction_id,
        });
        self.call(auth, &CANCEL_PUSH, body).await?;
        info!("📲️ Push payment {transaction_id} cancelled");
        Ok(())
    }

    /// Ask the network to return the funds of `transaction_id`. The network treats reversing a debit that never
    /// happened as a no-op.
    pub async fn reverse_push(
        &self,
        auth: &PushAuth,
        phone_number: &str,
        commerce_code: &str,
        value: i64,
        transaction_id: &str,
    ) -> Result<(), NetworkApiError> {
        let body = json!({
            "phoneNumber": phone_number,
            "code": commerce_code,
            "value": value.to_string(),
            "messageId": transaction_id,
            "type": "payment",
        });
        self.call(auth, &REVERSE_PUSH, body).await?;
        info!("📲️ Push payment {transaction_id} reversed");
        Ok(())
    }

    async fn call(&self, auth: &PushAuth, op: &Operation, body: Value) -> Result<Value, NetworkApiError> {
        let message_id = new_message_id();
        let mut any = serde_json::Map::new();
        any.insert(op.request_key.to_string(), body);
        let envelope = json!({
            "RequestMessage": {
                "RequestHeader": {
                    "Channel": self.config.channel,
                    "RequestDate": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    "MessageID": message_id,
                    "ClientID": auth.client_id,
                    "Destination": {
                        "ServiceName": op.service,
                        "ServiceOperation": op.name,
                        "ServiceRegion": "C001",
                        "ServiceVersion": "1.2.0"
                    }
                },
                "RequestBody": { "any": Value::Object(any) }
            }
        });
        trace!("📲️ Sending {} [{message_id}]", op.name);
        let req = self
            .client
            .post(format!("{}{}", self.config.api_base_url, op.path))
            .bearer_auth(auth.bearer.reveal())
            .header("x-api-key", auth.api_key.reveal().as_str())
            .json(&envelope);
        let response = send_json::<Value>(req, op.name).await?;
        let message = &response["ResponseMessage"];
        let status = &message["ResponseHeader"]["Status"];
        let code = match &status["StatusCode"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(NetworkApiError::MissingField("ResponseHeader.Status.StatusCode".into())),
        };
        if code != PUSH_STATUS_OK {
            let desc = status["StatusDesc"].as_str().unwrap_or_default().to_string();
            debug!("📲️ {} [{message_id}] was rejected with code {code}: {desc}", op.name);
            return Err(NetworkApiError::Business { code, message: desc });
        }
        Ok(message["ResponseBody"]["any"][op.response_key].clone())
    }
}

fn new_message_id() -> String {
    rand::thread_rng().gen_range(1_000_000_000u64..10_000_000_000u64).to_string()
}

#[cfg(test)]
mod test {
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use stl_common::Secret;

    use super::*;

    fn auth() -> PushAuth {
        PushAuth { bearer: Secret::from("bearer-1"), api_key: Secret::from("key-1"), client_id: "client-1".into() }
    }

    #[test]
    fn auth_is_redacted_in_debug_output() {
        let printed = format!("{:?}", auth());
        assert!(!printed.contains("bearer-1"));
        assert!(!printed.contains("key-1"));
        assert!(printed.contains("client-1"));
    }

    fn api(server: &MockServer) -> PushNetworkApi {
        let config = PushNetworkConfig {
            api_base_url: server.uri(),
            auth_url: format!("{}/oauth2/token", server.uri()),
            channel: "PNP04-C001".into(),
        };
        PushNetworkApi::new(config, &HttpSettings::default()).unwrap()
    }

    fn ok_envelope(key: &str, body: Value) -> Value {
        json!({
            "ResponseMessage": {
                "ResponseHeader": { "Status": { "StatusCode": "0", "StatusDesc": "SUCCESS" } },
                "ResponseBody": { "any": { key: body } }
            }
        })
    }

    #[tokio::test]
    async fn request_push_returns_transaction_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REQUEST_PUSH.path))
            .and(header("x-api-key", "key-1"))
            .and(header("authorization", "Bearer bearer-1"))
            .and(body_partial_json(json!({
                "RequestMessage": { "RequestBody": { "any": { "unregisteredPaymentRQ": {
                    "phoneNumber": "3001234567", "value": "50000", "reference1": "order-1"
                }}}}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_envelope("unregisteredPaymentRS", json!({ "transactionId": " tx-1 " }))),
            )
            .expect(1)
            .mount(&server)
            .await;
        let request = PushPaymentRequest {
            phone_number: "3001234567".into(),
            commerce_code: "NIT_1".into(),
            value: 50_000,
            reference: "order-1".into(),
        };
        let id = api(&server).request_push(&auth(), &request).await.unwrap();
        assert_eq!(id, "tx-1");
    }

    #[tokio::test]
    async fn status_values_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PAYMENT_STATUS.path))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
                "getStatusPaymentRS",
                json!({ "status": "35", "value": "50000", "trnId": "tx-1" }),
            )))
            .mount(&server)
            .await;
        let record = api(&server).payment_status(&auth(), "tx-1").await.unwrap();
        assert_eq!(record, PushStatusRecord {
            status: "35".into(),
            value: Some(50_000),
            transaction_id: Some("tx-1".into())
        });
    }

    #[tokio::test]
    async fn non_zero_header_codes_are_business_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResponseMessage": {
                    "ResponseHeader": {
                        "Status": { "StatusCode": "10-454", "StatusDesc": "La transaccion no existe" }
                    },
                    "ResponseBody": { "any": {} }
                }
            })))
            .mount(&server)
            .await;
        let err = api(&server).cancel_push(&auth(), "3001234567", "NIT_1", "tx-404").await.unwrap_err();
        match err {
            NetworkApiError::Business { code, message } => {
                assert_eq!(code, "10-454");
                assert_eq!(message, "La transaccion no existe");
            },
            other => panic!("Expected business error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_timeouts_are_transport_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(504)).mount(&server).await;
        let err = api(&server).payment_status(&auth(), "tx-1").await.unwrap_err();
        assert!(err.is_transport());
    }
}
