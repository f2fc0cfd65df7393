use std::time::Duration;

use serde_json::json;
use settlement_engine::{
    db_types::{OrderId, TenantId},
    push_payment::PushStatus,
    traits::PushTransactionStore,
    CancelOutcome,
    DecryptedCredentials,
    NewCheckout,
    PushBusinessErrorKind,
    ReverseOutcome,
    SettlementError,
    SqliteStore,
};
use stl_common::MinorUnits;
use wiremock::{
    matchers::{header, method, path},
    Mock,
    MockServer,
    ResponseTemplate,
};

use crate::support::{
    push_ok,
    push_rejected,
    setup,
    status_response,
    token_response,
    HexCipher,
    CANCEL_PATH,
    PUSH_PATH,
    REVERSE_PATH,
    STATUS_PATH,
    TOKEN_PATH,
};

mod support;

type Api = settlement_engine::CheckoutApi<SqliteStore, HexCipher>;

/// A tenant on the push network. The bearer token is cached, so each test expects at most one token exchange.
async fn push_tenant(server: &MockServer, token_exchanges: u64) -> (SqliteStore, Api, TenantId) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response()))
        .expect(token_exchanges)
        .mount(server)
        .await;
    let (store, api) = setup(server, 500).await;
    let tenant = TenantId::from("tenant-P");
    let creds = DecryptedCredentials::new("-", "commerce-77").with_client_credentials("client-1", "secret-1", "key-1");
    api.store_manual_credentials(&tenant, "pushNetworkC", &creds).await.unwrap();
    (store, api, tenant)
}

fn push_accepted(transaction_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(push_ok("unregisteredPaymentRS", json!({ "transactionId": transaction_id })))
}

fn status(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(status_response(code, "20000"))
}

/// Initiates tx-1 and polls it once, so that it is recorded with whatever the first status mock reports.
async fn initiated_and_polled(api: &Api, tenant: &TenantId) -> PushStatus {
    api.initiate_push_payment(tenant, "3001234567", MinorUnits::from(20_000), &OrderId::from("order-P9"))
        .await
        .unwrap();
    api.poll_push_payment("tx-1").await.unwrap().recorded_status
}

#[tokio::test]
async fn push_payment_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-1")).expect(1).mount(&server).await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_response("35", "20000")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_response("33", "20000")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CANCEL_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;

    let tx = api
        .initiate_push_payment(&tenant, "300 123 4567", MinorUnits::from(20_000), &OrderId::from("order-P1"))
        .await
        .unwrap();
    assert_eq!(tx.transaction_id, "tx-1");
    assert_eq!(tx.status, PushStatus::Initiated);
    assert_eq!(tx.payer_reference, "3001234567");
    assert_eq!(tx.currency.as_str(), "COP");

    let report = api.poll_push_payment("tx-1").await.unwrap();
    assert_eq!(report.status, PushStatus::Pending);
    assert_eq!(report.recorded_status, PushStatus::Pending);

    let report = api.poll_push_payment("tx-1").await.unwrap();
    assert_eq!(report.status, PushStatus::Completed);
    assert_eq!(report.raw_code, "33");
    assert_eq!(report.amount, Some(MinorUnits::from(20_000)));

    let outcome = api.cancel_push_payment("tx-1").await.unwrap();
    assert_eq!(outcome, CancelOutcome::NoOp { status: PushStatus::Completed });
    let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PushStatus::Completed);
    assert_eq!(stored.raw_code.as_deref(), Some("33"));
}

#[tokio::test]
async fn gateway_timeouts_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(504))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-2")).expect(1).mount(&server).await;
    let (_store, api, tenant) = push_tenant(&server, 1).await;

    let tx = api
        .initiate_push_payment(&tenant, "3109876543", MinorUnits::from(5_000), &OrderId::from("order-P2"))
        .await
        .unwrap();
    assert_eq!(tx.transaction_id, "tx-2");
}

#[tokio::test]
async fn business_rejections_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(push_rejected("20-07A", "Parametros invalidos")))
        .expect(1)
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;

    let err = api
        .initiate_push_payment(&tenant, "3109876543", MinorUnits::from(5_000), &OrderId::from("order-P3"))
        .await
        .unwrap_err();
    match err {
        SettlementError::PushPaymentBusinessError { kind, code, .. } => {
            assert_eq!(kind, PushBusinessErrorKind::InvalidParameters);
            assert_eq!(code, "20-07A");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.fetch_open_push_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_payers_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-x")).expect(0).mount(&server).await;
    let (_store, api, tenant) = push_tenant(&server, 0).await;
    for payer in ["12345", "2001234567", "30012345678", ""] {
        let err = api
            .initiate_push_payment(&tenant, payer, MinorUnits::from(5_000), &OrderId::from("order-P4"))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::InvalidPayerReference(_)), "{payer}: {err}");
    }
}

#[tokio::test]
async fn unknown_payments_are_flagged_by_reconciliation() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-1")).mount(&server).await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_response("99", "20000")))
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;
    api.initiate_push_payment(&tenant, "3001234567", MinorUnits::from(20_000), &OrderId::from("order-P5"))
        .await
        .unwrap();

    let summary = api.reconcile_open_push_payments().await.unwrap();
    assert_eq!(summary.polled, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unknown, vec!["tx-1".to_string()]);
    let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PushStatus::Unknown);
    assert_eq!(stored.raw_code.as_deref(), Some("99"));

    // UNKNOWN stays open, so the next pass polls it again
    let summary = api.reconcile_open_push_payments().await.unwrap();
    assert_eq!(summary.polled, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unknown.len(), 1);
}

#[tokio::test]
async fn completed_payments_can_be_reversed() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-1")).mount(&server).await;
    Mock::given(method("POST")).and(path(STATUS_PATH)).respond_with(status("33")).mount(&server).await;
    Mock::given(method("POST"))
        .and(path(REVERSE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(push_ok("reversionRS", json!({}))))
        .expect(1)
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;
    assert_eq!(initiated_and_polled(&api, &tenant).await, PushStatus::Completed);

    assert_eq!(api.reverse_push_payment("tx-1").await.unwrap(), ReverseOutcome::Reversed);
    let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PushStatus::Reversed);
    // A second request does not go back to the network
    assert_eq!(api.reverse_push_payment("tx-1").await.unwrap(), ReverseOutcome::NoOp { status: PushStatus::Reversed });
}

#[tokio::test]
async fn unknown_payments_without_a_debit_are_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-1")).mount(&server).await;
    Mock::given(method("POST")).and(path(STATUS_PATH)).respond_with(status("99")).mount(&server).await;
    Mock::given(method("POST"))
        .and(path(REVERSE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(push_rejected("10-454", "Registro no encontrado")))
        .expect(1)
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;
    assert_eq!(initiated_and_polled(&api, &tenant).await, PushStatus::Unknown);

    assert_eq!(api.reverse_push_payment("tx-1").await.unwrap(), ReverseOutcome::NothingToReverse);
    let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PushStatus::Failed);
    assert!(store.fetch_open_push_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_payments_can_be_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-1")).mount(&server).await;
    Mock::given(method("POST")).and(path(STATUS_PATH)).respond_with(status("35")).mount(&server).await;
    Mock::given(method("POST"))
        .and(path(CANCEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(push_ok("cancelUnregisteredPaymentRS", json!({}))))
        .expect(1)
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;
    assert_eq!(initiated_and_polled(&api, &tenant).await, PushStatus::Pending);

    assert_eq!(api.cancel_push_payment("tx-1").await.unwrap(), CancelOutcome::Cancelled);
    let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PushStatus::Cancelled);
    assert!(store.fetch_open_push_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn a_slow_poll_does_not_overwrite_a_reversal() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-1")).mount(&server).await;
    Mock::given(method("POST")).and(path(STATUS_PATH)).respond_with(status("99")).up_to_n_times(1).mount(&server).await;
    // The settled status arrives only after the reversal has been recorded
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(status("33").set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REVERSE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(push_ok("reversionRS", json!({}))))
        .expect(1)
        .mount(&server)
        .await;
    let (store, api, tenant) = push_tenant(&server, 1).await;
    assert_eq!(initiated_and_polled(&api, &tenant).await, PushStatus::Unknown);

    let reverse = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        api.reverse_push_payment("tx-1").await
    };
    let (report, outcome) = tokio::join!(api.poll_push_payment("tx-1"), reverse);
    assert_eq!(outcome.unwrap(), ReverseOutcome::Reversed);
    let report = report.unwrap();
    assert_eq!(report.status, PushStatus::Completed);
    assert_eq!(report.recorded_status, PushStatus::Reversed);
    let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PushStatus::Reversed);
}

#[tokio::test]
async fn push_checkouts_only_settle_in_pesos() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path(PUSH_PATH)).respond_with(push_accepted("tx-u")).expect(0).mount(&server).await;
    let (store, api, tenant) = push_tenant(&server, 0).await;
    let checkout = NewCheckout::new("order-U1", MinorUnits::from(20_000), "USD".parse().unwrap(), "Festival pass")
        .with_metadata("payer_reference", "3001234567");

    let err = api.create_checkout(&tenant, checkout).await.unwrap_err();
    assert!(matches!(err, SettlementError::ProviderRejected(_)), "{err}");
    assert!(store.fetch_open_push_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn refused_bearer_tokens_are_replaced_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "push-bearer-2", "token_type": "bearer", "expires_in": 3600 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("authorization", "Bearer push-bearer-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("authorization", "Bearer push-bearer-2"))
        .respond_with(push_accepted("tx-7"))
        .expect(1)
        .mount(&server)
        .await;
    let (_store, api) = setup(&server, 500).await;
    let tenant = TenantId::from("tenant-P");
    let creds = DecryptedCredentials::new("-", "commerce-77").with_client_credentials("client-1", "secret-1", "key-1");
    api.store_manual_credentials(&tenant, "pushNetworkC", &creds).await.unwrap();

    let tx = api
        .initiate_push_payment(&tenant, "3001234567", MinorUnits::from(20_000), &OrderId::from("order-P7"))
        .await
        .unwrap();
    assert_eq!(tx.transaction_id, "tx-7");
}
