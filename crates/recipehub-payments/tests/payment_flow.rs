use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

use payments::{
    CheckoutUrls, InMemoryLedger, InitializeTransaction, LedgerError, PaymentError,
    PaymentProvider, PaymentRequest, PaymentService, PurchaseLedger, PurchaseRecord,
    PurchaseStatus, ValidationError, WebhookOutcome,
};

/// Gateway double that records every initialization it receives.
struct StubProvider {
    result: Result<String, u16>,
    calls: Mutex<Vec<InitializeTransaction>>,
}

impl StubProvider {
    fn ok(url: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(url.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            result: Err(status),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<InitializeTransaction> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn initialize(&self, tx: &InitializeTransaction) -> Result<String, PaymentError> {
        self.calls.lock().unwrap().push(tx.clone());
        match &self.result {
            Ok(url) => Ok(url.clone()),
            Err(status) => Err(PaymentError::Gateway {
                status: *status,
                body: "upstream said no".to_string(),
            }),
        }
    }
}

/// Ledger that refuses every write.
struct BrokenLedger;

#[async_trait]
impl PurchaseLedger for BrokenLedger {
    async fn create_purchase(&self, _record: &PurchaseRecord) -> Result<(), LedgerError> {
        Err(LedgerError::Status { status: 503 })
    }

    async fn find_by_tx_ref(&self, _tx_ref: &str) -> Result<Option<PurchaseRecord>, LedgerError> {
        Err(LedgerError::Status { status: 503 })
    }

    async fn transition(
        &self,
        _tx_ref: &str,
        _from: &[PurchaseStatus],
        _to: PurchaseStatus,
    ) -> Result<u64, LedgerError> {
        Err(LedgerError::Status { status: 503 })
    }
}

fn urls() -> CheckoutUrls {
    CheckoutUrls {
        callback_url: "https://api.recipehub.test/payments/webhook".to_string(),
        return_url: "https://recipehub.test/purchases".to_string(),
    }
}

fn service(provider: Arc<StubProvider>, ledger: Arc<InMemoryLedger>) -> PaymentService {
    PaymentService::new(provider, ledger, urls())
}

fn request(recipe_id: &str, amount: payments::Decimal, currency: &str) -> PaymentRequest {
    PaymentRequest {
        recipe_id: recipe_id.to_string(),
        amount,
        currency: currency.to_string(),
    }
}

fn success_webhook(tx_ref: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event": "charge.completed",
        "data": { "status": "success", "tx_ref": tx_ref }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_initiate_then_webhook_completes_purchase() {
    let provider = StubProvider::ok("https://pay/x");
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider.clone(), ledger.clone());

    let checkout = svc
        .initiate("u1", &request("r1", dec!(100), "ETB"))
        .await
        .unwrap();
    assert_eq!(checkout.checkout_url, "https://pay/x");

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tx_ref, checkout.tx_ref);
    assert_eq!(calls[0].currency.as_str(), "ETB");
    assert_eq!(calls[0].callback_url, urls().callback_url);

    let record = ledger.find_by_tx_ref(&checkout.tx_ref).await.unwrap().unwrap();
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.recipe_id, "r1");
    assert_eq!(record.amount, dec!(100));
    assert_eq!(record.status, PurchaseStatus::Pending);

    let outcome = svc
        .handle_webhook(&success_webhook(&checkout.tx_ref))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Completed {
            tx_ref: checkout.tx_ref.clone(),
            changed: true
        }
    );

    let record = ledger.find_by_tx_ref(&checkout.tx_ref).await.unwrap().unwrap();
    assert_eq!(record.status, PurchaseStatus::Completed);
}

#[tokio::test]
async fn test_initiate_normalizes_currency_for_gateway() {
    let provider = StubProvider::ok("https://pay/y");
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider.clone(), ledger);

    svc.initiate("u1", &request("r1", dec!(0.5), "usd"))
        .await
        .unwrap();
    assert_eq!(provider.calls()[0].currency.as_str(), "USD");
}

#[tokio::test]
async fn test_initiate_records_trimmed_recipe_id() {
    let provider = StubProvider::ok("https://pay/z");
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider, ledger.clone());

    let checkout = svc
        .initiate("u1", &request("  r7 ", dec!(20), "ETB"))
        .await
        .unwrap();
    let record = ledger.find_by_tx_ref(&checkout.tx_ref).await.unwrap().unwrap();
    assert_eq!(record.recipe_id, "r7");
}

#[tokio::test]
async fn test_initiate_requires_user() {
    let provider = StubProvider::ok("https://pay/x");
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider.clone(), ledger.clone());

    let err = svc
        .initiate("", &request("r1", dec!(100), "ETB"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Unauthorized));
    assert!(provider.calls().is_empty());
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn test_invalid_request_makes_no_external_calls() {
    let provider = StubProvider::ok("https://pay/x");
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider.clone(), ledger.clone());

    let err = svc
        .initiate("u1", &request("r1", dec!(4.99), "etb"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::Validation(ValidationError::BelowMinimum { .. })
    ));
    assert!(provider.calls().is_empty());
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn test_gateway_failure_writes_no_ledger_row() {
    let provider = StubProvider::failing(400);
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider.clone(), ledger.clone());

    let err = svc
        .initiate("u1", &request("r1", dec!(100), "ETB"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Gateway { status: 400, .. }));
    assert_eq!(provider.calls().len(), 1);
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn test_ledger_failure_after_gateway_is_surfaced() {
    let provider = StubProvider::ok("https://pay/x");
    let svc = PaymentService::new(provider.clone(), Arc::new(BrokenLedger), urls());

    let err = svc
        .initiate("u1", &request("r1", dec!(100), "ETB"))
        .await
        .unwrap_err();
    match err {
        PaymentError::LedgerWriteFailed { tx_ref, .. } => {
            assert_eq!(tx_ref, provider.calls()[0].tx_ref);
        }
        other => panic!("expected LedgerWriteFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_each_initiation_gets_fresh_tx_ref() {
    let provider = StubProvider::ok("https://pay/x");
    let ledger = Arc::new(InMemoryLedger::new());
    let svc = service(provider, ledger.clone());

    let req = request("r1", dec!(100), "ETB");
    let a = svc.initiate("u1", &req).await.unwrap();
    let b = svc.initiate("u1", &req).await.unwrap();
    assert_ne!(a.tx_ref, b.tx_ref);
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn test_duplicate_success_webhook_is_idempotent() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger
        .create_purchase(&PurchaseRecord::pending("u1", "r1", "tx-1", dec!(100)))
        .await
        .unwrap();
    let svc = service(StubProvider::ok("https://pay/x"), ledger.clone());

    let first = svc.handle_webhook(&success_webhook("tx-1")).await.unwrap();
    let second = svc.handle_webhook(&success_webhook("tx-1")).await.unwrap();

    assert_eq!(
        first,
        WebhookOutcome::Completed {
            tx_ref: "tx-1".to_string(),
            changed: true
        }
    );
    assert_eq!(
        second,
        WebhookOutcome::Completed {
            tx_ref: "tx-1".to_string(),
            changed: false
        }
    );
    assert_eq!(ledger.len(), 1);
    let record = ledger.find_by_tx_ref("tx-1").await.unwrap().unwrap();
    assert_eq!(record.status, PurchaseStatus::Completed);
}

#[tokio::test]
async fn test_unknown_tx_ref_leaves_ledger_untouched() {
    let ledger = Arc::new(InMemoryLedger::new());
    let existing = PurchaseRecord::pending("u1", "r1", "tx-1", dec!(100));
    ledger.create_purchase(&existing).await.unwrap();
    let svc = service(StubProvider::ok("https://pay/x"), ledger.clone());

    let err = svc
        .handle_webhook(&success_webhook("forged"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::UnknownTransaction(ref r) if r == "forged"));
    assert_eq!(ledger.records(), vec![existing]);
}

#[tokio::test]
async fn test_failed_charge_marks_pending_failed_only() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger
        .create_purchase(&PurchaseRecord::pending("u1", "r1", "tx-1", dec!(100)))
        .await
        .unwrap();
    let svc = service(StubProvider::ok("https://pay/x"), ledger.clone());

    let failed = br#"{"event":"charge.completed","data":{"status":"failed","tx_ref":"tx-1"}}"#;
    let outcome = svc.handle_webhook(failed).await.unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Failed {
            tx_ref: "tx-1".to_string(),
            changed: true
        }
    );

    // A success afterwards still wins.
    svc.handle_webhook(&success_webhook("tx-1")).await.unwrap();

    // A late failure never regresses a completed purchase.
    let outcome = svc.handle_webhook(failed).await.unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Failed {
            tx_ref: "tx-1".to_string(),
            changed: false
        }
    );
    let record = ledger.find_by_tx_ref("tx-1").await.unwrap().unwrap();
    assert_eq!(record.status, PurchaseStatus::Completed);
}

#[tokio::test]
async fn test_other_events_and_statuses_are_noops() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger
        .create_purchase(&PurchaseRecord::pending("u1", "r1", "tx-1", dec!(100)))
        .await
        .unwrap();
    let svc = service(StubProvider::ok("https://pay/x"), ledger.clone());

    let outcome = svc
        .handle_webhook(br#"{"event":"payout.success","data":{"tx_ref":"tx-1"}}"#)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Ignored {
            event: "payout.success".to_string()
        }
    );

    let outcome = svc
        .handle_webhook(br#"{"event":"charge.completed","data":{"status":"pending","tx_ref":"tx-1"}}"#)
        .await
        .unwrap();
    assert_eq!(outcome.label(), "unhandled");

    let record = ledger.find_by_tx_ref("tx-1").await.unwrap().unwrap();
    assert_eq!(record.status, PurchaseStatus::Pending);
}

#[tokio::test]
async fn test_ledger_error_on_webhook_propagates() {
    let svc = PaymentService::new(
        StubProvider::ok("https://pay/x"),
        Arc::new(BrokenLedger),
        urls(),
    );
    let err = svc
        .handle_webhook(&success_webhook("tx-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Ledger(LedgerError::Status { status: 503 })));
}
