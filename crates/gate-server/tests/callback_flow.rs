//! End-to-end callback flows over the real router with an in-memory ledger
//! and a scripted chat client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use gate_chat::{ChatApi, InviteIssuer, MockChat};
use gate_core::{Tenant, TenantKey, TenantRegistry};
use gate_ledger::{LedgerStore, MemoryLedger, PaymentStatus, TenantResolver};
use gate_server::session;
use gate_server::state::AppState;
use gate_server::update::{
    IncomingMessage, Update, UpdateChat, UpdateJob, UpdateUser, spawn_workers,
};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tokio::sync::mpsc;
use tower::ServiceExt;
use url::form_urlencoded;

const SECRET: &str = "notify_secret";
const CRYPTO_SECRET: &str = "crypto_secret";
const CHANNEL_ID: i64 = -100;

fn key(s: &str) -> TenantKey {
    TenantKey::new(s).unwrap()
}

fn tenant(with_crypto: bool) -> Tenant {
    Tenant {
        bot_token: "123:abc".into(),
        receiver: "410011000000000".into(),
        notification_secret: SECRET.into(),
        channel_id: CHANNEL_ID,
        price: dec!(600.00),
        description: "Access for {price} RUB".into(),
        crypto_secret: with_crypto.then(|| CRYPTO_SECRET.into()),
    }
}

struct TestGate {
    app: Router,
    state: AppState,
    ledger: Arc<MemoryLedger>,
    chat: Arc<MockChat>,
    updates_tx: mpsc::Sender<UpdateJob>,
    updates_rx: mpsc::Receiver<UpdateJob>,
}

fn gate_with(chat: MockChat, with_crypto: bool, host_url: &str) -> TestGate {
    let mut registry = TenantRegistry::new();
    registry.register(key("bot1"), tenant(with_crypto)).unwrap();
    let registry = Arc::new(registry);

    let ledger = Arc::new(MemoryLedger::new());
    let ledger_dyn: Arc<dyn LedgerStore> = ledger.clone();

    let chat = Arc::new(chat);
    let mut chats: HashMap<TenantKey, Arc<dyn ChatApi>> = HashMap::new();
    chats.insert(key("bot1"), chat.clone());

    let (tx, rx) = mpsc::channel(8);

    let state = AppState {
        registry: Arc::clone(&registry),
        ledger: Arc::clone(&ledger_dyn),
        resolver: TenantResolver::new(registry, ledger_dyn),
        chats: Arc::new(chats),
        invites: InviteIssuer::new(),
        crypto: None,
        http: reqwest::Client::new(),
        host_url: host_url.into(),
        updates: tx.downgrade(),
    };

    TestGate {
        app: gate_server::app(state.clone()),
        state,
        ledger,
        chat,
        updates_tx: tx,
        updates_rx: rx,
    }
}

fn gate() -> TestGate {
    gate_with(MockChat::new(), true, "http://127.0.0.1:1")
}

/// Sign a notification body the way the processor does.
fn signed_form(label: &str, secret: &str, notification_type: &str, tamper: bool) -> String {
    let fields = [
        notification_type,
        "op-1",
        "600.00",
        "643",
        "2024-05-01T10:00:00Z",
        "41001000000",
        "false",
        secret,
        label,
    ];
    let mut hash = hex::encode(Sha1::digest(fields.join("&").as_bytes()));
    if tamper {
        let last = hash.pop().unwrap();
        hash.push(if last == '0' { '1' } else { '0' });
    }

    form_urlencoded::Serializer::new(String::new())
        .append_pair("notification_type", notification_type)
        .append_pair("operation_id", "op-1")
        .append_pair("amount", "600.00")
        .append_pair("currency", "643")
        .append_pair("datetime", "2024-05-01T10:00:00Z")
        .append_pair("sender", "41001000000")
        .append_pair("codepro", "false")
        .append_pair("label", label)
        .append_pair("sha1_hash", &hash)
        .finish()
}

fn crypto_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

async fn post_form(app: &Router, uri: &str, body: String) -> StatusCode {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> StatusCode {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

async fn register(gate: &TestGate, label: &str, user_id: &str) {
    let status = post_json(
        &gate.app,
        "/register-payment/bot1",
        serde_json::json!({ "label": label, "user_id": user_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn status_of(gate: &TestGate, label: &str) -> Option<PaymentStatus> {
    gate.ledger
        .get(&key("bot1"), label)
        .await
        .unwrap()
        .map(|r| r.status)
}

#[tokio::test]
async fn happy_path_settles_and_issues_single_member_invite() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Pending));

    let status = post_form(
        &gate.app,
        "/payment-callback",
        signed_form("lbl-1", SECRET, "p2p-incoming", false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Success));
    assert_eq!(gate.chat.invite_attempts(), 1);

    let texts: Vec<_> = gate.chat.sent_messages().iter().map(|m| m.text.clone()).collect();
    assert!(texts.iter().any(|t| t.contains("Payment confirmed")));
    // Mock invite links encode (chat_id, member_limit, name).
    assert!(
        texts
            .iter()
            .any(|t| t.contains("mock_-100_1_User_555_invite"))
    );
}

#[tokio::test]
async fn tenant_scoped_callback_follows_the_same_protocol() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;

    let status = post_form(
        &gate.app,
        "/payment-callback/bot1",
        signed_form("lbl-1", SECRET, "card-incoming", false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Success));
}

#[tokio::test]
async fn unknown_label_is_rejected_without_mutation() {
    let gate = gate();

    let status = post_form(
        &gate.app,
        "/payment-callback",
        signed_form("absent", SECRET, "p2p-incoming", false),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(status_of(&gate, "absent").await, None);
    assert_eq!(gate.chat.invite_attempts(), 0);
}

#[tokio::test]
async fn missing_label_is_rejected() {
    let gate = gate();
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("notification_type", "p2p-incoming")
        .finish();
    let status = post_form(&gate.app, "/payment-callback", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tampered_digest_is_rejected_and_status_stays_pending() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;

    let status = post_form(
        &gate.app,
        "/payment-callback",
        signed_form("lbl-1", SECRET, "p2p-incoming", true),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Pending));
    assert_eq!(gate.chat.invite_attempts(), 0);
}

#[tokio::test]
async fn non_incoming_type_is_acknowledged_without_settling() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;

    let status = post_form(
        &gate.app,
        "/payment-callback/bot1",
        signed_form("lbl-1", SECRET, "outgoing-transfer", false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Pending));
}

#[tokio::test(start_paused = true)]
async fn invite_failure_keeps_payment_settled_and_sends_fallback() {
    let gate = gate_with(
        MockChat::new().with_transient_invite_failures(usize::MAX),
        true,
        "http://127.0.0.1:1",
    );
    register(&gate, "lbl-1", "555").await;

    let status = post_form(
        &gate.app,
        "/payment-callback",
        signed_form("lbl-1", SECRET, "p2p-incoming", false),
    )
    .await;

    // Callback still acknowledged: retrying would not fix the invite.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Success));
    assert_eq!(gate.chat.invite_attempts(), 5);
    assert!(
        gate.chat
            .sent_messages()
            .iter()
            .any(|m| m.text.contains("contact support"))
    );
}

#[tokio::test]
async fn duplicate_deliveries_issue_exactly_one_invite() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;
    let body = signed_form("lbl-1", SECRET, "p2p-incoming", false);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = gate.app.clone();
        let body = body.clone();
        handles.push(tokio::spawn(async move {
            post_form(&app, "/payment-callback", body).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Success));
    assert_eq!(gate.chat.invite_attempts(), 1);
}

#[tokio::test]
async fn crypto_paid_callback_settles_payment() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;

    let body = serde_json::json!({ "invoice_id": 7, "status": "paid", "payload": "lbl-1" })
        .to_string();
    let signature = crypto_signature(CRYPTO_SECRET, body.as_bytes());

    let response = gate
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/crypto-callback/bot1")
                .header(CONTENT_TYPE, "application/json")
                .header("x-gateway-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Success));
    assert_eq!(gate.chat.invite_attempts(), 1);
}

#[tokio::test]
async fn crypto_callback_with_bad_signature_is_rejected() {
    let gate = gate();
    register(&gate, "lbl-1", "555").await;

    let body = serde_json::json!({ "invoice_id": 7, "status": "paid", "payload": "lbl-1" })
        .to_string();
    let signature = crypto_signature("wrong_secret", body.as_bytes());

    let response = gate
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/crypto-callback/bot1")
                .header(CONTENT_TYPE, "application/json")
                .header("x-gateway-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(status_of(&gate, "lbl-1").await, Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn crypto_callback_rejected_for_tenant_without_secret() {
    let gate = gate_with(MockChat::new(), false, "http://127.0.0.1:1");

    let body = serde_json::json!({ "invoice_id": 7, "status": "paid", "payload": "lbl-1" })
        .to_string();
    let signature = crypto_signature(CRYPTO_SECRET, body.as_bytes());

    let response = gate
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/crypto-callback/bot1")
                .header(CONTENT_TYPE, "application/json")
                .header("x-gateway-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_payment_rejects_missing_data() {
    let gate = gate();
    let status = post_json(
        &gate.app,
        "/register-payment/bot1",
        serde_json::json!({ "label": "lbl-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_active_tenant_count() {
    let gate = gate();
    let response = gate
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["tenants"], 1);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn bot_webhook_enqueues_updates_for_known_tenants_only() {
    let mut gate = gate();

    let update = serde_json::json!({
        "message": { "text": "/start", "from": { "id": 555 }, "chat": { "id": 555 } }
    });

    let status = post_json(&gate.app, "/bot-webhook/unknown", update.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = post_json(&gate.app, "/bot-webhook/bot1", update).await;
    assert_eq!(status, StatusCode::OK);

    let job = gate.updates_rx.try_recv().unwrap();
    assert_eq!(job.tenant, key("bot1"));
    assert_eq!(
        job.update.message.unwrap().text.as_deref(),
        Some("/start")
    );
}

#[tokio::test]
async fn workers_stop_after_bootstrap_sender_drops() {
    let TestGate {
        state,
        updates_tx,
        updates_rx,
        ..
    } = gate();

    let workers = spawn_workers(state.clone(), updates_rx, 2);

    // One queued job, then drop every strong sender the way shutdown does.
    // Worker tasks hold state clones, but those carry only weak senders,
    // so the queue closes once the bootstrap's sender is gone.
    updates_tx
        .try_send(UpdateJob {
            tenant: key("bot1"),
            update: Update { message: None },
        })
        .unwrap();
    drop(updates_tx);
    drop(state);

    for worker in workers {
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .expect("worker should stop once the queue closes")
            .unwrap();
    }
}

#[tokio::test]
async fn session_initiation_registers_label_before_showing_link() {
    // Serve the real router so the session's registration self-call lands
    // on the same ledger.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gate = gate_with(MockChat::new(), false, &format!("http://{addr}"));

    let app = gate.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let update = Update {
        message: Some(IncomingMessage {
            text: Some("/start".into()),
            from: Some(UpdateUser { id: 555 }),
            chat: UpdateChat { id: 555 },
        }),
    };
    session::handle_update(&gate.state, &key("bot1"), update).await;

    let sent = gate.chat.sent_messages();
    assert_eq!(sent.len(), 1, "expected exactly the payment-link message");
    let link = sent[0].button_url.clone().expect("payment link button");
    assert!(link.starts_with("https://yoomoney.ru/quickpay/confirm.xml?"));

    // The label embedded in the link must already be pending in the ledger.
    let label = url::Url::parse(&link)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "label")
        .map(|(_, v)| v.to_string())
        .unwrap();
    assert_eq!(
        gate.ledger
            .lookup_beneficiary(&key("bot1"), &label)
            .await
            .unwrap()
            .as_deref(),
        Some("555")
    );
    assert_eq!(status_of(&gate, &label).await, Some(PaymentStatus::Pending));
}
