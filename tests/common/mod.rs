#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use flower_shop_api::{
    auth::Claims,
    config::{AppConfig, PaymentConfig},
    db,
    entities::{bouquet, order, order_item, payment},
    notifications::{Notification, NotificationDispatcher},
    payments::{webhook::JWKS_PATH, PaymentGateway, WebhookVerifier, YandexPayClient},
    services::CreateBouquet,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const PROVIDER_ORDERS_PATH: &str = "/api/merchant/v1/orders";
pub const PAYMENT_URL: &str = "https://pay.example.test/l/session-1";
pub const PROVIDER_ATTEMPTS: u32 = 3;

/// Key pair the mock provider signs webhooks with; its public half is served as the JWKS
pub const PROVIDER_SIGNING_KEY: &str = include_str!("../fixtures/provider_signing_key.pem");
pub const PROVIDER_JWKS: &str = include_str!("../fixtures/provider_jwks.json");
pub const PROVIDER_KID: &str = "provider-key-1";
/// Valid P-256 key that is not in the provider's JWKS
pub const FOREIGN_SIGNING_KEY: &str = include_str!("../fixtures/foreign_signing_key.pem");

/// How the harness wires its collaborators
pub struct TestOptions {
    /// Response the mock payment provider gives to every session request
    pub provider_response: ResponseTemplate,
    /// When false, webhooks are decoded best-effort without a signature check
    pub verify_webhook_signature: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            provider_response: ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "paymentUrl": PAYMENT_URL } })),
            verify_webhook_signature: true,
        }
    }
}

/// Application backed by a throwaway SQLite file, a mock payment provider and
/// a notification queue the tests read from directly.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub provider: MockServer,
    token: String,
    notifications: Mutex<mpsc::Receiver<Notification>>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = db_dir.path().join("flower_shop_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PROVIDER_ORDERS_PATH))
            .respond_with(options.provider_response)
            .mount(&provider)
            .await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PROVIDER_JWKS, "application/json"))
            .mount(&provider)
            .await;

        cfg.payment = PaymentConfig {
            api_url: provider.uri(),
            api_key: "merchant-test-key".to_string(),
            request_timeout_secs: 2,
            max_retries: PROVIDER_ATTEMPTS,
            on_success_url: "https://shop.example.test/success".to_string(),
            on_error_url: "https://shop.example.test/error".to_string(),
            on_abort_url: "https://shop.example.test/abort".to_string(),
            verify_webhook_signature: options.verify_webhook_signature,
            ..PaymentConfig::default()
        };

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(YandexPayClient::new(cfg.payment.clone()).expect("payment client"));
        let verifier = WebhookVerifier::from_config(&cfg.payment).expect("webhook verifier");
        let (dispatcher, rx) = NotificationDispatcher::channel(64);

        let state = AppState::new(Arc::new(pool), cfg, gateway, verifier, dispatcher);
        let router = flower_shop_api::build_app(state.clone());

        Self {
            router,
            state,
            provider,
            token: mint_token(&["admin"], &[], 3600),
            notifications: Mutex::new(rx),
            _db_dir: db_dir,
        }
    }

    /// Bearer token carrying the admin role
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Posts a raw webhook body
    pub async fn post_webhook(&self, body: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payments/webhook")
            .body(Body::from(body.to_string()))
            .expect("failed to build webhook request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during webhook request")
    }

    /// Unsigned JSON claims announcing `status` for `order_id`
    pub fn webhook_claims(order_id: &str, status: &str) -> Value {
        json!({
            "event": "ORDER_STATUS_UPDATED",
            "eventTime": "2024-05-01T10:00:00Z",
            "order": { "orderId": order_id, "paymentStatus": status }
        })
    }

    /// Compact JWS announcing `status` for `order_id`, signed by the provider key
    pub fn webhook_body(order_id: &str, status: &str) -> String {
        sign_webhook(
            PROVIDER_SIGNING_KEY,
            Some(PROVIDER_KID),
            &Self::webhook_claims(order_id, status),
        )
    }

    pub async fn seed_bouquet(&self, name: &str, price: Decimal, quantity: i32) -> bouquet::Model {
        self.state
            .services
            .catalog
            .create_bouquet(CreateBouquet {
                name: name.to_string(),
                description: Some(format!("{} seeded for integration tests", name)),
                price,
                quantity,
                bouquet_type_id: None,
                flower_type_ids: Vec::new(),
            })
            .await
            .expect("seed bouquet for tests")
    }

    /// Places an order for `items` through the public endpoint and returns the new id
    pub async fn place_order(&self, items: Value) -> Uuid {
        let response = self
            .request(Method::POST, "/api/v1/orders", Some(order_payload(items)), None)
            .await;
        assert_eq!(response.status(), 201, "order placement should succeed");
        let body = response_json(response).await;
        body["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("order id in response")
    }

    /// Everything dispatched so far, in queue order
    pub fn drain_notifications(&self) -> Vec<Notification> {
        let mut rx = self.notifications.lock().expect("notification receiver");
        let mut drained = Vec::new();
        while let Ok(notification) = rx.try_recv() {
            drained.push(notification);
        }
        drained
    }

    pub async fn order_row(&self, id: Uuid) -> Option<order::Model> {
        order::Entity::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("order lookup")
    }

    pub async fn payment_for(&self, order_id: Uuid) -> Option<payment::Model> {
        use sea_orm::{ColumnTrait, QueryFilter};
        payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .one(&*self.state.db)
            .await
            .expect("payment lookup")
    }

    /// Row counts of (orders, order_items, payments)
    pub async fn row_counts(&self) -> (u64, u64, u64) {
        let db = &*self.state.db;
        (
            order::Entity::find().count(db).await.expect("count orders"),
            order_item::Entity::find()
                .count(db)
                .await
                .expect("count order items"),
            payment::Entity::find().count(db).await.expect("count payments"),
        )
    }
}

/// HS256 token signed with the harness secret
pub fn mint_token(roles: &[&str], permissions: &[&str], expires_in_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        name: Some("Test Admin".to_string()),
        email: Some("admin@example.com".to_string()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        jti: Some(Uuid::new_v4().to_string()),
        iat: now,
        exp: now + expires_in_secs,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode access token")
}

/// ES256 compact JWS over `claims`; `kid` goes into the protected header when given
pub fn sign_webhook(private_key_pem: &str, kid: Option<&str>, claims: &Value) -> String {
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::ES256);
    header.kid = kid.map(str::to_string);
    jsonwebtoken::encode(
        &header,
        claims,
        &jsonwebtoken::EncodingKey::from_ec_pem(private_key_pem.as_bytes()).expect("EC signing key"),
    )
    .expect("sign webhook")
}

/// A valid delivery order for the given `items` array
pub fn order_payload(items: Value) -> Value {
    json!({
        "customer_name": "Anna Petrova",
        "customer_phone": "+79990000000",
        "customer_email": "anna@example.com",
        "recipient_name": "Maria",
        "recipient_phone": "+79991111111",
        "delivery_method": "delivery",
        "delivery_city": "Moscow",
        "delivery_street": "Tverskaya",
        "delivery_house": "1",
        "greeting_card_text": "Happy birthday!",
        "payment_method": "card",
        "items": items
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
