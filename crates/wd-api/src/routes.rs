//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::session::create_session_layer;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - Auth (cookie session):
///   - GET  /api/auth/me - Current user
///   - POST /api/auth/login - Log in
///   - POST /api/auth/register - Create account and log in
///   - POST /api/auth/logout - Drop session
///
/// - Catalog:
///   - GET /api/products[?category=] - List products
///   - GET /api/products/{id} - Get product by ID
///   - GET /api/categories - Category summaries
///
/// - Payments & orders:
///   - POST /api/create-payment-intent - Stripe PaymentIntent for card checkout
///   - POST /api/webhook - Stripe webhook handler
///   - POST /api/orders - Place an order (card or bank transfer)
///   - GET  /api/orders - Current user's orders
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let sessions = create_session_layer(state.config.is_production());

    let auth_routes = Router::new()
        .route("/me", get(handlers::me))
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/logout", post(handlers::logout));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        // Catalog
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .route("/categories", get(handlers::list_categories))
        // Payments
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/webhook", post(handlers::stripe_webhook))
        // Orders
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        );

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root))
        // API
        .nest("/api", api_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(sessions),
        )
        // State
        .with_state(state)
}

/// Credentialed CORS for the configured browser origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ErrorResponse;
    use crate::state::{builtin_catalog, AppConfig};
    use crate::store::seed_demo_users;
    use stubs::fixed_gateway;
    use axum::http::{HeaderName, StatusCode};
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wd_core::{CategorySummary, Order, OrderStatus, PaymentAccounts, Product, User};
    use std::future::IntoFuture;
    use std::time::Duration;
    use wd_stripe::webhook::compute_hmac_sha256;
    use wd_stripe::StripeConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Payment gateway stub so routes can be exercised without Stripe
    mod stubs {
        use std::sync::Arc;
        use wd_core::{
            BoxedPaymentIntentGateway, PaymentIntent, PaymentIntentGateway, PaymentIntentRequest,
            StorefrontResult,
        };

        pub struct FixedGateway;

        #[async_trait::async_trait]
        impl PaymentIntentGateway for FixedGateway {
            async fn create_payment_intent(
                &self,
                request: &PaymentIntentRequest,
            ) -> StorefrontResult<PaymentIntent> {
                Ok(PaymentIntent {
                    client_secret: format!("pi_test_{}_secret", request.amount),
                    payment_intent_id: format!("pi_test_{}", request.amount),
                })
            }

            fn gateway_name(&self) -> &'static str {
                "fixed"
            }
        }

        pub fn fixed_gateway() -> BoxedPaymentIntentGateway {
            Arc::new(FixedGateway)
        }
    }

    const WEBHOOK_SECRET: &str = "whsec_route_tests";

    fn signature_header() -> HeaderName {
        HeaderName::from_static("stripe-signature")
    }

    fn signature_value(timestamp: i64, sig: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("t={},v1={}", timestamp, sig)).unwrap()
    }

    async fn server_with(state: AppState) -> TestServer {
        seed_demo_users(&state.users).await.unwrap();
        TestServer::builder()
            .save_cookies()
            .build(create_router(state))
            .unwrap()
    }

    fn base_state() -> AppState {
        AppState::new(
            AppConfig::default(),
            builtin_catalog().unwrap(),
            PaymentAccounts::default(),
        )
    }

    async fn server() -> TestServer {
        server_with(base_state()).await
    }

    async fn login_demo(server: &TestServer) -> User {
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "demo@restaurant.com", "password": "demo123" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<User>()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server().await.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["payment_methods"], json!(["bank"]));
    }

    #[tokio::test]
    async fn test_me_without_session_is_401() {
        let response = server().await.get("/api/auth/me").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<ErrorResponse>().detail, "Not authenticated");
    }

    #[tokio::test]
    async fn test_login_me_logout() {
        let server = server().await;

        let bad = server
            .post("/api/auth/login")
            .json(&json!({ "email": "demo@restaurant.com", "password": "nope" }))
            .await;
        assert_eq!(bad.status_code(), StatusCode::UNAUTHORIZED);

        let user = login_demo(&server).await;
        assert_eq!(user.company_name, "Demo Restaurant Chain");

        let me = server.get("/api/auth/me").await;
        assert_eq!(me.status_code(), StatusCode::OK);
        assert_eq!(me.json::<User>().id, user.id);

        let logout = server.post("/api/auth/logout").await;
        assert_eq!(logout.status_code(), StatusCode::OK);

        let me = server.get("/api/auth/me").await;
        assert_eq!(me.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_flow() {
        let server = server().await;

        let short = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "ops@bistro.es",
                "password": "123",
                "company_name": "Bistro SL",
                "country": "Spain"
            }))
            .await;
        assert_eq!(short.status_code(), StatusCode::BAD_REQUEST);

        let created = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "ops@bistro.es",
                "password": "secret1",
                "company_name": "Bistro SL",
                "country": "Spain",
                "city": "Madrid"
            }))
            .await;
        assert_eq!(created.status_code(), StatusCode::OK);
        let user = created.json::<User>();
        assert_eq!(user.region, "EU");
        assert_eq!(user.city.as_deref(), Some("Madrid"));

        // Registration logs the new user in
        let me = server.get("/api/auth/me").await;
        assert_eq!(me.json::<User>().email, "ops@bistro.es");

        let duplicate = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "demo@restaurant.com",
                "password": "secret1",
                "company_name": "Copycat",
                "country": "Germany"
            }))
            .await;
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_products_and_categories() {
        let server = server().await;

        let all = server.get("/api/products").await.json::<Vec<Product>>();
        assert_eq!(all.len(), 8);

        let durable = server
            .get("/api/products?category=Durable%20Consumables")
            .await
            .json::<Vec<Product>>();
        assert_eq!(durable.len(), 3);
        assert!(durable.iter().all(|p| p.category == "Durable Consumables"));

        let oil = server.get("/api/products/1").await.json::<Product>();
        assert_eq!(oil.base_price, dec!(45));

        let missing = server.get("/api/products/999").await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let categories = server
            .get("/api/categories")
            .await
            .json::<Vec<CategorySummary>>();
        assert_eq!(categories[0].name, "Food Commodities");
        assert_eq!(categories[0].count, 5);
    }

    #[tokio::test]
    async fn test_payment_intent_requires_processor() {
        let response = server()
            .await
            .post("/api/create-payment-intent")
            .json(&json!({ "amount": 535500, "currency": "eur" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response
            .json::<ErrorResponse>()
            .detail
            .contains("not configured"));
    }

    #[tokio::test]
    async fn test_payment_intent_with_gateway() {
        let server = server_with(base_state().with_payment_gateway(fixed_gateway())).await;
        let response = server
            .post("/api/create-payment-intent")
            .json(&json!({ "amount": 535500, "currency": "eur", "metadata": { "userId": "1" } }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["clientSecret"], "pi_test_535500_secret");
        assert_eq!(body["paymentIntentId"], "pi_test_535500");
    }

    #[tokio::test]
    async fn test_bank_transfer_order() {
        let server = server().await;

        let order_body = json!({
            "items": [
                { "product_id": 1, "quantity": 100, "price_per_unit": 45.0, "volume_tier": "100kg" }
            ],
            "payment_method": "bank"
        });

        let anonymous = server.post("/api/orders").json(&order_body).await;
        assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

        login_demo(&server).await;
        let response = server.post("/api/orders").json(&order_body).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let order = response.json::<Order>();
        assert_eq!(order.status, OrderStatus::AwaitingTransfer);
        assert_eq!(order.total_amount, dec!(4500));
        assert_eq!(order.vat_amount, dec!(855));
        assert_eq!(order.bank_account.unwrap().swift, "ABNANL2A");

        let orders = server.get("/api/orders").await.json::<Vec<Order>>();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_bank_transfer_blocked_for_incompatible_country() {
        let server = server().await;
        server
            .post("/api/auth/register")
            .json(&json!({
                "email": "buyer@tokyo.jp",
                "password": "secret1",
                "company_name": "Tokyo Foods KK",
                "country": "Japan",
                "region": "APAC"
            }))
            .await;

        let response = server
            .post("/api/orders")
            .json(&json!({
                "items": [
                    { "product_id": 8, "quantity": 100, "price_per_unit": 15.0, "volume_tier": "100kg" }
                ],
                "payment_method": "bank"
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_card_order_without_stripe_is_503() {
        let server = server().await;
        login_demo(&server).await;

        let response = server
            .post("/api/orders")
            .json(&json!({
                "items": [
                    { "product_id": 8, "quantity": 100, "price_per_unit": 15.0, "volume_tier": "100kg" }
                ],
                "payment_method": "card",
                "payment_intent_id": "pi_123"
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    /// 100kg of sea salt: 1500 net, 1785 with VAT
    const SEA_SALT_ORDER_MINOR: i64 = 178500;

    fn card_order_body(payment_intent_id: &str) -> serde_json::Value {
        json!({
            "items": [
                { "product_id": 8, "quantity": 100, "price_per_unit": 15.0, "volume_tier": "100kg" }
            ],
            "payment_method": "card",
            "payment_intent_id": payment_intent_id
        })
    }

    async fn mount_succeeded_intent(stripe: &MockServer, id: &str, delay: Duration, calls: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/payment_intents/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_delay(delay).set_body_json(json!({
                "id": id,
                "status": "succeeded",
                "amount": SEA_SALT_ORDER_MINOR,
                "currency": "eur"
            })))
            .expect(calls)
            .mount(stripe)
            .await;
    }

    fn stripe_state(api_base_url: impl Into<String>) -> AppState {
        base_state()
            .with_stripe(StripeConfig::new("sk_test_abc").with_api_base_url(api_base_url))
            .unwrap()
    }

    #[tokio::test]
    async fn test_card_payment_settles_one_order() {
        let stripe = MockServer::start().await;
        mount_succeeded_intent(&stripe, "pi_ok", Duration::ZERO, 1).await;

        let server = server_with(stripe_state(stripe.uri())).await;
        login_demo(&server).await;

        let paid = server.post("/api/orders").json(&card_order_body("pi_ok")).await;
        assert_eq!(paid.status_code(), StatusCode::OK);
        let order = paid.json::<Order>();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_intent_id.as_deref(), Some("pi_ok"));

        let reused = server.post("/api/orders").json(&card_order_body("pi_ok")).await;
        assert_eq!(reused.status_code(), StatusCode::BAD_REQUEST);

        // Would reach Stripe as `pi_ok` once the fragment is dropped
        let disguised = server
            .post("/api/orders")
            .json(&card_order_body("pi_ok#again"))
            .await;
        assert_eq!(disguised.status_code(), StatusCode::BAD_REQUEST);

        let orders = server.get("/api/orders").await.json::<Vec<Order>>();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_orders_cannot_share_a_payment() {
        let stripe = MockServer::start().await;
        mount_succeeded_intent(&stripe, "pi_race", Duration::from_millis(200), 2).await;

        let server = server_with(stripe_state(stripe.uri())).await;
        login_demo(&server).await;

        let first = server
            .post("/api/orders")
            .json(&card_order_body("pi_race"))
            .into_future();
        let second = server
            .post("/api/orders")
            .json(&card_order_body("pi_race"))
            .into_future();
        let (first, second) = tokio::join!(first, second);

        let mut statuses = vec![first.status_code(), second.status_code()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::BAD_REQUEST]);

        let orders = server.get("/api/orders").await.json::<Vec<Order>>();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_processor_is_bad_gateway() {
        let server = server_with(stripe_state("http://127.0.0.1:1")).await;
        let response = server
            .post("/api/create-payment-intent")
            .json(&json!({ "amount": 535500, "currency": "eur" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        assert!(response
            .json::<ErrorResponse>()
            .detail
            .starts_with("Network error"));
    }

    #[tokio::test]
    async fn test_webhook() {
        let unconfigured = server().await;
        let response = unconfigured.post("/api/webhook").text("{}").await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let server = server_with(base_state().with_webhook_secret(WEBHOOK_SECRET)).await;
        let payload = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "created": chrono::Utc::now().timestamp(),
            "data": { "object": { "id": "pi_1", "amount": 100, "currency": "eur" } }
        })
        .to_string();

        let timestamp = chrono::Utc::now().timestamp();
        let sig = compute_hmac_sha256(WEBHOOK_SECRET, &format!("{}.{}", timestamp, payload)).unwrap();

        let response = server
            .post("/api/webhook")
            .add_header(signature_header(), signature_value(timestamp, &sig))
            .text(payload.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<serde_json::Value>(), json!({ "received": true }));

        let forged = server
            .post("/api/webhook")
            .add_header(signature_header(), signature_value(timestamp, &"0".repeat(64)))
            .text(payload)
            .await;
        assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);
    }
}
