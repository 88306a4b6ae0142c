//! # Backend Client
//!
//! Reqwest client for the storefront backend. The client keeps a cookie jar
//! so the `session_id` cookie set by login/register rides along on every
//! later request.

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, instrument, warn};
use wd_core::{
    AuthBackend, CategorySummary, LoginRequest, NewOrder, Order, PaymentIntent,
    PaymentIntentGateway, PaymentIntentRequest, Product, ProductSource, RegisterRequest,
    StorefrontError, StorefrontResult, User,
};

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct DetailBody {
    detail: String,
}

/// HTTP client for the `/api` contract
pub struct BackendClient {
    config: ClientConfig,
    client: Client,
}

impl BackendClient {
    /// Create a new client with its own cookie jar
    pub fn new(config: ClientConfig) -> StorefrontResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                StorefrontError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from `WD_API_URL`
    pub fn from_env() -> StorefrontResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch one product
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: u32) -> StorefrontResult<Product> {
        let path = format!("/api/products/{}", product_id);
        let response = send(self.client.get(self.config.url(&path))).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorefrontError::ProductNotFound { product_id });
        }
        parse_json(response).await
    }

    /// Category summaries for the dashboard
    #[instrument(skip(self))]
    pub async fn categories(&self) -> StorefrontResult<Vec<CategorySummary>> {
        let response = send(self.client.get(self.config.url("/api/categories"))).await?;
        parse_json(response).await
    }

    /// Submit an order for the logged-in buyer
    #[instrument(skip(self, order), fields(method = %order.payment_method, items = order.items.len()))]
    pub async fn place_order(&self, order: &NewOrder) -> StorefrontResult<Order> {
        let response = send(self.client.post(self.config.url("/api/orders")).json(order)).await?;
        let placed: Order = parse_json(response).await?;
        info!("Order {} placed ({:?})", placed.id, placed.status);
        Ok(placed)
    }

    /// The logged-in buyer's orders, newest first
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> StorefrontResult<Vec<Order>> {
        let response = send(self.client.get(self.config.url("/api/orders"))).await?;
        parse_json(response).await
    }
}

#[async_trait]
impl AuthBackend for BackendClient {
    #[instrument(skip(self))]
    async fn current_user(&self) -> StorefrontResult<Option<User>> {
        let response = send(self.client.get(self.config.url("/api/auth/me"))).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("No active session");
            return Ok(None);
        }
        parse_json(response).await.map(Some)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> StorefrontResult<User> {
        let response = send(
            self.client
                .post(self.config.url("/api/auth/login"))
                .json(request),
        )
        .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(StorefrontError::InvalidCredentials);
        }
        parse_json(response).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> StorefrontResult<User> {
        let response = send(
            self.client
                .post(self.config.url("/api/auth/register"))
                .json(request),
        )
        .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(StorefrontError::EmailTaken {
                email: request.email.clone(),
            });
        }
        parse_json(response).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> StorefrontResult<()> {
        let response = send(self.client.post(self.config.url("/api/auth/logout"))).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentIntentGateway for BackendClient {
    #[instrument(skip(self, request), fields(amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> StorefrontResult<PaymentIntent> {
        let response = send(
            self.client
                .post(self.config.url("/api/create-payment-intent"))
                .json(request),
        )
        .await?;

        // Only this endpoint uses 503 for a missing processor setup
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            let detail = detail_from_response(response).await;
            warn!("Payment processor not configured: {}", detail);
            return Err(StorefrontError::ProcessorNotConfigured(detail));
        }
        parse_json(response).await
    }

    fn gateway_name(&self) -> &'static str {
        "backend"
    }
}

#[async_trait]
impl ProductSource for BackendClient {
    #[instrument(skip(self))]
    async fn list_products(&self, category: Option<&str>) -> StorefrontResult<Vec<Product>> {
        let mut request = self.client.get(self.config.url("/api/products"));
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }
        let response = send(request).await?;
        parse_json(response).await
    }
}

async fn send(request: RequestBuilder) -> StorefrontResult<Response> {
    request
        .send()
        .await
        .map_err(|e| StorefrontError::NetworkError(e.to_string()))
}

/// Decode a 2xx body, or turn the error body into a `StorefrontError`
async fn parse_json<T: DeserializeOwned>(response: Response) -> StorefrontResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| StorefrontError::Serialization(format!("Invalid backend response: {}", e)))
}

/// The `detail` of an error body, or the status reason when there is none
async fn detail_from_response(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<DetailBody>(&body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

/// A non-2xx response, keeping its status and `detail`
async fn error_from_response(response: Response) -> StorefrontError {
    let status = response.status();
    let detail = detail_from_response(response).await;

    warn!("Backend returned {}: {}", status, detail);

    StorefrontError::RequestFailed {
        status: status.as_u16(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wd_core::Currency;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(ClientConfig::new(server.uri())).unwrap()
    }

    fn user_json() -> serde_json::Value {
        json!({
            "id": 1,
            "email": "demo@restaurant.com",
            "company_name": "Demo Restaurant Chain",
            "country": "Germany",
            "region": "EU"
        })
    }

    #[tokio::test]
    async fn test_me_401_is_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "detail": "Not authenticated" })),
            )
            .mount(&server)
            .await;

        assert_eq!(client(&server).current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_sends_session_cookie_afterwards() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({ "email": "demo@restaurant.com", "password": "demo123" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session_id=abc123; Path=/; HttpOnly")
                    .set_body_json(user_json()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("cookie", "session_id=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = client(&server);
        let user = backend
            .login(&LoginRequest::new("demo@restaurant.com", "demo123"))
            .await
            .unwrap();
        assert_eq!(user.company_name, "Demo Restaurant Chain");
        assert!(user.street_address.is_none());

        let me = backend.current_user().await.unwrap().unwrap();
        assert_eq!(me.id, 1);
    }

    #[tokio::test]
    async fn test_bad_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "detail": "Invalid email or password" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&LoginRequest::new("demo@restaurant.com", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({ "detail": "Email already registered" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .register(&RegisterRequest::new("demo@restaurant.com", "secret1", "Demo", "Germany"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_payment_intent_not_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-intent"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "detail": "Payment processor not configured: STRIPE_SECRET_KEY not set"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_payment_intent(&PaymentIntentRequest::new(5355, Currency::EUR))
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::ProcessorNotConfigured(_)));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unavailable_login_is_not_a_processor_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({ "detail": "Maintenance" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&LoginRequest::new("demo@restaurant.com", "demo123"))
            .await
            .unwrap_err();
        assert!(!err.is_configuration());
        assert!(matches!(
            err,
            StorefrontError::RequestFailed { status: 503, ref detail } if detail == "Maintenance"
        ));
    }

    #[tokio::test]
    async fn test_payment_intent_processor_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-intent"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({
                "detail": "Network error: error sending request"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_payment_intent(&PaymentIntentRequest::new(5355, Currency::EUR))
            .await
            .unwrap_err();
        assert!(!err.is_configuration());
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_payment_intent_generic_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-intent"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_payment_intent(&PaymentIntentRequest::new(5355, Currency::EUR))
            .await
            .unwrap_err();
        match err {
            StorefrontError::RequestFailed { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_payment_intent_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-intent"))
            .and(body_json(json!({
                "amount": 535500,
                "currency": "eur",
                "metadata": { "userId": "1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "clientSecret": "pi_9_secret_x",
                "paymentIntentId": "pi_9"
            })))
            .mount(&server)
            .await;

        let intent = client(&server)
            .create_payment_intent(
                &PaymentIntentRequest::new(535500, Currency::EUR).with_metadata("userId", "1"),
            )
            .await
            .unwrap();
        assert_eq!(intent.client_secret, "pi_9_secret_x");
        assert_eq!(intent.payment_intent_id, "pi_9");
    }

    #[tokio::test]
    async fn test_list_products_by_category() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("category", "Durable Consumables"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 4,
                "name": "Disposable Gloves",
                "category": "Durable Consumables",
                "base_price": 18.0,
                "unit": "box",
                "stock": 5000,
                "description": "Nitrile, powder-free",
                "image_url": null
            }])))
            .mount(&server)
            .await;

        let products = client(&server)
            .list_products(Some("Durable Consumables"))
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].base_price, dec!(18));
    }

    #[tokio::test]
    async fn test_missing_product() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/99"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "detail": "Product not found: 99" })),
            )
            .mount(&server)
            .await;

        let err = client(&server).get_product(99).await.unwrap_err();
        assert!(matches!(err, StorefrontError::ProductNotFound { product_id: 99 }));
    }

    #[tokio::test]
    async fn test_network_error() {
        let backend = BackendClient::new(ClientConfig::new("http://127.0.0.1:1")).unwrap();
        let err = backend.current_user().await.unwrap_err();
        assert!(matches!(err, StorefrontError::NetworkError(_)));
        assert!(err.is_retryable());
    }
}
