//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Errors are rendered as `{"detail": "..."}` with the status from
//! `StorefrontError::status_code`.

use crate::session::{clear_current_user, require_user, set_current_user};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};
use wd_core::{
    is_payment_intent_id, unit_price, with_vat, CategorySummary, LoginRequest, NewOrder, Order,
    PaymentIntent, PaymentIntentRequest, Product, ProductCatalog, RegisterRequest,
    SettlementContext, StorefrontError, StorefrontResult, User,
};
use wd_stripe::{dispatch_webhook_event, LoggingWebhookHandler};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Handler error: a `StorefrontError` rendered as `{detail}`
#[derive(Debug)]
pub struct ApiError(pub StorefrontError);

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        storefront_error_to_response(self.0).into_response()
    }
}

fn storefront_error_to_response(err: StorefrontError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    if code >= 500 {
        error!("Request failed: {}", err);
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(ErrorResponse::new(err.to_string())),
    )
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `GET /api/products` query
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Service
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "world-distribution",
        "version": env!("CARGO_PKG_VERSION"),
        "payment_methods": state.payment_methods(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Root banner
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "World Distribution API",
        "status": "running"
    }))
}

// =============================================================================
// Auth
// =============================================================================

/// Current session user, 401 without a session
pub async fn me(State(state): State<AppState>, session: Session) -> ApiResult<User> {
    Ok(Json(require_user(&state, &session).await?))
}

#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> ApiResult<User> {
    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await
        .map_err(|e| {
            warn!("Failed login attempt");
            e
        })?;

    set_current_user(&session, &user).await?;
    info!("User {} logged in", user.id);
    Ok(Json(user))
}

#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<User> {
    let user = state.users.register(request).await?;
    set_current_user(&session, &user).await?;
    Ok(Json(user))
}

pub async fn logout(session: Session) -> ApiResult<MessageResponse> {
    clear_current_user(&session).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

// =============================================================================
// Catalog
// =============================================================================

/// Get products list, optionally filtered by category
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    let products = state
        .catalog
        .filter(query.category.as_deref())
        .cloned()
        .collect();
    Json(products)
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<u32>,
) -> ApiResult<Product> {
    let product = state
        .catalog
        .get(product_id)
        .ok_or(StorefrontError::ProductNotFound { product_id })?;
    Ok(Json(product.clone()))
}

pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<CategorySummary>> {
    Json(state.catalog.categories())
}

// =============================================================================
// Payments
// =============================================================================

/// Create a payment intent for in-page card confirmation
#[instrument(skip(state, request), fields(amount = request.amount))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<PaymentIntentRequest>,
) -> ApiResult<PaymentIntent> {
    let gateway = state.payments.as_ref().ok_or_else(|| {
        StorefrontError::ProcessorNotConfigured("STRIPE_SECRET_KEY not set".to_string())
    })?;

    let intent = gateway.create_payment_intent(&request).await?;
    Ok(Json(intent))
}

/// Handle Stripe webhook
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let verifier = state.webhook.as_ref().ok_or_else(|| {
        StorefrontError::ProcessorNotConfigured("STRIPE_WEBHOOK_SECRET not set".to_string())
    })?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| StorefrontError::Validation("Missing Stripe-Signature header".to_string()))?;

    let event = verifier.verify(&body, signature).map_err(|e| {
        error!("Webhook verification failed: {}", e);
        e
    })?;

    info!(
        "Received webhook: type={:?}, id={}",
        event.event_type, event.event_id
    );

    if let Some(ref pi) = event.payment_intent_id {
        if let Some(order) = state.orders.find_by_payment_intent(pi).await {
            info!("Webhook refers to order {}", order.id);
        }
    }

    dispatch_webhook_event(&LoggingWebhookHandler, &event).map_err(|e| {
        error!("Webhook handler error: {}", e);
        e
    })?;

    Ok(Json(serde_json::json!({ "received": true })))
}

// =============================================================================
// Orders
// =============================================================================

/// Check an order against the catalog: products exist, quantities are
/// positive, each unit price matches its claimed tier, and the quantity per
/// product (summed across lines) is in stock.
///
/// The tier itself is not re-derived from the quantity; a cart line keeps the
/// tier it was first priced at.
pub fn validate_order(catalog: &ProductCatalog, order: &NewOrder) -> StorefrontResult<()> {
    if order.items.is_empty() {
        return Err(StorefrontError::EmptyCart);
    }

    let mut requested: HashMap<u32, u32> = HashMap::new();

    for item in &order.items {
        let product = catalog
            .get(item.product_id)
            .ok_or(StorefrontError::ProductNotFound {
                product_id: item.product_id,
            })?;

        if item.quantity == 0 {
            return Err(StorefrontError::Validation(format!(
                "Quantity for {} must be positive",
                product.name
            )));
        }

        let total = requested.entry(product.id).or_insert(0);
        *total = total.saturating_add(item.quantity);
        if !product.in_stock(*total) {
            return Err(StorefrontError::InsufficientStock {
                product_id: product.id,
                requested: *total,
                available: product.stock,
            });
        }

        if item.price_per_unit != unit_price(product.base_price, item.volume_tier) {
            return Err(StorefrontError::Validation(format!(
                "Price for {} does not match the {} tier",
                product.name, item.volume_tier
            )));
        }
    }

    Ok(())
}

/// Place an order for the session user
#[instrument(skip(state, session, request), fields(method = %request.payment_method))]
pub async fn create_order(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<NewOrder>,
) -> ApiResult<Order> {
    let user = require_user(&state, &session).await?;
    validate_order(&state.catalog, &request)?;

    if let Some(ref pi) = request.payment_intent_id {
        if !is_payment_intent_id(pi) {
            return Err(
                StorefrontError::Validation(format!("Invalid payment intent id: {}", pi)).into(),
            );
        }
        if let Some(existing) = state.orders.find_by_payment_intent(pi).await {
            return Err(StorefrontError::Validation(format!(
                "Payment already used for order {}",
                existing.id
            ))
            .into());
        }
    }

    let currency = state.catalog.currency;
    let amount_minor = currency.to_minor_units(with_vat(request.subtotal()));
    let strategy = state.settlements.require(request.payment_method)?;

    let settlement = strategy
        .settle(&SettlementContext {
            order: &request,
            user: &user,
            amount_minor,
            currency,
        })
        .await?;

    let order = Order::settled(user.id, request, settlement);
    // Keyed by the id the processor confirmed, re-checked under the store lock
    state.orders.insert_if_intent_unused(order.clone()).await?;
    info!(
        "Order {} placed by user {}: status={:?}",
        order.id, user.id, order.status
    );

    Ok(Json(order))
}

/// The session user's orders, newest first
pub async fn list_orders(State(state): State<AppState>, session: Session) -> ApiResult<Vec<Order>> {
    let user = require_user(&state, &session).await?;
    Ok(Json(state.orders.for_user(user.id).await))
}
