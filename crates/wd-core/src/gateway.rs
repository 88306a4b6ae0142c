//! # Remote Service Seams
//!
//! Traits for everything the storefront talks to over the network. The HTTP
//! client crate implements them against the backend; tests implement them
//! in memory.

use crate::error::StorefrontResult;
use crate::product::{Currency, Product, ProductCatalog};
use crate::user::{LoginRequest, RegisterRequest, User};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// `POST /api/create-payment-intent` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    /// Amount in minor currency units (cents)
    pub amount: i64,

    #[serde(default)]
    pub currency: Currency,

    /// Opaque key/value pairs passed through to the processor
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntentRequest {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self {
            amount,
            currency,
            metadata: HashMap::new(),
        }
    }

    /// Builder: add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Handle returned by the processor for client-side confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
}

/// Obtains payment intents from a processor.
///
/// Implementations must report a missing processor configuration as
/// `StorefrontError::ProcessorNotConfigured` so callers can show setup
/// guidance instead of a generic failure.
#[async_trait]
pub trait PaymentIntentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> StorefrontResult<PaymentIntent>;

    /// Gateway name (for logging)
    fn gateway_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentIntentGateway = Arc<dyn PaymentIntentGateway>;

/// Session-bearing authentication backend
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve the current session. `Ok(None)` means there is no session.
    async fn current_user(&self) -> StorefrontResult<Option<User>>;

    async fn login(&self, request: &LoginRequest) -> StorefrontResult<User>;

    async fn register(&self, request: &RegisterRequest) -> StorefrontResult<User>;

    /// Discard the remote session
    async fn logout(&self) -> StorefrontResult<()>;
}

pub type BoxedAuthBackend = Arc<dyn AuthBackend>;

/// Source of catalog reference data
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn list_products(&self, category: Option<&str>) -> StorefrontResult<Vec<Product>>;
}

#[async_trait]
impl ProductSource for ProductCatalog {
    async fn list_products(&self, category: Option<&str>) -> StorefrontResult<Vec<Product>> {
        Ok(self.filter(category).cloned().collect())
    }
}
