//! # Storefront Error Types
//!
//! Typed error handling for the World Distribution storefront.
//! All fallible operations return `Result<T, StorefrontError>`.

use thiserror::Error;

/// Core error type shared by the client, the backend and the processor layer
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Client-side input validation failed before any request was sent
    #[error("{0}")]
    Validation(String),

    /// Bad email/password combination
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No valid session for a protected operation
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Registration with an email that already has an account
    #[error("Email already registered: {email}")]
    EmailTaken { email: String },

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: u32 },

    /// Not enough stock to fill a line
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: u32,
        requested: u32,
        available: u32,
    },

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Bank transfer blocked because the buyer country is not served by the routed account
    #[error("Payment method not compatible with your location: {country} is not served by {rail}")]
    IncompatibleRegion { country: String, rail: String },

    /// Payment processor has no credentials configured
    #[error("Payment processor not configured: {0}")]
    ProcessorNotConfigured(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Remote backend answered with an unexpected status
    #[error("Request failed ({status}): {detail}")]
    RequestFailed { status: u16, detail: String },

    /// Network/HTTP error communicating with a remote service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorefrontError {
    /// Returns true if re-submitting the same request could succeed.
    ///
    /// Nothing in the storefront retries on its own; this only drives the
    /// wording of the notification shown to the user.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorefrontError::NetworkError(_) | StorefrontError::ProviderError { .. }
        )
    }

    /// Returns true for the "processor not configured" class, which gets
    /// setup guidance instead of a generic failure message
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StorefrontError::ProcessorNotConfigured(_) | StorefrontError::Configuration(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StorefrontError::Configuration(_) => 500,
            StorefrontError::Validation(_) => 400,
            StorefrontError::InvalidCredentials => 401,
            StorefrontError::NotAuthenticated => 401,
            StorefrontError::EmailTaken { .. } => 409,
            StorefrontError::ProductNotFound { .. } => 404,
            StorefrontError::InsufficientStock { .. } => 409,
            StorefrontError::EmptyCart => 400,
            StorefrontError::IncompatibleRegion { .. } => 422,
            StorefrontError::ProcessorNotConfigured(_) => 503,
            StorefrontError::ProviderError { .. } => 502,
            StorefrontError::RequestFailed { status, .. } => *status,
            StorefrontError::NetworkError(_) => 502,
            StorefrontError::WebhookVerificationFailed(_) => 401,
            StorefrontError::WebhookParseError(_) => 400,
            StorefrontError::Internal(_) => 500,
            StorefrontError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type StorefrontResult<T> = Result<T, StorefrontError>;
