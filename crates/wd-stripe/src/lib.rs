//! # wd-stripe
//!
//! Stripe integration for the World Distribution storefront.
//!
//! This crate provides:
//!
//! 1. **StripePaymentIntents** - PaymentIntents API
//!    - Creates an intent per checkout for in-page card confirmation
//!    - Implements `PaymentIntentGateway`
//!
//! 2. **StripeCardSettlement** - card settlement strategy
//!    - Re-checks the intent status and amount before an order is recorded
//!
//! 3. **WebhookVerifier** - `Stripe-Signature` verification and event parsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wd_stripe::StripePaymentIntents;
//! use wd_core::{Currency, PaymentIntentGateway, PaymentIntentRequest};
//!
//! let gateway = StripePaymentIntents::from_env()?;
//! let intent = gateway
//!     .create_payment_intent(&PaymentIntentRequest::new(535500, Currency::EUR))
//!     .await?;
//!
//! // Hand intent.client_secret to the browser
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use wd_stripe::{dispatch_webhook_event, LoggingWebhookHandler, WebhookVerifier};
//!
//! let verifier = WebhookVerifier::new(webhook_secret);
//! let event = verifier.verify(payload, signature)?;
//! dispatch_webhook_event(&LoggingWebhookHandler, &event)?;
//! ```

pub mod config;
pub mod intent;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use intent::{StripeCardSettlement, StripePaymentIntent, StripePaymentIntents};
pub use webhook::{
    dispatch_webhook_event, LoggingWebhookHandler, WebhookEvent, WebhookEventType,
    WebhookHandler, WebhookVerifier, REQUIRED_WEBHOOK_EVENTS,
};
