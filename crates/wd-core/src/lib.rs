//! # wd-core
//!
//! Core types and traits for the World Distribution wholesale storefront.
//!
//! This crate provides:
//! - `VolumeTier` and the volume pricing functions
//! - `Product` and `ProductCatalog` for the catalog
//! - `Cart` and `CartItem` with first-tier-wins merging
//! - `CheckoutRouter` for picking the bank transfer account by region
//! - `AuthSession` for client-side session state
//! - `CheckoutSession` for obtaining one payment intent per checkout
//! - `SettlementStrategy` for card and bank transfer settlement
//! - `StorefrontError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use wd_core::{Cart, CartItem, CheckoutRouter, CheckoutSummary, Currency};
//!
//! // Add 100kg of olive oil at the tier implied by the quantity
//! let mut cart = Cart::new();
//! cart.add_item(CartItem::from_product(&olive_oil, 100));
//!
//! // VAT-inclusive total in cents for the processor
//! let summary = CheckoutSummary::from_cart(&cart, Currency::EUR);
//!
//! // Which account should the buyer wire to?
//! let route = CheckoutRouter::default().route(&user.region, &user.country);
//! let account = route.ensure_compatible(&user.country)?;
//! ```

pub mod account;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod order;
pub mod pricing;
pub mod product;
pub mod session;
pub mod strategy;
pub mod user;

// Re-exports for convenience
pub use account::{
    BankTransferRoute, CheckoutRouter, PaymentAccount, PaymentAccounts, RailType, EU_REGION,
};
pub use cart::{Cart, CartItem};
pub use checkout::{CheckoutSession, CheckoutSummary};
pub use error::{StorefrontError, StorefrontResult};
pub use gateway::{
    AuthBackend, BoxedAuthBackend, BoxedPaymentIntentGateway, PaymentIntent,
    PaymentIntentGateway, PaymentIntentRequest, ProductSource,
};
pub use order::{
    is_payment_intent_id, NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, Settlement,
};
pub use pricing::{
    tier_for_quantity, unit_price, vat_amount, with_vat, PriceQuote, VolumeTier, VAT_RATE,
};
pub use product::{format_money, CategorySummary, Currency, Product, ProductCatalog};
pub use session::{AuthSession, AuthState, RouteAccess};
pub use strategy::{
    BankTransferSettlement, BoxedSettlementStrategy, SettlementContext, SettlementSelector,
    SettlementStrategy,
};
pub use user::{LoginRequest, RegisterRequest, RegistrationForm, User};
