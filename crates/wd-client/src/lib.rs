//! # wd-client
//!
//! Buyer-side client for the World Distribution backend.
//!
//! - [`BackendClient`]: reqwest client with a cookie jar, implementing
//!   `AuthBackend`, `PaymentIntentGateway` and `ProductSource`
//! - [`Storefront`]: auth session, cart and checkout for one buyer
//!
//! ## Example
//!
//! ```rust,ignore
//! use wd_client::Storefront;
//! use wd_core::PaymentMethod;
//!
//! let mut shop = Storefront::from_env()?;
//! shop.login("demo@restaurant.com", "demo123").await?;
//!
//! let products = shop.products(Some("Food Commodities")).await?;
//! shop.add_to_cart(&products[0], 500);
//! println!("Total: {}", shop.summary().display_total());
//!
//! let order = shop.place_order(PaymentMethod::Bank).await?;
//! ```

pub mod client;
pub mod config;
pub mod storefront;

pub use client::BackendClient;
pub use config::ClientConfig;
pub use storefront::Storefront;
