//! # wd-api
//!
//! HTTP backend for the World Distribution storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server with cookie sessions
//! - Buyer accounts with Argon2id password hashes
//! - Catalog, payment intent and order endpoints
//! - Stripe webhook handling
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/auth/me` | Current user (401 without session) |
//! | POST | `/api/auth/login` | Log in |
//! | POST | `/api/auth/register` | Register and log in |
//! | POST | `/api/auth/logout` | Log out |
//! | GET | `/api/products` | List products (`?category=`) |
//! | GET | `/api/products/{id}` | Get product |
//! | GET | `/api/categories` | Category summaries |
//! | POST | `/api/create-payment-intent` | Stripe PaymentIntent |
//! | POST | `/api/webhook` | Stripe webhook |
//! | GET | `/api/orders` | Current user's orders |
//! | POST | `/api/orders` | Place an order |

pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
