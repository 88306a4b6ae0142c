//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the catalog, settlement strategies, stores and configuration.

use crate::store::{seed_demo_users, OrderStore, UserStore};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use wd_core::{
    BankTransferSettlement, BoxedPaymentIntentGateway, CheckoutRouter, PaymentAccounts,
    ProductCatalog, SettlementSelector, StorefrontError,
};
use wd_stripe::{StripeCardSettlement, StripeConfig, StripePaymentIntents, WebhookVerifier};

/// Catalog used when no products file is found
const BUILTIN_CATALOG: &str = include_str!("../../../config/products.toml");

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Browser origins allowed to make credentialed requests
    pub allowed_origins: Vec<String>,
    /// Explicit products file, otherwise `config/products.toml` is searched for
    pub products_path: Option<String>,
    /// Explicit settlement accounts file, otherwise `config/accounts.toml`
    pub accounts_path: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            products_path: std::env::var("PRODUCTS_PATH").ok(),
            accounts_path: std::env::var("ACCOUNTS_PATH").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            environment: "development".to_string(),
            allowed_origins: parse_origins(DEFAULT_ALLOWED_ORIGINS),
            products_path: None,
            accounts_path: None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Enabled settlement strategies (bank always, card when Stripe is configured)
    pub settlements: SettlementSelector,
    /// Payment intent gateway, absent when Stripe is not configured
    pub payments: Option<BoxedPaymentIntentGateway>,
    /// Webhook signature verifier, absent without a webhook secret
    pub webhook: Option<WebhookVerifier>,
    pub users: UserStore,
    pub orders: OrderStore,
}

impl AppState {
    /// State with bank transfer only and empty stores
    pub fn new(config: AppConfig, catalog: ProductCatalog, accounts: PaymentAccounts) -> Self {
        let settlements = SettlementSelector::new().with_strategy(Arc::new(
            BankTransferSettlement::new(CheckoutRouter::new(accounts)),
        ));

        Self {
            config,
            catalog: Arc::new(catalog),
            settlements,
            payments: None,
            webhook: None,
            users: UserStore::new(),
            orders: OrderStore::new(),
        }
    }

    /// Load everything from the environment and config files
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let catalog = load_product_catalog(config.products_path.as_deref())?;
        let accounts = load_payment_accounts(config.accounts_path.as_deref())?;
        let mut state = Self::new(config, catalog, accounts);

        // A missing Stripe key is not fatal; card endpoints answer 503
        match StripeConfig::from_env() {
            Ok(stripe) => state = state.with_stripe(stripe)?,
            Err(StorefrontError::ProcessorNotConfigured(reason)) => {
                warn!("Card payments disabled: {}", reason);
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to initialize Stripe: {}", e)),
        }

        if !state.config.is_production() {
            seed_demo_users(&state.users)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to seed demo users: {}", e))?;
        }

        Ok(state)
    }

    /// Enable card payments and (if a secret is set) webhooks
    pub fn with_stripe(mut self, stripe: StripeConfig) -> anyhow::Result<Self> {
        if let Some(ref secret) = stripe.webhook_secret {
            self.webhook = Some(WebhookVerifier::new(secret.clone()));
        } else {
            warn!("STRIPE_WEBHOOK_SECRET not set; webhooks will be rejected");
        }

        let mode = if stripe.is_live_mode() { "live" } else { "test" };
        let intents = Arc::new(
            StripePaymentIntents::new(stripe)
                .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?,
        );

        self.settlements
            .register(Arc::new(StripeCardSettlement::new(intents.clone())));
        self.payments = Some(intents as BoxedPaymentIntentGateway);
        info!("Stripe enabled ({} mode)", mode);
        Ok(self)
    }

    /// Builder: use a specific payment intent gateway
    pub fn with_payment_gateway(mut self, gateway: BoxedPaymentIntentGateway) -> Self {
        self.payments = Some(gateway);
        self
    }

    /// Builder: accept webhooks signed with `secret`
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook = Some(WebhookVerifier::new(secret));
        self
    }

    /// Names of the enabled payment methods, for the startup log
    pub fn payment_methods(&self) -> Vec<&'static str> {
        [wd_core::PaymentMethod::Card, wd_core::PaymentMethod::Bank]
            .into_iter()
            .filter(|m| self.settlements.has_method(*m))
            .map(|m| m.as_str())
            .collect()
    }
}

/// Locate a config file: an explicit path must exist, otherwise the usual
/// relative locations are tried.
fn find_config_file(explicit: Option<&str>, name: &str) -> anyhow::Result<Option<(String, String)>> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
        return Ok(Some((path.to_string(), content)));
    }

    let candidates = [
        format!("config/{}", name),
        format!("../config/{}", name),
        format!("../../config/{}", name),
    ];

    for path in candidates {
        if Path::new(&path).is_file() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
            return Ok(Some((path, content)));
        }
    }

    Ok(None)
}

/// Load product catalog from config file, falling back to the built-in seed catalog
pub fn load_product_catalog(explicit: Option<&str>) -> anyhow::Result<ProductCatalog> {
    if let Some((path, content)) = find_config_file(explicit, "products.toml")? {
        let catalog = ProductCatalog::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
        info!("Loaded {} products from {}", catalog.len(), path);
        return Ok(catalog);
    }

    warn!("No product catalog found, using built-in catalog");
    builtin_catalog()
}

/// The seed catalog compiled into the binary
pub fn builtin_catalog() -> anyhow::Result<ProductCatalog> {
    ProductCatalog::from_toml(BUILTIN_CATALOG)
        .map_err(|e| anyhow::anyhow!("Built-in catalog is invalid: {}", e))
}

/// Load settlement accounts from config file, falling back to the defaults
pub fn load_payment_accounts(explicit: Option<&str>) -> anyhow::Result<PaymentAccounts> {
    if let Some((path, content)) = find_config_file(explicit, "accounts.toml")? {
        let accounts = PaymentAccounts::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
        info!("Loaded settlement accounts from {}", path);
        return Ok(accounts);
    }

    Ok(PaymentAccounts::default())
}
