//! # World Distribution
//!
//! Wholesale storefront backend.
//!
//! ## Usage
//!
//! ```bash
//! # Optional: enable card payments
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! # JSON logs
//! export LOG_FORMAT=json
//!
//! # Run the server
//! world-distribution
//! ```

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wd_api::{routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with((!json_logs).then(fmt::layer))
        .with(json_logs.then(|| fmt::layer().json()))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::from_env().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.len());
    info!("Payment methods: {:?}", state.payment_methods());
    info!("Allowed origins: {:?}", state.config.allowed_origins);

    let app = routes::create_router(state);

    info!("World Distribution API listening on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Demo login: demo@restaurant.com / demo123");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  World Distribution
  ━━━━━━━━━━━━━━━━━━━━━━━
  Wholesale storefront API
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
