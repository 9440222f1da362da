//! # Storefront RS
//!
//! Cart and hosted-checkout server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//!
//! # Run the server
//! storefront
//! ```

use shop_api::{routes, state::AppState};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(fmt::layer))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!(
        "Checkout provider: {} ({}, ships to {:?})",
        state.redirect.provider_name(),
        state.settings.currency,
        state.settings.allowed_countries
    );

    spawn_session_sweeper(&state);

    let app = routes::create_router(state);

    info!("🛒 Storefront starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("🧺 New cart: POST http://{}/api/v1/carts", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop idle cart sessions
fn spawn_session_sweeper(state: &AppState) {
    let sessions = state.sessions.clone();
    let ttl = state.config.session_ttl;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let evicted = sessions.evict_idle(ttl).await;
            if evicted > 0 {
                debug!(evicted, "idle cart sessions dropped");
            }
        }
    });
}

fn print_banner() {
    println!(
        r#"
  🛒 Storefront RS 🛒
  ━━━━━━━━━━━━━━━━━━━━━━━
  Cart and hosted checkout
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
