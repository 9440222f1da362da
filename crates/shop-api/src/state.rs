//! # Application State
//!
//! Shared state for the Axum application: catalog, checkout redirect,
//! checkout limits, and the per-visitor cart sessions.

use chrono::{DateTime, Duration, Utc};
use shop_core::{
    BoxedCheckoutRedirect, CartPanel, CheckoutLimits, Currency, MemoryCartStore, ProductCard,
    ProductCatalog, QuantitySelector, RedirectConfig, ShopError, ShopResult,
};
use shop_stripe::StripeCheckoutRedirect;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for checkout callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Idle time after which a cart session is dropped
    pub session_ttl: Duration,
}

impl AppConfig {
    /// Load from environment variables
    ///
    /// `SESSION_TTL_MINUTES` must be a positive number of minutes (default 60).
    pub fn from_env() -> ShopResult<Self> {
        dotenvy::dotenv().ok();

        let ttl_minutes: i64 = parse_env("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES)?;

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("PORT", 8080)?,
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            session_ttl: session_ttl(ttl_minutes)?,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e)
            })
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
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            environment: "development".to_string(),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
        }
    }
}

const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

fn session_ttl(minutes: i64) -> ShopResult<Duration> {
    Duration::try_minutes(minutes)
        .filter(|ttl| *ttl > Duration::zero())
        .ok_or_else(|| {
            ShopError::Configuration(format!(
                "SESSION_TTL_MINUTES must be a positive number of minutes: {}",
                minutes
            ))
        })
}

/// Shop-level settings: currency, shipping countries, checkout limits
#[derive(Debug, Clone)]
pub struct ShopSettings {
    pub currency: Currency,
    pub allowed_countries: Vec<String>,
    pub limits: CheckoutLimits,
}

impl ShopSettings {
    /// Load from environment variables
    ///
    /// - `SHOP_CURRENCY` (default `jpy`)
    /// - `SHOP_ALLOWED_COUNTRIES`, comma separated (default `JP`)
    /// - `CHECKOUT_MIN_TOTAL` (default 30), `CHECKOUT_MAX_ITEMS` (default 20)
    /// - `CHECKOUT_MIN_TOTAL_CURRENCY` (default `gbp`)
    pub fn from_env() -> ShopResult<Self> {
        dotenvy::dotenv().ok();
        let defaults = CheckoutLimits::default();

        let currency = match std::env::var("SHOP_CURRENCY") {
            Ok(code) => code.parse()?,
            Err(_) => Currency::JPY,
        };
        let min_total_currency = match std::env::var("CHECKOUT_MIN_TOTAL_CURRENCY") {
            Ok(code) => code.parse()?,
            Err(_) => defaults.min_total_currency,
        };
        let allowed_countries = std::env::var("SHOP_ALLOWED_COUNTRIES")
            .unwrap_or_else(|_| "JP".to_string())
            .split(',')
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(Self {
            currency,
            allowed_countries,
            limits: CheckoutLimits {
                min_total: parse_env("CHECKOUT_MIN_TOTAL", defaults.min_total)?,
                max_items: parse_env("CHECKOUT_MAX_ITEMS", defaults.max_items)?,
                min_total_currency,
            },
        })
    }
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            currency: Currency::JPY,
            allowed_countries: vec!["JP".to_string()],
            limits: CheckoutLimits::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> ShopResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| {
                ShopError::Configuration(format!("{} is not a valid number: {}", key, raw))
            }),
        Err(_) => Ok(default),
    }
}

/// One visitor's cart plus the transient UI state around it
#[derive(Debug)]
pub struct CartSession {
    pub store: MemoryCartStore,
    pub panel: CartPanel,
    /// Quantity selectors keyed by product id; absent means 1
    pub selectors: HashMap<String, QuantitySelector>,
    pub last_seen: DateTime<Utc>,
}

impl CartSession {
    pub fn new(currency: Currency, limits: CheckoutLimits) -> Self {
        Self {
            store: MemoryCartStore::new(currency),
            panel: CartPanel::new(limits),
            selectors: HashMap::new(),
            last_seen: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    pub fn selector(&self, product_id: &str) -> QuantitySelector {
        self.selectors.get(product_id).copied().unwrap_or_default()
    }

    /// Run `f` against a product card bound to this session's selector
    pub fn with_card<T>(
        &mut self,
        catalog: &ProductCatalog,
        product_id: &str,
        f: impl FnOnce(&mut ProductCard<'_>, &mut MemoryCartStore) -> ShopResult<T>,
    ) -> ShopResult<T> {
        let product = catalog.require_active(product_id)?;
        let mut card = ProductCard::with_selector(product, self.selector(product_id));
        let result = f(&mut card, &mut self.store);
        self.selectors.insert(product_id.to_string(), card.selector());
        result
    }
}

/// All live cart sessions
#[derive(Clone, Default)]
pub struct CartSessions {
    inner: Arc<Mutex<HashMap<Uuid, CartSession>>>,
}

impl CartSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session and return its id
    pub async fn create(&self, currency: Currency, limits: CheckoutLimits) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .lock()
            .await
            .insert(id, CartSession::new(currency, limits));
        id
    }

    /// Run `f` with exclusive access to one session.
    ///
    /// The lock is released when `f` returns; never hold it across I/O.
    pub async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut CartSession) -> ShopResult<T>,
    ) -> ShopResult<T> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(&id).ok_or_else(|| ShopError::CartNotFound {
            cart_id: id.to_string(),
        })?;
        session.touch();
        f(session)
    }

    /// Drop sessions idle for longer than `ttl`; returns how many were dropped
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.inner.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen >= cutoff);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Hosted checkout provider
    pub redirect: BoxedCheckoutRedirect,
    /// Success/cancel URLs and shipping countries passed to the provider
    pub redirect_config: RedirectConfig,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Currency and checkout limits
    pub settings: ShopSettings,
    /// Live carts
    pub sessions: CartSessions,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the Stripe redirect
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load app config: {}", e))?;
        let settings = ShopSettings::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load shop settings: {}", e))?;

        let catalog = load_product_catalog()?;

        let stripe = StripeCheckoutRedirect::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self::from_parts(config, settings, catalog, Arc::new(stripe)))
    }

    /// Assemble state from explicit parts (tests, alternative providers)
    pub fn from_parts(
        config: AppConfig,
        settings: ShopSettings,
        catalog: ProductCatalog,
        redirect: BoxedCheckoutRedirect,
    ) -> Self {
        let redirect_config = RedirectConfig::new(&config.base_url, settings.currency)
            .with_allowed_countries(settings.allowed_countries.clone());

        Self {
            redirect,
            redirect_config,
            catalog: Arc::new(catalog),
            settings,
            sessions: CartSessions::new(),
            config,
        }
    }

    /// Provider settings for one cart. The return URLs carry the cart id so
    /// the success and cancel pages can give the cart a fresh checkout control.
    pub fn redirect_config_for(&self, cart_id: Uuid) -> RedirectConfig {
        let success = with_query(&self.redirect_config.success_url, "cart_id", &cart_id);
        let cancel = with_query(&self.redirect_config.cancel_url, "cart_id", &cart_id);
        self.redirect_config
            .clone()
            .with_success_url(success)
            .with_cancel_url(cancel)
    }
}

fn with_query(url: &str, key: &str, value: &impl std::fmt::Display) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, sep, key, value)
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}
