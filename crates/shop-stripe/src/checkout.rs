//! # Stripe Checkout Sessions
//!
//! Hands the cart to Stripe's hosted checkout page.
//!
//! Stripe answers a session request in three ways, mapped as follows:
//! - 2xx with a session URL: `RedirectResponse::Redirect`
//! - 4xx with a Stripe error body: `RedirectResponse::Rejected`
//! - anything else (transport failure, 5xx, unreadable body): `Err`

use crate::config::StripeConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    CheckoutCart, CheckoutRedirect, RedirectConfig, RedirectResponse, ShopError, ShopResult,
};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe Checkout Session redirect
pub struct StripeCheckoutRedirect {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutRedirect {
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Form-encoded body for `POST /v1/checkout/sessions`
    fn build_form_params(cart: &CheckoutCart, config: &RedirectConfig) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), config.success_url_with_session()),
            ("cancel_url".to_string(), config.cancel_url.clone()),
        ];

        for (i, line) in cart.lines.iter().enumerate() {
            let product = &line.product;
            form_params.push((
                format!("line_items[{}][price_data][currency]", i),
                product.price.currency.as_str().to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                product.price.amount.to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                product.name.clone(),
            ));
            if !product.description.is_empty() {
                form_params.push((
                    format!("line_items[{}][price_data][product_data][description]", i),
                    product.description.clone(),
                ));
            }
            if let Some(ref image) = product.image_url {
                form_params.push((
                    format!("line_items[{}][price_data][product_data][images][0]", i),
                    image.clone(),
                ));
            }
            form_params.push((
                format!("line_items[{}][price_data][product_data][metadata][product_id]", i),
                product.id.clone(),
            ));
            form_params.push((
                format!("line_items[{}][quantity]", i),
                line.quantity.to_string(),
            ));
        }

        for (j, country) in config.allowed_countries.iter().enumerate() {
            form_params.push((
                format!("shipping_address_collection[allowed_countries][{}]", j),
                country.clone(),
            ));
        }

        form_params
    }
}

#[async_trait]
impl CheckoutRedirect for StripeCheckoutRedirect {
    #[instrument(skip(self, cart, config), fields(lines = cart.lines.len()))]
    async fn redirect_to_checkout(
        &self,
        cart: &CheckoutCart,
        config: &RedirectConfig,
    ) -> ShopResult<RedirectResponse> {
        if cart.is_empty() {
            return Err(ShopError::InvalidRequest("Cart has no items".to_string()));
        }
        if cart.currency != config.currency {
            return Err(ShopError::CurrencyMismatch {
                expected: config.currency.to_string(),
                found: cart.currency.to_string(),
            });
        }

        let form_params = Self::build_form_params(cart, config);
        debug!(
            "Creating Stripe checkout session: {} lines, total={}",
            cart.lines.len(),
            cart.total().display()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if status.is_client_error() {
            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                info!(
                    code = ?error_response.error.code,
                    "Stripe declined checkout session: {}",
                    error_response.error.message
                );
                return Ok(RedirectResponse::Rejected {
                    error: error_response.error.message,
                });
            }
        }

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(ShopError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        let url = session.url.ok_or_else(|| ShopError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("session {} has no checkout url", session.id),
        })?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(RedirectResponse::Redirect {
            url,
            session_id: Some(session.id),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}
