//! # Checkout Redirect
//!
//! Boundary to the hosted payment page. A provider answers in one of three
//! ways, mirroring what browser checkout SDKs do:
//!
//! ```text
//! redirect_to_checkout()
//!   ├── Ok(Redirect { url })      navigate away
//!   ├── Ok(Rejected { error })    provider answered with an error value
//!   └── Err(ShopError)            the call itself faulted
//! ```
//!
//! [`RedirectOutcome::from_result`] folds the last two into a single
//! `Failed` so nothing downstream can tell them apart.

use crate::cart::{CartLine, CartStore};
use crate::error::ShopResult;
use crate::product::{Currency, Price};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable copy of the cart handed to a provider.
///
/// Taken before the await so the live cart is never borrowed across it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutCart {
    pub currency: Currency,
    pub lines: Vec<CartLine>,
}

impl CheckoutCart {
    pub fn from_store<S>(store: &S) -> Self
    where
        S: CartStore + ?Sized,
    {
        Self {
            currency: store.currency(),
            lines: store.cart_details().values().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn total(&self) -> Price {
        crate::cart::CartTotals::aggregate(&self.lines, self.currency).total_price
    }
}

/// Pass-through settings for the hosted checkout page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Where the provider sends the customer after paying
    pub success_url: String,
    /// Where the provider sends the customer after backing out
    pub cancel_url: String,
    /// ISO 3166-1 alpha-2 codes accepted for shipping
    #[serde(default)]
    pub allowed_countries: Vec<String>,
    pub currency: Currency,
}

impl RedirectConfig {
    pub fn new(base_url: &str, currency: Currency) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success_url: format!("{}/checkout/success", base),
            cancel_url: format!("{}/checkout/cancel", base),
            allowed_countries: Vec::new(),
            currency,
        }
    }

    /// Builder: set allowed shipping countries
    pub fn with_allowed_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set success URL
    pub fn with_success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = url.into();
        self
    }

    /// Builder: set cancel URL
    pub fn with_cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = url.into();
        self
    }

    /// Success URL carrying the provider's session id placeholder
    pub fn success_url_with_session(&self) -> String {
        if self.success_url.contains('?') {
            format!("{}&session_id={{CHECKOUT_SESSION_ID}}", self.success_url)
        } else {
            format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.success_url)
        }
    }
}

/// What a provider answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedirectResponse {
    /// Navigate the customer to `url`
    Redirect {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// The provider resolved with an error value
    Rejected { error: String },
}

/// Settled redirect attempt, with both failure channels merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RedirectOutcome {
    Navigated { url: String },
    Failed,
}

impl RedirectOutcome {
    /// Normalise a provider result, logging the cause of any failure
    pub fn from_result(provider: &str, result: ShopResult<RedirectResponse>) -> Self {
        match result {
            Ok(RedirectResponse::Redirect { url, session_id }) => {
                info!(provider, session_id = ?session_id, "redirecting to hosted checkout");
                RedirectOutcome::Navigated { url }
            }
            Ok(RedirectResponse::Rejected { error }) => {
                warn!(provider, %error, "hosted checkout rejected the cart");
                RedirectOutcome::Failed
            }
            Err(err) => {
                warn!(provider, error = %err, "hosted checkout call failed");
                RedirectOutcome::Failed
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RedirectOutcome::Failed)
    }
}

/// A hosted checkout provider.
#[async_trait]
pub trait CheckoutRedirect: Send + Sync {
    /// Ask the provider for a hosted checkout page for `cart`.
    async fn redirect_to_checkout(
        &self,
        cart: &CheckoutCart,
        config: &RedirectConfig,
    ) -> ShopResult<RedirectResponse>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type BoxedCheckoutRedirect = Arc<dyn CheckoutRedirect>;

/// Call `redirect` and fold its answer into a [`RedirectOutcome`]
pub async fn settle_redirect(
    redirect: &dyn CheckoutRedirect,
    cart: &CheckoutCart,
    config: &RedirectConfig,
) -> RedirectOutcome {
    let result = redirect.redirect_to_checkout(cart, config).await;
    RedirectOutcome::from_result(redirect.provider_name(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::MemoryCartStore;
    use crate::error::ShopError;
    use crate::product::Product;

    struct Scripted(fn() -> ShopResult<RedirectResponse>);

    #[async_trait]
    impl CheckoutRedirect for Scripted {
        async fn redirect_to_checkout(
            &self,
            _cart: &CheckoutCart,
            _config: &RedirectConfig,
        ) -> ShopResult<RedirectResponse> {
            (self.0)()
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn config() -> RedirectConfig {
        RedirectConfig::new("http://localhost:3000/", Currency::JPY).with_allowed_countries(["JP"])
    }

    #[test]
    fn test_config_urls() {
        let config = config();
        assert_eq!(config.success_url, "http://localhost:3000/checkout/success");
        assert_eq!(config.cancel_url, "http://localhost:3000/checkout/cancel");
        assert_eq!(config.allowed_countries, vec!["JP".to_string()]);
        assert_eq!(
            config.success_url_with_session(),
            "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );

        let with_query = config.with_success_url("https://shop.example/success?ref=cart");
        assert_eq!(
            with_query.success_url_with_session(),
            "https://shop.example/success?ref=cart&session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn test_checkout_cart_snapshot() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        store
            .add_item(&Product::new("a", "A", Price::new(400, Currency::JPY)), 2)
            .unwrap();
        let cart = CheckoutCart::from_store(&store);

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total().amount, 800);
        store.clear_cart();
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_both_failure_channels_collapse() {
        let cart = CheckoutCart {
            currency: Currency::JPY,
            lines: Vec::new(),
        };
        let rejected = Scripted(|| {
            Ok(RedirectResponse::Rejected {
                error: "x".to_string(),
            })
        });
        let faulted = Scripted(|| Err(ShopError::NetworkError("Network error".to_string())));

        let a = settle_redirect(&rejected, &cart, &config()).await;
        let b = settle_redirect(&faulted, &cart, &config()).await;
        assert_eq!(a, RedirectOutcome::Failed);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_success_navigates() {
        let cart = CheckoutCart {
            currency: Currency::JPY,
            lines: Vec::new(),
        };
        let ok = Scripted(|| {
            Ok(RedirectResponse::Redirect {
                url: "https://checkout.stripe.com/c/pay/cs_test".to_string(),
                session_id: Some("cs_test".to_string()),
            })
        });
        let outcome = settle_redirect(&ok, &cart, &config()).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Navigated {
                url: "https://checkout.stripe.com/c/pay/cs_test".to_string()
            }
        );
    }
}
