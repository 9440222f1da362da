//! # shop-stripe
//!
//! Stripe hosted-checkout redirect for storefront-rs.
//!
//! [`StripeCheckoutRedirect`] implements `shop_core::CheckoutRedirect` on top
//! of the Checkout Sessions API: the cart becomes a list of inline
//! `price_data` line items and the customer is sent to the session URL.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeCheckoutRedirect;
//! use shop_core::{settle_redirect, CheckoutCart, RedirectConfig, Currency};
//!
//! let redirect = StripeCheckoutRedirect::from_env()?;
//! let config = RedirectConfig::new("https://shop.example", Currency::JPY)
//!     .with_allowed_countries(["JP"]);
//!
//! let outcome = settle_redirect(&redirect, &CheckoutCart::from_store(&store), &config).await;
//! ```

pub mod checkout;
pub mod config;

// Re-exports
pub use checkout::StripeCheckoutRedirect;
pub use config::StripeConfig;
