//! # shop-core
//!
//! Core types for the storefront: catalog, cart, and the checkout control.
//!
//! This crate provides:
//! - `Product`, `Price`, and `format_currency` for the catalog and display
//! - `CartStore` with an in-memory, serialisable `MemoryCartStore`
//! - `ProductCard` / `QuantitySelector` for choosing how many to add
//! - `CartPanel` / `CartItemRow` for rendering the cart
//! - `CheckoutLimits` and `CheckoutControl` gating the checkout button
//! - `CheckoutRedirect` for handing off to a hosted payment page
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartPanel, CartStore, Currency, MemoryCartStore, ProductCard};
//!
//! let mut store = MemoryCartStore::new(Currency::JPY);
//! let mut card = ProductCard::new(&product);
//! card.increment();
//! card.add_to_cart(&mut store)?;
//!
//! let mut panel = CartPanel::default();
//! let view = panel.checkout(&store, redirect.as_ref(), &config).await;
//! ```

pub mod card;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod panel;
pub mod product;
pub mod quantity;
pub mod redirect;

// Re-exports for convenience
pub use card::{ProductCard, ProductCardView};
pub use cart::{CartLine, CartStore, CartTotals, MemoryCartStore};
pub use checkout::{
    AttemptTicket, CheckoutButtonView, CheckoutControl, CheckoutFailure, CheckoutLimits,
    CheckoutPhase, ClickOutcome, Ineligible,
};
pub use error::{ShopError, ShopResult};
pub use panel::{CartContents, CartItemRow, CartPanel, CartPanelView};
pub use product::{format_currency, Currency, Price, Product, ProductCatalog};
pub use quantity::QuantitySelector;
pub use redirect::{
    settle_redirect, BoxedCheckoutRedirect, CheckoutCart, CheckoutRedirect, RedirectConfig,
    RedirectOutcome, RedirectResponse,
};
