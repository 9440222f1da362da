//! Product card: a catalog entry plus its quantity selector.

use crate::cart::{CartLine, CartStore};
use crate::error::ShopResult;
use crate::product::Product;
use crate::quantity::QuantitySelector;
use serde::Serialize;
use tracing::debug;

/// Render data for a product card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCardView {
    pub product_id: String,
    pub name: String,
    pub emoji: String,
    pub price: String,
    pub quantity: u32,
    pub can_decrement: bool,
}

/// A product card with its own transient quantity.
#[derive(Debug, Clone)]
pub struct ProductCard<'a> {
    product: &'a Product,
    selector: QuantitySelector,
}

impl<'a> ProductCard<'a> {
    pub fn new(product: &'a Product) -> Self {
        Self::with_selector(product, QuantitySelector::new())
    }

    /// Resume a card whose selector state lives elsewhere (e.g. a session)
    pub fn with_selector(product: &'a Product, selector: QuantitySelector) -> Self {
        Self { product, selector }
    }

    pub fn product(&self) -> &Product {
        self.product
    }

    pub fn selector(&self) -> QuantitySelector {
        self.selector
    }

    pub fn quantity(&self) -> u32 {
        self.selector.value()
    }

    pub fn increment(&mut self) -> u32 {
        self.selector.increment()
    }

    pub fn decrement(&mut self) -> u32 {
        self.selector.decrement()
    }

    /// Add the selected quantity to the cart, then reset the selector to 1.
    ///
    /// On error the selector keeps its value.
    pub fn add_to_cart<'s, S>(&mut self, store: &'s mut S) -> ShopResult<&'s CartLine>
    where
        S: CartStore + ?Sized,
    {
        let count = self.selector.value();
        let line = store.add_item(self.product, count)?;
        debug!(
            product_id = %self.product.id,
            count,
            line_quantity = line.quantity,
            "added to cart"
        );
        self.selector.reset();
        Ok(line)
    }

    pub fn view(&self) -> ProductCardView {
        ProductCardView {
            product_id: self.product.id.clone(),
            name: self.product.name.clone(),
            emoji: self.product.emoji.clone(),
            price: self.product.display_price(),
            quantity: self.selector.value(),
            can_decrement: !self.selector.at_floor(),
        }
    }
}
