//! # Cart Types
//!
//! The cart is a mapping from product id to [`CartLine`]. Totals are never
//! stored; [`CartTotals::aggregate`] recomputes them from the line set on
//! every call so they cannot drift.
//!
//! Components never reach for a global cart. They receive a `&mut impl
//! CartStore` (or `&dyn CartStore`) from whoever owns it.

use crate::error::{ShopError, ShopResult};
use crate::product::{Currency, Price, Product};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aggregated (product, quantity) entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Snapshot of the catalog entry at the time of the first add
    pub product: Product,
    /// Always >= 1 while the line exists
    pub quantity: u32,
}

impl CartLine {
    pub fn id(&self) -> &str {
        &self.product.id
    }

    pub fn unit_price(&self) -> Price {
        self.product.price
    }

    /// Unit price times quantity
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Derived cart totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of unit price x quantity, in minor units
    pub total_price: Price,
    /// Sum of quantities
    pub total_count: u32,
}

impl CartTotals {
    /// Reduce a line set into totals
    pub fn aggregate<'a, I>(lines: I, currency: Currency) -> Self
    where
        I: IntoIterator<Item = &'a CartLine>,
    {
        let (amount, count) = lines.into_iter().fold((0i64, 0u32), |(amount, count), line| {
            (
                amount.saturating_add(line.line_total().amount),
                count.saturating_add(line.quantity),
            )
        });
        Self {
            total_price: Price::new(amount, currency),
            total_count: count,
        }
    }

    pub fn empty(currency: Currency) -> Self {
        Self {
            total_price: Price::zero(currency),
            total_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// Interface to the authoritative cart state.
///
/// Mirrors the operations a browser cart library exposes: add with a count,
/// remove by id, read details and totals, and a presentational display flag.
pub trait CartStore {
    /// Currency every line must share
    fn currency(&self) -> Currency;

    /// Add `count` units of `product`, merging with an existing line.
    /// Zero counts, foreign currencies and negative prices are rejected.
    fn add_item(&mut self, product: &Product, count: u32) -> ShopResult<&CartLine>;

    /// Remove the whole line. Absent ids return `None`.
    fn remove_item(&mut self, id: &str) -> Option<CartLine>;

    /// Lower a line's quantity, destroying it when it would reach 0.
    /// Returns the remaining quantity, or `None` when no line remains.
    fn decrement_item(&mut self, id: &str, count: u32) -> ShopResult<Option<u32>>;

    /// Drop every line
    fn clear_cart(&mut self);

    /// All lines keyed by product id
    fn cart_details(&self) -> &BTreeMap<String, CartLine>;

    fn should_display_cart(&self) -> bool;

    fn set_display_cart(&mut self, visible: bool);

    fn line(&self, id: &str) -> Option<&CartLine> {
        self.cart_details().get(id)
    }

    fn toggle_cart(&mut self) {
        let visible = !self.should_display_cart();
        self.set_display_cart(visible);
    }

    fn totals(&self) -> CartTotals {
        CartTotals::aggregate(self.cart_details().values(), self.currency())
    }

    fn cart_count(&self) -> u32 {
        self.totals().total_count
    }

    fn total_price(&self) -> Price {
        self.totals().total_price
    }
}

/// In-memory cart, serialisable so it can be written to browser storage.
///
/// The display flag is skipped on (de)serialisation: a restored cart always
/// starts closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCartStore {
    currency: Currency,
    #[serde(default)]
    lines: BTreeMap<String, CartLine>,
    #[serde(skip)]
    display: bool,
}

impl MemoryCartStore {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            lines: BTreeMap::new(),
            display: false,
        }
    }

    /// Serialise for local/session storage
    pub fn to_json(&self) -> ShopResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore from local/session storage, dropping any corrupt lines
    pub fn from_json(json: &str) -> ShopResult<Self> {
        let mut store: MemoryCartStore = serde_json::from_str(json)?;
        let currency = store.currency;
        store.lines.retain(|id, line| {
            line.quantity > 0
                && *id == line.product.id
                && line.product.price.currency == currency
                && line.product.price.amount >= 0
        });
        Ok(store)
    }
}

impl CartStore for MemoryCartStore {
    fn currency(&self) -> Currency {
        self.currency
    }

    fn add_item(&mut self, product: &Product, count: u32) -> ShopResult<&CartLine> {
        if count == 0 {
            return Err(ShopError::InvalidQuantity(count));
        }
        if product.price.currency != self.currency {
            return Err(ShopError::CurrencyMismatch {
                expected: self.currency.to_string(),
                found: product.price.currency.to_string(),
            });
        }
        if product.price.amount < 0 {
            return Err(ShopError::InvalidPrice {
                message: format!("{} has a negative price", product.id),
            });
        }

        let line = self
            .lines
            .entry(product.id.clone())
            .and_modify(|line| line.quantity = line.quantity.saturating_add(count))
            .or_insert_with(|| CartLine {
                product: product.clone(),
                quantity: count,
            });
        Ok(line)
    }

    fn remove_item(&mut self, id: &str) -> Option<CartLine> {
        self.lines.remove(id)
    }

    fn decrement_item(&mut self, id: &str, count: u32) -> ShopResult<Option<u32>> {
        if count == 0 {
            return Err(ShopError::InvalidQuantity(count));
        }
        let Some(line) = self.lines.get_mut(id) else {
            return Ok(None);
        };
        if line.quantity <= count {
            self.lines.remove(id);
            return Ok(None);
        }
        line.quantity -= count;
        Ok(Some(line.quantity))
    }

    fn clear_cart(&mut self) {
        self.lines.clear();
    }

    fn cart_details(&self) -> &BTreeMap<String, CartLine> {
        &self.lines
    }

    fn should_display_cart(&self) -> bool {
        self.display
    }

    fn set_display_cart(&mut self, visible: bool) {
        self.display = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apple() -> Product {
        Product::new("apple", "Apple", Price::new(1000, Currency::JPY)).with_emoji("🍎")
    }

    fn banana() -> Product {
        Product::new("banana", "Banana", Price::new(500, Currency::JPY)).with_emoji("🍌")
    }

    #[test]
    fn test_repeat_adds_merge_into_one_line() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        store.add_item(&apple(), 2).unwrap();
        let line = store.add_item(&apple(), 3).unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(store.cart_details().len(), 1);
        assert_eq!(store.cart_count(), 5);
    }

    #[test]
    fn test_totals_follow_line_set() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        store.add_item(&apple(), 3).unwrap();
        store.add_item(&banana(), 2).unwrap();

        let totals = store.totals();
        assert_eq!(totals.total_price.amount, 4000);
        assert_eq!(totals.total_count, 5);

        store.remove_item("apple");
        let totals = store.totals();
        assert_eq!(totals.total_price.amount, 1000);
        assert_eq!(totals.total_count, 2);
    }

    #[test]
    fn test_aggregate_matches_manual_sums() {
        let lines: Vec<CartLine> = (1..=6)
            .map(|i| CartLine {
                product: Product::new(format!("p{}", i), "P", Price::new(i * 110, Currency::JPY)),
                quantity: i as u32,
            })
            .collect();
        let totals = CartTotals::aggregate(&lines, Currency::JPY);

        let expected_amount: i64 = lines
            .iter()
            .map(|l| l.unit_price().amount * l.quantity as i64)
            .sum();
        let expected_count: u32 = lines.iter().map(|l| l.quantity).sum();
        assert_eq!(totals.total_price.amount, expected_amount);
        assert_eq!(totals.total_count, expected_count);
        assert!(CartTotals::aggregate(&[], Currency::JPY).is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        assert!(store.remove_item("ghost").is_none());
        store.add_item(&apple(), 1).unwrap();
        assert!(store.remove_item("apple").is_some());
        assert!(store.remove_item("apple").is_none());
        assert!(store.totals().is_empty());
    }

    #[test]
    fn test_decrement_destroys_line_at_zero() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        store.add_item(&apple(), 3).unwrap();

        assert_eq!(store.decrement_item("apple", 1).unwrap(), Some(2));
        assert_eq!(store.decrement_item("apple", 5).unwrap(), None);
        assert!(store.line("apple").is_none());
        assert_eq!(store.decrement_item("apple", 1).unwrap(), None);
        assert!(store.decrement_item("apple", 0).is_err());
    }

    #[test]
    fn test_add_rejects_zero_and_foreign_currency() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        assert!(matches!(
            store.add_item(&apple(), 0),
            Err(ShopError::InvalidQuantity(0))
        ));

        let dollars = Product::new("usd", "Dollar item", Price::new(100, Currency::USD));
        assert!(matches!(
            store.add_item(&dollars, 1),
            Err(ShopError::CurrencyMismatch { .. })
        ));

        let refund = Product::new("refund", "Refund", Price::new(-5000, Currency::JPY));
        assert!(matches!(
            store.add_item(&refund, 1),
            Err(ShopError::InvalidPrice { .. })
        ));
        assert!(store.cart_details().is_empty());
    }

    #[test]
    fn test_display_flag_toggles() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        assert!(!store.should_display_cart());
        store.toggle_cart();
        assert!(store.should_display_cart());
        store.toggle_cart();
        assert!(!store.should_display_cart());
    }

    #[test]
    fn test_json_roundtrip_keeps_lines_and_closes_panel() {
        let mut store = MemoryCartStore::new(Currency::JPY);
        store.add_item(&apple(), 2).unwrap();
        store.set_display_cart(true);

        let restored = MemoryCartStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.cart_count(), 2);
        assert!(!restored.should_display_cart());
    }

    #[test]
    fn test_from_json_drops_corrupt_lines() {
        let json = r#"{
            "currency": "jpy",
            "lines": {
                "apple": {
                    "product": {
                        "id": "apple",
                        "name": "Apple",
                        "price": {"amount": 1000, "currency": "jpy"}
                    },
                    "quantity": 0
                },
                "pear": {
                    "product": {
                        "id": "pear",
                        "name": "Pear",
                        "price": {"amount": 200, "currency": "jpy"}
                    },
                    "quantity": 2
                },
                "refund": {
                    "product": {
                        "id": "refund",
                        "name": "Refund",
                        "price": {"amount": -5000, "currency": "jpy"}
                    },
                    "quantity": 1
                }
            }
        }"#;
        let store = MemoryCartStore::from_json(json).unwrap();
        assert_eq!(store.cart_details().len(), 1);
        assert_eq!(store.total_price().amount, 400);
        assert!(store.total_price().amount >= 0);
        assert!(MemoryCartStore::from_json("not json").is_err());
    }
}
