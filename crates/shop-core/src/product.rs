//! # Product Types
//!
//! Catalog types for the storefront.
//! Products are loaded from `config/products.toml` and never change at runtime.

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Display prefix used by [`format_currency`]
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "￥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF ",
            Currency::MXN => "MX$",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::JPY
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl FromStr for Currency {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Currency::USD),
            "eur" => Ok(Currency::EUR),
            "gbp" => Ok(Currency::GBP),
            "jpy" => Ok(Currency::JPY),
            "cad" => Ok(Currency::CAD),
            "aud" => Ok(Currency::AUD),
            "chf" => Ok(Currency::CHF),
            "mxn" => Ok(Currency::MXN),
            other => Err(ShopError::UnsupportedCurrency {
                currency: other.to_string(),
            }),
        }
    }
}

/// Format an amount given in minor units for display.
///
/// Zero-decimal currencies print the integer amount (`￥1000`); the rest print
/// two decimals (`£0.30`). No digit grouping is applied, so output does not
/// depend on the host locale.
pub fn format_currency(amount: i64, currency: Currency) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let magnitude = amount.unsigned_abs();
    match currency.decimal_places() {
        0 => format!("{}{}{}", sign, currency.symbol(), magnitude),
        _ => format!(
            "{}{}{}.{:02}",
            sign,
            currency.symbol(),
            magnitude / 100,
            magnitude % 100
        ),
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (yen for JPY, pence for GBP)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a price from its minor-unit amount
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Multiply by a quantity, saturating instead of overflowing
    pub fn times(&self, quantity: u32) -> Price {
        Price {
            amount: self.amount.saturating_mul(quantity as i64),
            currency: self.currency,
        }
    }

    /// Format for display (e.g., "￥1000", "£0.30")
    pub fn display(&self) -> String {
        format_currency(self.amount, self.currency)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "fresh-egg")
    pub id: String,

    /// Display name
    pub name: String,

    /// Emoji shown on the card and in the cart row
    #[serde(default)]
    pub emoji: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Unit price
    pub price: Price,

    /// Whether this product is listed
    #[serde(default = "default_true")]
    pub active: bool,

    /// Optional image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Free-form metadata passed through to the cart line
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            emoji: String::new(),
            description: String::new(),
            price,
            active: true,
            image_url: None,
            metadata: HashMap::new(),
        }
    }

    /// Builder: set emoji
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Builder: add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Formatted unit price
    pub fn display_price(&self) -> String {
        self.price.display()
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Builder: add a product
    pub fn with_product(mut self, product: Product) -> Self {
        self.add(product);
        self
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Find an active product or fail with `ProductNotFound`
    pub fn require_active(&self, id: &str) -> ShopResult<&Product> {
        self.get(id)
            .filter(|p| p.active)
            .ok_or_else(|| ShopError::ProductNotFound {
                product_id: id.to_string(),
            })
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load and validate a catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        let catalog: ProductCatalog = toml::from_str(toml_str)
            .map_err(|e| ShopError::Configuration(format!("invalid catalog: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject duplicate ids, empty ids, and negative prices
    pub fn validate(&self) -> ShopResult<()> {
        let mut seen = std::collections::HashSet::new();
        for product in &self.products {
            if product.id.trim().is_empty() {
                return Err(ShopError::Configuration(
                    "product id must not be empty".to_string(),
                ));
            }
            if !seen.insert(product.id.as_str()) {
                return Err(ShopError::Configuration(format!(
                    "duplicate product id: {}",
                    product.id
                )));
            }
            if product.price.amount < 0 {
                return Err(ShopError::InvalidPrice {
                    message: format!("{} has a negative price", product.id),
                });
            }
        }
        Ok(())
    }
}
