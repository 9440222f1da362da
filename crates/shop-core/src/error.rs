//! # Shop Error Types
//!
//! Typed error handling for the storefront core.
//! Validation outcomes of the checkout control are *not* errors; they are
//! rendered as messages. This type covers infrastructure failures only.

use thiserror::Error;

/// Core error type for catalog, cart, and redirect operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Cart session not found
    #[error("Cart not found: {cart_id}")]
    CartNotFound { cart_id: String },

    /// Negative or otherwise unusable amount
    #[error("Invalid price: {message}")]
    InvalidPrice { message: String },

    /// Quantity of zero passed to an add/decrement operation
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// Product currency differs from the cart currency
    #[error("Currency mismatch: cart is {expected}, product is {found}")]
    CurrencyMismatch { expected: String, found: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Hosted checkout provider returned an unusable response
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_) | ShopError::ProviderError { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::CartNotFound { .. } => 404,
            ShopError::InvalidPrice { .. } => 400,
            ShopError::InvalidQuantity(_) => 400,
            ShopError::CurrencyMismatch { .. } => 400,
            ShopError::UnsupportedCurrency { .. } => 400,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::NetworkError("timeout".into()).is_retryable());
        assert!(ShopError::ProviderError {
            provider: "stripe".into(),
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(!ShopError::InvalidQuantity(0).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            ShopError::ProductNotFound {
                product_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(
            ShopError::CartNotFound {
                cart_id: "c".into()
            }
            .status_code(),
            404
        );
        assert_eq!(ShopError::NetworkError("down".into()).status_code(), 503);
    }

    #[test]
    fn test_currency_mismatch_message() {
        let err = ShopError::CurrencyMismatch {
            expected: "JPY".into(),
            found: "USD".into(),
        };
        assert_eq!(
            err.to_string(),
            "Currency mismatch: cart is JPY, product is USD"
        );
    }
}
