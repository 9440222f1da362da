//! # shop-api
//!
//! HTTP API layer for storefront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the catalog, product cards and cart sessions
//! - The checkout button flow, handing off to a hosted checkout page
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/products/{id}` | Get product |
//! | POST | `/api/v1/carts` | Open cart session |
//! | GET | `/api/v1/carts/{id}` | Render cart panel |
//! | POST | `/api/v1/carts/{id}/toggle` | Show/hide cart panel |
//! | POST | `/api/v1/carts/{id}/items` | Add product with count |
//! | DELETE | `/api/v1/carts/{id}/items/{pid}` | Remove line |
//! | POST | `/api/v1/carts/{id}/products/{pid}/increment` | Quantity + |
//! | POST | `/api/v1/carts/{id}/products/{pid}/decrement` | Quantity - |
//! | POST | `/api/v1/carts/{id}/products/{pid}/add` | Add selected quantity |
//! | POST | `/api/v1/carts/{id}/checkout` | Proceed to checkout |
//! | GET | `/checkout/success` | Success page |
//! | GET | `/checkout/cancel` | Cancel page |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, CartSessions, ShopSettings};
