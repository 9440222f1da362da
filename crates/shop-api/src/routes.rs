//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/products - List active products
///   - GET  /api/v1/products/{id} - Get product by ID
///
/// - Cart:
///   - POST   /api/v1/carts - Open a cart session
///   - GET    /api/v1/carts/{cart_id} - Render the cart panel
///   - POST   /api/v1/carts/{cart_id}/toggle - Show/hide the panel
///   - POST   /api/v1/carts/{cart_id}/items - Add `{product_id, count}`
///   - DELETE /api/v1/carts/{cart_id}/items/{product_id} - Remove a line
///   - POST   /api/v1/carts/{cart_id}/products/{product_id}/increment
///   - POST   /api/v1/carts/{cart_id}/products/{product_id}/decrement
///   - POST   /api/v1/carts/{cart_id}/products/{product_id}/add
///   - POST   /api/v1/carts/{cart_id}/checkout - Proceed to checkout
///
/// - Static pages:
///   - GET /checkout/success - Success page
///   - GET /checkout/cancel - Cancel page
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_routes = Router::new()
        .route("/success", get(handlers::checkout_success))
        .route("/cancel", get(handlers::checkout_cancel));

    let product_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product));

    let card_routes = Router::new()
        .route(
            "/carts/{cart_id}/products/{product_id}/increment",
            post(handlers::increment_quantity),
        )
        .route(
            "/carts/{cart_id}/products/{product_id}/decrement",
            post(handlers::decrement_quantity),
        )
        .route(
            "/carts/{cart_id}/products/{product_id}/add",
            post(handlers::add_card_to_cart),
        );

    let cart_routes = Router::new()
        .route("/carts", post(handlers::create_cart))
        .route("/carts/{cart_id}", get(handlers::get_cart))
        .route("/carts/{cart_id}/toggle", post(handlers::toggle_cart))
        .route("/carts/{cart_id}/items", post(handlers::add_item))
        .route("/carts/{cart_id}/items/{product_id}", delete(handlers::remove_item))
        .route("/carts/{cart_id}/checkout", post(handlers::checkout));

    let api_routes = Router::new()
        .merge(product_routes)
        .merge(cart_routes)
        .merge(card_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
