//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Every cart mutation answers with the freshly rendered cart panel, so the
//! client never computes totals on its own.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{
    settle_redirect, CartPanelView, CartStore, CheckoutCart, ClickOutcome, Product,
    ProductCardView, ShopError,
};
use std::collections::HashMap;
use tracing::{error, info, instrument};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Catalog entry as listed on the storefront
#[derive(Debug, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    /// Formatted unit price, e.g. "￥1000"
    pub display_price: String,
}

impl From<&Product> for ProductListing {
    fn from(product: &Product) -> Self {
        Self {
            display_price: product.display_price(),
            product: product.clone(),
        }
    }
}

/// Cart panel response
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_id: Uuid,
    pub panel: CartPanelView,
}

/// Product card response (selector changes)
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub cart_id: Uuid,
    pub card: ProductCardView,
    pub panel: CartPanelView,
}

/// Add a product with an explicit count
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List active products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<ProductListing> = state.catalog.active_products().map(Into::into).collect();
    Json(serde_json::json!({
        "count": products.len(),
        "products": products,
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductListing>, ApiError> {
    let product = state
        .catalog
        .require_active(&product_id)
        .map_err(shop_error_to_response)?;

    Ok(Json(product.into()))
}

/// Open a new cart session
#[instrument(skip(state))]
pub async fn create_cart(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart_id = state
        .sessions
        .create(state.settings.currency, state.settings.limits)
        .await;
    info!(%cart_id, "cart session created");

    let panel = state
        .sessions
        .with_session(cart_id, |session| Ok(session.panel.render(&session.store)))
        .await
        .map_err(shop_error_to_response)?;

    Ok((StatusCode::CREATED, Json(CartResponse { cart_id, panel })))
}

/// Render the cart panel
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let panel = state
        .sessions
        .with_session(cart_id, |session| Ok(session.panel.render(&session.store)))
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartResponse { cart_id, panel }))
}

/// Open or close the cart panel
pub async fn toggle_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let panel = state
        .sessions
        .with_session(cart_id, |session| {
            session.store.toggle_cart();
            Ok(session.panel.render(&session.store))
        })
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartResponse { cart_id, panel }))
}

/// Which selector action a card route performs
#[derive(Debug, Clone, Copy)]
enum CardAction {
    Increment,
    Decrement,
    AddToCart,
}

async fn card_action(
    state: AppState,
    cart_id: Uuid,
    product_id: String,
    action: CardAction,
) -> Result<Json<CardResponse>, ApiError> {
    let catalog = state.catalog.clone();
    let (card, panel) = state
        .sessions
        .with_session(cart_id, |session| {
            let card = session.with_card(&catalog, &product_id, |card, store| {
                match action {
                    CardAction::Increment => {
                        card.increment();
                    }
                    CardAction::Decrement => {
                        card.decrement();
                    }
                    CardAction::AddToCart => {
                        card.add_to_cart(store)?;
                    }
                }
                Ok(card.view())
            })?;
            Ok((card, session.panel.render(&session.store)))
        })
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CardResponse {
        cart_id,
        card,
        panel,
    }))
}

/// Quantity "+" on a product card
pub async fn increment_quantity(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<CardResponse>, ApiError> {
    card_action(state, cart_id, product_id, CardAction::Increment).await
}

/// Quantity "-" on a product card (never below 1)
pub async fn decrement_quantity(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<CardResponse>, ApiError> {
    card_action(state, cart_id, product_id, CardAction::Decrement).await
}

/// "Add to cart" on a product card: adds the selected quantity, resets to 1
#[instrument(skip(state))]
pub async fn add_card_to_cart(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<CardResponse>, ApiError> {
    card_action(state, cart_id, product_id, CardAction::AddToCart).await
}

/// Add a product with an explicit count
#[instrument(skip(state, request), fields(product_id = %request.product_id, count = request.count))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let catalog = state.catalog.clone();
    let panel = state
        .sessions
        .with_session(cart_id, |session| {
            let product = catalog.require_active(&request.product_id)?;
            session.store.add_item(product, request.count)?;
            Ok(session.panel.render(&session.store))
        })
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartResponse { cart_id, panel }))
}

/// Remove a cart line; removing an absent line is not an error
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<CartResponse>, ApiError> {
    let panel = state
        .sessions
        .with_session(cart_id, |session| {
            if session.store.remove_item(&product_id).is_none() {
                tracing::debug!(%product_id, "remove of absent line");
            }
            Ok(session.panel.render(&session.store))
        })
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartResponse { cart_id, panel }))
}

/// Click "Proceed to checkout".
///
/// The session lock is released while the provider is called, so the cart
/// can change in the meantime; a result arriving after the checkout control
/// was torn down is dropped by the panel.
#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let (click, cart) = state
        .sessions
        .with_session(cart_id, |session| {
            let click = session.panel.click_checkout(&session.store);
            Ok((click, CheckoutCart::from_store(&session.store)))
        })
        .await
        .map_err(shop_error_to_response)?;

    let settled = match click {
        ClickOutcome::Started(ticket) => {
            let config = state.redirect_config_for(cart_id);
            let outcome = settle_redirect(state.redirect.as_ref(), &cart, &config).await;
            if outcome.is_failed() {
                error!(%cart_id, "checkout redirect failed");
            }
            Some((ticket, outcome))
        }
        ClickOutcome::Rejected(failure) => {
            info!(%cart_id, ?failure, "checkout rejected locally");
            None
        }
        ClickOutcome::Ignored => None,
    };

    let panel = state
        .sessions
        .with_session(cart_id, |session| {
            if let Some((ticket, outcome)) = settled {
                session.panel.settle_checkout(ticket, outcome);
            }
            Ok(session.panel.render(&session.store))
        })
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartResponse { cart_id, panel }))
}

/// The customer is back from the hosted checkout page: give the cart a fresh
/// checkout control. Unknown or missing cart ids are ignored.
async fn return_from_checkout(state: &AppState, params: &HashMap<String, String>) {
    let Some(cart_id) = params.get("cart_id").and_then(|id| id.parse::<Uuid>().ok()) else {
        return;
    };
    match state
        .sessions
        .with_session(cart_id, |session| Ok(session.panel.remount()))
        .await
    {
        Ok(remounted) => info!(%cart_id, remounted, "returned from hosted checkout"),
        Err(e) => tracing::debug!(%cart_id, "return for unknown cart: {}", e),
    }
}

/// Checkout success page
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    return_from_checkout(&state, &params).await;
    let session_id = params
        .get("session_id")
        .map(|s| s.as_str())
        .unwrap_or("unknown");
    Html(format!(
        r#"
<!DOCTYPE html>
<html>
<head>
<title>Thank you</title>
<style>
    body {{ font-family: system-ui; display: flex; justify-content: center; align-items: center;
           height: 100vh; margin: 0; background: #f0fdf4; }}
    .card {{ background: white; padding: 60px; border-radius: 16px; text-align: center; }}
</style>
</head>
<body>
    <div class="card">
        <div style="font-size: 60px;">🛍️</div>
        <h1>Thank you for your order!</h1>
        <p>Reference: <code>{}</code></p>
    </div>
</body>
</html>
"#,
        html_escape(session_id)
    ))
}

/// Checkout cancel page
pub async fn checkout_cancel(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    return_from_checkout(&state, &params).await;
    Html(
        r#"
<!DOCTYPE html>
<html>
<head>
<title>Checkout cancelled</title>
<style>
    body { font-family: system-ui; display: flex; justify-content: center; align-items: center;
           height: 100vh; margin: 0; background: #f0fdf4; }
    .card { background: white; padding: 60px; border-radius: 16px; text-align: center; }
</style>
</head>
<body>
    <div class="card">
        <h1>Checkout cancelled</h1>
        <p style="color: #666;">Your basket is still waiting for you.</p>
        <p><a href="/">Back to the shop</a></p>
    </div>
</body>
</html>
"#,
    )
}

fn html_escape(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            other => other.to_string(),
        })
        .collect()
}
