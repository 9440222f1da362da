//! # shop-wasm
//!
//! WebAssembly bindings for storefront-rs.
//!
//! Runs the whole cart in the browser: product cards, the cart panel and the
//! checkout button, with the cart persisted to `localStorage`. The hosted
//! checkout call is supplied by the page as a JavaScript function.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmStorefront } from 'storefront-wasm';
//!
//! await init();
//!
//! const shop = new WasmStorefront(catalogJson, {
//!   base_url: window.location.origin,
//!   currency: 'jpy',
//!   allowed_countries: ['JP'],
//! });
//!
//! shop.increment('egg');
//! shop.add_to_cart('egg');
//! render(shop.panel());
//!
//! // redirect(cart, config) may throw, reject, or resolve with { error }
//! const panel = await shop.checkout((cart, config) => stripe.redirectToCheckout(...));
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use serde::{Deserialize, Serialize};
use shop_core::{
    format_currency, CartPanel, CartPanelView, CartStore, CheckoutCart, CheckoutLimits,
    ClickOutcome, Currency, MemoryCartStore, ProductCard, ProductCardView, ProductCatalog,
    QuantitySelector, RedirectConfig, RedirectOutcome, RedirectResponse, ShopError, ShopResult,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

/// `localStorage` key the cart is saved under
pub const STORAGE_KEY: &str = "storefront-cart";

const PROVIDER: &str = "js";

/// Storefront options passed from JavaScript; every field is optional
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorefrontOptions {
    pub base_url: String,
    pub currency: Currency,
    pub allowed_countries: Vec<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub limits: CheckoutLimits,
    /// Skip `localStorage` entirely
    pub ephemeral: bool,
}

impl Default for StorefrontOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            currency: Currency::JPY,
            allowed_countries: vec!["JP".to_string()],
            success_url: None,
            cancel_url: None,
            limits: CheckoutLimits::default(),
            ephemeral: false,
        }
    }
}

impl StorefrontOptions {
    fn redirect_config(&self) -> RedirectConfig {
        let mut config = RedirectConfig::new(&self.base_url, self.currency)
            .with_allowed_countries(self.allowed_countries.clone());
        if let Some(ref url) = self.success_url {
            config = config.with_success_url(url.clone());
        }
        if let Some(ref url) = self.cancel_url {
            config = config.with_cancel_url(url.clone());
        }
        config
    }
}

/// What the page's redirect function resolved with
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsRedirectResult {
    error: Option<String>,
    url: Option<String>,
    session_id: Option<String>,
}

impl From<JsRedirectResult> for RedirectResponse {
    fn from(result: JsRedirectResult) -> Self {
        match result.error {
            Some(error) => RedirectResponse::Rejected { error },
            None => RedirectResponse::Redirect {
                url: result.url.unwrap_or_default(),
                session_id: result.session_id,
            },
        }
    }
}

/// Browser-independent storefront state
#[derive(Debug)]
struct Storefront {
    catalog: ProductCatalog,
    store: MemoryCartStore,
    panel: CartPanel,
    selectors: HashMap<String, QuantitySelector>,
    redirect_config: RedirectConfig,
}

impl Storefront {
    fn new(catalog: ProductCatalog, options: &StorefrontOptions) -> ShopResult<Self> {
        catalog.validate()?;
        if let Some(product) = catalog
            .products
            .iter()
            .find(|p| p.price.currency != options.currency)
        {
            return Err(ShopError::CurrencyMismatch {
                expected: options.currency.to_string(),
                found: product.price.currency.to_string(),
            });
        }

        Ok(Self {
            catalog,
            store: MemoryCartStore::new(options.currency),
            panel: CartPanel::new(options.limits),
            selectors: HashMap::new(),
            redirect_config: options.redirect_config(),
        })
    }

    /// Replace the cart with a saved one; a cart in another currency is ignored
    fn restore(&mut self, json: &str) -> ShopResult<bool> {
        let saved = MemoryCartStore::from_json(json)?;
        if saved.currency() != self.store.currency() {
            return Ok(false);
        }
        let visible = self.store.should_display_cart();
        self.store = saved;
        self.store.set_display_cart(visible);
        Ok(true)
    }

    fn card<T>(
        &mut self,
        product_id: &str,
        f: impl FnOnce(&mut ProductCard<'_>, &mut MemoryCartStore) -> ShopResult<T>,
    ) -> ShopResult<T> {
        let product = self.catalog.require_active(product_id)?;
        let selector = self.selectors.get(product_id).copied().unwrap_or_default();
        let mut card = ProductCard::with_selector(product, selector);
        let result = f(&mut card, &mut self.store);
        self.selectors.insert(product_id.to_string(), card.selector());
        result
    }

    fn card_view(&mut self, product_id: &str) -> ShopResult<ProductCardView> {
        self.card(product_id, |card, _| Ok(card.view()))
    }

    fn increment(&mut self, product_id: &str) -> ShopResult<ProductCardView> {
        self.card(product_id, |card, _| {
            card.increment();
            Ok(card.view())
        })
    }

    fn decrement(&mut self, product_id: &str) -> ShopResult<ProductCardView> {
        self.card(product_id, |card, _| {
            card.decrement();
            Ok(card.view())
        })
    }

    fn add_to_cart(&mut self, product_id: &str) -> ShopResult<ProductCardView> {
        self.card(product_id, |card, store| {
            card.add_to_cart(store)?;
            Ok(card.view())
        })
    }

    fn add_item(&mut self, product_id: &str, count: u32) -> ShopResult<()> {
        let product = self.catalog.require_active(product_id)?;
        self.store.add_item(product, count)?;
        Ok(())
    }

    fn remove_item(&mut self, product_id: &str) {
        self.store.remove_item(product_id);
    }

    fn toggle(&mut self) {
        self.store.toggle_cart();
    }

    fn render(&mut self) -> CartPanelView {
        self.panel.render(&self.store)
    }

    /// Click the button; returns what to send to the page when a redirect starts
    fn begin_checkout(&mut self) -> Option<(shop_core::AttemptTicket, CheckoutCart)> {
        match self.panel.click_checkout(&self.store) {
            ClickOutcome::Started(ticket) => Some((ticket, CheckoutCart::from_store(&self.store))),
            ClickOutcome::Rejected(_) | ClickOutcome::Ignored => None,
        }
    }
}

/// The storefront as seen from JavaScript
#[wasm_bindgen]
pub struct WasmStorefront {
    inner: Rc<RefCell<Storefront>>,
    persist: bool,
}

#[wasm_bindgen]
impl WasmStorefront {
    /// Build from a catalog (`{"products": [...]}`) and optional options
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str, options: JsValue) -> Result<WasmStorefront, JsValue> {
        let options: StorefrontOptions = if options.is_undefined() || options.is_null() {
            StorefrontOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?
        };
        let catalog: ProductCatalog = serde_json::from_str(catalog_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid catalog: {}", e)))?;

        let mut storefront = Storefront::new(catalog, &options).map_err(to_js_error)?;

        let persist = !options.ephemeral;
        if persist {
            if let Some(saved) = load_saved_cart() {
                if let Err(e) = storefront.restore(&saved) {
                    log(&format!("discarding saved cart: {}", e));
                }
            }
        }

        Ok(WasmStorefront {
            inner: Rc::new(RefCell::new(storefront)),
            persist,
        })
    }

    /// Current state of a product card
    pub fn card(&self, product_id: &str) -> Result<JsValue, JsValue> {
        let view = self
            .inner
            .borrow_mut()
            .card_view(product_id)
            .map_err(to_js_error)?;
        to_js(&view)
    }

    pub fn increment(&self, product_id: &str) -> Result<JsValue, JsValue> {
        let view = self
            .inner
            .borrow_mut()
            .increment(product_id)
            .map_err(to_js_error)?;
        to_js(&view)
    }

    pub fn decrement(&self, product_id: &str) -> Result<JsValue, JsValue> {
        let view = self
            .inner
            .borrow_mut()
            .decrement(product_id)
            .map_err(to_js_error)?;
        to_js(&view)
    }

    /// Add the card's selected quantity; the card resets to 1
    pub fn add_to_cart(&self, product_id: &str) -> Result<JsValue, JsValue> {
        let view = self
            .inner
            .borrow_mut()
            .add_to_cart(product_id)
            .map_err(to_js_error)?;
        self.save();
        to_js(&view)
    }

    /// Add `count` of a product directly
    pub fn add_item(&self, product_id: &str, count: u32) -> Result<JsValue, JsValue> {
        self.inner
            .borrow_mut()
            .add_item(product_id, count)
            .map_err(to_js_error)?;
        self.save();
        self.panel()
    }

    pub fn remove_item(&self, product_id: &str) -> Result<JsValue, JsValue> {
        self.inner.borrow_mut().remove_item(product_id);
        self.save();
        self.panel()
    }

    pub fn toggle_cart(&self) -> Result<JsValue, JsValue> {
        self.inner.borrow_mut().toggle();
        self.panel()
    }

    pub fn cart_count(&self) -> u32 {
        self.inner.borrow().store.cart_count()
    }

    /// Render the cart panel
    pub fn panel(&self) -> Result<JsValue, JsValue> {
        let view = self.inner.borrow_mut().render();
        to_js(&view)
    }

    /// Click "Proceed to checkout".
    ///
    /// `redirect(cart, config)` is the page's hosted-checkout call. Throwing,
    /// rejecting, and resolving with `{ error }` all end in the same failure
    /// message. Resolves with the rendered panel.
    pub fn checkout(&self, redirect: js_sys::Function) -> js_sys::Promise {
        let inner = self.inner.clone();

        future_to_promise(async move {
            let started = inner.borrow_mut().begin_checkout();

            if let Some((ticket, cart)) = started {
                let config = inner.borrow().redirect_config.clone();
                let result = call_redirect(&redirect, &cart, &config).await;
                let outcome = RedirectOutcome::from_result(PROVIDER, result);

                let settled = inner.borrow_mut().panel.settle_checkout(ticket, outcome.clone());
                if settled {
                    if let RedirectOutcome::Navigated { ref url } = outcome {
                        navigate(url);
                    }
                }
            }

            let view = inner.borrow_mut().render();
            to_js(&view)
        })
    }

    /// Replace a checkout control left in its redirected state, e.g. when the
    /// page is restored from the back/forward cache.
    pub fn return_from_checkout(&self) -> Result<JsValue, JsValue> {
        self.inner.borrow_mut().panel.remount();
        self.panel()
    }

    /// Empty the cart and forget the saved copy
    pub fn clear(&self) -> Result<JsValue, JsValue> {
        self.inner.borrow_mut().store.clear_cart();
        self.save();
        self.panel()
    }

    fn save(&self) {
        if !self.persist {
            return;
        }
        match self.inner.borrow().store.to_json() {
            Ok(json) => {
                if let Err(e) = save_cart(&json) {
                    log(&format!("failed to save cart: {:?}", e));
                }
            }
            Err(e) => log(&format!("failed to serialise cart: {}", e)),
        }
    }
}

async fn call_redirect(
    redirect: &js_sys::Function,
    cart: &CheckoutCart,
    config: &RedirectConfig,
) -> ShopResult<RedirectResponse> {
    let cart_js = serde_wasm_bindgen::to_value(cart)
        .map_err(|e| ShopError::Serialization(e.to_string()))?;
    let config_js = serde_wasm_bindgen::to_value(config)
        .map_err(|e| ShopError::Serialization(e.to_string()))?;

    let returned = redirect
        .call2(&JsValue::NULL, &cart_js, &config_js)
        .map_err(|e| js_fault("redirect threw", &e))?;

    let resolved = JsFuture::from(js_sys::Promise::resolve(&returned))
        .await
        .map_err(|e| js_fault("redirect rejected", &e))?;

    if resolved.is_undefined() || resolved.is_null() {
        return Ok(JsRedirectResult::default().into());
    }

    let result: JsRedirectResult = serde_wasm_bindgen::from_value(resolved)
        .map_err(|e| ShopError::Serialization(e.to_string()))?;
    Ok(result.into())
}

fn js_fault(context: &str, err: &JsValue) -> ShopError {
    ShopError::ProviderError {
        provider: PROVIDER.to_string(),
        message: format!("{}: {:?}", context, err),
    }
}

fn navigate(url: &str) {
    if url.is_empty() {
        return;
    }
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(url) {
            log(&format!("navigation failed: {:?}", e));
        }
    }
}

fn storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

fn load_saved_cart() -> Option<String> {
    storage()?.get_item(STORAGE_KEY).ok().flatten()
}

fn save_cart(json: &str) -> Result<(), JsValue> {
    match storage() {
        Some(storage) => storage.set_item(STORAGE_KEY, json),
        None => Ok(()),
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(err: ShopError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Format minor units for display, e.g. `format_price(1000, "jpy")` is "￥1000"
#[wasm_bindgen]
pub fn format_price(amount: i64, currency: &str) -> Result<String, JsValue> {
    let currency: Currency = currency.parse().map_err(to_js_error)?;
    Ok(format_currency(amount, currency))
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::{CartContents, Price, Product};

    fn storefront() -> Storefront {
        let catalog = ProductCatalog::new()
            .with_product(
                Product::new("egg", "Egg", Price::new(100, Currency::JPY)).with_emoji("🥚"),
            )
            .with_product(Product::new("melon", "Melon", Price::new(3000, Currency::JPY)));
        Storefront::new(catalog, &StorefrontOptions::default()).unwrap()
    }

    #[test]
    fn test_card_flow() {
        let mut shop = storefront();
        assert_eq!(shop.decrement("egg").unwrap().quantity, 1);
        shop.increment("egg").unwrap();
        assert_eq!(shop.increment("egg").unwrap().quantity, 3);

        let card = shop.add_to_cart("egg").unwrap();
        assert_eq!(card.quantity, 1);
        assert_eq!(shop.store.cart_count(), 3);
        assert!(shop.add_to_cart("nope").is_err());
    }

    #[test]
    fn test_panel_render() {
        let mut shop = storefront();
        assert!(matches!(shop.render().contents, CartContents::Empty { .. }));

        shop.add_item("egg", 2).unwrap();
        shop.add_item("melon", 1).unwrap();
        shop.toggle();
        let view = shop.render();
        assert_eq!(view.visibility_class, "opacity-100");
        match view.contents {
            CartContents::Filled { total_label, .. } => {
                assert_eq!(total_label, "Total: ￥3200(3)")
            }
            other => panic!("expected filled cart, got {:?}", other),
        }

        shop.remove_item("melon");
        shop.remove_item("egg");
        assert!(matches!(shop.render().contents, CartContents::Empty { .. }));
    }

    #[test]
    fn test_restore_keeps_visibility_and_checks_currency() {
        let mut shop = storefront();
        shop.add_item("egg", 4).unwrap();
        let saved = shop.store.to_json().unwrap();

        let mut fresh = storefront();
        fresh.toggle();
        assert!(fresh.restore(&saved).unwrap());
        assert_eq!(fresh.store.cart_count(), 4);
        assert!(fresh.store.should_display_cart());

        let usd = MemoryCartStore::new(Currency::USD).to_json().unwrap();
        assert!(!fresh.restore(&usd).unwrap());
        assert_eq!(fresh.store.cart_count(), 4);
    }

    #[test]
    fn test_catalog_currency_must_match() {
        let catalog = ProductCatalog::new()
            .with_product(Product::new("tea", "Tea", Price::new(250, Currency::USD)));
        assert!(matches!(
            Storefront::new(catalog, &StorefrontOptions::default()),
            Err(ShopError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_begin_checkout() {
        let mut shop = storefront();
        assert!(shop.begin_checkout().is_none());

        shop.add_item("melon", 1).unwrap();
        let (ticket, cart) = shop.begin_checkout().unwrap();
        assert_eq!(cart.item_count(), 1);
        assert!(shop.begin_checkout().is_none());

        assert!(shop.panel.settle_checkout(ticket, RedirectOutcome::Failed));
        let view = shop.render();
        assert_eq!(
            view.checkout().unwrap().message.as_deref(),
            Some("Unable to redirect to checkout page")
        );
    }

    #[test]
    fn test_js_result_mapping() {
        let rejected: RedirectResponse = JsRedirectResult {
            error: Some("card declined".into()),
            ..Default::default()
        }
        .into();
        assert!(matches!(rejected, RedirectResponse::Rejected { .. }));

        let navigated: RedirectResponse = JsRedirectResult::default().into();
        assert_eq!(
            navigated,
            RedirectResponse::Redirect {
                url: String::new(),
                session_id: None
            }
        );
    }

    #[test]
    fn test_options_redirect_config() {
        let options = StorefrontOptions {
            base_url: "https://shop.example/".into(),
            cancel_url: Some("https://shop.example/?success=false".into()),
            ..Default::default()
        };
        let config = options.redirect_config();
        assert_eq!(config.success_url, "https://shop.example/checkout/success");
        assert_eq!(config.cancel_url, "https://shop.example/?success=false");
        assert_eq!(config.allowed_countries, vec!["JP".to_string()]);
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
