//! Cart panel and its rows.
//!
//! The panel renders from the store every time; nothing is cached between
//! renders except the checkout control, which is mounted while the cart has
//! lines and torn down when it empties.

use crate::cart::{CartLine, CartStore, CartTotals};
use crate::checkout::{
    AttemptTicket, CheckoutButtonView, CheckoutControl, CheckoutLimits, ClickOutcome,
};
use crate::redirect::{
    settle_redirect, CheckoutCart, CheckoutRedirect, RedirectConfig, RedirectOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const EMPTY_CART_MESSAGE: &str = "You have no items in your cart";
pub const VISIBLE_CLASS: &str = "opacity-100";
pub const HIDDEN_CLASS: &str = "opacity-0";

/// Render data for one cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRow {
    pub product_id: String,
    pub name: String,
    pub emoji: String,
    pub quantity: u32,
    /// e.g. "(2)"
    pub quantity_label: String,
    /// Unit price, e.g. "￥1000"
    pub price: String,
}

impl CartItemRow {
    pub fn from_line(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id.clone(),
            name: line.product.name.clone(),
            emoji: line.product.emoji.clone(),
            quantity: line.quantity,
            quantity_label: format!("({})", line.quantity),
            price: line.unit_price().display(),
        }
    }

    /// Delete button: removes the whole line, no confirmation
    pub fn remove<S>(&self, store: &mut S) -> Option<CartLine>
    where
        S: CartStore + ?Sized,
    {
        store.remove_item(&self.product_id)
    }
}

/// What the panel body shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CartContents {
    Empty {
        message: String,
    },
    Filled {
        rows: Vec<CartItemRow>,
        totals: CartTotals,
        /// e.g. "Total: ￥2500(3)"
        total_label: String,
        checkout: CheckoutButtonView,
    },
}

/// Render data for the whole panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPanelView {
    pub visible: bool,
    pub visibility_class: String,
    pub cart_count: u32,
    pub contents: CartContents,
}

impl CartPanelView {
    pub fn checkout(&self) -> Option<&CheckoutButtonView> {
        match &self.contents {
            CartContents::Filled { checkout, .. } => Some(checkout),
            CartContents::Empty { .. } => None,
        }
    }
}

/// Format the panel's totals line
pub fn total_label(totals: &CartTotals) -> String {
    format!("Total: {}({})", totals.total_price.display(), totals.total_count)
}

/// The cart panel with its (optional) checkout control
#[derive(Debug, Clone)]
pub struct CartPanel {
    limits: CheckoutLimits,
    control: Option<CheckoutControl>,
    mounts: u64,
}

impl CartPanel {
    pub fn new(limits: CheckoutLimits) -> Self {
        Self {
            limits,
            control: None,
            mounts: 0,
        }
    }

    pub fn limits(&self) -> &CheckoutLimits {
        &self.limits
    }

    pub fn control(&self) -> Option<&CheckoutControl> {
        self.control.as_ref()
    }

    /// Mount the control for a non-empty cart, tear it down for an empty one
    fn reconcile(&mut self, totals: &CartTotals) {
        if totals.is_empty() {
            if let Some(mut control) = self.control.take() {
                control.unmount();
                debug!(control_id = control.id(), "checkout control unmounted");
            }
        } else if self.control.is_none() {
            self.mounts += 1;
            self.control = Some(CheckoutControl::new(self.mounts));
        }
    }

    pub fn render<S>(&mut self, store: &S) -> CartPanelView
    where
        S: CartStore + ?Sized,
    {
        let totals = store.totals();
        self.reconcile(&totals);

        let visible = store.should_display_cart();
        let contents = match &self.control {
            None => CartContents::Empty {
                message: EMPTY_CART_MESSAGE.to_string(),
            },
            Some(control) => CartContents::Filled {
                rows: store.cart_details().values().map(CartItemRow::from_line).collect(),
                total_label: total_label(&totals),
                checkout: control.view(&totals, &self.limits),
                totals,
            },
        };

        CartPanelView {
            visible,
            visibility_class: if visible { VISIBLE_CLASS } else { HIDDEN_CLASS }.to_string(),
            cart_count: totals.total_count,
            contents,
        }
    }

    /// Click the checkout button, if one is mounted
    pub fn click_checkout<S>(&mut self, store: &S) -> ClickOutcome
    where
        S: CartStore + ?Sized,
    {
        let totals = store.totals();
        self.reconcile(&totals);
        match &mut self.control {
            Some(control) => control.click(&totals, &self.limits),
            None => ClickOutcome::Ignored,
        }
    }

    /// Deliver a redirect result; dropped if the control was torn down
    pub fn settle_checkout(&mut self, ticket: AttemptTicket, outcome: RedirectOutcome) -> bool {
        match &mut self.control {
            Some(control) => control.settle(ticket, outcome),
            None => {
                debug!(
                    control_id = ticket.control_id,
                    "no checkout control mounted, dropping result"
                );
                false
            }
        }
    }

    /// The customer came back from the hosted checkout page.
    ///
    /// Navigating away unmounts the control, so the one left behind is torn
    /// down and the next render mounts a fresh, idle one. Returns `true` when
    /// a control was replaced.
    pub fn remount(&mut self) -> bool {
        match self.control.take() {
            Some(mut control) => {
                control.unmount();
                debug!(control_id = control.id(), "checkout control remounted");
                true
            }
            None => false,
        }
    }

    /// Click, call the provider, settle, and render
    pub async fn checkout<S>(
        &mut self,
        store: &S,
        redirect: &dyn CheckoutRedirect,
        config: &RedirectConfig,
    ) -> CartPanelView
    where
        S: CartStore + ?Sized,
    {
        if let ClickOutcome::Started(ticket) = self.click_checkout(store) {
            let cart = CheckoutCart::from_store(store);
            let outcome = settle_redirect(redirect, &cart, config).await;
            self.settle_checkout(ticket, outcome);
        }
        self.render(store)
    }
}

impl Default for CartPanel {
    fn default() -> Self {
        Self::new(CheckoutLimits::default())
    }
}
