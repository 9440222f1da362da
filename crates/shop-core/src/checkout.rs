//! # Checkout Control
//!
//! Eligibility rules and the state machine behind the "Proceed to checkout"
//! button.
//!
//! ```text
//!            block(totals) holds
//!   ┌──────┐ ─────────────────────▶ ┌──────────────┐
//!   │ Idle │ ◀───────────────────── │ Idle+blocked │
//!   └──┬───┘     block clears       └──────────────┘
//!      │ click (non-empty)
//!      ▼
//!   ┌─────────┐  Navigated   ┌────────────┐
//!   │ Loading │ ───────────▶ │ Redirected │
//!   └────┬────┘              └────────────┘
//!        │ Failed
//!        ▼
//!   ┌──────────────────────┐  click (empty)   ┌─────────────────┐
//!   │ Failed(RedirectFail) │ ◀── Idle ──────▶ │ Failed(NoItems) │
//!   └──────────────────────┘                  └─────────────────┘
//! ```
//!
//! The minimum-total and maximum-items rules are evaluated at render time and
//! disable the button on their own. The empty-cart rule only fires on click.
//! `Redirected` is terminal for a control; when the customer returns, the
//! owning panel replaces it with a fresh one.

use crate::cart::{CartStore, CartTotals};
use crate::product::{format_currency, Currency};
use crate::redirect::{
    settle_redirect, CheckoutCart, CheckoutRedirect, RedirectConfig, RedirectOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PROCEED_LABEL: &str = "Proceed to checkout";
pub const LOADING_LABEL: &str = "Loading...";
pub const NO_ITEMS_MESSAGE: &str = "Please add some items to your cart";
pub const REDIRECT_FAILED_MESSAGE: &str = "Unable to redirect to checkout page";

/// Bounds a cart must satisfy before checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLimits {
    /// Smallest accepted total, in minor units of the cart currency
    pub min_total: i64,
    /// Largest accepted item count (inclusive)
    pub max_items: u32,
    /// Currency used to print `min_total` in the warning
    #[serde(default = "default_min_total_currency")]
    pub min_total_currency: Currency,
}

fn default_min_total_currency() -> Currency {
    Currency::GBP
}

impl Default for CheckoutLimits {
    fn default() -> Self {
        Self {
            min_total: 30,
            max_items: 20,
            min_total_currency: default_min_total_currency(),
        }
    }
}

impl CheckoutLimits {
    pub fn min_total_label(&self) -> String {
        format_currency(self.min_total, self.min_total_currency)
    }

    /// Rules that disable the button without any click.
    /// An empty cart is never blocked here; see [`Self::eligibility`].
    pub fn block(&self, totals: &CartTotals) -> Option<Ineligible> {
        if totals.is_empty() {
            return None;
        }
        if totals.total_price.amount < self.min_total {
            return Some(Ineligible::BelowMinimum {
                minimum: self.min_total_label(),
            });
        }
        if totals.total_count > self.max_items {
            return Some(Ineligible::TooManyItems {
                max_items: self.max_items,
            });
        }
        None
    }

    /// Full rule set in precedence order: empty, minimum, maximum.
    pub fn eligibility(&self, totals: &CartTotals) -> Result<(), Ineligible> {
        if totals.is_empty() {
            return Err(Ineligible::EmptyCart);
        }
        match self.block(totals) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    pub fn is_eligible(&self, totals: &CartTotals) -> bool {
        self.eligibility(totals).is_ok()
    }
}

/// Why a cart may not be checked out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligible {
    EmptyCart,
    BelowMinimum { minimum: String },
    TooManyItems { max_items: u32 },
}

impl Ineligible {
    pub fn message(&self) -> String {
        match self {
            Ineligible::EmptyCart => NO_ITEMS_MESSAGE.to_string(),
            Ineligible::BelowMinimum { minimum } => {
                format!("You must have at least {} in your basket", minimum)
            }
            Ineligible::TooManyItems { max_items } => {
                format!("You cannot have more than {} items", max_items)
            }
        }
    }
}

/// Failure surfaced after a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutFailure {
    NoItems,
    RedirectFailed,
}

impl CheckoutFailure {
    pub fn message(&self) -> &'static str {
        match self {
            CheckoutFailure::NoItems => NO_ITEMS_MESSAGE,
            CheckoutFailure::RedirectFailed => REDIRECT_FAILED_MESSAGE,
        }
    }
}

/// Click-driven phase of the control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CheckoutPhase {
    Idle,
    Loading { attempt: u64 },
    Failed { failure: CheckoutFailure },
    Redirected { url: String },
}

/// Proof that a redirect attempt was started by a given control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptTicket {
    pub control_id: u64,
    pub attempt: u64,
}

/// Result of clicking the button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Redirect should be invoked; settle with this ticket
    Started(AttemptTicket),
    /// Rejected locally without invoking the redirect
    Rejected(CheckoutFailure),
    /// Button was disabled, loading, or torn down
    Ignored,
}

/// Render data for the button and its message line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutButtonView {
    pub label: String,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// The checkout button's state machine.
///
/// A control is owned by whatever renders it. Once [`unmount`](Self::unmount)
/// is called, late redirect results are dropped.
#[derive(Debug, Clone)]
pub struct CheckoutControl {
    id: u64,
    phase: CheckoutPhase,
    attempts: u64,
    mounted: bool,
}

impl CheckoutControl {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            phase: CheckoutPhase::Idle,
            attempts: 0,
            mounted: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, CheckoutPhase::Loading { .. })
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn view(&self, totals: &CartTotals, limits: &CheckoutLimits) -> CheckoutButtonView {
        let block = limits.block(totals);
        let in_flight = matches!(
            self.phase,
            CheckoutPhase::Loading { .. } | CheckoutPhase::Redirected { .. }
        );
        let failure = match &self.phase {
            CheckoutPhase::Failed { failure } => Some(*failure),
            _ => None,
        };

        let message = block
            .as_ref()
            .map(Ineligible::message)
            .or_else(|| failure.map(|f| f.message().to_string()));

        let disabled = in_flight || block.is_some() || (failure.is_some() && totals.is_empty());

        let redirect_url = match &self.phase {
            CheckoutPhase::Redirected { url } => Some(url.clone()),
            _ => None,
        };

        CheckoutButtonView {
            label: if in_flight { LOADING_LABEL } else { PROCEED_LABEL }.to_string(),
            disabled,
            message,
            redirect_url,
        }
    }

    /// Handle a click on the button.
    pub fn click(&mut self, totals: &CartTotals, limits: &CheckoutLimits) -> ClickOutcome {
        if !self.mounted {
            return ClickOutcome::Ignored;
        }
        if matches!(
            self.phase,
            CheckoutPhase::Loading { .. } | CheckoutPhase::Redirected { .. }
        ) {
            return ClickOutcome::Ignored;
        }
        if totals.is_empty() {
            self.phase = CheckoutPhase::Failed {
                failure: CheckoutFailure::NoItems,
            };
            return ClickOutcome::Rejected(CheckoutFailure::NoItems);
        }
        if limits.block(totals).is_some() {
            return ClickOutcome::Ignored;
        }

        self.attempts += 1;
        self.phase = CheckoutPhase::Loading {
            attempt: self.attempts,
        };
        debug!(control_id = self.id, attempt = self.attempts, "checkout started");
        ClickOutcome::Started(AttemptTicket {
            control_id: self.id,
            attempt: self.attempts,
        })
    }

    /// Apply a redirect result. Returns `false` when the ticket is stale or
    /// the control is no longer mounted.
    pub fn settle(&mut self, ticket: AttemptTicket, outcome: RedirectOutcome) -> bool {
        let current = matches!(
            self.phase,
            CheckoutPhase::Loading { attempt } if attempt == ticket.attempt
        );
        if !self.mounted || ticket.control_id != self.id || !current {
            debug!(
                control_id = self.id,
                attempt = ticket.attempt,
                "ignoring late redirect result"
            );
            return false;
        }

        self.phase = match outcome {
            RedirectOutcome::Navigated { url } => CheckoutPhase::Redirected { url },
            RedirectOutcome::Failed => CheckoutPhase::Failed {
                failure: CheckoutFailure::RedirectFailed,
            },
        };
        true
    }

    /// Click, call the provider, and settle in one go.
    ///
    /// For owners that can hold the control across the await. Owners that
    /// must release it (shared sessions) use [`click`](Self::click) and
    /// [`settle`](Self::settle) directly.
    pub async fn checkout<S>(
        &mut self,
        store: &S,
        limits: &CheckoutLimits,
        redirect: &dyn CheckoutRedirect,
        config: &RedirectConfig,
    ) -> &CheckoutPhase
    where
        S: CartStore + ?Sized,
    {
        let totals = store.totals();
        if let ClickOutcome::Started(ticket) = self.click(&totals, limits) {
            let cart = CheckoutCart::from_store(store);
            let outcome = settle_redirect(redirect, &cart, config).await;
            self.settle(ticket, outcome);
        }
        &self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::MemoryCartStore;
    use crate::error::{ShopError, ShopResult};
    use crate::product::{Price, Product};
    use crate::redirect::RedirectResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn totals(amount: i64, count: u32) -> CartTotals {
        CartTotals {
            total_price: Price::new(amount, Currency::JPY),
            total_count: count,
        }
    }

    #[test]
    fn test_eligibility_boundaries() {
        let limits = CheckoutLimits::default();

        assert_eq!(limits.eligibility(&totals(0, 0)), Err(Ineligible::EmptyCart));
        assert!(matches!(
            limits.eligibility(&totals(29, 1)),
            Err(Ineligible::BelowMinimum { .. })
        ));
        assert!(limits.is_eligible(&totals(30, 1)));
        assert!(limits.is_eligible(&totals(1000, 20)));
        assert_eq!(
            limits.eligibility(&totals(1000, 21)),
            Err(Ineligible::TooManyItems { max_items: 20 })
        );
    }

    #[test]
    fn test_eligibility_grid() {
        let limits = CheckoutLimits::default();
        for count in [0u32, 1, 19, 20, 21, 40] {
            for amount in [0i64, 1, 29, 30, 31, 100_000] {
                let t = totals(if count == 0 { 0 } else { amount }, count);
                let expected = !(count == 0 || t.total_price.amount < 30 || count > 20);
                assert_eq!(limits.is_eligible(&t), expected, "count={} amount={}", count, amount);
            }
        }
    }

    #[test]
    fn test_minimum_message_precedes_maximum() {
        let limits = CheckoutLimits::default();
        let reason = limits.block(&totals(20, 25)).unwrap();
        assert_eq!(reason.message(), "You must have at least £0.30 in your basket");
    }

    #[test]
    fn test_view_for_valid_cart() {
        let control = CheckoutControl::new(1);
        let view = control.view(&totals(1000, 1), &CheckoutLimits::default());

        assert_eq!(view.label, "Proceed to checkout");
        assert!(!view.disabled);
        assert!(view.message.is_none());
    }

    #[test]
    fn test_view_below_minimum() {
        let control = CheckoutControl::new(1);
        let view = control.view(&totals(20, 1), &CheckoutLimits::default());

        assert!(view.disabled);
        assert_eq!(
            view.message.as_deref(),
            Some("You must have at least £0.30 in your basket")
        );
    }

    #[test]
    fn test_view_too_many_items() {
        let control = CheckoutControl::new(1);
        let view = control.view(&totals(1000, 21), &CheckoutLimits::default());

        assert!(view.disabled);
        assert_eq!(view.message.as_deref(), Some("You cannot have more than 20 items"));
    }

    #[test]
    fn test_empty_click_rejects_without_redirect() {
        let mut control = CheckoutControl::new(1);
        let limits = CheckoutLimits::default();
        let empty = totals(0, 0);

        assert!(!control.view(&empty, &limits).disabled);
        assert_eq!(
            control.click(&empty, &limits),
            ClickOutcome::Rejected(CheckoutFailure::NoItems)
        );

        let view = control.view(&empty, &limits);
        assert!(view.disabled);
        assert_eq!(view.message.as_deref(), Some("Please add some items to your cart"));
    }

    #[test]
    fn test_loading_then_failure_then_retry() {
        let mut control = CheckoutControl::new(7);
        let limits = CheckoutLimits::default();
        let t = totals(1000, 1);

        let ClickOutcome::Started(ticket) = control.click(&t, &limits) else {
            panic!("expected a started attempt");
        };
        let loading = control.view(&t, &limits);
        assert_eq!(loading.label, "Loading...");
        assert!(loading.disabled);
        assert!(loading.message.is_none());
        assert_eq!(control.click(&t, &limits), ClickOutcome::Ignored);

        assert!(control.settle(ticket, RedirectOutcome::Failed));
        let failed = control.view(&t, &limits);
        assert_eq!(failed.label, "Proceed to checkout");
        assert!(!failed.disabled);
        assert_eq!(failed.message.as_deref(), Some("Unable to redirect to checkout page"));

        assert!(matches!(control.click(&t, &limits), ClickOutcome::Started(_)));
    }

    #[test]
    fn test_blocked_click_is_ignored() {
        let mut control = CheckoutControl::new(1);
        let limits = CheckoutLimits::default();
        assert_eq!(control.click(&totals(10, 1), &limits), ClickOutcome::Ignored);
        assert_eq!(control.phase(), &CheckoutPhase::Idle);
    }

    #[test]
    fn test_settle_after_unmount_is_dropped() {
        let mut control = CheckoutControl::new(3);
        let limits = CheckoutLimits::default();
        let ClickOutcome::Started(ticket) = control.click(&totals(1000, 1), &limits) else {
            panic!("expected a started attempt");
        };

        control.unmount();
        assert!(!control.settle(ticket, RedirectOutcome::Failed));
        assert!(control.is_loading());
    }

    #[test]
    fn test_ticket_from_other_control_is_rejected() {
        let limits = CheckoutLimits::default();
        let mut first = CheckoutControl::new(1);
        let mut second = CheckoutControl::new(2);
        let ClickOutcome::Started(ticket) = first.click(&totals(1000, 1), &limits) else {
            panic!("expected a started attempt");
        };
        second.click(&totals(1000, 1), &limits);

        assert!(!second.settle(ticket, RedirectOutcome::Failed));
        assert!(second.is_loading());
    }

    #[test]
    fn test_navigation_is_terminal() {
        let mut control = CheckoutControl::new(1);
        let limits = CheckoutLimits::default();
        let t = totals(1000, 1);
        let ClickOutcome::Started(ticket) = control.click(&t, &limits) else {
            panic!("expected a started attempt");
        };
        control.settle(
            ticket,
            RedirectOutcome::Navigated {
                url: "https://checkout.example/s".to_string(),
            },
        );

        let view = control.view(&t, &limits);
        assert!(view.disabled);
        assert_eq!(view.redirect_url.as_deref(), Some("https://checkout.example/s"));
        assert_eq!(control.click(&t, &limits), ClickOutcome::Ignored);
    }

    struct CountingRedirect {
        calls: AtomicUsize,
        answer: fn() -> ShopResult<RedirectResponse>,
    }

    #[async_trait]
    impl CheckoutRedirect for CountingRedirect {
        async fn redirect_to_checkout(
            &self,
            _cart: &CheckoutCart,
            _config: &RedirectConfig,
        ) -> ShopResult<RedirectResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answer)()
        }

        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    fn store_with(amount: i64, count: u32) -> MemoryCartStore {
        let mut store = MemoryCartStore::new(Currency::JPY);
        store
            .add_item(&Product::new("p", "P", Price::new(amount, Currency::JPY)), count)
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_checkout_rejected_value_and_fault_match() {
        let config = RedirectConfig::new("http://localhost:3000", Currency::JPY);
        let limits = CheckoutLimits::default();
        let store = store_with(1000, 1);

        let rejected = CountingRedirect {
            calls: AtomicUsize::new(0),
            answer: || Ok(RedirectResponse::Rejected { error: "x".into() }),
        };
        let faulted = CountingRedirect {
            calls: AtomicUsize::new(0),
            answer: || Err(ShopError::NetworkError("Network error".into())),
        };

        let mut a = CheckoutControl::new(1);
        let mut b = CheckoutControl::new(2);
        a.checkout(&store, &limits, &rejected, &config).await;
        b.checkout(&store, &limits, &faulted, &config).await;

        let totals = store.totals();
        assert_eq!(a.view(&totals, &limits).message, b.view(&totals, &limits).message);
        assert_eq!(
            a.view(&totals, &limits).message.as_deref(),
            Some(REDIRECT_FAILED_MESSAGE)
        );
        assert_eq!(rejected.calls.load(Ordering::SeqCst), 1);
        assert_eq!(faulted.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checkout_on_empty_cart_skips_redirect() {
        let config = RedirectConfig::new("http://localhost:3000", Currency::JPY);
        let redirect = CountingRedirect {
            calls: AtomicUsize::new(0),
            answer: || Ok(RedirectResponse::Rejected { error: "x".into() }),
        };
        let store = MemoryCartStore::new(Currency::JPY);
        let mut control = CheckoutControl::new(1);

        let phase = control
            .checkout(&store, &CheckoutLimits::default(), &redirect, &config)
            .await
            .clone();
        assert_eq!(
            phase,
            CheckoutPhase::Failed {
                failure: CheckoutFailure::NoItems
            }
        );
        assert_eq!(redirect.calls.load(Ordering::SeqCst), 0);
    }
}
