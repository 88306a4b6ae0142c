//! # Checkout
//!
//! VAT-inclusive totals for a cart and the per-checkout payment intent cache.

use crate::cart::Cart;
use crate::error::StorefrontResult;
use crate::gateway::{BoxedPaymentIntentGateway, PaymentIntent, PaymentIntentRequest};
use crate::pricing::{vat_amount, with_vat};
use crate::product::{format_money, Currency};
use crate::user::User;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Totals shown on the checkout page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    /// `round(subtotal * 1.19 * 100)`, the amount charged to the processor
    pub amount_minor: i64,
    pub currency: Currency,
}

impl CheckoutSummary {
    pub fn from_cart(cart: &Cart, currency: Currency) -> Self {
        Self::from_subtotal(cart.total_amount(), currency)
    }

    pub fn from_subtotal(subtotal: Decimal, currency: Currency) -> Self {
        let total = with_vat(subtotal);
        Self {
            subtotal,
            vat: vat_amount(subtotal),
            total,
            amount_minor: currency.to_minor_units(total),
            currency,
        }
    }

    /// Display string for the VAT-inclusive total
    pub fn display_total(&self) -> String {
        format_money(self.total, self.currency)
    }
}

/// Holds at most one payment intent per checkout.
///
/// A new intent is requested only when the cart is non-empty and no client
/// secret is cached. Nothing here retries; a failed request leaves the cache
/// empty so the next explicit attempt can try again.
pub struct CheckoutSession {
    gateway: BoxedPaymentIntentGateway,
    currency: Currency,
    intent: Option<PaymentIntent>,
}

impl CheckoutSession {
    pub fn new(gateway: BoxedPaymentIntentGateway, currency: Currency) -> Self {
        Self {
            gateway,
            currency,
            intent: None,
        }
    }

    /// Fetch a client secret if one is needed, otherwise return the cached one.
    ///
    /// Returns `Ok(None)` for an empty cart without contacting the gateway.
    #[instrument(skip(self, cart, user), fields(gateway = self.gateway.gateway_name()))]
    pub async fn ensure_payment_intent(
        &mut self,
        cart: &Cart,
        user: Option<&User>,
    ) -> StorefrontResult<Option<&PaymentIntent>> {
        if cart.is_empty() {
            return Ok(None);
        }
        if self.intent.is_some() {
            debug!("Reusing cached payment intent");
            return Ok(self.intent.as_ref());
        }

        let summary = CheckoutSummary::from_cart(cart, self.currency);
        let mut request = PaymentIntentRequest::new(summary.amount_minor, self.currency);
        if let Some(user) = user {
            request = request
                .with_metadata("userId", user.id.to_string())
                .with_metadata("companyName", user.company_name.clone());
        }

        let intent = self.gateway.create_payment_intent(&request).await?;
        info!(
            "Created payment intent {} for {}",
            intent.payment_intent_id,
            summary.display_total()
        );
        self.intent = Some(intent);
        Ok(self.intent.as_ref())
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.client_secret.as_str())
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.payment_intent_id.as_str())
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Forget the cached intent (after an order is placed)
    pub fn reset(&mut self) {
        self.intent = None;
    }
}
