//! # Order Types
//!
//! Orders placed from a cart, and their settlement outcome.

use crate::account::PaymentAccount;
use crate::cart::{Cart, CartItem};
use crate::error::{StorefrontError, StorefrontResult};
use crate::pricing::{vat_amount, VolumeTier};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the buyer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card payment confirmed through the processor
    #[default]
    Card,
    /// Manual bank transfer to a routed settlement account
    Bank,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Bank => "bank",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced line on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: u32,
    pub quantity: u32,
    pub price_per_unit: Decimal,
    pub volume_tier: VolumeTier,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price_per_unit * Decimal::from(self.quantity)
    }
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id(),
            quantity: item.quantity,
            price_per_unit: item.price_per_unit,
            volume_tier: item.volume_tier,
        }
    }
}

/// `POST /api/orders` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

impl NewOrder {
    /// Snapshot a cart into an order request
    pub fn from_cart(cart: &Cart, payment_method: PaymentMethod) -> StorefrontResult<Self> {
        if cart.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        Ok(Self {
            items: cart.items().iter().map(OrderItem::from).collect(),
            payment_method,
            payment_intent_id: None,
        })
    }

    /// Builder: attach the confirmed card payment
    pub fn with_payment_intent(mut self, payment_intent_id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(payment_intent_id.into());
        self
    }

    /// Net total before VAT
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// Processor PaymentIntent ids look like `pi_3MtwBwLkdIwHu7ix28a3tqPa`
pub fn is_payment_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Card payment confirmed by the processor
    Paid,
    /// Waiting for the buyer's bank transfer
    AwaitingTransfer,
}

/// What a settlement strategy decided for an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    CardCharged { payment_intent_id: String },
    AwaitingTransfer { account: PaymentAccount },
}

impl Settlement {
    pub fn status(&self) -> OrderStatus {
        match self {
            Settlement::CardCharged { .. } => OrderStatus::Paid,
            Settlement::AwaitingTransfer { .. } => OrderStatus::AwaitingTransfer,
        }
    }
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: u64,
    /// Net total
    pub total_amount: Decimal,
    pub vat_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    /// Where to wire the money, for bank transfer orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<PaymentAccount>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Record a settled order with a generated ID
    pub fn settled(user_id: u64, request: NewOrder, settlement: Settlement) -> Self {
        let total_amount = request.subtotal();
        let status = settlement.status();
        let (payment_intent_id, bank_account) = match settlement {
            Settlement::CardCharged { payment_intent_id } => (Some(payment_intent_id), None),
            Settlement::AwaitingTransfer { account } => (None, Some(account)),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            total_amount,
            vat_amount: vat_amount(total_amount),
            status,
            payment_method: request.payment_method,
            items: request.items,
            payment_intent_id,
            bank_account,
            created_at: Utc::now(),
        }
    }

    /// Net total plus VAT
    pub fn total_with_vat(&self) -> Decimal {
        self.total_amount + self.vat_amount
    }
}
