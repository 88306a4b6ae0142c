//! # Cart
//!
//! In-memory cart keyed by product id with merge-on-add semantics.
//!
//! A line snapshots its tier and unit price when it is first added. Adding
//! more of the same product only grows the quantity; the stored price is kept
//! even if the new quantity crosses a tier threshold.

use crate::pricing::{tier_for_quantity, unit_price, with_vat, VolumeTier};
use crate::product::Product;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A line in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,

    pub quantity: u32,

    /// Tier resolved when the line was created
    pub volume_tier: VolumeTier,

    /// Unit price resolved when the line was created
    pub price_per_unit: Decimal,
}

impl CartItem {
    /// Build a line, selecting the tier from the quantity
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self::with_tier(product, quantity, tier_for_quantity(quantity))
    }

    /// Build a line with an explicitly chosen tier
    pub fn with_tier(product: &Product, quantity: u32, tier: VolumeTier) -> Self {
        Self {
            product: product.clone(),
            quantity,
            volume_tier: tier,
            price_per_unit: unit_price(product.base_price, tier),
        }
    }

    pub fn product_id(&self) -> u32 {
        self.product.id
    }

    /// `price_per_unit * quantity`
    pub fn line_total(&self) -> Decimal {
        self.price_per_unit * Decimal::from(self.quantity)
    }
}

/// Ordered collection of cart lines, at most one per product id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line, merging into an existing line for the same product.
    ///
    /// On merge only the quantity changes; the incoming tier and price are
    /// discarded.
    pub fn add_item(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id() == item.product_id())
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
    }

    /// Remove the line for a product; no-op if absent
    pub fn remove_item(&mut self, product_id: u32) {
        self.items.retain(|item| item.product_id() != product_id);
    }

    /// Replace a line's quantity in place without re-pricing; no-op if absent
    pub fn update_quantity(&mut self, product_id: u32, quantity: u32) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id() == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, product_id: u32) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id() == product_id)
    }

    /// Σ(price_per_unit × quantity), recomputed on every call
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total including VAT. Not stored on the cart.
    pub fn total_with_vat(&self) -> Decimal {
        with_vat(self.total_amount())
    }

    /// Number of distinct lines
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ quantity across lines
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}
