//! # wd-wasm
//!
//! WebAssembly bindings for the storefront pricing rules, so the browser
//! shows exactly the numbers the backend will charge.
//!
//! Money crosses the boundary as decimal strings (`"38.25"`), never as
//! floats.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { tier_for_quantity, unit_price, WasmCart } from 'wd-wasm';
//!
//! await init();
//!
//! tier_for_quantity(500);          // "500kg"
//! unit_price("45", "500kg");       // "38.25"
//!
//! const cart = new WasmCart("eur");
//! cart.add_product(1, "Premium Olive Oil", "45", 100);
//! cart.display_total();            // "€5355.00"
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build crates/wd-wasm --target web
//! ```

use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wd_core::{
    format_money, pricing, Cart, CartItem, CheckoutSummary, Currency, Product, VolumeTier,
};

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid amount '{}': {}", value, e))
}

fn parse_tier(label: &str) -> Result<VolumeTier, String> {
    VolumeTier::from_label(label).ok_or_else(|| format!("Unknown volume tier: {}", label))
}

fn parse_currency(code: &str) -> Result<Currency, String> {
    Currency::from_code(code).ok_or_else(|| format!("Unsupported currency: {}", code))
}

fn js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// Tier earned by a quantity (`100kg`, `500kg`, `1000kg+`)
#[wasm_bindgen]
pub fn tier_for_quantity(quantity: u32) -> String {
    pricing::tier_for_quantity(quantity).as_str().to_string()
}

/// Quantity range shown next to a tier, e.g. `500-999kg`
#[wasm_bindgen]
pub fn tier_range_label(tier: &str) -> Result<String, JsValue> {
    Ok(parse_tier(tier).map_err(js_error)?.range_label().to_string())
}

/// Discount badge (`15%`, `30%`), or `undefined` for the base tier
#[wasm_bindgen]
pub fn tier_discount_label(tier: &str) -> Result<Option<String>, JsValue> {
    Ok(parse_tier(tier)
        .map_err(js_error)?
        .discount_label()
        .map(String::from))
}

/// Discounted unit price, unrounded
#[wasm_bindgen]
pub fn unit_price(base_price: &str, tier: &str) -> Result<String, JsValue> {
    let base = parse_decimal(base_price).map_err(js_error)?;
    let tier = parse_tier(tier).map_err(js_error)?;
    Ok(pricing::unit_price(base, tier).normalize().to_string())
}

/// VAT due on a net amount
#[wasm_bindgen]
pub fn vat_amount(net: &str) -> Result<String, JsValue> {
    let net = parse_decimal(net).map_err(js_error)?;
    Ok(pricing::vat_amount(net).normalize().to_string())
}

/// Net amount plus VAT
#[wasm_bindgen]
pub fn with_vat(net: &str) -> Result<String, JsValue> {
    let net = parse_decimal(net).map_err(js_error)?;
    Ok(pricing::with_vat(net).normalize().to_string())
}

/// `€38.25`-style display string
#[wasm_bindgen(js_name = format_money)]
pub fn format_amount(amount: &str, currency: &str) -> Result<String, JsValue> {
    let amount = parse_decimal(amount).map_err(js_error)?;
    let currency = parse_currency(currency).map_err(js_error)?;
    Ok(format_money(amount, currency))
}

/// A cart line as handed to JavaScript
#[derive(Debug, Serialize)]
struct CartLine {
    product_id: u32,
    name: String,
    quantity: u32,
    volume_tier: &'static str,
    price_per_unit: String,
    line_total: String,
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id(),
            name: item.product.name.clone(),
            quantity: item.quantity,
            volume_tier: item.volume_tier.as_str(),
            price_per_unit: item.price_per_unit.normalize().to_string(),
            line_total: item.line_total().normalize().to_string(),
        }
    }
}

/// Browser-side cart with the same merge and pricing rules as the backend
#[wasm_bindgen]
pub struct WasmCart {
    cart: Cart,
    currency: Currency,
}

#[wasm_bindgen]
impl WasmCart {
    #[wasm_bindgen(constructor)]
    pub fn new(currency: &str) -> Result<WasmCart, JsValue> {
        Ok(Self {
            cart: Cart::new(),
            currency: parse_currency(currency).map_err(js_error)?,
        })
    }

    /// Add a product; an existing line keeps its original tier and price
    pub fn add_product(
        &mut self,
        product_id: u32,
        name: &str,
        base_price: &str,
        quantity: u32,
    ) -> Result<(), JsValue> {
        let base = parse_decimal(base_price).map_err(js_error)?;
        let product = Product::new(product_id, name, "", base, "kg");
        self.cart.add_item(CartItem::from_product(&product, quantity));
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: u32) {
        self.cart.remove_item(product_id);
    }

    pub fn update_quantity(&mut self, product_id: u32, quantity: u32) {
        self.cart.update_quantity(product_id, quantity);
    }

    pub fn clear(&mut self) {
        self.cart.clear();
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.cart.len()
    }

    /// Net total
    pub fn total_amount(&self) -> String {
        self.cart.total_amount().normalize().to_string()
    }

    /// Total including 19% VAT
    pub fn total_with_vat(&self) -> String {
        self.cart.total_with_vat().normalize().to_string()
    }

    /// What the processor will be asked to charge, in cents
    pub fn amount_minor(&self) -> i64 {
        self.summary().amount_minor
    }

    pub fn display_total(&self) -> String {
        self.summary().display_total()
    }

    /// Lines as plain objects
    pub fn items(&self) -> Result<JsValue, JsValue> {
        let lines: Vec<CartLine> = self.cart.items().iter().map(CartLine::from).collect();
        serde_wasm_bindgen::to_value(&lines).map_err(|e| js_error(e.to_string()))
    }
}

impl WasmCart {
    fn summary(&self) -> CheckoutSummary {
        CheckoutSummary::from_cart(&self.cart, self.currency)
    }
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_labels() {
        assert_eq!(tier_for_quantity(499), "100kg");
        assert_eq!(tier_for_quantity(500), "500kg");
        assert_eq!(tier_for_quantity(1000), "1000kg+");
        assert_eq!(tier_range_label("500kg").unwrap(), "500-999kg");
        assert_eq!(tier_discount_label("1000kg+").unwrap().as_deref(), Some("30%"));
        assert_eq!(tier_discount_label("100kg").unwrap(), None);
    }

    #[test]
    fn test_unit_price_is_exact() {
        assert_eq!(unit_price("45", "100kg").unwrap(), "45");
        assert_eq!(unit_price("45", "500kg").unwrap(), "38.25");
        assert_eq!(unit_price("45.00", "1000kg+").unwrap(), "31.5");
    }

    #[test]
    fn test_vat() {
        assert_eq!(vat_amount("4500").unwrap(), "855");
        assert_eq!(with_vat("4500").unwrap(), "5355");
        assert_eq!(format_amount("5355", "EUR").unwrap(), "€5355.00");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_decimal("forty").is_err());
        assert!(parse_tier("2000kg").is_err());
        assert!(parse_currency("jpy").is_err());
    }

    #[test]
    fn test_cart_first_tier_wins() {
        let mut cart = WasmCart::new("eur").unwrap();
        cart.add_product(1, "Premium Olive Oil", "45", 100).unwrap();
        cart.add_product(1, "Premium Olive Oil", "45", 450).unwrap();

        assert_eq!(cart.length(), 1);
        assert_eq!(cart.total_amount(), "24750");

        cart.clear();
        cart.add_product(1, "Premium Olive Oil", "45", 100).unwrap();
        assert_eq!(cart.total_with_vat(), "5355");
        assert_eq!(cart.amount_minor(), 535500);
        assert_eq!(cart.display_total(), "€5355.00");
    }
}
