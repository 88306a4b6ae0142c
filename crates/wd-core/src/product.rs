//! # Product Types
//!
//! Product catalog types for the storefront.
//! Products are loaded from `config/products.toml` or fetched from the backend.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    EUR,
    USD,
    GBP,
    CHF,
}

impl Currency {
    /// Returns the lowercase ISO 4217 code the processor expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::EUR => "eur",
            Currency::USD => "usd",
            Currency::GBP => "gbp",
            Currency::CHF => "chf",
        }
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::EUR => "€",
            Currency::USD => "$",
            Currency::GBP => "£",
            Currency::CHF => "CHF ",
        }
    }

    /// Parse a case-insensitive ISO code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "eur" => Some(Currency::EUR),
            "usd" => Some(Currency::USD),
            "gbp" => Some(Currency::GBP),
            "chf" => Some(Currency::CHF),
            _ => None,
        }
    }

    /// Convert a decimal amount to minor units (cents), rounding half away from zero
    pub fn to_minor_units(&self, amount: Decimal) -> i64 {
        (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Convert from minor units back to a decimal amount
    pub fn from_minor_units(&self, amount: i64) -> Decimal {
        Decimal::new(amount, 2)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Format an amount for display, e.g. `€38.25`.
///
/// This is the only place prices are rounded for humans.
pub fn format_money(amount: Decimal, currency: Currency) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{}{:.2}", currency.symbol(), rounded)
}

/// A product in the wholesale catalog.
///
/// Field names follow the backend wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier
    pub id: u32,

    /// Display name
    pub name: String,

    /// Category (e.g. "Food Commodities")
    pub category: String,

    /// Price per unit before any volume discount
    pub base_price: Decimal,

    /// Unit label ("kg", "box", "case", ...)
    pub unit: String,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Create a product with required fields
    pub fn new(
        id: u32,
        name: impl Into<String>,
        category: impl Into<String>,
        base_price: Decimal,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            base_price,
            unit: unit.into(),
            stock: 0,
            description: None,
            image_url: None,
        }
    }

    /// Builder: set stock
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn in_stock(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// Per-category aggregate shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub total_stock: u64,
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    /// Currency every base price is quoted in
    #[serde(default)]
    pub currency: Currency,

    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty EUR catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Builder: add a product
    pub fn with_product(mut self, product: Product) -> Self {
        self.add(product);
        self
    }

    /// Find a product by ID
    pub fn get(&self, id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products in a category, or all products when `category` is `None`
    pub fn filter<'a>(&'a self, category: Option<&'a str>) -> impl Iterator<Item = &'a Product> {
        self.products
            .iter()
            .filter(move |p| category.map_or(true, |c| p.category == c))
    }

    /// Category summaries in first-seen order
    pub fn categories(&self) -> Vec<CategorySummary> {
        let mut summaries: Vec<CategorySummary> = Vec::new();
        for product in &self.products {
            match summaries.iter_mut().find(|s| s.name == product.category) {
                Some(summary) => {
                    summary.count += 1;
                    summary.total_stock += u64::from(product.stock);
                }
                None => summaries.push(CategorySummary {
                    name: product.category.clone(),
                    count: 1,
                    total_stock: u64::from(product.stock),
                }),
            }
        }
        summaries
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_catalog() -> ProductCatalog {
        ProductCatalog::new()
            .with_product(
                Product::new(1, "Premium Olive Oil", "Food Commodities", dec!(45), "kg")
                    .with_stock(5000),
            )
            .with_product(
                Product::new(4, "Disposable Gloves", "Durable Consumables", dec!(18), "box")
                    .with_stock(20000),
            )
            .with_product(
                Product::new(8, "Sea Salt", "Food Commodities", dec!(15), "kg").with_stock(6000),
            )
    }

    #[test]
    fn test_minor_units() {
        let eur = Currency::EUR;
        assert_eq!(eur.to_minor_units(dec!(10.99)), 1099);
        assert_eq!(eur.to_minor_units(dec!(53.55)), 5355);
        assert_eq!(eur.to_minor_units(dec!(0.005)), 1);
        assert_eq!(eur.from_minor_units(1099), dec!(10.99));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(38.25), Currency::EUR), "€38.25");
        assert_eq!(format_money(dec!(31.5), Currency::EUR), "€31.50");
        assert_eq!(format_money(dec!(0.255), Currency::USD), "$0.26");
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code("EUR"), Some(Currency::EUR));
        assert_eq!(Currency::from_code("jpy"), None);
        assert_eq!(Currency::default().to_string(), "EUR");
    }

    #[test]
    fn test_filter_by_category() {
        let catalog = sample_catalog();
        assert_eq!(catalog.filter(None).count(), 3);
        assert_eq!(catalog.filter(Some("Food Commodities")).count(), 2);
        assert_eq!(catalog.filter(Some("Electronics")).count(), 0);
    }

    #[test]
    fn test_category_summaries() {
        let summaries = sample_catalog().categories();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Food Commodities");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].total_stock, 11000);
        assert_eq!(summaries[1].total_stock, 20000);
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = ProductCatalog::from_toml(
            r#"
            currency = "eur"

            [[products]]
            id = 2
            name = "Basmati Rice"
            category = "Food Commodities"
            base_price = 0.3
            unit = "kg"
            stock = 15000
            "#,
        )
        .unwrap();

        let rice = catalog.get(2).unwrap();
        assert_eq!(rice.base_price, dec!(0.3));
        assert_eq!(rice.description, None);
        assert!(rice.in_stock(15000));
        assert!(!rice.in_stock(15001));
    }
}
