//! # Volume Pricing
//!
//! Tier selection from order quantity and tiered unit prices.
//!
//! Everything here is pure. Prices are exact decimals and are never rounded
//! at this stage; rounding happens when formatting for display or converting
//! to processor minor units.
//!
//! | Tier | Quantity | Multiplier |
//! |------|----------|------------|
//! | `100kg` | 0–499 | 1.00 |
//! | `500kg` | 500–999 | 0.85 |
//! | `1000kg+` | 1000+ | 0.70 |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// German standard VAT applied at checkout
pub const VAT_RATE: Decimal = dec!(0.19);

/// Quantity at which the `500kg` tier starts
pub const BULK_THRESHOLD: u32 = 500;

/// Quantity at which the `1000kg+` tier starts
pub const PALLET_THRESHOLD: u32 = 1000;

/// Discount bracket keyed by order quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum VolumeTier {
    #[default]
    #[serde(rename = "100kg")]
    Kg100,
    #[serde(rename = "500kg")]
    Kg500,
    #[serde(rename = "1000kg+")]
    Kg1000Plus,
}

impl VolumeTier {
    pub const ALL: [VolumeTier; 3] = [VolumeTier::Kg100, VolumeTier::Kg500, VolumeTier::Kg1000Plus];

    /// Wire identifier (`100kg`, `500kg`, `1000kg+`)
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeTier::Kg100 => "100kg",
            VolumeTier::Kg500 => "500kg",
            VolumeTier::Kg1000Plus => "1000kg+",
        }
    }

    /// Parse a wire identifier
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }

    /// Multiplier applied to the base price
    pub fn multiplier(&self) -> Decimal {
        match self {
            VolumeTier::Kg100 => Decimal::ONE,
            VolumeTier::Kg500 => dec!(0.85),
            VolumeTier::Kg1000Plus => dec!(0.70),
        }
    }

    /// Quantity range shown next to the tier
    pub fn range_label(&self) -> &'static str {
        match self {
            VolumeTier::Kg100 => "100-499kg",
            VolumeTier::Kg500 => "500-999kg",
            VolumeTier::Kg1000Plus => "1000kg+",
        }
    }

    /// Discount badge, if the tier has one
    pub fn discount_label(&self) -> Option<&'static str> {
        match self {
            VolumeTier::Kg100 => None,
            VolumeTier::Kg500 => Some("15%"),
            VolumeTier::Kg1000Plus => Some("30%"),
        }
    }

    /// Smallest quantity that lands in this tier
    pub fn min_quantity(&self) -> u32 {
        match self {
            VolumeTier::Kg100 => 0,
            VolumeTier::Kg500 => BULK_THRESHOLD,
            VolumeTier::Kg1000Plus => PALLET_THRESHOLD,
        }
    }
}

impl std::fmt::Display for VolumeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select the tier for an order quantity
pub fn tier_for_quantity(quantity: u32) -> VolumeTier {
    if quantity >= PALLET_THRESHOLD {
        VolumeTier::Kg1000Plus
    } else if quantity >= BULK_THRESHOLD {
        VolumeTier::Kg500
    } else {
        VolumeTier::Kg100
    }
}

/// Unit price for a tier: `base_price * multiplier`
pub fn unit_price(base_price: Decimal, tier: VolumeTier) -> Decimal {
    base_price * tier.multiplier()
}

/// VAT owed on a net amount
pub fn vat_amount(net: Decimal) -> Decimal {
    net * VAT_RATE
}

/// Net amount plus VAT
pub fn with_vat(net: Decimal) -> Decimal {
    net * (Decimal::ONE + VAT_RATE)
}

/// Tier and price resolved for a product at a given quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub quantity: u32,
    pub tier: VolumeTier,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl PriceQuote {
    /// Quote a base price at a quantity, selecting the tier from the quantity
    pub fn for_quantity(base_price: Decimal, quantity: u32) -> Self {
        let tier = tier_for_quantity(quantity);
        let unit_price = unit_price(base_price, tier);
        Self {
            quantity,
            tier,
            unit_price,
            line_total: unit_price * Decimal::from(quantity),
        }
    }
}
