//! # Settlement Accounts
//!
//! The two bank accounts orders can be paid into by transfer, and the router
//! that picks one from the buyer's region.
//!
//! ```text
//! region == "EU"  ──► EU account (SEPA)
//! anything else   ──► INTERNATIONAL account (SWIFT)
//!
//! bank transfer allowed  ⇔  buyer country ∈ account.compatible
//! ```
//!
//! There is no fallback: a buyer whose country is not listed on the routed
//! account cannot pay by transfer, even if the other account lists it.

use crate::error::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};

/// Region code that routes to the SEPA account
pub const EU_REGION: &str = "EU";

/// Bank-transfer rail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RailType {
    Sepa,
    Swift,
}

impl RailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RailType::Sepa => "SEPA",
            RailType::Swift => "SWIFT",
        }
    }
}

impl std::fmt::Display for RailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A static account buyers can wire money to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccount {
    /// Account holder
    pub name: String,

    pub iban: String,

    /// SWIFT/BIC code
    pub swift: String,

    #[serde(rename = "type")]
    pub rail: RailType,

    /// Human-readable region served ("European Union", "International")
    pub region: String,

    /// Countries allowed to pay into this account
    #[serde(default)]
    pub compatible: Vec<String>,
}

impl PaymentAccount {
    /// SEPA account for buyers in the EU region
    pub fn eu() -> Self {
        Self {
            name: "Olky B.V.".to_string(),
            iban: "NL89ABNA0417164300".to_string(),
            swift: "ABNANL2A".to_string(),
            rail: RailType::Sepa,
            region: "European Union".to_string(),
            compatible: [
                "Germany",
                "France",
                "Netherlands",
                "Belgium",
                "Spain",
                "Italy",
                "Austria",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    /// SWIFT account for everyone else
    pub fn international() -> Self {
        Self {
            name: "B Partner GmbH".to_string(),
            iban: "DE89370400440532013000".to_string(),
            swift: "COBADEFFXXX".to_string(),
            rail: RailType::Swift,
            region: "International".to_string(),
            compatible: [
                "United States",
                "United Kingdom",
                "Switzerland",
                "Canada",
                "Australia",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    /// Exact, case-sensitive membership check
    pub fn is_compatible(&self, country: &str) -> bool {
        self.compatible.iter().any(|c| c == country)
    }
}

/// The two settlement accounts, overridable from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccounts {
    pub eu: PaymentAccount,
    pub international: PaymentAccount,
}

impl Default for PaymentAccounts {
    fn default() -> Self {
        Self {
            eu: PaymentAccount::eu(),
            international: PaymentAccount::international(),
        }
    }
}

impl PaymentAccounts {
    /// Load both accounts from TOML (`[eu]` and `[international]` tables)
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// Outcome of routing a buyer for bank transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankTransferRoute<'a> {
    pub account: &'a PaymentAccount,
    pub compatible: bool,
}

impl BankTransferRoute<'_> {
    /// Turn an incompatible route into the blocking error shown to the user
    pub fn ensure_compatible(&self, country: &str) -> StorefrontResult<&PaymentAccount> {
        if self.compatible {
            Ok(self.account)
        } else {
            Err(StorefrontError::IncompatibleRegion {
                country: country.to_string(),
                rail: self.account.rail.to_string(),
            })
        }
    }
}

/// Picks the settlement account for a buyer
#[derive(Debug, Clone, Default)]
pub struct CheckoutRouter {
    accounts: PaymentAccounts,
}

impl CheckoutRouter {
    pub fn new(accounts: PaymentAccounts) -> Self {
        Self { accounts }
    }

    /// `EU` selects the SEPA account, any other region the SWIFT account
    pub fn select(&self, region: &str) -> &PaymentAccount {
        if region == EU_REGION {
            &self.accounts.eu
        } else {
            &self.accounts.international
        }
    }

    /// Select the account and check the buyer's country against it
    pub fn route(&self, region: &str, country: &str) -> BankTransferRoute<'_> {
        let account = self.select(region);
        BankTransferRoute {
            account,
            compatible: account.is_compatible(country),
        }
    }

    pub fn accounts(&self) -> &PaymentAccounts {
        &self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eu_buyer_in_germany() {
        let router = CheckoutRouter::default();
        let route = router.route("EU", "Germany");

        assert!(route.compatible);
        assert_eq!(route.account.rail, RailType::Sepa);
        assert_eq!(route.account.iban, "NL89ABNA0417164300");
        assert!(route.ensure_compatible("Germany").is_ok());
    }

    #[test]
    fn test_japan_is_blocked() {
        let router = CheckoutRouter::default();
        let route = router.route("APAC", "Japan");

        assert!(!route.compatible);
        assert_eq!(route.account.rail, RailType::Swift);
        let err = route.ensure_compatible("Japan").unwrap_err();
        assert!(matches!(err, StorefrontError::IncompatibleRegion { .. }));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_no_fallback_to_other_account() {
        let router = CheckoutRouter::default();

        // Listed on the SEPA account, but a non-EU region routes to SWIFT.
        let route = router.route("International", "Germany");
        assert_eq!(route.account.rail, RailType::Swift);
        assert!(!route.compatible);

        // Listed on the SWIFT account, but the EU region routes to SEPA.
        let route = router.route("EU", "Switzerland");
        assert_eq!(route.account.rail, RailType::Sepa);
        assert!(!route.compatible);
    }

    #[test]
    fn test_region_match_is_exact() {
        let router = CheckoutRouter::default();
        assert_eq!(router.select("eu").rail, RailType::Swift);
        assert!(!router.route("EU", "germany").compatible);
    }

    #[test]
    fn test_accounts_from_toml() {
        let accounts = PaymentAccounts::from_toml(
            r#"
            [eu]
            name = "Test EU"
            iban = "NL00TEST0000000000"
            swift = "TESTNL2A"
            type = "SEPA"
            region = "European Union"
            compatible = ["Portugal"]

            [international]
            name = "Test Intl"
            iban = "DE00TEST"
            swift = "TESTDEFF"
            type = "SWIFT"
            region = "International"
            compatible = ["Japan"]
            "#,
        )
        .unwrap();

        let router = CheckoutRouter::new(accounts);
        assert!(router.route("EU", "Portugal").compatible);
        assert!(router.route("APAC", "Japan").compatible);
        assert!(!router.route("EU", "Germany").compatible);
    }
}
