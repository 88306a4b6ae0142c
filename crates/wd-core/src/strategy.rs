//! # Settlement Strategy Trait
//!
//! Strategy pattern for the ways an order can be settled. Card and bank
//! transfer sit behind the same "settle order" interface so a deployment can
//! enable either or both.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 SettlementStrategy (trait)                  │
//! │  ├── settle()                                               │
//! │  ├── method()                                               │
//! │  └── is_available_for()                                     │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!               ┌────────────┴────────────┐
//!               │                         │
//!      ┌────────┴────────┐      ┌─────────┴─────────┐
//!      │ StripeCard      │      │ BankTransfer      │
//!      │ Settlement      │      │ Settlement        │
//!      │ (wd-stripe)     │      │ (CheckoutRouter)  │
//!      └─────────────────┘      └───────────────────┘
//! ```

use crate::account::CheckoutRouter;
use crate::error::{StorefrontError, StorefrontResult};
use crate::order::{NewOrder, PaymentMethod, Settlement};
use crate::product::Currency;
use crate::user::User;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Everything a strategy needs to settle one order
#[derive(Debug, Clone, Copy)]
pub struct SettlementContext<'a> {
    pub order: &'a NewOrder,
    pub user: &'a User,
    /// VAT-inclusive total in minor units
    pub amount_minor: i64,
    pub currency: Currency,
}

/// Core trait for settlement implementations.
#[async_trait]
pub trait SettlementStrategy: Send + Sync {
    /// Settle the order or refuse it.
    async fn settle(&self, ctx: &SettlementContext<'_>) -> StorefrontResult<Settlement>;

    /// The payment method this strategy handles.
    fn method(&self) -> PaymentMethod;

    /// Whether the buyer may pick this method at all.
    fn is_available_for(&self, _user: &User) -> bool {
        true
    }
}

/// Type alias for a boxed settlement strategy (dynamic dispatch)
pub type BoxedSettlementStrategy = Arc<dyn SettlementStrategy>;

/// Manual bank transfer into the account the router picks for the buyer
#[derive(Debug, Clone, Default)]
pub struct BankTransferSettlement {
    router: CheckoutRouter,
}

impl BankTransferSettlement {
    pub fn new(router: CheckoutRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &CheckoutRouter {
        &self.router
    }
}

#[async_trait]
impl SettlementStrategy for BankTransferSettlement {
    #[instrument(skip(self, ctx), fields(user_id = ctx.user.id))]
    async fn settle(&self, ctx: &SettlementContext<'_>) -> StorefrontResult<Settlement> {
        let route = self.router.route(&ctx.user.region, &ctx.user.country);
        let account = route.ensure_compatible(&ctx.user.country)?;
        debug!("Routing bank transfer to {} ({})", account.name, account.rail);
        Ok(Settlement::AwaitingTransfer {
            account: account.clone(),
        })
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Bank
    }

    fn is_available_for(&self, user: &User) -> bool {
        self.router.route(&user.region, &user.country).compatible
    }
}

/// Registry of enabled settlement strategies
#[derive(Clone, Default)]
pub struct SettlementSelector {
    strategies: HashMap<PaymentMethod, BoxedSettlementStrategy>,
}

impl SettlementSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, replacing any previous one for the same method
    pub fn register(&mut self, strategy: BoxedSettlementStrategy) {
        self.strategies.insert(strategy.method(), strategy);
    }

    /// Register with builder pattern
    pub fn with_strategy(mut self, strategy: BoxedSettlementStrategy) -> Self {
        self.register(strategy);
        self
    }

    pub fn get(&self, method: PaymentMethod) -> Option<&BoxedSettlementStrategy> {
        self.strategies.get(&method)
    }

    /// Look up a strategy, reporting a disabled method as a configuration problem
    pub fn require(&self, method: PaymentMethod) -> StorefrontResult<&BoxedSettlementStrategy> {
        self.get(method).ok_or_else(|| match method {
            PaymentMethod::Card => StorefrontError::ProcessorNotConfigured(
                "card payments are not enabled on this deployment".to_string(),
            ),
            PaymentMethod::Bank => StorefrontError::Configuration(
                "bank transfer is not enabled on this deployment".to_string(),
            ),
        })
    }

    /// Methods the buyer can choose from, card first
    pub fn available_for(&self, user: &User) -> Vec<PaymentMethod> {
        [PaymentMethod::Card, PaymentMethod::Bank]
            .into_iter()
            .filter(|m| self.get(*m).is_some_and(|s| s.is_available_for(user)))
            .collect()
    }

    pub fn has_method(&self, method: PaymentMethod) -> bool {
        self.strategies.contains_key(&method)
    }
}
