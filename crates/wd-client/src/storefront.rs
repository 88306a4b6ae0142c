//! # Storefront
//!
//! The buyer-side state of one browser session: auth, cart and checkout,
//! each owned here and driven through explicit action methods.

use crate::client::BackendClient;
use std::sync::Arc;
use tracing::{info, instrument};
use wd_core::{
    AuthSession, BankTransferRoute, Cart, CartItem, CheckoutRouter, CheckoutSession,
    CheckoutSummary, Currency, NewOrder, Order, PaymentAccounts, PaymentIntent, PaymentMethod,
    Product, ProductSource, RegistrationForm, StorefrontError, StorefrontResult, User,
};

pub struct Storefront {
    client: Arc<BackendClient>,
    auth: AuthSession,
    cart: Cart,
    checkout: CheckoutSession,
    router: CheckoutRouter,
}

impl Storefront {
    pub fn new(client: BackendClient, accounts: PaymentAccounts, currency: Currency) -> Self {
        let client = Arc::new(client);
        Self {
            auth: AuthSession::new(client.clone()),
            checkout: CheckoutSession::new(client.clone(), currency),
            cart: Cart::new(),
            router: CheckoutRouter::new(accounts),
            client,
        }
    }

    /// Storefront against `WD_API_URL` with the default settlement accounts
    pub fn from_env() -> StorefrontResult<Self> {
        Ok(Self::new(
            BackendClient::from_env()?,
            PaymentAccounts::default(),
            Currency::default(),
        ))
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Resolve the session cookie once, at start-up
    pub async fn probe_session(&mut self) -> Option<&User> {
        self.auth.probe().await;
        self.auth.user()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> StorefrontResult<&User> {
        self.auth.login(email, password).await
    }

    pub async fn register(&mut self, form: RegistrationForm) -> StorefrontResult<&User> {
        self.auth.register(form).await
    }

    /// Log out; the cart and any pending payment go with the session
    pub async fn logout(&mut self) {
        self.auth.logout().await;
        self.cart.clear();
        self.checkout.reset();
    }

    pub async fn products(&self, category: Option<&str>) -> StorefrontResult<Vec<Product>> {
        self.client.list_products(category).await
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// Add a product at the tier its quantity earns
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) {
        self.cart.add_item(CartItem::from_product(product, quantity));
    }

    pub fn summary(&self) -> CheckoutSummary {
        CheckoutSummary::from_cart(&self.cart, self.checkout.currency())
    }

    pub fn checkout(&self) -> &CheckoutSession {
        &self.checkout
    }

    /// Where the logged-in buyer would wire money, and whether they may
    pub fn bank_route(&self) -> Option<BankTransferRoute<'_>> {
        self.auth
            .user()
            .map(|user| self.router.route(&user.region, &user.country))
    }

    /// Obtain (or reuse) the client secret for card confirmation
    pub async fn prepare_card_payment(&mut self) -> StorefrontResult<Option<&PaymentIntent>> {
        self.checkout
            .ensure_payment_intent(&self.cart, self.auth.user())
            .await
    }

    /// Submit the cart. Bank transfer is checked against the router first;
    /// card orders carry the intent confirmed in the browser.
    #[instrument(skip(self))]
    pub async fn place_order(&mut self, method: PaymentMethod) -> StorefrontResult<Order> {
        let user = self.auth.user().ok_or(StorefrontError::NotAuthenticated)?;

        let mut order = NewOrder::from_cart(&self.cart, method)?;
        match method {
            PaymentMethod::Bank => {
                self.router
                    .route(&user.region, &user.country)
                    .ensure_compatible(&user.country)?;
            }
            PaymentMethod::Card => {
                let payment_intent_id = self.checkout.payment_intent_id().ok_or_else(|| {
                    StorefrontError::Validation("Card payment has not been started".to_string())
                })?;
                order = order.with_payment_intent(payment_intent_id);
            }
        }

        let placed = self.client.place_order(&order).await?;
        info!("Order {} placed, clearing cart", placed.id);
        self.cart.clear();
        self.checkout.reset();
        Ok(placed)
    }

    pub async fn orders(&self) -> StorefrontResult<Vec<Order>> {
        self.client.list_orders().await
    }
}
