//! # Stripe PaymentIntents
//!
//! Creates PaymentIntents for in-page card confirmation and verifies them
//! again when the order is placed.

use crate::config::StripeConfig;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use wd_core::{
    is_payment_intent_id, PaymentIntent, PaymentIntentGateway, PaymentIntentRequest,
    PaymentMethod, Settlement, SettlementContext, SettlementStrategy, StorefrontError,
    StorefrontResult,
};

const PROVIDER: &str = "stripe";

/// Client for the `/v1/payment_intents` endpoints
pub struct StripePaymentIntents {
    config: StripeConfig,
    client: Client,
}

impl StripePaymentIntents {
    /// Create a new PaymentIntents client
    pub fn new(config: StripeConfig) -> StorefrontResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                StorefrontError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StorefrontResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Form body for a create call. Metadata keys are sorted so the body is
    /// stable for a given request.
    fn build_form(request: &PaymentIntentRequest) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.as_str().to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        let mut keys: Vec<&String> = request.metadata.keys().collect();
        keys.sort();
        for key in keys {
            form_params.push((format!("metadata[{}]", key), request.metadata[key].clone()));
        }

        form_params
    }

    /// Fetch an existing PaymentIntent
    #[instrument(skip(self))]
    pub async fn retrieve(&self, payment_intent_id: &str) -> StorefrontResult<StripePaymentIntent> {
        // The id becomes a path segment; anything else could address another resource
        if !is_payment_intent_id(payment_intent_id) {
            return Err(StorefrontError::Validation(format!(
                "Invalid payment intent id: {}",
                payment_intent_id
            )));
        }

        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base_url, payment_intent_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| StorefrontError::NetworkError(e.to_string()))?;

        parse_response(response).await
    }
}

#[async_trait]
impl PaymentIntentGateway for StripePaymentIntents {
    #[instrument(skip(self, request), fields(amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> StorefrontResult<PaymentIntent> {
        if request.amount <= 0 {
            return Err(StorefrontError::Validation(
                "Amount must be positive".to_string(),
            ));
        }

        let form_params = Self::build_form(request);
        debug!(
            "Creating Stripe payment intent: amount={}, currency={}",
            request.amount, request.currency
        );

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| StorefrontError::NetworkError(e.to_string()))?;

        let intent: StripePaymentIntent = parse_response(response).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            StorefrontError::Serialization("Stripe response has no client_secret".to_string())
        })?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(PaymentIntent {
            client_secret,
            payment_intent_id: intent.id,
        })
    }

    fn gateway_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Card settlement: the buyer confirmed in the browser, the server checks
/// with Stripe that the intent really succeeded for the expected amount.
pub struct StripeCardSettlement {
    intents: Arc<StripePaymentIntents>,
}

impl StripeCardSettlement {
    pub fn new(intents: Arc<StripePaymentIntents>) -> Self {
        Self { intents }
    }
}

#[async_trait]
impl SettlementStrategy for StripeCardSettlement {
    #[instrument(skip(self, ctx), fields(user_id = ctx.user.id))]
    async fn settle(&self, ctx: &SettlementContext<'_>) -> StorefrontResult<Settlement> {
        let payment_intent_id = ctx.order.payment_intent_id.as_deref().ok_or_else(|| {
            StorefrontError::Validation(
                "payment_intent_id is required for card payments".to_string(),
            )
        })?;

        let intent = self.intents.retrieve(payment_intent_id).await?;

        if intent.id != payment_intent_id {
            warn!(
                "Stripe returned intent {} for requested {}",
                intent.id, payment_intent_id
            );
            return Err(StorefrontError::Validation(
                "Payment intent does not match".to_string(),
            ));
        }

        if intent.status != "succeeded" {
            warn!(
                "Payment intent {} not settled: status={}",
                intent.id, intent.status
            );
            return Err(StorefrontError::Validation(format!(
                "Payment not completed (status: {})",
                intent.status
            )));
        }

        if intent.amount != ctx.amount_minor {
            warn!(
                "Payment intent {} amount {} does not match order amount {}",
                intent.id, intent.amount, ctx.amount_minor
            );
            return Err(StorefrontError::Validation(
                "Payment amount does not match order total".to_string(),
            ));
        }

        Ok(Settlement::CardCharged {
            payment_intent_id: intent.id,
        })
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Card
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(response: Response) -> StorefrontResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StorefrontError::NetworkError(e.to_string()))?;

    if !status.is_success() {
        error!("Stripe API error: status={}, body={}", status, body);

        // Parse Stripe error
        if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
            return Err(StorefrontError::ProviderError {
                provider: PROVIDER.to_string(),
                message: error_response.error.message,
            });
        }

        return Err(StorefrontError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        StorefrontError::Serialization(format!("Failed to parse Stripe response: {}", e))
    })
}

// =============================================================================
// Stripe API Types
// =============================================================================

/// The fields of a Stripe PaymentIntent object the storefront reads
#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
