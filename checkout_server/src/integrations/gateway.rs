use std::sync::Arc;

use checkout_engine::traits::{GatewayClientError, IntentRequest, PaymentGateway, PaymentIntent};
use log::*;
use reqwest::Client;

use crate::{config::GatewayConfig, errors::ServerError, integrations::build_client};

/// REST client for the payment gateway's intent API.
#[derive(Clone)]
pub struct RestPaymentGateway {
    name: String,
    base_url: String,
    client: Arc<Client>,
}

impl RestPaymentGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, ServerError> {
        let client = build_client(&config.api_key)?;
        Ok(Self { name: config.name.clone(), base_url: config.base_url.trim_end_matches('/').to_string(), client })
    }
}

impl std::fmt::Debug for RestPaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RestPaymentGateway({})", self.name)
    }
}

impl PaymentGateway for RestPaymentGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayClientError> {
        let url = format!("{}/v1/intents", self.base_url);
        trace!("💳️ Opening a payment intent for {} at {url}", request.amount);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayClientError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("💳️ The gateway refused a payment intent ({status}): {message}");
            return Err(GatewayClientError::Rejected { status: status.as_u16(), message });
        }
        let intent =
            response.json::<PaymentIntent>().await.map_err(|e| GatewayClientError::InvalidResponse(e.to_string()))?;
        debug!("💳️ Payment intent {} is open", intent.gateway_order_id);
        Ok(intent)
    }
}
