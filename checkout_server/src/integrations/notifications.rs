use std::sync::Arc;

use checkout_engine::{
    db_types::Order,
    traits::{NotificationError, NotificationService},
};
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::{config::RemoteServiceConfig, errors::ServerError, integrations::build_client};

#[derive(Debug, Clone, Serialize)]
struct OrderConfirmationMessage<'a> {
    recipient_email: &'a str,
    recipient_name: &'a str,
    order_id: i64,
    order_total: Money,
}

#[derive(Debug, Clone, Deserialize)]
struct DeliveryReceipt {
    message_id: String,
}

/// REST client for the transactional notification service.
#[derive(Clone)]
pub struct RestNotificationService {
    base_url: String,
    client: Arc<Client>,
}

impl RestNotificationService {
    pub fn new(config: &RemoteServiceConfig) -> Result<Self, ServerError> {
        let client = build_client(&config.api_key)?;
        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_string(), client })
    }
}

impl std::fmt::Debug for RestNotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RestNotificationService")
    }
}

impl NotificationService for RestNotificationService {
    async fn send_order_confirmation(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        order: &Order,
    ) -> Result<String, NotificationError> {
        let url = format!("{}/v1/messages/order-confirmation", self.base_url);
        let message = OrderConfirmationMessage {
            recipient_email,
            recipient_name,
            order_id: order.id,
            order_total: order.total,
        };
        let response = self
            .client
            .post(&url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotificationError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError(format!("The notification service answered {status}: {body}")));
        }
        let receipt = response.json::<DeliveryReceipt>().await.map_err(|e| NotificationError(e.to_string()))?;
        debug!("📧️ Order confirmation for order {} queued as {}", order.id, receipt.message_id);
        Ok(receipt.message_id)
    }
}
