//! REST clients for the engine's external collaborators.
//!
//! Each client is constructed once at process start from [`crate::config::ServerConfig`] and injected into the
//! relevant API object. They all follow the same shape: a shared `reqwest` client with the service's credential
//! baked into the default headers, and thin methods that map HTTP failures onto the engine's collaborator errors.

mod address_book;
mod gateway;
mod notifications;

use std::sync::Arc;

pub use address_book::RestAddressBook;
pub use gateway::RestPaymentGateway;
pub use notifications::RestNotificationService;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use shop_common::Secret;

use crate::errors::ServerError;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Builds a client with the service credential attached as a sensitive bearer token.
fn build_client(api_key: &Secret<String>) -> Result<Arc<Client>, ServerError> {
    let mut headers = HeaderMap::with_capacity(1);
    if !api_key.reveal().is_empty() {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.reveal()))
            .map_err(|e| ServerError::InitializeError(format!("Invalid API key. {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    let client = Client::builder()
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| ServerError::InitializeError(format!("Could not construct HTTP client. {e}")))?;
    Ok(Arc::new(client))
}
