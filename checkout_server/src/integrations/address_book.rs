use std::sync::Arc;

use checkout_engine::{
    db_types::{Address, Owner},
    traits::{AddressBook, AddressBookError},
};
use log::*;
use reqwest::{Client, StatusCode};

use crate::{config::RemoteServiceConfig, errors::ServerError, integrations::build_client};

/// REST client for the customer profile service, consulted for a default address when a checkout request carries
/// none.
#[derive(Clone)]
pub struct RestAddressBook {
    base_url: String,
    client: Arc<Client>,
}

impl RestAddressBook {
    pub fn new(config: &RemoteServiceConfig) -> Result<Self, ServerError> {
        let client = build_client(&config.api_key)?;
        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_string(), client })
    }
}

impl std::fmt::Debug for RestAddressBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RestAddressBook")
    }
}

impl AddressBook for RestAddressBook {
    async fn default_address(&self, owner: &Owner) -> Result<Option<Address>, AddressBookError> {
        let url = format!("{}/v1/profiles/{}/{}/default-address", self.base_url, owner.kind, owner.id);
        let response = self.client.get(&url).send().await.map_err(|e| AddressBookError(e.to_string()))?;
        let status = response.status();
        // no profile, or a profile with no address on file
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            trace!("📇️ No default address on file for {owner}");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AddressBookError(format!("The profile service answered {status}: {body}")));
        }
        let address = response.json::<Address>().await.map_err(|e| AddressBookError(e.to_string()))?;
        Ok(Some(address))
    }
}
