//! Proxy vendor listing client.

use crate::endpoint::{ProxyEndpoint, ProxyScheme};
use crate::error::VendorApiError;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

/// A source of proxy endpoints queried over the network.
///
/// The reqwest-backed [`HttpVendorApi`] is the production implementation;
/// tests substitute scripted ones.
#[async_trait]
pub trait VendorApi: Send + Sync {
    async fn list_endpoints(&self) -> Result<Vec<ProxyEndpoint>, VendorApiError>;
}

/// Shape of the vendor's listing response (Webshare direct-mode format).
#[derive(Debug, Deserialize)]
struct VendorListing {
    results: Vec<VendorRecord>,
}

#[derive(Debug, Deserialize)]
struct VendorRecord {
    proxy_address: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    #[serde(default = "default_valid")]
    valid: bool,
}

fn default_valid() -> bool {
    true
}

/// Lists proxies from a vendor inventory endpoint authenticated with a
/// static token header.
pub struct HttpVendorApi {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpVendorApi {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl VendorApi for HttpVendorApi {
    async fn list_endpoints(&self) -> Result<Vec<ProxyEndpoint>, VendorApiError> {
        let response = self
            .client
            .get(&self.url)
            .header("Authorization", format!("Token {}", self.api_key))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(VendorApiError::Status(response.status()));
        }
        let listing: VendorListing = response.json().await?;
        Ok(listing
            .results
            .into_iter()
            .filter_map(record_to_endpoint)
            .collect())
    }
}

fn record_to_endpoint(record: VendorRecord) -> Option<ProxyEndpoint> {
    if !record.valid {
        return None;
    }
    match ProxyEndpoint::new(
        ProxyScheme::Http,
        record.proxy_address,
        record.port,
        record.username,
        record.password,
    ) {
        Ok(endpoint) => Some(endpoint),
        Err(e) => {
            debug!("Skipping vendor record: {}", e);
            None
        }
    }
}
