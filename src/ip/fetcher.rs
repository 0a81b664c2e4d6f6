use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::error::FetchError;
use super::extract::{decode_body, extract_ipv4};
use crate::config::FetchConfig;

/// Outcome of querying one endpoint: an address, or nothing.
pub type FetchResult = Option<Ipv4Addr>;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Queries a single endpoint. Failures are logged and reported as `None`,
    /// they never reach the caller as errors.
    async fn fetch(&self, endpoint: &str) -> FetchResult;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn try_fetch(&self, endpoint: &str) -> Result<Ipv4Addr, FetchError> {
        let request_failed = |source| FetchError::Request {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(request_failed)?;

        // Error pages are scanned too, some services still print the address.
        let status = response.status();
        if !status.is_success() {
            debug!("{} answered with status {}", endpoint, status);
        }

        let body = response.bytes().await.map_err(request_failed)?;
        let text = decode_body(&body);

        extract_ipv4(&text).ok_or_else(|| FetchError::NoAddress {
            endpoint: endpoint.to_string(),
            status,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &str) -> FetchResult {
        match self.try_fetch(endpoint).await {
            Ok(ip) => {
                debug!("{} reported {}", endpoint, ip);
                Some(ip)
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}
