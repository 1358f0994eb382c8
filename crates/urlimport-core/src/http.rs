//! HTTP/HTTPS fetching for remote roots and module sources.

use crate::config::NetworkConfig;
use crate::error::{ImportError, Result};
use crate::fetch::Fetch;
use std::time::Duration;
use tracing::debug;

/// Blocking HTTP client for listings and module sources.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher with the given configuration.
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(
                config.max_redirects as usize,
            ));

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua);
        } else {
            builder = builder.user_agent(format!("urlimport/{}", env!("CARGO_PKG_VERSION")));
        }

        if let Some(ref proxy_url) = config.http_proxy {
            let proxy = reqwest::Proxy::http(proxy_url)
                .map_err(|e| ImportError::Config(format!("Invalid HTTP proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        if let Some(ref proxy_url) = config.https_proxy {
            let proxy = reqwest::Proxy::https(proxy_url)
                .map_err(|e| ImportError::Config(format!("Invalid HTTPS proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            ImportError::Network(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }

    /// Create a new HTTP fetcher with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&NetworkConfig::default())
    }
}

impl Fetch for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ImportError::Network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: status.to_string(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ImportError::Network(format!("Failed to read response: {}", e)))
    }
}
