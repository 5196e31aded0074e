//! HTTP client utilities.
//!
//! Provides a shared HTTP client for all provider fetchers.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::{AxlensError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("axlens/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AxlensError::Network(e.to_string()))
}

/// Get or create a default HTTP client.
pub fn default_client() -> Result<Client> {
    build_client(DEFAULT_TIMEOUT)
}

/// Fetch JSON from a URL via GET.
///
/// # Errors
///
/// Returns `Timeout` on deadline, `Http` on a non-success status,
/// `Network` on transport failure, `ParseResponse` on malformed JSON.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AxlensError::Timeout {
                seconds: DEFAULT_TIMEOUT.as_secs(),
            }
        } else {
            AxlensError::Network(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(AxlensError::Http {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AxlensError::ParseResponse(e.to_string()))
}

/// POST a JSON body and parse the JSON reply.
///
/// # Errors
///
/// Same failure modes as [`fetch_json`].
pub async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<T> {
    let response = client.post(url).json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            AxlensError::Timeout {
                seconds: DEFAULT_TIMEOUT.as_secs(),
            }
        } else {
            AxlensError::Network(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(AxlensError::Http {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AxlensError::ParseResponse(e.to_string()))
}
