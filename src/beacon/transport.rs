//! HTTP transport used by every node of the endpoint chain.
//!
//! One `reqwest::Client` (and so one connection pool) is created at startup and
//! shared by all nodes. Errors are mapped onto [`BeaconError`] here so the chain
//! only reasons about transient vs non-transient failures.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use url::Url;

use crate::beacon::types::{BeaconError, BeaconResult};
use crate::config::BeaconConfig;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// A single GET against a fully resolved URL.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn get(&self, url: &Url) -> BeaconResult<Bytes>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &BeaconConfig) -> BeaconResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| BeaconError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> BeaconResult<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BeaconError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response.bytes().await.map_err(|e| classify(url, e))
    }
}

fn classify(url: &Url, err: reqwest::Error) -> BeaconError {
    let detail = format!("{url}: {err}");
    if err.is_connect() && err.is_timeout() {
        BeaconError::ConnectTimeout(detail)
    } else if err.is_timeout() {
        BeaconError::Timeout(detail)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        // Refused, reset or closed while the exchange was under way.
        BeaconError::Connect(detail)
    } else if err.is_decode() {
        BeaconError::Decode(detail)
    } else {
        BeaconError::InvalidRequest(detail)
    }
}

/// Append an absolute API path to an endpoint base URL, keeping any base path
/// prefix and query (some providers put the API key in either).
pub fn join_path(base: &Url, path: &str) -> BeaconResult<Url> {
    if !path.starts_with('/') {
        return Err(BeaconError::InvalidRequest(format!(
            "path '{path}' must start with '/'"
        )));
    }
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| BeaconError::InvalidRequest("endpoint URL cannot take a path".into()))?
        .pop_if_empty()
        .extend(path.split('/').skip(1));

    if let Some(query) = query {
        let merged = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query.to_string(),
        };
        url.set_query(Some(&merged));
    }
    Ok(url)
}
