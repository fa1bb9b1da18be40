//! Beacon API client with transparent endpoint fallback.
//!
//! # Responsibilities
//! - Own the head of the endpoint chain
//! - Expose one method per supported beacon API route
//! - Decode response envelopes into typed payloads
//!
//! Callers never see which endpoint served a response.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::beacon::chain::{build_chain, ChainNode, EndpointStatus, Request};
use crate::beacon::responses::{
    BeaconResponse, BlockHeader, FinalityCheckpoints, SignedBeaconBlock, ValidatorInfo,
};
use crate::beacon::transport::{HttpTransport, Transport};
use crate::beacon::types::{BeaconError, BeaconResult, BlockId, StateId, ValidatorId};
use crate::config::{BeaconConfig, ResilienceConfig};

/// Handle to the endpoint chain. Cheap to clone; clones share breaker state.
#[derive(Clone)]
pub struct BeaconClient {
    head: Arc<ChainNode>,
}

impl BeaconClient {
    /// Build the chain over HTTP from configuration.
    pub fn new(beacon: &BeaconConfig, resilience: &ResilienceConfig) -> BeaconResult<Self> {
        let endpoints = beacon
            .endpoints
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    BeaconError::InvalidRequest(format!("invalid beacon endpoint '{raw}': {e}"))
                })
            })
            .collect::<BeaconResult<Vec<_>>>()?;
        let transport = Arc::new(HttpTransport::new(beacon)?);
        let client = Self::with_transport(&endpoints, resilience, transport)?;

        tracing::info!(
            endpoints = ?client.endpoints(),
            failure_threshold = resilience.failure_threshold,
            recovery_timeout_secs = resilience.recovery_timeout_secs,
            "Beacon client initialized"
        );
        Ok(client)
    }

    /// Build the chain over an arbitrary transport.
    pub fn with_transport(
        endpoints: &[Url],
        resilience: &ResilienceConfig,
        transport: Arc<dyn Transport>,
    ) -> BeaconResult<Self> {
        let head = build_chain(endpoints, resilience, transport)?;
        Ok(Self { head })
    }

    /// Fetch `path` through the chain and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> BeaconResult<T> {
        let span = tracing::debug_span!("beacon_get", request_id = %Uuid::new_v4(), path);
        async {
            let body = self.head.get(Request::new(path)).await?;
            serde_json::from_slice(&body).map_err(|e| BeaconError::Decode(format!("{path}: {e}")))
        }
        .instrument(span)
        .await
    }

    /// Fetch `path` as untyped JSON.
    pub async fn get_json(&self, path: &str) -> BeaconResult<serde_json::Value> {
        self.get(path).await
    }

    /// `GET /eth/v2/beacon/blocks/{block_id}`.
    pub async fn get_block(&self, block_id: &str) -> BeaconResult<SignedBeaconBlock> {
        let block_id: BlockId = block_id.parse()?;
        let path = format!("/eth/v2/beacon/blocks/{block_id}");
        let response: BeaconResponse<SignedBeaconBlock> = self.get(&path).await?;
        Ok(response.data)
    }

    /// `GET /eth/v1/beacon/headers/{block_id}`.
    pub async fn get_block_header(&self, block_id: &str) -> BeaconResult<BlockHeader> {
        let block_id: BlockId = block_id.parse()?;
        let path = format!("/eth/v1/beacon/headers/{block_id}");
        let response: BeaconResponse<BlockHeader> = self.get(&path).await?;
        Ok(response.data)
    }

    /// `GET /eth/v1/beacon/states/{state_id}/validators/{validator_id}`.
    pub async fn get_validator(
        &self,
        state_id: &str,
        validator_id: &str,
    ) -> BeaconResult<ValidatorInfo> {
        let state_id: StateId = state_id.parse()?;
        let validator_id: ValidatorId = validator_id.parse()?;
        let path = format!("/eth/v1/beacon/states/{state_id}/validators/{validator_id}");
        let response: BeaconResponse<ValidatorInfo> = self.get(&path).await?;
        Ok(response.data)
    }

    /// `GET /eth/v1/beacon/states/{state_id}/finality_checkpoints`.
    pub async fn get_finality_checkpoints(&self, state_id: &str) -> BeaconResult<FinalityCheckpoints> {
        let state_id: StateId = state_id.parse()?;
        let path = format!("/eth/v1/beacon/states/{state_id}/finality_checkpoints");
        let response: BeaconResponse<FinalityCheckpoints> = self.get(&path).await?;
        Ok(response.data)
    }

    /// Endpoint labels, most preferred first.
    pub fn endpoints(&self) -> Vec<String> {
        self.head.iter().map(|node| node.label().to_string()).collect()
    }

    /// Breaker state and counters for every endpoint, most preferred first.
    pub fn endpoint_status(&self) -> Vec<EndpointStatus> {
        self.head.iter().map(ChainNode::status).collect()
    }
}

impl fmt::Debug for BeaconClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeaconClient")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}
