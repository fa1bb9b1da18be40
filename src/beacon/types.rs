//! Identifier types and error definitions for beacon API calls.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{FixedBytes, B256};
use thiserror::Error;

/// Errors that can occur while talking to the beacon endpoint chain.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Endpoint answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Connection could not be established or broke mid-request.
    #[error("Connection error: {0}")]
    Connect(String),

    /// Connection was not established within the connect timeout.
    #[error("Connect timeout: {0}")]
    ConnectTimeout(String),

    /// The endpoint accepted the connection but the response did not arrive in
    /// time. Only raised when the HTTP client carries a request timeout.
    #[error("Response timeout: {0}")]
    Timeout(String),

    /// The request itself is malformed (bad id, bad path).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body did not have the expected shape.
    #[error("Unexpected response payload: {0}")]
    Decode(String),

    /// The endpoint list was empty.
    #[error("No beacon endpoints configured")]
    NoEndpoints,

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl BeaconError {
    /// Transient failures are retried and may trigger a fallback; everything
    /// else propagates to the caller untouched.
    pub fn is_transient(&self) -> bool {
        match self {
            BeaconError::Status { status, .. } => *status >= 500 || *status == 429,
            BeaconError::Connect(_) | BeaconError::ConnectTimeout(_) => true,
            _ => false,
        }
    }
}

/// Result type for beacon operations.
pub type BeaconResult<T> = Result<T, BeaconError>;

fn parse_root(s: &str, what: &str) -> BeaconResult<B256> {
    B256::from_str(s).map_err(|e| BeaconError::InvalidRequest(format!("invalid {what} root '{s}': {e}")))
}

fn parse_slot(s: &str, what: &str) -> BeaconResult<u64> {
    s.parse::<u64>()
        .map_err(|_| BeaconError::InvalidRequest(format!("invalid {what} id '{s}'")))
}

/// Block identifier accepted by `/eth/v*/beacon/blocks/{block_id}` style routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Head,
    Genesis,
    Finalized,
    Slot(u64),
    Root(B256),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Head => write!(f, "head"),
            BlockId::Genesis => write!(f, "genesis"),
            BlockId::Finalized => write!(f, "finalized"),
            BlockId::Slot(slot) => write!(f, "{slot}"),
            BlockId::Root(root) => write!(f, "{root}"),
        }
    }
}

impl FromStr for BlockId {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(BlockId::Head),
            "genesis" => Ok(BlockId::Genesis),
            "finalized" => Ok(BlockId::Finalized),
            _ if s.starts_with("0x") => parse_root(s, "block").map(BlockId::Root),
            _ => parse_slot(s, "block").map(BlockId::Slot),
        }
    }
}

impl From<u64> for BlockId {
    fn from(slot: u64) -> Self {
        BlockId::Slot(slot)
    }
}

/// State identifier accepted by `/eth/v1/beacon/states/{state_id}/...` routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Head,
    Genesis,
    Finalized,
    Justified,
    Slot(u64),
    Root(B256),
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Head => write!(f, "head"),
            StateId::Genesis => write!(f, "genesis"),
            StateId::Finalized => write!(f, "finalized"),
            StateId::Justified => write!(f, "justified"),
            StateId::Slot(slot) => write!(f, "{slot}"),
            StateId::Root(root) => write!(f, "{root}"),
        }
    }
}

impl FromStr for StateId {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(StateId::Head),
            "genesis" => Ok(StateId::Genesis),
            "finalized" => Ok(StateId::Finalized),
            "justified" => Ok(StateId::Justified),
            _ if s.starts_with("0x") => parse_root(s, "state").map(StateId::Root),
            _ => parse_slot(s, "state").map(StateId::Slot),
        }
    }
}

/// Validator identifier: registry index or BLS public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorId {
    Index(u64),
    Pubkey(FixedBytes<48>),
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorId::Index(index) => write!(f, "{index}"),
            ValidatorId::Pubkey(pubkey) => write!(f, "{pubkey}"),
        }
    }
}

impl FromStr for ValidatorId {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") {
            FixedBytes::<48>::from_str(s)
                .map(ValidatorId::Pubkey)
                .map_err(|e| BeaconError::InvalidRequest(format!("invalid validator pubkey '{s}': {e}")))
        } else {
            parse_slot(s, "validator").map(ValidatorId::Index)
        }
    }
}
