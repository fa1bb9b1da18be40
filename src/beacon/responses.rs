//! Beacon API response payloads.
//!
//! Integers arrive as decimal strings on the wire; roots and keys as 0x-hex.
//! Block bodies are fork-dependent and kept as opaque JSON.

use alloy::primitives::{Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};

/// Standard beacon API envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconResponse<T> {
    /// Fork name, present on versioned (v2) routes.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub execution_optimistic: Option<bool>,
    #[serde(default)]
    pub finalized: Option<bool>,
    pub data: T,
}

/// `data` of `/eth/v2/beacon/blocks/{block_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconBlock {
    #[serde(with = "quoted_u64")]
    pub slot: u64,
    #[serde(with = "quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: B256,
    pub state_root: B256,
    pub body: serde_json::Value,
}

impl BeaconBlock {
    /// Execution-layer block number, for post-merge blocks.
    pub fn execution_block_number(&self) -> Option<u64> {
        let raw = self.body.get("execution_payload")?.get("block_number")?;
        match raw {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Fee recipient of the execution payload, for post-merge blocks.
    pub fn fee_recipient(&self) -> Option<&str> {
        self.body.get("execution_payload")?.get("fee_recipient")?.as_str()
    }
}

/// `data` of `/eth/v1/beacon/headers/{block_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub root: B256,
    pub canonical: bool,
    pub header: SignedBeaconBlockHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    #[serde(with = "quoted_u64")]
    pub slot: u64,
    #[serde(with = "quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: B256,
    pub state_root: B256,
    pub body_root: B256,
}

/// `data` of `/eth/v1/beacon/states/{state_id}/validators/{validator_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorInfo {
    #[serde(with = "quoted_u64")]
    pub index: u64,
    /// Balance in gwei.
    #[serde(with = "quoted_u64")]
    pub balance: u64,
    /// e.g. `active_ongoing`, `exited_unslashed`, `withdrawal_done`.
    pub status: String,
    pub validator: Validator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validator {
    pub pubkey: FixedBytes<48>,
    pub withdrawal_credentials: B256,
    #[serde(with = "quoted_u64")]
    pub effective_balance: u64,
    pub slashed: bool,
    #[serde(with = "quoted_u64")]
    pub activation_eligibility_epoch: u64,
    #[serde(with = "quoted_u64")]
    pub activation_epoch: u64,
    #[serde(with = "quoted_u64")]
    pub exit_epoch: u64,
    #[serde(with = "quoted_u64")]
    pub withdrawable_epoch: u64,
}

/// `data` of `/eth/v1/beacon/states/{state_id}/finality_checkpoints`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalityCheckpoints {
    pub previous_justified: Checkpoint,
    pub current_justified: Checkpoint,
    pub finalized: Checkpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(with = "quoted_u64")]
    pub epoch: u64,
    pub root: B256,
}

/// Serde adapter for integers encoded as decimal strings (numbers are accepted too).
pub mod quoted_u64 {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct QuotedVisitor;

        impl Visitor<'_> for QuotedVisitor {
            type Value = u64;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an unsigned integer or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
                Ok(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
                v.parse().map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(QuotedVisitor)
    }
}
