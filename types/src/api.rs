//! Wire types for the ledger's JSON-RPC interface.

use crate::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";

/// Execution status value that marks a successful transaction.
pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// How long `sui_executeTransactionBlock` blocks before returning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitMode {
    /// Return once effects are certified.
    WaitForEffectsCert,
    /// Return once the full node has applied the transaction locally.
    WaitForLocalExecution,
}

impl WaitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitMode::WaitForEffectsCert => "WaitForEffectsCert",
            WaitMode::WaitForLocalExecution => "WaitForLocalExecution",
        }
    }
}

/// Response of `sui_getObject` (and entries of `suix_getOwnedObjects`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ObjectResponse {
    #[serde(default)]
    pub data: Option<ObjectData>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: ObjectId,
    #[serde(default, rename = "type")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub content: Option<ObjectContent>,
}

impl ObjectData {
    /// Declared type of the object, preferring the top-level `type` field.
    pub fn type_tag(&self) -> Option<&str> {
        self.object_type
            .as_deref()
            .or_else(|| self.content.as_ref().map(|content| content.object_type.as_str()))
    }

    /// Struct fields of a Move object, if the content was requested.
    pub fn fields(&self) -> Option<&Value> {
        self.content.as_ref().map(|content| &content.fields)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectContent {
    pub data_type: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub fields: Value,
}

/// One page of `suix_getOwnedObjects`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedObjectsPage {
    pub data: Vec<ObjectResponse>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Argument to a Move call, in the JSON form accepted by `unsafe_moveCall`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallArg {
    Object(ObjectId),
    /// Serialized as an explicit `vector<u8>` (array of numbers), never a string.
    Bytes(Vec<u8>),
}

/// A call into the game module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    pub arguments: Vec<CallArg>,
}

impl MoveCall {
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}

impl fmt::Display for MoveCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target())
    }
}

/// Unsigned transaction produced by the ledger's transaction builder.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBytes {
    /// Base64-encoded `TransactionData`.
    pub tx_bytes: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<TransactionEffects>,
    #[serde(default)]
    pub events: Option<Vec<LedgerEvent>>,
    #[serde(default)]
    pub object_changes: Option<Vec<Value>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub transaction_digest: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionStatus {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: "failure".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub parsed_json: Value,
}

/// Body accepted by the sponsor service.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRequest {
    pub sender: ObjectId,
    pub tx_bytes: String,
}

/// Transaction returned by the sponsor, with the sponsor's signature over it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredTransaction {
    pub tx_bytes: String,
    pub signature: String,
}
