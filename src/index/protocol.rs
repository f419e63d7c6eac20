//! Messages exchanged with the package-index evaluator
//!
//! The evaluator speaks JSON-RPC 2.0 with `Content-Length` framing, the same
//! framing the editor uses with this server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ATTRPATH_COMPLETE: &str = "attrset/attrpathComplete";
pub const ATTRPATH_INFO: &str = "attrset/attrpathInfo";

/// Attribute path inside the package index, e.g. `["python3Packages", "requests"]`.
pub type AttrPath = Vec<String>;

/// Parameters of `attrset/attrpathComplete`: list the names under `scope`
/// starting with `prefix`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrPathCompleteParams {
    pub scope: AttrPath,
    pub prefix: String,
}

/// Reply of `attrset/attrpathComplete`.
pub type AttrPathCompleteResponse = Vec<String>;

/// Reply of `attrset/attrpathInfo`: package metadata of one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "PName", skip_serializing_if = "Option::is_none")]
    pub pname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Incoming JSON-RPC message. Notifications from the evaluator have no `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}
