use crate::models::dao::DaoPolicy;
use base64::Engine as _;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC endpoint returned HTTP {0}")]
    Status(u16),

    #[error("RPC endpoint rate limited the request")]
    RateLimited,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("malformed RPC response: {0}")]
    Malformed(String),
}

/// Read-only view of the chain the indexer depends on.
/// Tests substitute an in-memory fake.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Raw proposal records with ids starting at `from_index`, at most `limit`.
    async fn fetch_proposal_page(
        &self,
        contract_id: &str,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<Value>, RpcError>;

    /// Total proposals ever created; valid ids are `0..count`.
    async fn fetch_proposal_count(&self, contract_id: &str) -> Result<u64, RpcError>;

    async fn fetch_policy(&self, contract_id: &str) -> Result<DaoPolicy, RpcError>;

    /// DAO account ids registered with a factory contract.
    async fn fetch_dao_list(
        &self,
        factory_id: &str,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<String>, RpcError>;
}

/// JSON-RPC client issuing `call_function` view queries at final finality.
pub struct NearRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
}

impl NearRpcClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.to_string(),
        })
    }

    pub async fn call_view(
        &self,
        contract_id: &str,
        method_name: &str,
        args: Value,
    ) -> Result<Value, RpcError> {
        let body = view_request_body(contract_id, method_name, &args);

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RpcError::RateLimited);
        }
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        log::debug!("{contract_id}.{method_name} answered");
        decode_view_result(&envelope)
    }
}

#[async_trait::async_trait]
impl DataSource for NearRpcClient {
    async fn fetch_proposal_page(
        &self,
        contract_id: &str,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<Value>, RpcError> {
        let value = self
            .call_view(
                contract_id,
                "get_proposals",
                json!({ "from_index": from_index, "limit": limit }),
            )
            .await?;
        match value {
            Value::Array(records) => Ok(records),
            other => Err(RpcError::Malformed(format!(
                "get_proposals returned {}",
                type_name(&other)
            ))),
        }
    }

    async fn fetch_proposal_count(&self, contract_id: &str) -> Result<u64, RpcError> {
        let value = self
            .call_view(contract_id, "get_last_proposal_id", json!({}))
            .await?;
        value.as_u64().ok_or_else(|| {
            RpcError::Malformed(format!("get_last_proposal_id returned {}", type_name(&value)))
        })
    }

    async fn fetch_policy(&self, contract_id: &str) -> Result<DaoPolicy, RpcError> {
        let value = self.call_view(contract_id, "get_policy", json!({})).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Malformed(format!("get_policy: {e}")))
    }

    async fn fetch_dao_list(
        &self,
        factory_id: &str,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<String>, RpcError> {
        let value = self
            .call_view(
                factory_id,
                "get_dao_list",
                json!({ "from_index": from_index, "limit": limit }),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| RpcError::Malformed(format!("get_dao_list: {e}")))
    }
}

fn view_request_body(contract_id: &str, method_name: &str, args: &Value) -> Value {
    let args_base64 = base64::engine::general_purpose::STANDARD.encode(args.to_string());
    json!({
        "jsonrpc": "2.0",
        "id": "gri",
        "method": "query",
        "params": {
            "request_type": "call_function",
            "finality": "final",
            "account_id": contract_id,
            "method_name": method_name,
            "args_base64": args_base64,
        }
    })
}

/// Unwrap a `call_function` envelope. The contract's return value arrives
/// as a byte array holding UTF-8 JSON.
fn decode_view_result(envelope: &Value) -> Result<Value, RpcError> {
    if let Some(error) = envelope.get("error") {
        let message = error
            .pointer("/cause/name")
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(RpcError::Rpc(message));
    }

    let result = envelope
        .get("result")
        .ok_or_else(|| RpcError::Malformed("missing result".to_string()))?;

    // Contract panics come back as a successful envelope carrying `result.error`.
    if let Some(error) = result.get("error").and_then(Value::as_str) {
        return Err(RpcError::Rpc(error.to_string()));
    }

    let bytes = result
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| RpcError::Malformed("missing result bytes".to_string()))?
        .iter()
        .map(|byte| {
            byte.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| RpcError::Malformed("result byte out of range".to_string()))
        })
        .collect::<Result<Vec<u8>, RpcError>>()?;

    serde_json::from_slice(&bytes).map_err(|e| RpcError::Malformed(format!("result body: {e}")))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_for(body: &Value) -> Value {
        let bytes: Vec<Value> = body.to_string().bytes().map(Value::from).collect();
        json!({
            "jsonrpc": "2.0",
            "id": "gri",
            "result": { "result": bytes, "logs": [], "block_height": 1 }
        })
    }

    #[test]
    fn request_encodes_args_as_base64() {
        let body = view_request_body(
            "x.sputnik-dao.near",
            "get_proposals",
            &json!({ "from_index": 0, "limit": 50 }),
        );
        assert_eq!(body["method"], "query");
        assert_eq!(body["params"]["request_type"], "call_function");
        assert_eq!(body["params"]["finality"], "final");
        assert_eq!(body["params"]["method_name"], "get_proposals");

        let encoded = body["params"]["args_base64"].as_str().expect("args");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .expect("valid base64");
        let args: Value = serde_json::from_slice(&decoded).expect("json args");
        assert_eq!(args, json!({ "from_index": 0, "limit": 50 }));
    }

    #[test]
    fn decodes_byte_array_result() {
        let decoded = decode_view_result(&envelope_for(&json!([{ "id": 0 }, { "id": 1 }])))
            .expect("decoded");
        assert_eq!(decoded, json!([{ "id": 0 }, { "id": 1 }]));

        let count = decode_view_result(&envelope_for(&json!(42))).expect("decoded");
        assert_eq!(count.as_u64(), Some(42));
    }

    #[test]
    fn surfaces_rpc_and_contract_errors() {
        let rpc = decode_view_result(&json!({
            "error": { "name": "HANDLER_ERROR", "cause": { "name": "UNKNOWN_ACCOUNT" }, "message": "x" }
        }));
        assert!(matches!(rpc, Err(RpcError::Rpc(ref m)) if m == "UNKNOWN_ACCOUNT"));

        let panic = decode_view_result(&json!({
            "result": { "error": "wasm execution failed", "logs": [] }
        }));
        assert!(matches!(panic, Err(RpcError::Rpc(_))));
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert!(matches!(
            decode_view_result(&json!({ "jsonrpc": "2.0" })),
            Err(RpcError::Malformed(_))
        ));
        assert!(matches!(
            decode_view_result(&json!({ "result": { "result": [300] } })),
            Err(RpcError::Malformed(_))
        ));
        assert!(matches!(
            decode_view_result(&json!({ "result": { "result": [123] } })),
            Err(RpcError::Malformed(_))
        ));
    }
}
