//! CLI command handlers

pub mod query;
pub mod status;
pub mod tables;

use anyhow::{anyhow, bail};
use serde_json::Value;

/// Invoke a tool on the MCP server and return its `data` payload
pub async fn invoke_tool(server_url: &str, tool: &str, params: Value) -> anyhow::Result<Value> {
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/mcp", server_url.trim_end_matches('/')))
        .json(&serde_json::json!({
            "tool": tool,
            "params": params
        }))
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;

    unwrap_response(resp)
}

fn unwrap_response(mut resp: Value) -> anyhow::Result<Value> {
    if resp.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(resp.get_mut("data").map(Value::take).unwrap_or(Value::Null));
    }

    match resp.get("error").and_then(Value::as_str) {
        Some(message) => bail!("{}", message),
        None => Err(anyhow!("malformed response from server: {}", resp)),
    }
}

/// Render a JSON cell for table output
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_response_success() {
        let data = unwrap_response(serde_json::json!({"success": true, "data": {"count": 2}}))
            .unwrap();
        assert_eq!(data["count"], 2);
    }

    #[test]
    fn test_unwrap_response_failure() {
        let err = unwrap_response(serde_json::json!({"success": false, "error": "Query error: x"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Query error: x");

        assert!(unwrap_response(serde_json::json!({"status": "?"})).is_err());
    }

    #[test]
    fn test_cell() {
        assert_eq!(cell(&Value::Null), "NULL");
        assert_eq!(cell(&serde_json::json!("ERROR")), "ERROR");
        assert_eq!(cell(&serde_json::json!(42)), "42");
        assert_eq!(cell(&serde_json::json!("9007199254740993")), "9007199254740993");
    }
}
