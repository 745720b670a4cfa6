//! Status, database switching and tool listing commands

use serde_json::Value;

use super::{cell, invoke_tool};
use crate::OutputFormat;

pub async fn handle(server_url: &str, format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/health", server_url.trim_end_matches('/')))
        .send()
        .await?
        .json::<Value>()
        .await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        _ => {
            println!("Logduck Server Status");
            println!("=====================\n");

            let status = health.get("status").and_then(Value::as_str).unwrap_or("unknown");
            println!("Status:  {}", status);

            match health.get("database") {
                Some(database) => print_database(database),
                None => {
                    let error = health.get("error").and_then(Value::as_str).unwrap_or("-");
                    println!("Database: none ({})", error);
                }
            }
        }
    }

    Ok(())
}

/// Switch the server to another initialization script
pub async fn use_database(
    server_url: &str,
    path: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let params = match path {
        Some(path) => serde_json::json!({ "path": path }),
        None => Value::Null,
    };

    let data = invoke_tool(server_url, "set_database", params).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        _ => {
            println!("Database switched\n");
            if let Some(database) = data.get("database") {
                print_database(database);
            }
        }
    }

    Ok(())
}

pub async fn list_tools(server_url: &str, format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/tools", server_url.trim_end_matches('/')))
        .send()
        .await?
        .json::<Value>()
        .await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        _ => {
            if let Some(tools) = resp.get("tools").and_then(Value::as_array) {
                println!("Available tools ({}):\n", tools.len());
                for tool in tools {
                    let name = tool.get("name").and_then(Value::as_str).unwrap_or("");
                    let description = tool.get("description").and_then(Value::as_str).unwrap_or("");
                    println!("  {:<20} {}", name, description);
                }
            }
        }
    }

    Ok(())
}

fn print_database(database: &Value) {
    let source = database.get("source");
    let path = source.and_then(|s| s.get("path")).map(cell).unwrap_or_default();
    let kind = source.and_then(|s| s.get("kind")).map(cell).unwrap_or_default();
    let state = database.get("state").map(cell).unwrap_or_default();
    let opened = database.get("opened_at").map(cell).unwrap_or_default();
    let statements = database.get("statement_count").map(cell).unwrap_or_default();

    println!("Script:     {} ({})", path, kind);
    println!("State:      {}", state);
    println!("Opened at:  {}", opened);
    println!("Statements: {}", statements);
}
