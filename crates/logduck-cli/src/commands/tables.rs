//! Table listing and description commands

use serde_json::Value;

use super::{cell, invoke_tool};
use crate::OutputFormat;

pub async fn list(server_url: &str, format: OutputFormat) -> anyhow::Result<()> {
    let data = invoke_tool(server_url, "list_tables", Value::Null).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        OutputFormat::Compact => {
            for table in tables(&data) {
                println!("{}", qualified_name(table));
            }
        }
        OutputFormat::Table => {
            let tables = tables(&data);
            println!("Tables ({}):\n", tables.len());
            println!("{:<40} {}", "NAME", "TYPE");
            println!("{}", "-".repeat(52));
            for table in tables {
                let kind = table.get("table_type").and_then(Value::as_str).unwrap_or("-");
                println!("{:<40} {}", qualified_name(table), kind);
            }
        }
    }

    Ok(())
}

pub async fn describe(server_url: &str, table: String, format: OutputFormat) -> anyhow::Result<()> {
    let data = invoke_tool(
        server_url,
        "describe_table",
        serde_json::json!({ "table": table }),
    )
    .await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        OutputFormat::Compact => {
            for column in columns(&data) {
                let name = column.get("name").map(cell).unwrap_or_default();
                let data_type = column.get("data_type").map(cell).unwrap_or_default();
                println!("{}\t{}", name, data_type);
            }
        }
        OutputFormat::Table => {
            let rows = data.get("row_count").map(cell).unwrap_or_default();
            println!("{} ({} rows)\n", table, rows);
            println!("{:<32} {:<24} {}", "COLUMN", "TYPE", "NULLABLE");
            println!("{}", "-".repeat(66));
            for column in columns(&data) {
                let name = column.get("name").map(cell).unwrap_or_default();
                let data_type = column.get("data_type").map(cell).unwrap_or_default();
                let nullable = column.get("nullable").and_then(Value::as_bool) == Some(true);
                println!(
                    "{:<32} {:<24} {}",
                    name,
                    data_type,
                    if nullable { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}

fn tables(data: &Value) -> &[Value] {
    data.get("tables")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn columns(data: &Value) -> &[Value] {
    data.get("columns")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// `schema.name`, leaving the default schema implicit
fn qualified_name(table: &Value) -> String {
    let name = table.get("name").and_then(Value::as_str).unwrap_or("?");
    match table.get("schema").and_then(Value::as_str) {
        Some("main") | None => name.to_string(),
        Some(schema) => format!("{}.{}", schema, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(
            qualified_name(&serde_json::json!({"schema": "main", "name": "logs"})),
            "logs"
        );
        assert_eq!(
            qualified_name(&serde_json::json!({"schema": "archive", "name": "logs"})),
            "archive.logs"
        );
    }

    #[test]
    fn test_missing_lists() {
        assert!(tables(&Value::Null).is_empty());
        assert!(columns(&serde_json::json!({"columns": "nope"})).is_empty());
    }
}
