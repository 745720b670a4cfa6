//! Query command

use serde_json::Value;

use super::{cell, invoke_tool};
use crate::OutputFormat;

const MAX_CELL_WIDTH: usize = 40;

pub async fn handle(
    server_url: &str,
    sql: String,
    limit: Option<u64>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut params = serde_json::json!({ "sql": sql });
    if let Some(limit) = limit {
        params["limit"] = Value::from(limit);
    }

    let data = invoke_tool(server_url, "query", params).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        OutputFormat::Compact => {
            for row in rows(&data) {
                if let Some(row) = row.as_object() {
                    let line: Vec<String> = row.values().map(cell).collect();
                    println!("{}", line.join("\t"));
                }
            }
        }
        OutputFormat::Table => {
            print!("{}", render_table(&data));
            let count = data.get("row_count").and_then(Value::as_u64).unwrap_or(0);
            if data.get("truncated").and_then(Value::as_bool) == Some(true) {
                let total = data.get("total_rows").and_then(Value::as_u64).unwrap_or(count);
                println!("\n{} of {} rows (truncated)", count, total);
            } else {
                println!("\n{} rows", count);
            }
        }
    }

    Ok(())
}

fn rows(data: &Value) -> &[Value] {
    data.get("rows")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Aligned text table of a query result
fn render_table(data: &Value) -> String {
    let columns: Vec<&str> = data
        .get("columns")
        .and_then(Value::as_array)
        .map(|c| c.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if columns.is_empty() {
        return String::new();
    }

    let body: Vec<Vec<String>> = rows(data)
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| truncate(&row.get(*c).map(cell).unwrap_or_default()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let header: Vec<String> = columns.iter().map(|c| c.to_uppercase()).collect();
    let mut out = format_line(&header);
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');
    for row in &body {
        out.push_str(&format_line(row));
    }
    out
}
