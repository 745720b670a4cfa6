//! MCP prompts: canned starting points for exploring logs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use logduck_common::{Error, Result};

/// MCP Prompt definition
#[derive(Debug, Clone, Serialize)]
pub struct McpPrompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

pub fn list_prompts() -> Vec<McpPrompt> {
    vec![
        McpPrompt {
            name: "explore_database".to_string(),
            description: "Survey the tables in the log database and summarize what they hold"
                .to_string(),
            arguments: Vec::new(),
        },
        McpPrompt {
            name: "investigate_errors".to_string(),
            description: "Find the most frequent errors in a log table".to_string(),
            arguments: vec![
                PromptArgument {
                    name: "table".to_string(),
                    description: "Table holding the log records".to_string(),
                    required: true,
                },
                PromptArgument {
                    name: "column".to_string(),
                    description: "Column holding the severity level (default: level)".to_string(),
                    required: false,
                },
            ],
        },
    ]
}

#[derive(Debug, Default, Deserialize)]
struct InvestigateErrorsArgs {
    table: Option<String>,
    column: Option<String>,
}

/// Render a prompt with its arguments into MCP messages
pub fn get_prompt(name: &str, arguments: &Value) -> Result<Value> {
    let (description, text) = match name {
        "explore_database" => (
            "Survey the log database",
            "Use list_tables to see what is loaded. For each table, call describe_table, \
             then run a small query (LIMIT 5) to look at sample rows. Summarize which \
             tables hold logs, their time range, and which columns look useful for \
             filtering."
                .to_string(),
        ),
        "investigate_errors" => {
            let args: InvestigateErrorsArgs = if arguments.is_null() {
                InvestigateErrorsArgs::default()
            } else {
                serde_json::from_value(arguments.clone())
                    .map_err(|e| Error::InvalidParameter(e.to_string()))?
            };
            let table = args
                .table
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| Error::InvalidParameter("table argument is required".to_string()))?;
            let column = args.column.unwrap_or_else(|| "level".to_string());

            (
                "Investigate errors in a log table",
                format!(
                    "Call describe_table on {table} to learn its columns. Then query {table} \
                     for rows where upper({column}) is ERROR or FATAL, grouped by message, \
                     ordered by count descending. Report the top patterns, when they first \
                     and last occurred, and any service or host they cluster on."
                ),
            )
        }
        _ => return Err(Error::NotFound(format!("Prompt not found: {}", name))),
    };

    Ok(serde_json::json!({
        "description": description,
        "messages": [{
            "role": "user",
            "content": {
                "type": "text",
                "text": text
            }
        }]
    }))
}
