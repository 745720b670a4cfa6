//! MCP Tool implementations

use std::{collections::BTreeMap, path::PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use logduck_common::{split_statements, Error, Result};

use crate::state::AppState;

/// First keywords accepted by the query tool in read-only mode
const READ_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "SUMMARIZE", "EXPLAIN", "PRAGMA", "FROM", "VALUES",
    "TABLE",
];

/// MCP Tool definition
#[derive(Debug, Clone, Serialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: BTreeMap<String, McpTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: McpTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&McpTool> {
        self.tools.get(name)
    }

    pub fn list(&self) -> Vec<&McpTool> {
        self.tools.values().collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the default tool registry with all available tools
pub fn create_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // query tool
    registry.register(McpTool {
        name: "query".to_string(),
        description: "Run a read-only SQL query against the log database (DuckDB dialect). \
                      Returns rows as JSON objects."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "required": ["sql"],
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "A single SQL statement, \
                                    e.g. SELECT level, count(*) FROM logs GROUP BY level"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum rows to return (capped by server configuration)"
                }
            }
        }),
    });

    // list_tables tool
    registry.register(McpTool {
        name: "list_tables".to_string(),
        description: "List the tables and views available in the log database.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    });

    // describe_table tool
    registry.register(McpTool {
        name: "describe_table".to_string(),
        description: "Show the columns, types and row count of a table or view.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "required": ["table"],
            "properties": {
                "table": {
                    "type": "string",
                    "description": "Table name, optionally schema-qualified (schema.table)"
                }
            }
        }),
    });

    // get_database_info tool
    registry.register(McpTool {
        name: "get_database_info".to_string(),
        description: "Show which initialization script backs the database, where it came \
                      from, and the connection state."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    });

    // set_database tool
    registry.register(McpTool {
        name: "set_database".to_string(),
        description: "Switch to a different initialization script. Without a path the \
                      external resolver is asked for one. On failure the current database \
                      stays active."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Filesystem path of the new initialization script"
                }
            }
        }),
    });

    registry
}

/// Execute a tool by name
pub async fn execute_tool(state: &AppState, tool_name: &str, params: Value) -> Result<Value> {
    match tool_name {
        "query" => execute_query(state, params).await,
        "list_tables" => execute_list_tables(state).await,
        "describe_table" => execute_describe_table(state, params).await,
        "get_database_info" => execute_get_database_info(state).await,
        "set_database" => execute_set_database(state, params).await,
        _ => Err(Error::NotFound(format!("Tool not found: {}", tool_name))),
    }
}

/// Absent params are treated as an empty object
fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| Error::InvalidParameter(e.to_string()))
}

/// Accept exactly one statement, and only a read when `read_only` is set
fn check_statement(sql: &str, read_only: bool) -> Result<()> {
    let statements = split_statements(sql);
    let statement = match statements.as_slice() {
        [statement] => statement,
        [] => return Err(Error::InvalidParameter("query is empty".to_string())),
        _ => {
            return Err(Error::InvalidParameter(
                "query must contain a single statement".to_string(),
            ))
        }
    };

    if read_only {
        let keyword = statement
            .as_str()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_uppercase();
        if !READ_KEYWORDS.contains(&keyword.as_str()) {
            return Err(Error::InvalidParameter(format!(
                "only read queries are allowed, got {}",
                keyword
            )));
        }
    }

    Ok(())
}

// ============================================================================
// Tool implementations
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryParams {
    sql: String,
    limit: Option<usize>,
}

async fn execute_query(state: &AppState, params: Value) -> Result<Value> {
    let p: QueryParams = parse_params(params)?;
    check_statement(&p.sql, state.config.query.read_only)?;

    let max_rows = state.config.query.max_rows;
    let limit = p.limit.map_or(max_rows, |l| l.min(max_rows));

    let sql = p.sql;
    let mut rows = state.database.run(move |db| db.execute_query(&sql)).await?;

    let total = rows.len();
    let truncated = total > limit;
    rows.truncate(limit);

    let columns: Vec<&String> = rows.first().map(|r| r.keys().collect()).unwrap_or_default();

    Ok(serde_json::json!({
        "columns": columns,
        "row_count": rows.len(),
        "total_rows": total,
        "truncated": truncated,
        "rows": rows
    }))
}

async fn execute_list_tables(state: &AppState) -> Result<Value> {
    let tables = state.database.run(|db| db.list_tables()).await?;

    Ok(serde_json::json!({
        "count": tables.len(),
        "tables": tables
    }))
}

#[derive(Debug, Deserialize)]
struct DescribeTableParams {
    table: String,
}

async fn execute_describe_table(state: &AppState, params: Value) -> Result<Value> {
    let p: DescribeTableParams = parse_params(params)?;

    let table = p.table.clone();
    let (columns, row_count) = state
        .database
        .run(move |db| Ok((db.describe_table(&table)?, db.table_row_count(&table)?)))
        .await?;

    Ok(serde_json::json!({
        "table": p.table,
        "row_count": row_count,
        "columns": columns
    }))
}

async fn execute_get_database_info(state: &AppState) -> Result<Value> {
    let status = state.database.run(|db| Ok(db.status())).await?;
    Ok(serde_json::to_value(status)?)
}

#[derive(Debug, Deserialize)]
struct SetDatabaseParams {
    path: Option<PathBuf>,
}

async fn execute_set_database(state: &AppState, params: Value) -> Result<Value> {
    let p: SetDatabaseParams = parse_params(params)?;

    let status = state.database.configure(p.path).await?;

    Ok(serde_json::json!({
        "status": "ok",
        "database": status
    }))
}
