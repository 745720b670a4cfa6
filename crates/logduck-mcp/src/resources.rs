//! MCP resources: read-only views of the loaded database

use serde::Serialize;
use serde_json::Value;

use logduck_common::{Error, Result};

use crate::state::AppState;

const DATABASE_URI: &str = "logduck://database";
const TABLE_URI_PREFIX: &str = "logduck://tables/";

/// MCP Resource definition
#[derive(Debug, Clone, Serialize)]
pub struct McpResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// The database resource plus one resource per table.
///
/// With no database loaded only the database resource is listed.
pub async fn list_resources(state: &AppState) -> Result<Vec<McpResource>> {
    let mut resources = vec![McpResource {
        uri: DATABASE_URI.to_string(),
        name: "Database".to_string(),
        description: "Initialization source and connection state of the log database"
            .to_string(),
        mime_type: "application/json".to_string(),
    }];

    if !state.database.is_loaded().await {
        return Ok(resources);
    }

    let tables = state.database.run(|db| db.list_tables()).await?;
    resources.extend(tables.into_iter().map(|table| {
        let qualified = format!("{}.{}", table.schema, table.name);
        McpResource {
            uri: format!("{}{}", TABLE_URI_PREFIX, qualified),
            name: qualified,
            description: format!("Columns and row count of {}", table.name),
            mime_type: "application/json".to_string(),
        }
    }));

    Ok(resources)
}

/// Read a resource by URI
pub async fn read_resource(state: &AppState, uri: &str) -> Result<Value> {
    if uri == DATABASE_URI {
        let status = state.database.run(|db| Ok(db.status())).await?;
        return Ok(serde_json::json!({
            "uri": uri,
            "mimeType": "application/json",
            "contents": status
        }));
    }

    let Some(table) = uri.strip_prefix(TABLE_URI_PREFIX).filter(|t| !t.is_empty()) else {
        return Err(Error::NotFound(format!("Resource not known: {}", uri)));
    };

    let name = table.to_string();
    let (columns, row_count) = state
        .database
        .run(move |db| Ok((db.describe_table(&name)?, db.table_row_count(&name)?)))
        .await?;

    Ok(serde_json::json!({
        "uri": uri,
        "mimeType": "application/json",
        "contents": {
            "table": table,
            "row_count": row_count,
            "columns": columns
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{io::Write, sync::Arc};

    use logduck_common::{Config, DatabaseService, EngineSettings, UnconfiguredResolver};

    use crate::state::DatabaseSlot;

    fn app_state(script: Option<&tempfile::NamedTempFile>) -> AppState {
        let resolver = Arc::new(UnconfiguredResolver);
        let service = script.map(|file| {
            DatabaseService::create(
                Some(file.path().to_path_buf()),
                resolver.clone(),
                EngineSettings::default(),
            )
            .unwrap()
        });
        AppState::new(
            DatabaseSlot::new(service, resolver, EngineSettings::default()),
            Config::default(),
        )
    }

    fn script_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"CREATE TABLE logs(level VARCHAR, msg VARCHAR);\n\
              INSERT INTO logs VALUES ('ERROR', 'boom'), ('INFO', 'ok');\n\
              CREATE VIEW errors AS SELECT * FROM logs WHERE level = 'ERROR';",
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn test_list_resources() {
        let file = script_file();
        let state = app_state(Some(&file));

        let resources = list_resources(&state).await.unwrap();
        let uris: Vec<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec![
                "logduck://database",
                "logduck://tables/main.errors",
                "logduck://tables/main.logs"
            ]
        );
    }

    #[tokio::test]
    async fn test_list_resources_without_database() {
        let state = app_state(None);
        let resources = list_resources(&state).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, DATABASE_URI);
    }

    #[tokio::test]
    async fn test_read_resources() {
        let file = script_file();
        let state = app_state(Some(&file));

        let database = read_resource(&state, "logduck://database").await.unwrap();
        assert_eq!(database["contents"]["state"], "open");
        assert_eq!(database["contents"]["statement_count"], 3);

        let table = read_resource(&state, "logduck://tables/main.logs")
            .await
            .unwrap();
        assert_eq!(table["contents"]["row_count"], 2);
        assert_eq!(table["contents"]["columns"][0]["name"], "level");

        let view = read_resource(&state, "logduck://tables/errors").await.unwrap();
        assert_eq!(view["contents"]["row_count"], 1);
    }

    #[tokio::test]
    async fn test_read_unknown_resources() {
        let file = script_file();
        let state = app_state(Some(&file));

        let err = read_resource(&state, "logduck://elsewhere").await.unwrap_err();
        assert!(err.is_not_found());

        let err = read_resource(&state, "logduck://tables/").await.unwrap_err();
        assert!(err.is_not_found());

        let err = read_resource(&state, "logduck://tables/missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resource_serialization() {
        let resource = McpResource {
            uri: DATABASE_URI.to_string(),
            name: "Database".to_string(),
            description: "d".to_string(),
            mime_type: "application/json".to_string(),
        };
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["mimeType"], "application/json");
    }
}
