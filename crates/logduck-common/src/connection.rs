//! DuckDB connection handle for Logduck
//!
//! A `ConnectionHandle` owns at most one live in-memory DuckDB connection.
//! It knows how to bring a fresh connection to a ready state by running an
//! initialization script, and how to turn query results into JSON rows.

use chrono::{DateTime, Utc};
use duckdb::{types::Value as DuckValue, Connection};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::DatabaseConfig,
    error::{Error, Result},
    splitter::{split_statements, Statement},
    types::{to_json_value, ConnectionState, InitializationSource, Row},
};

/// Engine settings applied to every new connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub memory_limit: Option<String>,
    pub threads: Option<u32>,
}

impl From<&DatabaseConfig> for EngineSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            memory_limit: config.memory_limit.clone(),
            threads: config.threads,
        }
    }
}

/// Owner of a single DuckDB connection
pub struct ConnectionHandle {
    conn: Option<Connection>,
    opened_at: Option<DateTime<Utc>>,
    statement_count: usize,
}

impl ConnectionHandle {
    /// Open an empty in-memory database and apply engine settings
    pub fn open(settings: &EngineSettings) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::Connection(format!("Failed to create in-memory DuckDB database: {}", e))
        })?;

        let mut handle = Self {
            conn: Some(conn),
            opened_at: Some(Utc::now()),
            statement_count: 0,
        };
        if let Err(e) = handle.configure(settings) {
            handle.close();
            return Err(e);
        }
        Ok(handle)
    }

    /// Open a connection and run the full initialization script of `source`.
    ///
    /// All-or-nothing: if reading the script or any statement fails, the new
    /// connection is closed before the error is returned.
    #[instrument(skip(source, settings), fields(source = %source))]
    pub fn initialize(source: &InitializationSource, settings: &EngineSettings) -> Result<Self> {
        let script = source.read_script()?;
        let statements = split_statements(&script);

        let mut handle = Self::open(settings)?;
        if let Err(e) = handle.execute_script(&statements) {
            handle.close();
            return Err(e);
        }

        info!(statements = statements.len(), "Initialization script executed");
        Ok(handle)
    }

    fn configure(&self, settings: &EngineSettings) -> Result<()> {
        if let Some(limit) = &settings.memory_limit {
            if limit.is_empty()
                || !limit
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == ' ')
            {
                return Err(Error::Config(format!("invalid memory limit '{}'", limit)));
            }
            self.connection()?
                .execute_batch(&format!("SET memory_limit='{}'", limit))
                .map_err(|e| Error::Connection(format!("Failed to set memory limit: {}", e)))?;
        }

        if let Some(threads) = settings.threads {
            self.connection()?
                .execute_batch(&format!("SET threads={}", threads))
                .map_err(|e| Error::Connection(format!("Failed to set threads: {}", e)))?;
        }

        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::Connection("connection is closed".to_string()))
    }

    /// Run statements in order, stopping at the first failure
    pub fn execute_script(&mut self, statements: &[Statement]) -> Result<()> {
        for statement in statements {
            self.execute(statement)?;
        }
        self.statement_count = statements.len();
        Ok(())
    }

    /// Run a single statement
    pub fn execute(&self, statement: &Statement) -> Result<()> {
        debug!(index = statement.index(), "Executing statement");
        self.connection()?
            .execute_batch(statement.as_str())
            .map_err(|e| Error::Statement {
                index: statement.index(),
                statement: statement.as_str().to_string(),
                message: e.to_string(),
            })
    }

    /// Run a query and collect every row
    pub fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.query_with_params(sql, &[])
    }

    /// Run a query with positional `?` parameters bound as text.
    ///
    /// `sql` must hold a single statement; scripts go through `execute_script`.
    #[instrument(skip(self, params))]
    pub fn query_with_params(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let statements = split_statements(sql).len();
        if statements > 1 {
            return Err(Error::Query(format!(
                "expected a single statement, got {}",
                statements
            )));
        }

        let conn = self.connection()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::Query(e.to_string()))?;
        let mut rows = stmt
            .query(duckdb::params_from_iter(params.iter()))
            .map_err(|e| Error::Query(e.to_string()))?;

        let columns = unique_column_names(
            rows.as_ref()
                .map(duckdb::Statement::column_names)
                .unwrap_or_default(),
        );

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| Error::Query(e.to_string()))? {
            let mut record = Row::new();
            for (i, name) in columns.iter().enumerate() {
                let value: DuckValue = row.get(i).map_err(|e| Error::Query(e.to_string()))?;
                record.insert(name.clone(), to_json_value(value));
            }
            records.push(record);
        }

        debug!(count = records.len(), "Query returned rows");
        Ok(records)
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_open() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// Statements executed by the last initialization script
    pub fn statement_count(&self) -> usize {
        self.statement_count
    }

    /// Close the connection. Closing a closed handle does nothing.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "DuckDB reported an error while closing");
            }
            self.opened_at = None;
            debug!("Connection closed");
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("state", &self.state())
            .field("opened_at", &self.opened_at)
            .field("statement_count", &self.statement_count)
            .finish_non_exhaustive()
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Rename repeated column names to `name_1`, `name_2`, ... so no value is lost
fn unique_column_names(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 0;
        while unique.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}", name, suffix);
        }
        if candidate != name {
            debug!(column = %name, renamed = %candidate, "Duplicate column name");
        }
        unique.push(candidate);
    }
    unique
}
