//! Database service: the single shared DuckDB session behind the server
//!
//! A `DatabaseService` owns one `ConnectionHandle` and the configuration it
//! was built from. Every operation runs under one lock, so an initialization
//! script always executes as a unit and queries never interleave.
//!
//! Two behaviours matter to callers:
//!
//! - A closed connection is detected before use and rebuilt from the current
//!   configuration, at most once per call.
//! - Reconfiguration builds and initializes the replacement first and only
//!   swaps it in on success, so a failed switch leaves the old database
//!   serving queries.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{info, instrument, warn};

use crate::{
    connection::{ConnectionHandle, EngineSettings},
    error::{Error, Result},
    resolver::SourceResolver,
    types::{
        ColumnInfo, ConnectionState, InitializationSource, Row, ServiceConfiguration,
        ServiceStatus, TableInfo,
    },
};

const DEFAULT_SCHEMA: &str = "main";

struct ServiceState {
    handle: ConnectionHandle,
    config: ServiceConfiguration,
}

/// The database session shared by all request handlers
pub struct DatabaseService {
    state: Mutex<ServiceState>,
    resolver: Arc<dyn SourceResolver>,
    settings: EngineSettings,
}

impl DatabaseService {
    /// Create a service from an explicit script, or from the resolver when
    /// `explicit` is `None`. There is no fallback to an empty database.
    #[instrument(skip(resolver, settings))]
    pub fn create(
        explicit: Option<PathBuf>,
        resolver: Arc<dyn SourceResolver>,
        settings: EngineSettings,
    ) -> Result<Self> {
        let (source, handle) = build(explicit, resolver.as_ref(), &settings)?;
        info!(source = %source, "Database service created");

        Ok(Self {
            state: Mutex::new(ServiceState {
                handle,
                config: ServiceConfiguration { source },
            }),
            resolver,
            settings,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reopen and reinitialize from the current configuration if closed
    fn ensure_open(&self, state: &mut ServiceState) -> Result<()> {
        if state.handle.state() == ConnectionState::Closed {
            let source = &state.config.source;
            info!(source = %source, "Connection closed, reinitializing");

            let handle = ConnectionHandle::initialize(source, &self.settings).map_err(|e| {
                warn!(error = %e, "Reconnect failed");
                Error::Reconnect(Box::new(Error::initialization(source.origin(), e)))
            })?;
            state.handle = handle;
        }
        Ok(())
    }

    /// Run `f` against an open connection while holding the service lock
    fn with_handle<T>(&self, f: impl FnOnce(&ConnectionHandle) -> Result<T>) -> Result<T> {
        let mut state = self.lock();
        self.ensure_open(&mut state)?;
        f(&state.handle)
    }

    /// Execute a single-statement query, reconnecting first if the
    /// connection was closed. Multi-statement SQL is rejected with `Query`.
    #[instrument(skip(self))]
    pub fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.with_handle(|handle| handle.query(sql))
    }

    /// Execute a query with `?` placeholders bound to `params`
    #[instrument(skip(self))]
    pub fn execute_query_with_params(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        self.with_handle(|handle| handle.query_with_params(sql, params))
    }

    /// Switch to a new initialization source.
    ///
    /// Either the service ends up fully on the new source, or it is left
    /// exactly as it was and the error is returned.
    #[instrument(skip(self))]
    pub fn set_database_config(&self, new_source: Option<PathBuf>) -> Result<()> {
        let mut state = self.lock();

        let (source, handle) = build(new_source, self.resolver.as_ref(), &self.settings)?;

        let mut previous = std::mem::replace(&mut state.handle, handle);
        let previous_source = std::mem::replace(&mut state.config, ServiceConfiguration { source });
        previous.close();

        info!(
            from = %previous_source.source,
            to = %state.config.source,
            "Database reconfigured"
        );
        Ok(())
    }

    /// Release the connection. Closing twice is a no-op.
    pub fn close(&self) {
        self.lock().handle.close();
    }

    pub fn is_open(&self) -> bool {
        self.lock().handle.is_open()
    }

    pub fn configuration(&self) -> ServiceConfiguration {
        self.lock().config.clone()
    }

    pub fn status(&self) -> ServiceStatus {
        let state = self.lock();
        ServiceStatus {
            source: state.config.source.clone(),
            state: state.handle.state(),
            opened_at: state.handle.opened_at(),
            statement_count: state.handle.statement_count(),
        }
    }

    /// All user tables and views
    pub fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let rows = self.execute_query(
            "SELECT table_schema AS \"schema\", table_name AS name, table_type \
             FROM information_schema.tables \
             WHERE table_schema NOT IN ('information_schema', 'pg_catalog') \
             ORDER BY table_schema, table_name",
        )?;

        rows.into_iter()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)).map_err(Error::from))
            .collect()
    }

    /// Columns of `table` (optionally `schema.table`); `NotFound` if it does not exist
    pub fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let (schema, name) = split_table_name(table);
        let rows = self.execute_query_with_params(
            "SELECT column_name AS name, data_type, is_nullable = 'YES' AS nullable \
             FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? \
             ORDER BY ordinal_position",
            &[schema, name],
        )?;

        if rows.is_empty() {
            return Err(Error::NotFound(format!("table {}", table)));
        }

        rows.into_iter()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)).map_err(Error::from))
            .collect()
    }

    /// Number of rows in `table`; the table must exist in the catalog
    pub fn table_row_count(&self, table: &str) -> Result<u64> {
        let (schema, name) = split_table_name(table);

        self.with_handle(|handle| {
            let found = handle.query_with_params(
                "SELECT 1 FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                &[schema, name],
            )?;
            if found.is_empty() {
                return Err(Error::NotFound(format!("table {}", table)));
            }

            let sql = format!(
                "SELECT count(*) AS n FROM {}.{}",
                quote_identifier(schema),
                quote_identifier(name)
            );
            let rows = handle.query(&sql)?;

            rows.first()
                .and_then(|row| row.get("n"))
                .and_then(|n| n.as_u64().or_else(|| n.as_str().and_then(|s| s.parse().ok())))
                .ok_or_else(|| {
                    Error::Internal(format!("count query on {} returned no value", table))
                })
        })
    }
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("DatabaseService");
        // never wait on a running operation
        match self.state.try_lock() {
            Ok(state) => debug
                .field("source", &state.config.source)
                .field("handle", &state.handle),
            Err(_) => debug.field("state", &"<locked>"),
        };
        debug
            .field("resolver", &self.resolver.describe())
            .finish_non_exhaustive()
    }
}

/// Capture the source (explicit, or via the resolver) and fully initialize a
/// connection for it. Nothing is shared with any existing connection.
fn build(
    explicit: Option<PathBuf>,
    resolver: &dyn SourceResolver,
    settings: &EngineSettings,
) -> Result<(InitializationSource, ConnectionHandle)> {
    let source = match explicit {
        Some(path) => {
            let origin = format!("'{}'", path.display());
            InitializationSource::explicit(path).map_err(|e| Error::initialization(origin, e))?
        }
        None => {
            let path = resolver
                .resolve()
                .map_err(|e| Error::initialization(resolver.describe(), e))?;
            let origin = format!("'{}'", path.display());
            InitializationSource::resolved(path).map_err(|e| Error::initialization(origin, e))?
        }
    };

    let handle = ConnectionHandle::initialize(&source, settings)
        .map_err(|e| Error::initialization(source.origin(), e))?;

    Ok((source, handle))
}

fn split_table_name(table: &str) -> (&str, &str) {
    table.split_once('.').unwrap_or((DEFAULT_SCHEMA, table))
}

/// Quote an identifier for splicing into SQL, doubling embedded quotes
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
