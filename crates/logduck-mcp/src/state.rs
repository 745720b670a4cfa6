//! Shared server state
//!
//! The server owns at most one `DatabaseService`. Handlers reach it through
//! the `DatabaseSlot` passed in `AppState`, never through globals.

use std::{path::PathBuf, sync::Arc};

use tokio::sync::RwLock;
use tracing::info;

use logduck_common::{
    types::ServiceStatus, Config, DatabaseService, EngineSettings, Error, Result, SourceResolver,
};

use crate::tools::{self, ToolRegistry};

/// State handed to every request handler
pub struct AppState {
    pub database: DatabaseSlot,
    pub config: Config,
    pub tools: ToolRegistry,
}

impl AppState {
    pub fn new(database: DatabaseSlot, config: Config) -> Self {
        Self {
            database,
            config,
            tools: tools::create_tool_registry(),
        }
    }
}

/// Holder for the active database service, if one has been loaded
pub struct DatabaseSlot {
    service: RwLock<Option<Arc<DatabaseService>>>,
    resolver: Arc<dyn SourceResolver>,
    settings: EngineSettings,
}

impl DatabaseSlot {
    pub fn new(
        service: Option<DatabaseService>,
        resolver: Arc<dyn SourceResolver>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            service: RwLock::new(service.map(Arc::new)),
            resolver,
            settings,
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.service.read().await.is_some()
    }

    /// The loaded service, or `NotFound` when there is none
    pub async fn current(&self) -> Result<Arc<DatabaseService>> {
        self.service.read().await.clone().ok_or_else(|| {
            Error::NotFound("No database loaded; call set_database first".to_string())
        })
    }

    /// Run a blocking database operation off the async runtime
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DatabaseService) -> Result<T> + Send + 'static,
    {
        let service = self.current().await?;
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| Error::Internal(format!("database task failed: {}", e)))?
    }

    /// Reconfigure the loaded service, or create one if none is loaded.
    ///
    /// A failure leaves the slot as it was.
    pub async fn configure(&self, path: Option<PathBuf>) -> Result<ServiceStatus> {
        let mut slot = self.service.write().await;

        if let Some(service) = slot.as_ref() {
            let service = Arc::clone(service);
            return tokio::task::spawn_blocking(move || {
                service.set_database_config(path)?;
                Ok(service.status())
            })
            .await
            .map_err(|e| Error::Internal(format!("database task failed: {}", e)))?;
        }

        let resolver = Arc::clone(&self.resolver);
        let settings = self.settings.clone();
        let service = tokio::task::spawn_blocking(move || {
            DatabaseService::create(path, resolver, settings)
        })
        .await
        .map_err(|e| Error::Internal(format!("database task failed: {}", e)))??;

        let status = service.status();
        info!(source = %status.source, "Database loaded");
        *slot = Some(Arc::new(service));
        Ok(status)
    }
}
