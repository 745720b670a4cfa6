//! Logduck MCP Server
//!
//! Model Context Protocol server exposing a DuckDB log database to
//! tool-calling agents.

mod prompts;
mod resources;
mod server;
mod state;
mod tools;

use std::{net::SocketAddr, sync::Arc};

use tracing::{error, info, warn};

use logduck_common::{resolver, Config, DatabaseService, EngineSettings, SourceResolver};

use server::McpServer;
use state::DatabaseSlot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("logduck_mcp=debug".parse()?)
                .add_directive("logduck_common=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .json()
        .init();

    info!("Starting Logduck MCP server");

    // Load configuration
    let config = Config::load_or_default();
    info!(
        init_script = ?config.database.init_script,
        resolver = ?config.resolver.command,
        mcp_port = config.mcp.port,
        "Configuration loaded"
    );

    if !config.mcp.enabled {
        warn!("MCP server disabled by configuration");
        return Ok(());
    }

    let resolver: Arc<dyn SourceResolver> = Arc::from(resolver::from_config(&config.resolver));
    let settings = EngineSettings::from(&config.database);

    // Load the initial database; set_database can still load one later
    let explicit = config.database.init_script.clone();
    let startup_resolver = Arc::clone(&resolver);
    let startup_settings = settings.clone();
    let service = match tokio::task::spawn_blocking(move || {
        DatabaseService::create(explicit, startup_resolver, startup_settings)
    })
    .await?
    {
        Ok(service) => {
            info!(source = %service.configuration().source, "Database ready");
            Some(service)
        }
        Err(e) => {
            error!(error = %e, "Database initialization failed - continuing without a database");
            None
        }
    };

    // Create and run MCP server
    let database = DatabaseSlot::new(service, resolver, settings);
    let server = McpServer::new(database, config.clone());

    let addr = SocketAddr::new(
        config.mcp.host.parse().unwrap_or([0, 0, 0, 0].into()),
        config.mcp.port,
    );

    info!(address = %addr, "Logduck MCP server listening");
    server.run(addr).await?;

    info!("Logduck MCP server stopped");
    Ok(())
}
