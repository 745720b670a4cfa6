//! Logduck CLI
//!
//! Command-line client for a running Logduck MCP server.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "logduck")]
#[command(about = "CLI tool for the Logduck log analytics server")]
#[command(version)]
struct Cli {
    /// MCP server URL
    #[arg(
        long,
        env = "LOGDUCK_SERVER_URL",
        default_value = "http://localhost:8081"
    )]
    server_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Compact,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SQL query
    Query {
        /// SQL statement (DuckDB dialect)
        sql: String,

        /// Maximum rows to return
        #[arg(long, short = 'n')]
        limit: Option<u64>,
    },

    /// List tables and views
    Tables,

    /// Show the columns of a table
    Describe {
        /// Table name, optionally schema-qualified
        table: String,
    },

    /// Switch the server to another initialization script
    Use {
        /// Script path; omit to let the server's resolver pick one
        path: Option<String>,
    },

    /// Show server and database status
    Status,

    /// List the tools the server exposes
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(server_url = %cli.server_url, "Using server");

    match cli.command {
        Commands::Query { sql, limit } => {
            commands::query::handle(&cli.server_url, sql, limit, cli.format).await?;
        }
        Commands::Tables => {
            commands::tables::list(&cli.server_url, cli.format).await?;
        }
        Commands::Describe { table } => {
            commands::tables::describe(&cli.server_url, table, cli.format).await?;
        }
        Commands::Use { path } => {
            commands::status::use_database(&cli.server_url, path, cli.format).await?;
        }
        Commands::Status => {
            commands::status::handle(&cli.server_url, cli.format).await?;
        }
        Commands::Tools => {
            commands::status::list_tools(&cli.server_url, cli.format).await?;
        }
    }

    Ok(())
}
