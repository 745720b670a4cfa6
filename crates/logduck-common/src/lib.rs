//! Logduck Common Library
//!
//! Shared types, configuration, and the DuckDB session lifecycle used by the
//! Logduck server: script splitting, connection handling, source resolution,
//! and the `DatabaseService` that ties them together.

pub mod config;
pub mod connection;
pub mod error;
pub mod resolver;
pub mod service;
pub mod splitter;
pub mod types;

#[cfg(test)]
mod service_test;

pub use config::Config;
pub use connection::{ConnectionHandle, EngineSettings};
pub use error::{Error, Result};
pub use resolver::{CommandResolver, SourceResolver, UnconfiguredResolver};
pub use service::DatabaseService;
pub use splitter::{split_statements, Statement};
pub use types::{
    ConnectionState, InitializationSource, Row, ServiceConfiguration, ServiceStatus, SourceKind,
};
