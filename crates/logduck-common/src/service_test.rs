//! Tests for service module

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use crate::{
    connection::EngineSettings,
    error::{Error, Result},
    resolver::{SourceResolver, UnconfiguredResolver},
    service::{quote_identifier, DatabaseService},
    types::{ConnectionState, SourceKind},
};

const LOGS_SCRIPT: &str = "\
-- application logs
CREATE TABLE t(id INTEGER, name VARCHAR);
INSERT INTO t VALUES (1,'alpha'),(2,'beta');
";

/// Resolver that hands out a fixed path and counts calls
struct FixedResolver {
    path: PathBuf,
    calls: AtomicUsize,
}

impl FixedResolver {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl SourceResolver for FixedResolver {
    fn resolve(&self) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.path.clone())
    }

    fn describe(&self) -> String {
        "fixed resolver".to_string()
    }
}

fn script_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn service_for(path: &Path) -> DatabaseService {
    DatabaseService::create(
        Some(path.to_path_buf()),
        Arc::new(UnconfiguredResolver),
        EngineSettings::default(),
    )
    .unwrap()
}

#[test]
fn test_end_to_end_query() {
    let file = script_file(
        "CREATE TABLE t(id INTEGER, name VARCHAR); INSERT INTO t VALUES (1,'alpha'),(2,'beta');",
    );
    let service = service_for(file.path());

    let rows = assert_ok!(service.execute_query("SELECT id,name FROM t ORDER BY id"));
    assert_eq!(
        serde_json::to_value(rows).unwrap(),
        json!([{"id": 1, "name": "alpha"}, {"id": 2, "name": "beta"}])
    );
}

#[test]
fn test_large_integer_serialization() {
    let file = script_file(
        "CREATE TABLE counters(name VARCHAR, value BIGINT);
         INSERT INTO counters VALUES ('big', 9007199254740993), ('small', 10);",
    );
    let service = service_for(file.path());

    let rows = service
        .execute_query("SELECT value FROM counters ORDER BY name")
        .unwrap();
    assert_eq!(
        serde_json::to_string(&rows).unwrap(),
        r#"[{"value":"9007199254740993"},{"value":10}]"#
    );
}

#[test]
fn test_create_records_explicit_source() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    let config = service.configuration();
    assert_eq!(config.source.kind(), SourceKind::Explicit);
    assert_eq!(config.source.path(), file.path());

    let status = service.status();
    assert_eq!(status.state, ConnectionState::Open);
    assert_eq!(status.statement_count, 2);
    assert!(status.opened_at.is_some());
}

#[test]
fn test_create_missing_file() {
    let result = DatabaseService::create(
        Some(PathBuf::from("/nonexistent/logduck/init.sql")),
        Arc::new(UnconfiguredResolver),
        EngineSettings::default(),
    );
    let err = assert_err!(result);
    assert!(err.is_initialization_error());
    assert!(err.to_string().contains("/nonexistent/logduck/init.sql"));
}

#[test]
fn test_create_fails_on_bad_statement() {
    let file = script_file("CREATE TABLE t(id INTEGER);\nINSERT INTO nope VALUES (1);\nSELECT 1;");
    let result = DatabaseService::create(
        Some(file.path().to_path_buf()),
        Arc::new(UnconfiguredResolver),
        EngineSettings::default(),
    );

    let err = assert_err!(result);
    assert!(err.is_initialization_error());
    assert_eq!(err.statement_index(), Some(2));
    assert!(err.to_string().contains("INSERT INTO nope VALUES (1)"));
}

#[test]
fn test_create_uses_resolver_without_explicit_path() {
    let file = script_file(LOGS_SCRIPT);
    let resolver = Arc::new(FixedResolver::new(file.path()));

    let service = assert_ok!(DatabaseService::create(
        None,
        resolver.clone(),
        EngineSettings::default()
    ));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.configuration().source.kind(), SourceKind::Resolved);
    assert_eq!(service.execute_query("SELECT * FROM t").unwrap().len(), 2);
}

#[test]
fn test_create_resolver_failure_has_no_fallback() {
    let result = DatabaseService::create(
        None,
        Arc::new(UnconfiguredResolver),
        EngineSettings::default(),
    );
    let err = assert_err!(result);
    assert!(err.is_initialization_error());
    match err {
        Error::Initialization { cause, .. } => assert!(matches!(*cause, Error::Resolution(_))),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_query_error() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    let err = assert_err!(service.execute_query("SELECT missing_column FROM t"));
    assert!(matches!(err, Error::Query(_)));

    // The connection stays usable
    assert!(service.execute_query("SELECT 1").is_ok());
}

#[test]
fn test_close_is_idempotent() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    service.close();
    assert!(!service.is_open());
    service.close();
    assert!(!service.is_open());
    assert_eq!(service.status().state, ConnectionState::Closed);
}

#[test]
fn test_auto_reconnect_after_close() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    // Write state that the initialization script does not create
    service
        .execute_query("CREATE TABLE scratch AS SELECT 42 AS answer")
        .unwrap();
    service.close();

    let rows = assert_ok!(service.execute_query("SELECT count(*) AS n FROM t"));
    assert_eq!(rows[0]["n"], json!(2));
    assert!(service.is_open());

    // A fresh database: only what the script built survives
    assert!(service.execute_query("SELECT * FROM scratch").is_err());
}

#[test]
fn test_reconnect_failure_is_reported() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());
    let path = file.path().to_path_buf();

    service.close();
    drop(file);
    assert!(!path.exists());

    let err = assert_err!(service.execute_query("SELECT * FROM t"));
    assert!(err.is_reconnect_error());
    assert!(!service.is_open());
    assert_eq!(service.configuration().source.path(), path.as_path());
}

#[test]
fn test_set_database_config_switches() {
    let first = script_file(LOGS_SCRIPT);
    let second = script_file(
        "CREATE TABLE events(kind VARCHAR); \
         INSERT INTO events VALUES ('deploy'), ('rollback'), ('deploy');",
    );
    let service = service_for(first.path());

    assert_ok!(service.set_database_config(Some(second.path().to_path_buf())));

    assert_eq!(service.configuration().source.path(), second.path());
    let rows = service
        .execute_query("SELECT count(*) AS n FROM events WHERE kind = 'deploy'")
        .unwrap();
    assert_eq!(rows[0]["n"], json!(2));

    // The old database is gone
    assert!(service.execute_query("SELECT * FROM t").is_err());
}

#[test]
fn test_set_database_config_is_atomic() {
    let original = script_file(LOGS_SCRIPT);
    let broken = script_file("CREATE TABLE other(x INTEGER);\nTHIS IS NOT SQL;");
    let service = service_for(original.path());

    let err = assert_err!(service.set_database_config(Some(broken.path().to_path_buf())));
    assert!(err.is_initialization_error());
    assert_eq!(err.statement_index(), Some(2));

    // Original configuration and connection are intact
    assert_eq!(service.configuration().source.path(), original.path());
    assert!(service.is_open());
    let rows = assert_ok!(service.execute_query("SELECT name FROM t ORDER BY id"));
    assert_eq!(rows[0]["name"], json!("alpha"));
    assert!(service.execute_query("SELECT * FROM other").is_err());
}

#[test]
fn test_set_database_config_missing_file_is_atomic() {
    let original = script_file(LOGS_SCRIPT);
    let service = service_for(original.path());

    let missing = PathBuf::from("/nonexistent/next.sql");
    let err = assert_err!(service.set_database_config(Some(missing)));
    assert!(err.is_initialization_error());
    assert_eq!(service.configuration().source.path(), original.path());
    assert!(service.execute_query("SELECT * FROM t").is_ok());
}

#[test]
fn test_set_database_config_while_closed() {
    let first = script_file(LOGS_SCRIPT);
    let second = script_file("CREATE TABLE events(kind VARCHAR);");
    let service = service_for(first.path());

    service.close();
    assert_ok!(service.set_database_config(Some(second.path().to_path_buf())));
    assert!(service.is_open());
    assert!(service.execute_query("SELECT * FROM events").is_ok());
}

#[test]
fn test_set_database_config_uses_resolver() {
    let first = script_file(LOGS_SCRIPT);
    let resolved = script_file("CREATE TABLE resolved(x INTEGER);");
    let resolver = Arc::new(FixedResolver::new(resolved.path()));

    let service = DatabaseService::create(
        Some(first.path().to_path_buf()),
        resolver.clone(),
        EngineSettings::default(),
    )
    .unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

    assert_ok!(service.set_database_config(None));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.configuration().source.kind(), SourceKind::Resolved);
    assert!(service.execute_query("SELECT * FROM resolved").is_ok());

    // Not cached: every reconfiguration asks again
    assert_ok!(service.set_database_config(None));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_queries_and_reconfiguration() {
    let first = script_file(LOGS_SCRIPT);
    let second = script_file(
        "CREATE TABLE t(id INTEGER, name VARCHAR);
         INSERT INTO t VALUES (1,'gamma'),(2,'delta');",
    );
    let service = Arc::new(service_for(first.path()));

    let mut workers = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        let second_path = second.path().to_path_buf();
        let first_path = first.path().to_path_buf();
        workers.push(thread::spawn(move || {
            for j in 0..10 {
                match (i + j) % 4 {
                    0 => service
                        .set_database_config(Some(second_path.clone()))
                        .unwrap(),
                    1 => service.set_database_config(Some(first_path.clone())).unwrap(),
                    2 => service.close(),
                    _ => {}
                }
                // Whatever configuration is active, its script ran completely
                let rows = service.execute_query("SELECT count(*) AS n FROM t").unwrap();
                assert_eq!(rows[0]["n"], json!(2));
            }
        }));
    }

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_catalog_helpers() {
    let file = script_file(
        "CREATE TABLE logs(ts TIMESTAMP, level VARCHAR NOT NULL, msg VARCHAR);
         INSERT INTO logs VALUES
             ('2024-01-01 00:00:00', 'ERROR', 'disk full'),
             ('2024-01-01 00:01:00', 'INFO', 'ok');
         CREATE VIEW errors AS SELECT * FROM logs WHERE level = 'ERROR';",
    );
    let service = service_for(file.path());

    let tables = service.list_tables().unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["errors", "logs"]);
    assert!(tables.iter().all(|t| t.schema == "main"));

    let columns = service.describe_table("logs").unwrap();
    let column_names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(column_names, vec!["ts", "level", "msg"]);
    assert!(!columns[1].nullable);
    assert!(columns[2].nullable);

    assert_eq!(service.describe_table("main.logs").unwrap().len(), 3);
    assert_eq!(service.table_row_count("logs").unwrap(), 2);
    assert_eq!(service.table_row_count("errors").unwrap(), 1);
}

#[test]
fn test_catalog_helpers_reject_unknown_tables() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    let err = assert_err!(service.describe_table("t; DROP TABLE t"));
    assert!(err.is_not_found());

    let err = assert_err!(service.table_row_count("t\" ; DROP TABLE t; --"));
    assert!(err.is_not_found());

    // Still there
    assert_eq!(service.table_row_count("t").unwrap(), 2);
}

#[test]
fn test_quote_identifier() {
    assert_eq!(quote_identifier("logs"), "\"logs\"");
    assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
}

#[test]
fn test_execute_query_rejects_multiple_statements() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    let err = assert_err!(service.execute_query("SELECT 1; DELETE FROM t"));
    assert!(matches!(err, Error::Query(_)));

    let rows = assert_ok!(service.execute_query("SELECT count(*) AS n FROM t"));
    assert_eq!(rows[0]["n"], json!(2));
}

#[test]
fn test_debug_output() {
    let file = script_file(LOGS_SCRIPT);
    let service = service_for(file.path());

    let debug = format!("{:?}", service);
    assert!(debug.starts_with("DatabaseService"));
    assert!(debug.contains("Explicit"));
    assert!(debug.contains("ConnectionHandle"));
    assert!(debug.contains("Open"));
}
