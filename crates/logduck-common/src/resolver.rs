//! External initialization source discovery
//!
//! When no script path is supplied, an operator-configured command is run and
//! the first line it prints is taken as the path. Failures are reported, never
//! retried, and nothing is cached between calls.

use std::{path::PathBuf, process::Command};

use tracing::{debug, instrument};

use crate::{
    config::ResolverConfig,
    error::{Error, Result},
};

/// Finds an initialization script when none was given explicitly
pub trait SourceResolver: Send + Sync {
    /// Produce a script path
    fn resolve(&self) -> Result<PathBuf>;

    /// Human-readable description used in error messages
    fn describe(&self) -> String;
}

/// Runs an external program and reads the script path from its stdout
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl SourceResolver for CommandResolver {
    #[instrument(skip(self), fields(program = %self.program))]
    fn resolve(&self) -> Result<PathBuf> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| Error::Resolution(format!("failed to run '{}': {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Resolution(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| {
                Error::Resolution(format!("'{}' did not print a path", self.program))
            })?;

        debug!(path, "Resolved initialization script");
        Ok(PathBuf::from(path))
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            format!("external resolver '{}'", self.program)
        } else {
            format!("external resolver '{} {}'", self.program, self.args.join(" "))
        }
    }
}

/// Resolver used when no external command is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredResolver;

impl SourceResolver for UnconfiguredResolver {
    fn resolve(&self) -> Result<PathBuf> {
        Err(Error::Resolution(
            "no initialization script given and no resolver command configured".to_string(),
        ))
    }

    fn describe(&self) -> String {
        "external resolver (not configured)".to_string()
    }
}

/// Build the resolver described by `config`
pub fn from_config(config: &ResolverConfig) -> Box<dyn SourceResolver> {
    match config.command.as_deref().map(str::trim) {
        Some(program) if !program.is_empty() => {
            Box::new(CommandResolver::new(program, config.args.clone()))
        }
        _ => Box::new(UnconfiguredResolver),
    }
}
