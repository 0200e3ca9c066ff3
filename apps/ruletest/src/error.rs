//! Error types for parsing, group setup, and engine invocation.
//!
//! Authoring errors (`SpecError`, `RuleError`) abort one spec file or one
//! group. Infrastructure errors are wrapped in `GroupError` and recorded as
//! an errored result so sibling groups keep running.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// A single spec file could not be turned into a `SpecFile`.
pub enum SpecError {
    #[error("path does not exist: {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid tests file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("bad search pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },
}

#[derive(Debug, Error)]
#[error("{}", .problems.join("; "))]
/// Every invariant violation found in one spec file.
pub struct ValidationError {
    pub problems: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode rules file: {0}")]
    Decode(#[from] serde_yaml::Error),
    #[error("rules file must be a list of rules")]
    NotAList,
    #[error("rule(s) not found in rules file: {}", .ids.join(", "))]
    NotFound { ids: Vec<String> },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no base configuration for provider '{0}'")]
    UnknownProvider(String),
    #[error("failed to read provider settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode provider settings {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("failed to encode provider settings: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start analyzer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("analyzer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("analyzer did not finish within {0}s")]
    TimedOut(u64),
    #[error("failed to wait for analyzer: {0}")]
    Wait(#[source] std::io::Error),
}

#[derive(Debug, Error)]
/// Anything that aborts one analysis group.
pub enum GroupError {
    #[error("failed creating temp dir: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed creating log file: {0}")]
    LogFile(#[source] std::io::Error),
    #[error("failed writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Rules(#[from] RuleError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed reading analysis output {path}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed decoding analysis output {path}: {source}")]
    DecodeOutput {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
