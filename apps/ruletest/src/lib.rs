//! ruletest core library.
//!
//! This crate runs declarative tests for analyzer rules: it loads
//! `*.test.yaml` files, batches their cases into analyzer runs, executes the
//! analyzer locally or in a container, and verifies the produced incidents.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `parser`: Tests file discovery, provider default merging, validation.
//! - `filter`: Inclusion filters for rules and test cases.
//! - `group`: Batching of test cases by analysis params.
//! - `settings`: Provider settings and container volume planning.
//! - `rules`: Extraction of the rules a batch needs.
//! - `engine`: Analyzer invocation (local process or container).
//! - `verify`: Matching analyzer output against expectations.
//! - `runner`: Orchestration of batches and temp workspaces.
//! - `output`: Human/JSON printers for results.
//! - `models`: Data models for tests files, analyzer output, results.
//! - `error`, `logging`, `utils`: Supporting pieces.
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod group;
pub mod logging;
pub mod models;
pub mod output;
pub mod parser;
pub mod rules;
pub mod runner;
pub mod settings;
pub mod utils;
pub mod verify;
