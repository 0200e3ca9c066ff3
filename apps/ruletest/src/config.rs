//! Configuration discovery and effective settings resolution.
//!
//! ruletest reads `ruletest.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config.
//! Defaults:
//! - `runLocal`: false (analyzer runs in a container)
//! - `containerTool`: `podman`
//! - `runnerImage`: `quay.io/konveyor/kantra:latest`
//! - `analyzerBinary`: `konveyor-analyzer`
//! - `verbosity`: 20
//! - `output`: `human`
//! - `logLevel`: `info`
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONTAINER_TOOL: &str = "podman";
pub const DEFAULT_RUNNER_IMAGE: &str = "quay.io/konveyor/kantra:latest";
pub const DEFAULT_ANALYZER_BINARY: &str = "konveyor-analyzer";
pub const DEFAULT_VERBOSITY: u32 = 20;

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `ruletest.toml|yaml`.
pub struct RuletestConfig {
    #[serde(rename = "providerSettings")]
    pub provider_settings: Option<String>,
    #[serde(rename = "runLocal")]
    pub run_local: Option<bool>,
    #[serde(rename = "containerTool")]
    pub container_tool: Option<String>,
    #[serde(rename = "runnerImage")]
    pub runner_image: Option<String>,
    #[serde(rename = "analyzerBinary")]
    pub analyzer_binary: Option<String>,
    pub verbosity: Option<u32>,
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
    pub output: Option<String>,
    #[serde(rename = "logLevel")]
    pub log_level: Option<String>,
    #[serde(rename = "testFilter")]
    pub test_filter: Option<String>,
    #[serde(rename = "keepTemp")]
    pub keep_temp: Option<bool>,
}

#[derive(Debug, Clone, Default)]
/// Values given on the command line; `None` defers to the config file.
pub struct CliOverrides {
    pub repo_root: Option<String>,
    pub provider_settings: Option<String>,
    pub run_local: Option<bool>,
    pub container_tool: Option<String>,
    pub runner_image: Option<String>,
    pub analyzer_binary: Option<String>,
    pub verbosity: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub output: Option<String>,
    pub log_level: Option<String>,
    pub test_filter: Option<String>,
    pub keep_temp: Option<bool>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    /// Base provider table file; built-in defaults when `None`.
    pub provider_settings: Option<PathBuf>,
    pub run_local: bool,
    pub container_tool: String,
    pub runner_image: String,
    pub analyzer_binary: String,
    pub verbosity: u32,
    pub timeout_secs: Option<u64>,
    pub output: String,
    pub log_level: String,
    pub test_filter: Option<String>,
    pub keep_temp: bool,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `ruletest.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("ruletest.toml").exists()
            || cur.join("ruletest.yaml").exists()
            || cur.join("ruletest.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `RuletestConfig` from `ruletest.toml` or `ruletest.yaml|yml` if present.
pub fn load_config(root: &Path) -> Option<RuletestConfig> {
    let toml_path = root.join("ruletest.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        let cfg: RuletestConfig = toml::from_str(&s).ok()?;
        return Some(cfg);
    }
    for yml in ["ruletest.yaml", "ruletest.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            let cfg: RuletestConfig = serde_yaml::from_str(&s).ok()?;
            return Some(cfg);
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: CliOverrides) -> Effective {
    let start = PathBuf::from(cli.repo_root.as_deref().unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root).unwrap_or_default();

    // config-relative paths resolve against the repo root, CLI paths against cwd
    let provider_settings = cli
        .provider_settings
        .map(PathBuf::from)
        .or_else(|| cfg.provider_settings.map(|p| repo_root.join(p)));

    Effective {
        provider_settings,
        run_local: cli.run_local.or(cfg.run_local).unwrap_or(false),
        container_tool: cli
            .container_tool
            .or(cfg.container_tool)
            .unwrap_or_else(|| DEFAULT_CONTAINER_TOOL.to_string()),
        runner_image: cli
            .runner_image
            .or(cfg.runner_image)
            .unwrap_or_else(|| DEFAULT_RUNNER_IMAGE.to_string()),
        analyzer_binary: cli
            .analyzer_binary
            .or(cfg.analyzer_binary)
            .unwrap_or_else(|| DEFAULT_ANALYZER_BINARY.to_string()),
        verbosity: cli.verbosity.or(cfg.verbosity).unwrap_or(DEFAULT_VERBOSITY),
        timeout_secs: cli.timeout_secs.or(cfg.timeout_secs).filter(|s| *s > 0),
        output: cli
            .output
            .or(cfg.output)
            .unwrap_or_else(|| "human".to_string()),
        log_level: cli
            .log_level
            .or(cfg.log_level)
            .unwrap_or_else(|| "info".to_string()),
        test_filter: cli.test_filter.or(cfg.test_filter),
        keep_temp: cli.keep_temp.or(cfg.keep_temp).unwrap_or(false),
        repo_root,
    }
}
