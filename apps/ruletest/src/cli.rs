//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ruletest",
    version,
    about = "Run analyzer rule tests",
    long_about = "ruletest: run declarative tests for analyzer rules and verify the incidents they produce.\n\nConfiguration precedence: CLI > ruletest.toml > defaults.",
    after_help = "Examples:\n  ruletest test rulesets/eap8\n  ruletest test rulesets/eap8/01-javax.test.yaml --test-filter rule-000#tc-1\n  ruletest test rulesets --run-local --analyzer-binary ./bin/konveyor-analyzer",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current ruletest version.")]
    Version,
    /// Run rule tests
    #[command(
        about = "Run rule tests",
        long_about = "Discover *.test.yaml files under the given paths, run the analyzer once per group of test cases sharing analysis params, and verify the results.",
        after_help = "Examples:\n  ruletest test rulesets/\n  ruletest test rulesets/ --output json\n  ruletest test a.test.yaml --test-filter 'rule-000,rule-001#tc-2'"
    )]
    Test {
        #[arg(required = true, help = "Tests files or directories containing *.test.yaml")]
        paths: Vec<String>,
        #[arg(long, help = "Repository root used for config discovery (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Comma-separated rule IDs or ruleID#testCase to run")]
        test_filter: Option<String>,
        #[arg(long, help = "Base provider settings file (YAML or JSON list)")]
        provider_settings: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Run the analyzer as a local process instead of a container")]
        run_local: bool,
        #[arg(long, help = "Container tool: podman|docker (default: podman)")]
        container_tool: Option<String>,
        #[arg(long, help = "Runner image for containerized runs")]
        runner_image: Option<String>,
        #[arg(long, help = "Analyzer binary (local path or container entrypoint)")]
        analyzer_binary: Option<String>,
        #[arg(long, help = "Analyzer verbosity (default: 20)")]
        verbosity: Option<u32>,
        #[arg(long, help = "Kill an analyzer run after this many seconds")]
        timeout_secs: Option<u64>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Keep temp directories even for passing groups")]
        keep_temp: bool,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Log level or filter directive (default: info)")]
        log_level: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_subcommand() {
        let cli = Cli::try_parse_from([
            "ruletest",
            "test",
            "rulesets",
            "extra.test.yaml",
            "--run-local",
            "--test-filter",
            "rule-000#tc-1",
            "--verbosity",
            "5",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Test {
                paths,
                run_local,
                test_filter,
                verbosity,
                keep_temp,
                ..
            } => {
                assert_eq!(paths, vec!["rulesets", "extra.test.yaml"]);
                assert!(run_local);
                assert!(!keep_temp);
                assert_eq!(test_filter.as_deref(), Some("rule-000#tc-1"));
                assert_eq!(verbosity, Some(5));
            }
            Commands::Version => panic!("expected test"),
        }
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["ruletest", "test"]).is_err());
    }
}
