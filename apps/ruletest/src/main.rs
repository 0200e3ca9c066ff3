//! ruletest CLI binary entry point.
//! Resolves configuration, loads tests files, runs them, and prints results.

use clap::Parser;
use ruletest::cli::{Cli, Commands};
use ruletest::config::{self, CliOverrides};
use ruletest::engine::{ContainerEngine, Engine, LocalEngine};
use ruletest::filter::filter_from_option;
use ruletest::models::provider::ProviderTable;
use ruletest::runner::{RunOptions, Runner};
use ruletest::settings::{ExecutionMode, SettingsBuilder};
use ruletest::utils::error_prefix;
use ruletest::{logging, output, parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Test {
            paths,
            repo_root,
            test_filter,
            provider_settings,
            run_local,
            container_tool,
            runner_image,
            analyzer_binary,
            verbosity,
            timeout_secs,
            keep_temp,
            output: output_mode,
            log_level,
        } => {
            let eff = config::resolve_effective(CliOverrides {
                repo_root,
                provider_settings,
                run_local: if run_local { Some(true) } else { None },
                container_tool,
                runner_image,
                analyzer_binary,
                verbosity,
                timeout_secs,
                output: output_mode,
                log_level,
                test_filter,
                keep_temp: if keep_temp { Some(true) } else { None },
            });
            logging::init(&eff.log_level);
            if config::load_config(&eff.repo_root).is_none() {
                info!("no ruletest.toml found; using defaults");
            }

            let table = match eff.provider_settings.as_ref() {
                Some(p) => match ProviderTable::from_path(p) {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("{} {}", error_prefix(), e);
                        std::process::exit(2);
                    }
                },
                None => ProviderTable::container_defaults(),
            };
            let timeout = eff.timeout_secs.map(Duration::from_secs);
            let (engine, mode): (Box<dyn Engine>, ExecutionMode) = if eff.run_local {
                (
                    Box::new(LocalEngine {
                        binary: eff.analyzer_binary.clone(),
                        timeout,
                    }),
                    ExecutionMode::Local,
                )
            } else {
                (
                    Box::new(ContainerEngine {
                        tool: eff.container_tool.clone(),
                        image: eff.runner_image.clone(),
                        binary: eff.analyzer_binary.clone(),
                        timeout,
                    }),
                    ExecutionMode::Container,
                )
            };

            let filter = filter_from_option(eff.test_filter.as_deref());
            let inputs: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
            let (specs, errors) = parser::parse_paths(&inputs, filter.as_ref());
            output::print_parse_errors(&errors, &eff.output);
            if specs.is_empty() && errors.is_empty() {
                eprintln!("{} no test cases found under the given paths", error_prefix());
                std::process::exit(2);
            }

            let runner = Runner::new(
                engine,
                SettingsBuilder::new(table, mode),
                RunOptions {
                    verbosity: eff.verbosity,
                    keep_temp: eff.keep_temp,
                    temp_root: None,
                },
            );
            let report = runner.run(&specs);
            output::print_results(&report.results, &eff.output);
            if report.failed() || !errors.is_empty() {
                std::process::exit(1);
            }
        }
    }
}
