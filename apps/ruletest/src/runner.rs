//! Test runner: executes every analysis group of every tests file.
//!
//! Files and groups run one after another. Each group owns a temp directory
//! holding the extracted rules, provider settings, analyzer log, output and a
//! reproducer script. The directory is removed when every case in the group
//! passes and kept otherwise, so failures can be inspected afterwards.

use crate::engine::{Engine, EngineRequest};
use crate::error::GroupError;
use crate::group::{group_tests, TestGroup};
use crate::models::output::{parse_output, RuleSet};
use crate::models::spec::SpecFile;
use crate::models::TestResult;
use crate::rules::write_rules_dir;
use crate::settings::SettingsBuilder;
use crate::verify::{rule_errors, verify};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PROVIDER_SETTINGS_FILE: &str = "provider_settings.json";
const OUTPUT_FILE: &str = "output.yaml";
const LOG_FILE: &str = "analysis.log";
const REPRODUCER_FILE: &str = "reproducer.sh";

/// Runner options that do not depend on the engine flavour.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub verbosity: u32,
    /// Keep group directories even when everything passed.
    pub keep_temp: bool,
    /// Parent for group directories; system temp dir when unset.
    pub temp_root: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verbosity: 20,
            keep_temp: false,
            temp_root: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub results: Vec<TestResult>,
}

impl RunReport {
    /// True when any case failed or errored.
    pub fn failed(&self) -> bool {
        self.results.iter().any(TestResult::is_failure)
    }
}

pub struct Runner {
    engine: Box<dyn Engine>,
    settings: SettingsBuilder,
    options: RunOptions,
}

impl Runner {
    pub fn new(engine: Box<dyn Engine>, settings: SettingsBuilder, options: RunOptions) -> Self {
        Self {
            engine,
            settings,
            options,
        }
    }

    /// Run all spec files. The returned results are sorted by file, rule
    /// and test case.
    pub fn run(&self, specs: &[SpecFile]) -> RunReport {
        let mut results = Vec::new();
        for spec in specs {
            results.extend(self.run_spec(spec));
        }
        results.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
                .then_with(|| a.test_case_name.cmp(&b.test_case_name))
        });
        RunReport { results }
    }

    fn run_spec(&self, spec: &SpecFile) -> Vec<TestResult> {
        let file = spec.path.to_string_lossy().to_string();
        let groups = group_tests(&spec.tests);
        info!(file = %file, groups = groups.len(), cases = spec.case_count(), "running tests file");
        let mut results = Vec::new();
        for group in &groups {
            match self.run_group(spec, group) {
                Ok(mut rs) => results.append(&mut rs),
                Err(e) => {
                    warn!(file = %file, error = %e, "analysis group failed");
                    results.extend(errored_cases(&file, group, &e, &[]));
                }
            }
        }
        results
    }

    fn run_group(&self, spec: &SpecFile, group: &TestGroup) -> Result<Vec<TestResult>, GroupError> {
        let file = spec.path.to_string_lossy().to_string();
        let mut builder = tempfile::Builder::new();
        builder.prefix("rules-test-");
        let temp = match self.options.temp_root.as_ref() {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(GroupError::TempDir)?;
        let dir = temp.path().to_path_buf();
        let log = File::create(dir.join(LOG_FILE)).map_err(GroupError::LogFile)?;
        debug!(dir = %dir.display(), mode = %group.params.mode, selector = %group.params.dep_label_selector, "group workspace ready");

        let rules_path = spec
            .rules_path
            .clone()
            .unwrap_or_else(|| crate::parser::default_rules_path(&spec.path));
        let rules_dir = write_rules_dir(&rules_path, &group.rule_ids(), &dir)?;

        let shared = self.settings.shared_dir(&dir);
        let providers = self.settings.build(spec, &group.params, &shared)?;
        let settings_path = dir.join(PROVIDER_SETTINGS_FILE);
        let body = serde_json::to_string_pretty(&providers).map_err(crate::error::SettingsError::from)?;
        write_file(&settings_path, &body)?;

        let request = EngineRequest {
            settings: settings_path,
            rules: rules_dir,
            output: dir.join(OUTPUT_FILE),
            group_dir: dir.clone(),
            verbosity: self.options.verbosity,
            dep_label_selector: group.params.dep_label_selector.clone(),
            volumes: self.settings.volumes(spec),
        };
        let run = self.engine.invoke(&request, &log);
        write_file(&dir.join(REPRODUCER_FILE), &format!("#!/bin/sh\n{}\n", run.reproducer))?;
        let output = match run
            .outcome
            .map_err(GroupError::from)
            .and_then(|()| read_output(&request.output))
        {
            Ok(output) => output,
            Err(e) => {
                // keep the workspace around for the log, output and reproducer
                let kept = temp.keep();
                warn!(file = %file, dir = %kept.display(), error = %e, "analysis group failed");
                let hints = debug_hints(&kept, &run.reproducer);
                return Ok(errored_cases(&file, group, &e, &hints));
            }
        };

        let mut results = Vec::new();
        for test in &group.tests {
            for tc in &test.test_cases {
                let reasons = verify(tc, &test.rule_id, &output);
                results.push(TestResult {
                    passed: reasons.is_empty(),
                    file_path: file.clone(),
                    rule_id: test.rule_id.clone(),
                    test_case_name: tc.name.clone(),
                    failure_reasons: reasons,
                    ..Default::default()
                });
            }
        }

        let any_failed = results.iter().any(|r| !r.passed);
        if any_failed || self.options.keep_temp {
            let kept = temp.keep();
            let hints = debug_hints(&kept, &run.reproducer);
            for r in results.iter_mut().filter(|r| !r.passed) {
                r.debug_info = rule_errors(&r.rule_id, &output);
                r.debug_info.extend(hints.iter().cloned());
            }
            info!(dir = %kept.display(), "kept group workspace");
        }
        Ok(results)
    }
}

/// One errored result per case in `group`, all carrying the same error.
fn errored_cases(file: &str, group: &TestGroup, err: &GroupError, hints: &[String]) -> Vec<TestResult> {
    group
        .tests
        .iter()
        .flat_map(|test| {
            test.test_cases.iter().map(move |tc| TestResult {
                debug_info: hints.to_vec(),
                ..TestResult::errored(file, &test.rule_id, &tc.name, err)
            })
        })
        .collect()
}

fn debug_hints(dir: &Path, reproducer: &str) -> Vec<String> {
    vec![
        format!("find debug data in {}", dir.display()),
        format!("reproduce with: {}", reproducer),
    ]
}

fn write_file(path: &Path, body: &str) -> Result<(), GroupError> {
    fs::write(path, body).map_err(|source| GroupError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_output(path: &Path) -> Result<Vec<RuleSet>, GroupError> {
    let s = fs::read_to_string(path).map_err(|source| GroupError::ReadOutput {
        path: path.to_path_buf(),
        source,
    })?;
    parse_output(&s).map_err(|source| GroupError::DecodeOutput {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use crate::filter::AcceptAll;
    use crate::models::provider::ProviderTable;
    use crate::parser::parse_paths;
    use crate::settings::ExecutionMode;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    const RULES: &str = r#"
- ruleID: rule-000
  when:
    builtin.filecontent:
      pattern: javax
- ruleID: rule-001
  when:
    builtin.file:
      pattern: pom.xml
"#;

    const SPEC: &str = r#"
providers:
  - name: java
    dataPath: ./data
tests:
  - ruleID: rule-000
    testCases:
      - name: tc-1
        analysisParams: { mode: source-only }
        hasIncidents:
          locations:
            - fileURI: src/App.java
              lineNumber: 3
              messageMatches: jakarta
      - name: tc-2
        analysisParams: { mode: full }
        hasIncidents: { atLeast: 1 }
  - ruleID: rule-001
    testCases:
      - name: tc-1
        analysisParams: { mode: source-only }
        isUnmatched: true
"#;

    const OUTPUT: &str = r#"
- name: test
  violations:
    rule-000:
      incidents:
        - uri: file:///data/src/App.java
          lineNumber: 3
          message: use jakarta
          codeSnip: import javax.ejb.Stateless;
  unmatched: [rule-001]
"#;

    /// Write a fake analyzer that copies a canned output to `--output-file`.
    fn fake_analyzer(dir: &Path, canned: &str, exit: i32) -> PathBuf {
        let canned_path = dir.join("canned.yaml");
        fs::write(&canned_path, canned).unwrap();
        let script = dir.join("fake-analyzer");
        let body = format!(
            "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in --output-file=*) out=\"${{a#--output-file=}}\";; esac; done\necho analyzing\nif [ {exit} -ne 0 ]; then echo 'provider crashed' >&2; exit {exit}; fi\ncp {canned} \"$out\"\n",
            exit = exit,
            canned = canned_path.display()
        );
        fs::write(&script, body).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn setup(canned: &str, exit: i32) -> (tempfile::TempDir, Runner, Vec<SpecFile>) {
        let dir = tempdir().unwrap();
        let rs = dir.path().join("rulesets");
        fs::create_dir_all(rs.join("data/src")).unwrap();
        fs::write(rs.join("01-javax.yaml"), RULES).unwrap();
        fs::write(rs.join("01-javax.test.yaml"), SPEC).unwrap();
        let bin = fake_analyzer(dir.path(), canned, exit);
        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let runner = Runner::new(
            Box::new(LocalEngine {
                binary: bin.to_string_lossy().to_string(),
                timeout: None,
            }),
            SettingsBuilder::new(ProviderTable::container_defaults(), ExecutionMode::Local),
            RunOptions {
                temp_root: Some(work),
                ..Default::default()
            },
        );
        let (specs, errors) = parse_paths(&[rs], &AcceptAll);
        assert!(errors.is_empty(), "{:?}", errors);
        (dir, runner, specs)
    }

    fn kept_dirs(root: &Path) -> usize {
        fs::read_dir(root.join("work")).unwrap().count()
    }

    #[test]
    fn test_run_passes_and_cleans_up() {
        let (dir, runner, specs) = setup(OUTPUT, 0);
        let report = runner.run(&specs);
        assert_eq!(report.results.len(), 3);
        assert!(!report.failed(), "{:?}", report.results);
        let names: Vec<(String, String)> = report
            .results
            .iter()
            .map(|r| (r.rule_id.clone(), r.test_case_name.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("rule-000".to_string(), "tc-1".to_string()),
                ("rule-000".to_string(), "tc-2".to_string()),
                ("rule-001".to_string(), "tc-1".to_string()),
            ]
        );
        assert_eq!(kept_dirs(dir.path()), 0);
    }

    #[test]
    fn test_failed_case_keeps_workspace() {
        let canned = OUTPUT.replace("use jakarta", "use something else");
        let (dir, runner, specs) = setup(&canned, 0);
        let report = runner.run(&specs);
        assert!(report.failed());
        let failed: Vec<&TestResult> = report.results.iter().filter(|r| !r.passed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].test_case_name, "tc-1");
        assert!(failed[0].debug_info[0].starts_with("find debug data in"));
        // only the source-only group failed; the full group was removed
        assert_eq!(kept_dirs(dir.path()), 1);
        let kept = fs::read_dir(dir.path().join("work"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert!(kept.join("provider_settings.json").is_file());
        assert!(kept.join("rules/rules.yaml").is_file());
        assert!(fs::read_to_string(kept.join("analysis.log"))
            .unwrap()
            .contains("analyzing"));
    }

    #[test]
    fn test_engine_failure_errors_every_case_in_group() {
        let (dir, runner, specs) = setup(OUTPUT, 2);
        let report = runner.run(&specs);
        assert!(report.failed());
        assert_eq!(report.results.len(), 3);
        for r in &report.results {
            assert!(!r.rule_id.is_empty());
            assert!(!r.test_case_name.is_empty());
            assert!(r.error.as_deref().unwrap().contains("provider crashed"));
            assert!(r.debug_info.iter().any(|d| d.starts_with("reproduce with:")));
        }
        // both groups keep their workspaces
        assert_eq!(kept_dirs(dir.path()), 2);
    }

    #[test]
    fn test_undecodable_output_keeps_workspace() {
        let (dir, runner, specs) = setup("- name: [unclosed", 0);
        let report = runner.run(&specs);
        assert_eq!(report.results.len(), 3);
        for r in &report.results {
            assert!(r.error.as_deref().unwrap().contains("failed decoding analysis output"));
            assert!(r.debug_info[0].starts_with("find debug data in"));
        }
        assert_eq!(kept_dirs(dir.path()), 2);
        for entry in fs::read_dir(dir.path().join("work")).unwrap() {
            let kept = entry.unwrap().path();
            assert!(kept.join("output.yaml").is_file());
            assert!(kept.join("reproducer.sh").is_file());
        }
    }

    #[test]
    fn test_analyzer_rule_errors_reach_failed_cases() {
        let canned = format!(
            "{}  errors:\n    rule-000: unable to parse condition\n",
            OUTPUT.replace("use jakarta", "use something else")
        );
        let (_dir, runner, specs) = setup(&canned, 0);
        let report = runner.run(&specs);
        let failed: Vec<&TestResult> = report.results.iter().filter(|r| !r.passed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].debug_info[0],
            "analyzer reported an error for rule-000: unable to parse condition"
        );
        assert!(failed[0].debug_info[1].starts_with("find debug data in"));
    }

    #[test]
    fn test_missing_rule_aborts_group_only() {
        let (dir, runner, specs) = setup(OUTPUT, 0);
        fs::write(
            dir.path().join("rulesets/01-javax.yaml"),
            RULES.replace("rule-001", "rule-999"),
        )
        .unwrap();
        let report = runner.run(&specs);
        // source-only group needs rule-001 and errors for both of its cases
        let errored: Vec<&TestResult> =
            report.results.iter().filter(|r| r.error.is_some()).collect();
        assert_eq!(errored.len(), 2);
        assert!(errored
            .iter()
            .all(|r| r.error.as_deref().unwrap().contains("rule-001")));
        assert!(report
            .results
            .iter()
            .any(|r| r.rule_id == "rule-000" && r.test_case_name == "tc-2" && r.passed));
    }
}
