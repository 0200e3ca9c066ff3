//! Output rendering for test results.
//!
//! Supports `human` (default) and `json` outputs. Human output is a pass
//! ratio summary plus a progress tree (file → rule → failed case); the JSON
//! form carries every result and the same summary.

use crate::models::{Summary, TestResult};
use crate::utils::rel_to_wd;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeMap;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Compute rule and case pass ratios.
///
/// A rule passes when every one of its case results passed; errored cases
/// count as failed.
pub fn summarize(results: &[TestResult]) -> Summary {
    let mut rules: BTreeMap<&str, bool> = BTreeMap::new();
    let mut cases_passed = 0;
    for r in results {
        let ok = !r.is_failure();
        if ok {
            cases_passed += 1;
        }
        let entry = rules.entry(r.rule_id.as_str()).or_insert(true);
        *entry &= ok;
    }
    Summary {
        rules_total: rules.len(),
        rules_passed: rules.values().filter(|ok| **ok).count(),
        cases_total: results.len(),
        cases_passed,
    }
}

fn percent(passed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        passed as f64 * 100.0 / total as f64
    }
}

fn label(passed: usize, total: usize, color: bool) -> String {
    match (passed == total, color) {
        (true, true) => "PASSED".green().bold().to_string(),
        (true, false) => "PASSED".to_string(),
        (false, true) => "FAILED".red().bold().to_string(),
        (false, false) => "FAILED".to_string(),
    }
}

/// Render the two summary lines.
pub fn render_summary(results: &[TestResult], color: bool) -> String {
    let s = summarize(results);
    format!(
        "Rules Summary:      {}/{} ({:.2}%) {}\nTest Cases Summary: {}/{} ({:.2}%) {}\n",
        s.rules_passed,
        s.rules_total,
        percent(s.rules_passed, s.rules_total),
        label(s.rules_passed, s.rules_total, color),
        s.cases_passed,
        s.cases_total,
        percent(s.cases_passed, s.cases_total),
        label(s.cases_passed, s.cases_total, color),
    )
}

/// Render the progress tree. Passing cases only show up in the ratios.
pub fn render_progress(results: &[TestResult], color: bool) -> String {
    let mut by_file: BTreeMap<&str, Vec<&TestResult>> = BTreeMap::new();
    for r in results {
        by_file.entry(r.file_path.as_str()).or_default().push(r);
    }
    let mut out = String::new();
    for (file, rs) in by_file {
        let passed = rs.iter().filter(|r| !r.is_failure()).count();
        let name = rel_to_wd(std::path::Path::new(file));
        let name = if color { name.bold().to_string() } else { name };
        out.push_str(&format!(
            "- {} {}/{} {}\n",
            name,
            passed,
            rs.len(),
            label(passed, rs.len(), color)
        ));

        let mut by_rule: BTreeMap<&str, Vec<&TestResult>> = BTreeMap::new();
        for &r in &rs {
            by_rule.entry(r.rule_id.as_str()).or_default().push(r);
        }
        for (rule, cases) in by_rule {
            let ok = cases.iter().filter(|r| !r.is_failure()).count();
            out.push_str(&format!(
                "  - {} {}/{} {}\n",
                rule,
                ok,
                cases.len(),
                label(ok, cases.len(), color)
            ));
            for c in cases.iter().filter(|r| r.is_failure()) {
                out.push_str(&format!(
                    "    - {} {}\n",
                    c.test_case_name,
                    label(0, 1, color)
                ));
                for reason in &c.failure_reasons {
                    out.push_str(&format!("      - {}\n", reason));
                }
                if let Some(err) = c.error.as_deref() {
                    let tag = if color {
                        "ERROR".red().bold().to_string()
                    } else {
                        "ERROR".to_string()
                    };
                    out.push_str(&format!("      - {} {}\n", tag, err));
                }
                for d in &c.debug_info {
                    let d = if color {
                        d.bright_black().to_string()
                    } else {
                        d.clone()
                    };
                    out.push_str(&format!("      - {}\n", d));
                }
            }
        }
    }
    out
}

/// Print results in the requested format.
pub fn print_results(results: &[TestResult], output: &str) {
    match output {
        "json" => match serde_json::to_string_pretty(&compose_json(results)) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("failed to encode results: {}", e),
        },
        _ => {
            let color = use_colors(output);
            print!("{}", render_progress(results, color));
            print!("{}", render_summary(results, color));
        }
    }
}

/// Print parse errors for tests files that could not be loaded.
pub fn print_parse_errors(errors: &[crate::error::SpecError], output: &str) {
    let color = use_colors(output);
    for e in errors {
        if color {
            eprintln!("{} {}", "✖ error:".red().bold(), e);
        } else {
            eprintln!("✖ error: {}", e);
        }
    }
}

/// Compose results JSON object (pure) for testing/snapshot purposes.
pub fn compose_json(results: &[TestResult]) -> JsonVal {
    json!({
        "results": results,
        "summary": summarize(results),
    })
}
