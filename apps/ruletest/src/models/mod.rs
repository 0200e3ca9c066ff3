//! Shared data models for tests files, analyzer output, provider settings,
//! and per-case results.

pub mod output;
pub mod provider;
pub mod spec;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Outcome of one test case.
///
/// When the case's group failed before verification, `error` is set and
/// `failure_reasons` stays empty.
pub struct TestResult {
    pub passed: bool,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "ruleID")]
    pub rule_id: String,
    #[serde(rename = "testCaseName")]
    pub test_case_name: String,
    #[serde(rename = "debugInfo")]
    pub debug_info: Vec<String>,
    #[serde(rename = "failureReasons")]
    pub failure_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    /// Errored result for a case whose group never reached verification.
    pub fn errored(
        file_path: &str,
        rule_id: &str,
        test_case_name: &str,
        error: impl std::fmt::Display,
    ) -> Self {
        TestResult {
            passed: false,
            file_path: file_path.to_string(),
            rule_id: rule_id.to_string(),
            test_case_name: test_case_name.to_string(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.passed || self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Aggregated pass ratios used by printers.
pub struct Summary {
    #[serde(rename = "rulesTotal")]
    pub rules_total: usize,
    #[serde(rename = "rulesPassed")]
    pub rules_passed: usize,
    #[serde(rename = "casesTotal")]
    pub cases_total: usize,
    #[serde(rename = "casesPassed")]
    pub cases_passed: usize,
}
