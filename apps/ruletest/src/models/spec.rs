//! Tests-file schema: providers, tests, test cases and their expectations.
//!
//! A tests file (`*.test.yaml`) looks like:
//!
//! ```yaml
//! rulesPath: ../rules.yaml      # optional, defaults to <stem>.yaml
//! providers:
//!   - name: java
//!     dataPath: ./data/java
//! tests:
//!   - ruleID: rule-000
//!     testCases:
//!       - name: tc-1
//!         analysisParams: { mode: source-only }
//!         hasIncidents: { exactly: 1 }
//! ```

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// One parsed tests file. `path` is filled in by the parser.
pub struct SpecFile {
    #[serde(default, rename = "rulesPath")]
    pub rules_path: Option<PathBuf>,
    #[serde(default)]
    pub providers: Vec<ProviderOverride>,
    #[serde(default)]
    pub tests: Vec<Test>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
/// Fixture directory a named provider should analyze.
pub struct ProviderOverride {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "dataPath")]
    pub data_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Ruleset-level defaults (`testing-config.yaml`), only `providers`.
pub struct RulesetDefaults {
    #[serde(default)]
    pub providers: Vec<ProviderOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Test {
    #[serde(default, rename = "ruleID")]
    pub rule_id: String,
    #[serde(default, rename = "testCases")]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "analysisParams")]
    pub analysis_params: AnalysisParams,
    #[serde(default, rename = "isUnmatched")]
    pub is_unmatched: bool,
    #[serde(default, rename = "hasIncidents", alias = "hasInsights")]
    pub has_incidents: Option<IncidentVerification>,
    #[serde(default, rename = "hasTags")]
    pub has_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
/// Parameters that force a separate analyzer run when they differ.
///
/// Field order matters: the derived `Ord` sorts by selector, then mode.
pub struct AnalysisParams {
    #[serde(default, rename = "depLabelSelector")]
    pub dep_label_selector: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IncidentFields")]
/// Expectation on a rule's incidents.
///
/// The document carries no tag; both shapes share one inline mapping and the
/// variant is chosen by which keys are present:
/// - exactly one of `exactly`, `atLeast`, `atMost` and no `locations` → `Count`
/// - a non-empty `locations` and no count key → `Locations`
///
/// Anything else (no keys, both shapes, several count keys) fails to decode.
pub enum IncidentVerification {
    Count(CountBound),
    Locations(Vec<LocationExpectation>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountBound {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocationExpectation {
    #[serde(default, rename = "fileURI")]
    pub file_uri: String,
    #[serde(default, rename = "lineNumber")]
    pub line_number: Option<u32>,
    #[serde(default, rename = "messageMatches")]
    pub message_matches: Option<String>,
    #[serde(default, rename = "codeSnipMatches")]
    pub code_snip_matches: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IncidentFields {
    #[serde(default)]
    exactly: Option<usize>,
    #[serde(default, rename = "atLeast")]
    at_least: Option<usize>,
    #[serde(default, rename = "atMost")]
    at_most: Option<usize>,
    #[serde(default)]
    locations: Option<Vec<LocationExpectation>>,
}

impl TryFrom<IncidentFields> for IncidentVerification {
    type Error = String;

    fn try_from(raw: IncidentFields) -> Result<Self, Self::Error> {
        let mut bounds = Vec::new();
        if let Some(n) = raw.exactly {
            bounds.push(CountBound::Exactly(n));
        }
        if let Some(n) = raw.at_least {
            bounds.push(CountBound::AtLeast(n));
        }
        if let Some(n) = raw.at_most {
            bounds.push(CountBound::AtMost(n));
        }
        let locations = raw.locations.filter(|l| !l.is_empty());
        match (bounds.len(), locations) {
            (0, None) => Err(
                "hasIncidents must declare a count (exactly|atLeast|atMost) or locations"
                    .to_string(),
            ),
            (0, Some(locs)) => Ok(IncidentVerification::Locations(locs)),
            (1, None) => Ok(IncidentVerification::Count(bounds[0])),
            (1, Some(_)) => Err(
                "hasIncidents cannot declare both a count and locations".to_string(),
            ),
            _ => Err("hasIncidents count bounds exactly|atLeast|atMost are mutually exclusive"
                .to_string()),
        }
    }
}

impl SpecFile {
    /// Check structural invariants, collecting every problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();
        for (i, p) in self.providers.iter().enumerate() {
            if p.name.trim().is_empty() {
                problems.push(format!("providers[{}]: name must not be empty", i));
            }
            if p.data_path.trim().is_empty() {
                problems.push(format!("providers[{}]: dataPath must not be empty", i));
            }
        }
        for (i, t) in self.tests.iter().enumerate() {
            if t.rule_id.trim().is_empty() {
                problems.push(format!("tests[{}]: ruleID must not be empty", i));
            }
            for (j, tc) in t.test_cases.iter().enumerate() {
                let at = format!("tests[{}].testCases[{}]", i, j);
                if tc.name.trim().is_empty() {
                    problems.push(format!("{}: name must not be empty", at));
                }
                if let Some(IncidentVerification::Locations(locs)) = &tc.has_incidents {
                    for (k, loc) in locs.iter().enumerate() {
                        if loc.file_uri.trim().is_empty() {
                            problems.push(format!("{}.locations[{}]: fileURI is required", at, k));
                        }
                        if loc.line_number.is_none() {
                            problems
                                .push(format!("{}.locations[{}]: lineNumber is required", at, k));
                        }
                    }
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { problems })
        }
    }

    /// Number of test cases across all tests.
    pub fn case_count(&self) -> usize {
        self.tests.iter().map(|t| t.test_cases.len()).sum()
    }
}

/// Merge provider overrides; entries in `from` win by name.
///
/// Unmatched names from both sides are kept and the result is sorted by
/// name.
pub fn merge_providers(base: &[ProviderOverride], from: &[ProviderOverride]) -> Vec<ProviderOverride> {
    let mut merged: BTreeMap<String, ProviderOverride> = BTreeMap::new();
    for p in base.iter().chain(from.iter()) {
        merged.insert(p.name.clone(), p.clone());
    }
    merged.into_values().collect()
}
