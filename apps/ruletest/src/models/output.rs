//! Analyzer output schema (`output.yaml`): a list of rule sets.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub violations: BTreeMap<String, Violation>,
    #[serde(default)]
    pub insights: BTreeMap<String, Violation>,
    #[serde(default)]
    pub unmatched: Vec<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Violation or insight record; both hold incidents the same way.
pub struct Violation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub incidents: Vec<Incident>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub uri: String,
    #[serde(default, rename = "lineNumber")]
    pub line_number: Option<u32>,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "codeSnip")]
    pub code_snip: String,
}

/// Decode an analyzer output document. An empty document yields no rule sets.
pub fn parse_output(doc: &str) -> Result<Vec<RuleSet>, serde_yaml::Error> {
    if doc.trim().is_empty() {
        return Ok(Vec::new());
    }
    let sets: Option<Vec<RuleSet>> = serde_yaml::from_str(doc)?;
    Ok(sets.unwrap_or_default())
}
