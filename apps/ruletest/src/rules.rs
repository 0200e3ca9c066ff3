//! Extraction of the rules a group needs from the full rules file.

use crate::error::{GroupError, RuleError};
use serde_yaml::{Mapping, Value as Yaml};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const RULESET_METADATA_FILE: &str = "ruleset.yaml";

/// Return the rule entries whose `ruleID` is in `needed`.
///
/// Every needed ID must be present; missing ones are reported together.
pub fn extract_rules(doc: &str, needed: &BTreeSet<String>) -> Result<Vec<Mapping>, RuleError> {
    let parsed: Yaml = serde_yaml::from_str(doc)?;
    let entries = match parsed {
        Yaml::Sequence(seq) => seq,
        Yaml::Null => Vec::new(),
        _ => return Err(RuleError::NotAList),
    };
    let mut found: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::new();
    for entry in entries {
        let Yaml::Mapping(rule) = entry else {
            continue;
        };
        let id = rule.get("ruleID").and_then(Yaml::as_str).map(str::to_string);
        if let Some(id) = id {
            if needed.contains(&id) {
                found.insert(id);
                out.push(rule);
            }
        }
    }
    let missing: Vec<String> = needed.difference(&found).cloned().collect();
    if !missing.is_empty() {
        return Err(RuleError::NotFound { ids: missing });
    }
    Ok(out)
}

/// Read `rules_path`, extract `needed`, and write them under `<dir>/rules`.
///
/// A `ruleset.yaml` next to the source rules file is copied along so the
/// analyzer reports the same ruleset name and tags. Returns the directory.
pub fn write_rules_dir(
    rules_path: &Path,
    needed: &BTreeSet<String>,
    dir: &Path,
) -> Result<PathBuf, GroupError> {
    let doc = fs::read_to_string(rules_path).map_err(|source| RuleError::Read {
        path: rules_path.to_path_buf(),
        source,
    })?;
    let rules = extract_rules(&doc, needed)?;
    let out_dir = dir.join("rules");
    fs::create_dir_all(&out_dir).map_err(|source| GroupError::Write {
        path: out_dir.clone(),
        source,
    })?;
    let body = serde_yaml::to_string(&rules).map_err(RuleError::Decode)?;
    let out_file = out_dir.join("rules.yaml");
    fs::write(&out_file, body).map_err(|source| GroupError::Write {
        path: out_file.clone(),
        source,
    })?;
    if let Some(meta) = rules_path.parent().map(|p| p.join(RULESET_METADATA_FILE)) {
        if meta.is_file() {
            let target = out_dir.join(RULESET_METADATA_FILE);
            fs::copy(&meta, &target).map_err(|source| GroupError::Write {
                path: target.clone(),
                source,
            })?;
        }
    }
    Ok(out_dir)
}
