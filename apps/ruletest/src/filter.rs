//! Inclusion filters selecting which tests and test cases to run.
//!
//! The name filter is parsed from a comma-separated list where each token is
//! either `ruleID` (every case of the rule) or `ruleID#caseName` (one case).

use crate::models::spec::Test;
use std::collections::{BTreeMap, BTreeSet};

/// Narrows a list of tests. Tests left without cases are removed.
pub trait TestsFilter: Send + Sync {
    fn filter(&self, tests: Vec<Test>) -> Vec<Test>;
}

/// Accepts everything.
pub struct AcceptAll;

impl TestsFilter for AcceptAll {
    fn filter(&self, tests: Vec<Test>) -> Vec<Test> {
        tests
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NameFilter {
    whole_rules: BTreeSet<String>,
    cases: BTreeMap<String, BTreeSet<String>>,
}

impl NameFilter {
    pub fn parse(list: &str) -> Self {
        let mut f = NameFilter::default();
        for tok in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match tok.split_once('#') {
                Some((rule, case)) => {
                    f.cases
                        .entry(rule.trim().to_string())
                        .or_default()
                        .insert(case.trim().to_string());
                }
                None => {
                    f.whole_rules.insert(tok.to_string());
                }
            }
        }
        f
    }
}

impl TestsFilter for NameFilter {
    fn filter(&self, tests: Vec<Test>) -> Vec<Test> {
        tests
            .into_iter()
            .filter_map(|mut t| {
                // a bare rule token wins over scoped ones
                if self.whole_rules.contains(&t.rule_id) {
                    return Some(t);
                }
                let wanted = self.cases.get(&t.rule_id)?;
                t.test_cases.retain(|tc| wanted.contains(&tc.name));
                if t.test_cases.is_empty() {
                    None
                } else {
                    Some(t)
                }
            })
            .collect()
    }
}

/// Build the filter for an optional `--test-filter` value.
pub fn filter_from_option(list: Option<&str>) -> Box<dyn TestsFilter> {
    match list.map(str::trim) {
        Some(s) if !s.is_empty() => Box::new(NameFilter::parse(s)),
        _ => Box::new(AcceptAll),
    }
}
