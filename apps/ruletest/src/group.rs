//! Partitioning of test cases into analyzer runs.

use crate::models::spec::{AnalysisParams, Test};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Tests whose cases all share one set of analysis params.
pub struct TestGroup {
    pub params: AnalysisParams,
    pub tests: Vec<Test>,
}

impl TestGroup {
    /// Rule IDs the group needs from the rules file.
    pub fn rule_ids(&self) -> BTreeSet<String> {
        self.tests.iter().map(|t| t.rule_id.clone()).collect()
    }
}

/// Split tests into the fewest groups with identical analysis params.
///
/// A rule whose cases disagree on params appears in several groups, each
/// holding only its matching cases. Groups come out ordered by
/// `(depLabelSelector, mode)`; tests keep their input order within a group.
pub fn group_tests(tests: &[Test]) -> Vec<TestGroup> {
    let mut groups: BTreeMap<AnalysisParams, Vec<Test>> = BTreeMap::new();
    for test in tests {
        for tc in &test.test_cases {
            let bucket = groups.entry(tc.analysis_params.clone()).or_default();
            match bucket.iter_mut().find(|t| t.rule_id == test.rule_id) {
                Some(t) => t.test_cases.push(tc.clone()),
                None => bucket.push(Test {
                    rule_id: test.rule_id.clone(),
                    test_cases: vec![tc.clone()],
                }),
            }
        }
    }
    groups
        .into_iter()
        .map(|(params, tests)| TestGroup { params, tests })
        .collect()
}
