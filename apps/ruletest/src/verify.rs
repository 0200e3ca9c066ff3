//! Verification of analyzer output against one test case.
//!
//! `verify` is pure: it maps expectations plus output to failure reasons,
//! an empty list meaning the case passed.

use crate::models::output::{Incident, RuleSet};
use crate::models::spec::{CountBound, IncidentVerification, LocationExpectation, TestCase};
use crate::utils::normalize_path;
use regex::Regex;
use std::path::Path;

/// Check `tc` for `rule_id` against the analyzer's rule sets.
pub fn verify(tc: &TestCase, rule_id: &str, output: &[RuleSet]) -> Vec<String> {
    let mut reasons = Vec::new();

    let mut matched = false;
    let mut unmatched = false;
    let mut incidents: Vec<&Incident> = Vec::new();
    let mut tags: Vec<&str> = Vec::new();
    for rs in output {
        // violations and insights are interchangeable here
        for v in [rs.violations.get(rule_id), rs.insights.get(rule_id)]
            .into_iter()
            .flatten()
        {
            matched = true;
            incidents.extend(v.incidents.iter());
        }
        if rs.unmatched.iter().any(|r| r == rule_id) {
            unmatched = true;
        }
        tags.extend(rs.tags.iter().map(String::as_str));
    }

    if tc.is_unmatched {
        if !unmatched || matched {
            reasons.push("expected rule to not match but matched".to_string());
        }
        return reasons;
    }
    if unmatched {
        reasons.push("expected rule to match but unmatched".to_string());
        return reasons;
    }

    for want in &tc.has_tags {
        if !tag_found(want, &tags) {
            reasons.push(format!("tag '{}' not found in output", want));
        }
    }

    match &tc.has_incidents {
        Some(IncidentVerification::Count(bound)) => {
            if let Some(reason) = check_count(*bound, incidents.len()) {
                reasons.push(reason);
            }
        }
        Some(IncidentVerification::Locations(locations)) => {
            for loc in locations {
                check_location(loc, &incidents, &mut reasons);
            }
        }
        None => {}
    }
    reasons
}

fn tag_found(want: &str, tags: &[&str]) -> bool {
    if tags.iter().any(|t| *t == want) {
        return true;
    }
    match Regex::new(want) {
        Ok(re) => tags.iter().any(|t| re.is_match(t)),
        Err(_) => false,
    }
}

fn check_count(bound: CountBound, actual: usize) -> Option<String> {
    match bound {
        CountBound::Exactly(n) if n != actual => Some(format!(
            "expected exactly {} incidents, got {}",
            n, actual
        )),
        CountBound::AtLeast(n) if actual < n => Some(format!(
            "expected at least {} incidents, got {}",
            n, actual
        )),
        CountBound::AtMost(n) if actual > n => Some(format!(
            "expected at most {} incidents, got {}",
            n, actual
        )),
        _ => None,
    }
}

fn check_location(loc: &LocationExpectation, incidents: &[&Incident], reasons: &mut Vec<String>) {
    let want_file = normalize_uri(&loc.file_uri);
    let in_file: Vec<&&Incident> = incidents
        .iter()
        .filter(|i| normalize_uri(&i.uri).ends_with(&want_file))
        .collect();
    if in_file.is_empty() {
        reasons.push(format!(
            "expected incident in file {} not found",
            loc.file_uri
        ));
        return;
    }
    let line = loc
        .line_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    let on_line: Vec<&&Incident> = in_file
        .into_iter()
        .filter(|i| i.line_number == loc.line_number)
        .collect();
    if on_line.is_empty() {
        reasons.push(format!(
            "expected incident in file {} at line {} not found",
            loc.file_uri, line
        ));
        return;
    }
    // each pattern may be satisfied by any incident on the line
    if let Some(pat) = loc.message_matches.as_deref() {
        if !on_line.iter().any(|i| pattern_matches(pat, &i.message)) {
            reasons.push(format!(
                "expected message in file {} at line {} to match '{}'",
                loc.file_uri, line, pat
            ));
        }
    }
    if let Some(pat) = loc.code_snip_matches.as_deref() {
        if !on_line.iter().any(|i| pattern_matches(pat, &i.code_snip)) {
            reasons.push(format!(
                "expected code snippet in file {} at line {} to match '{}'",
                loc.file_uri, line, pat
            ));
        }
    }
}

/// Errors the analyzer recorded against `rule_id`, one line per rule set.
pub fn rule_errors(rule_id: &str, output: &[RuleSet]) -> Vec<String> {
    output
        .iter()
        .filter_map(|rs| rs.errors.get(rule_id))
        .map(|msg| format!("analyzer reported an error for {}: {}", rule_id, msg))
        .collect()
}

/// A pattern matches only if it matches as a regex (when it compiles) AND
/// occurs literally in the text. Metacharacter patterns that match only as a
/// regex therefore fail.
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    let regex_ok = match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => true,
    };
    regex_ok && text.contains(pattern)
}

/// Strip the `file://` scheme, use forward slashes, and lexically clean
/// the path so `./a/b.py` and `a//b.py` compare as `a/b.py`.
fn normalize_uri(uri: &str) -> String {
    let raw = uri.strip_prefix("file://").unwrap_or(uri).replace('\\', "/");
    normalize_path(Path::new(&raw))
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::output::Violation;
    use std::collections::BTreeMap;

    fn incident(uri: &str, line: Option<u32>, message: &str, snip: &str) -> Incident {
        Incident {
            uri: uri.into(),
            line_number: line,
            message: message.into(),
            code_snip: snip.into(),
        }
    }

    fn output_with(rule: &str, incidents: Vec<Incident>) -> Vec<RuleSet> {
        let mut violations = BTreeMap::new();
        violations.insert(
            rule.to_string(),
            Violation {
                description: String::new(),
                incidents,
            },
        );
        vec![RuleSet {
            name: "test".into(),
            tags: vec!["Java EE".into(), "Servlet".into()],
            violations,
            ..Default::default()
        }]
    }

    fn counting(bound: CountBound) -> TestCase {
        TestCase {
            name: "tc".into(),
            has_incidents: Some(IncidentVerification::Count(bound)),
            ..Default::default()
        }
    }

    fn locating(locs: Vec<LocationExpectation>) -> TestCase {
        TestCase {
            name: "tc".into(),
            has_incidents: Some(IncidentVerification::Locations(locs)),
            ..Default::default()
        }
    }

    fn loc(file: &str, line: u32) -> LocationExpectation {
        LocationExpectation {
            file_uri: file.into(),
            line_number: Some(line),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_count() {
        let tc = counting(CountBound::Exactly(1));
        let one = output_with("r", vec![incident("file:///a", Some(1), "", "")]);
        assert!(verify(&tc, "r", &one).is_empty());

        let none = output_with("r", vec![]);
        assert_eq!(
            verify(&tc, "r", &none),
            vec!["expected exactly 1 incidents, got 0"]
        );
        let two = output_with(
            "r",
            vec![
                incident("file:///a", Some(1), "", ""),
                incident("file:///b", Some(2), "", ""),
            ],
        );
        assert_eq!(
            verify(&tc, "r", &two),
            vec!["expected exactly 1 incidents, got 2"]
        );
    }

    #[test]
    fn test_count_bounds_and_absent_rule() {
        let out = output_with("r", vec![incident("file:///a", Some(1), "", "")]);
        assert!(verify(&counting(CountBound::AtLeast(1)), "r", &out).is_empty());
        assert!(verify(&counting(CountBound::AtMost(1)), "r", &out).is_empty());
        assert_eq!(verify(&counting(CountBound::AtLeast(2)), "r", &out).len(), 1);
        // rule not in output at all counts as zero incidents
        assert!(verify(&counting(CountBound::AtMost(0)), "other", &out).is_empty());
    }

    #[test]
    fn test_insights_count_like_violations() {
        let mut out = output_with("r", vec![incident("file:///a", Some(1), "", "")]);
        let v = out[0].violations.remove("r").unwrap();
        out[0].insights.insert("r".into(), v);
        assert!(verify(&counting(CountBound::Exactly(1)), "r", &out).is_empty());
    }

    #[test]
    fn test_unmatched_expectations() {
        let tc = TestCase {
            name: "tc".into(),
            is_unmatched: true,
            ..Default::default()
        };
        let mut out = vec![RuleSet {
            unmatched: vec!["r".into()],
            ..Default::default()
        }];
        assert!(verify(&tc, "r", &out).is_empty());

        // a violation entry fails the case even when listed unmatched
        out[0]
            .violations
            .insert("r".into(), Violation::default());
        assert_eq!(
            verify(&tc, "r", &out),
            vec!["expected rule to not match but matched"]
        );

        // absent from the unmatched list also fails
        let empty = vec![RuleSet::default()];
        assert_eq!(verify(&tc, "r", &empty).len(), 1);
    }

    #[test]
    fn test_unexpected_unmatched_short_circuits() {
        let mut tc = counting(CountBound::Exactly(3));
        tc.has_tags = vec!["missing-tag".into()];
        let out = vec![RuleSet {
            unmatched: vec!["r".into()],
            ..Default::default()
        }];
        assert_eq!(
            verify(&tc, "r", &out),
            vec!["expected rule to match but unmatched"]
        );
    }

    #[test]
    fn test_tags_exact_regex_and_missing() {
        let tc = TestCase {
            name: "tc".into(),
            has_tags: vec!["Servlet".into(), "Java.*".into(), "EJB".into(), "Spring".into()],
            ..Default::default()
        };
        let out = output_with("r", vec![]);
        assert_eq!(
            verify(&tc, "r", &out),
            vec![
                "tag 'EJB' not found in output",
                "tag 'Spring' not found in output"
            ]
        );
    }

    #[test]
    fn test_location_suffix_and_line() {
        let out = output_with(
            "r",
            vec![incident("file:///data/proj/a/b.py", Some(7), "msg", "code")],
        );
        assert!(verify(&locating(vec![loc("a/b.py", 7)]), "r", &out).is_empty());
        assert_eq!(
            verify(&locating(vec![loc("a/b.py", 8)]), "r", &out),
            vec!["expected incident in file a/b.py at line 8 not found"]
        );
        assert_eq!(
            verify(&locating(vec![loc("c.py", 7), loc("a/b.py", 7)]), "r", &out),
            vec!["expected incident in file c.py not found"]
        );
    }

    #[test]
    fn test_location_message_and_snippet_patterns() {
        let out = output_with(
            "r",
            vec![incident(
                "file:///src/App.java",
                Some(3),
                "Replace javax.ejb with jakarta.ejb",
                "import javax.ejb.Stateless;",
            )],
        );
        let mut l = loc("src/App.java", 3);
        l.message_matches = Some("jakarta.ejb".into());
        l.code_snip_matches = Some("javax.ejb.Stateless".into());
        assert!(verify(&locating(vec![l.clone()]), "r", &out).is_empty());

        l.code_snip_matches = Some("Stateful".into());
        assert_eq!(
            verify(&locating(vec![l]), "r", &out),
            vec!["expected code snippet in file src/App.java at line 3 to match 'Stateful'"]
        );
    }

    #[test]
    fn test_location_fixture_path_is_cleaned() {
        let out = output_with(
            "r",
            vec![incident("file:///data/a/b.py", Some(7), "msg", "code")],
        );
        assert!(verify(&locating(vec![loc("./a/b.py", 7)]), "r", &out).is_empty());
        assert!(verify(&locating(vec![loc("a//b.py", 7)]), "r", &out).is_empty());
        assert!(verify(&locating(vec![loc("a/./c/../b.py", 7)]), "r", &out).is_empty());
    }

    #[test]
    fn test_patterns_checked_against_every_incident_on_line() {
        let out = output_with(
            "r",
            vec![
                incident("file:///src/App.java", Some(3), "Replace javax.jms", "import javax.jms.Queue;"),
                incident("file:///src/App.java", Some(3), "Replace javax.ejb", "import javax.ejb.Stateless;"),
            ],
        );
        let mut l = loc("src/App.java", 3);
        l.message_matches = Some("javax.ejb".into());
        l.code_snip_matches = Some("Stateless".into());
        assert!(verify(&locating(vec![l.clone()]), "r", &out).is_empty());

        l.message_matches = Some("javax.xml".into());
        assert_eq!(
            verify(&locating(vec![l]), "r", &out),
            vec!["expected message in file src/App.java at line 3 to match 'javax.xml'"]
        );
    }

    #[test]
    fn test_rule_errors_collected_per_rule() {
        let mut out = output_with("r", vec![]);
        out[0]
            .errors
            .insert("r".into(), "unable to parse condition".into());
        out[0].errors.insert("other".into(), "boom".into());
        assert_eq!(
            rule_errors("r", &out),
            vec!["analyzer reported an error for r: unable to parse condition"]
        );
        assert!(rule_errors("missing", &out).is_empty());
    }

    #[test]
    fn test_pattern_requires_regex_and_literal_match() {
        assert!(pattern_matches("javax.ejb", "import javax.ejb.Stateless"));
        // matches as a regex but is not a literal substring: rejected
        assert!(!pattern_matches("javax.*Stateless", "import javax.ejb.Stateless"));
        assert!(!pattern_matches("^import", "import javax"));
        // invalid regex falls back to the literal check alone
        assert!(pattern_matches("foo(", "call foo(x)"));
        assert!(!pattern_matches("bar(", "call foo(x)"));
    }

    #[test]
    fn test_windows_style_uri_normalized() {
        let out = output_with(
            "r",
            vec![incident("file://C:\\work\\a\\b.py", Some(1), "", "")],
        );
        assert!(verify(&locating(vec![loc("a/b.py", 1)]), "r", &out).is_empty());
    }
}
