//! Discovery and loading of tests files.
//!
//! Each `*.test.yaml` found under the input paths is decoded, merged with
//! the `testing-config.yaml` provider defaults of its directory, given a
//! default rules path, validated, and finally narrowed by the inclusion
//! filter. Failures are per file; the remaining files still load.

use crate::error::SpecError;
use crate::filter::TestsFilter;
use crate::models::spec::{merge_providers, RulesetDefaults, SpecFile};
use crate::utils::{absolute, normalize_path};
use glob::glob;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TEST_FILE_SUFFIXES: [&str; 2] = [".test.yaml", ".test.yml"];
pub const RULESET_DEFAULTS_FILE: &str = "testing-config.yaml";

/// Load every tests file reachable from `paths`.
///
/// Returned spec files are sorted by path; errors are returned alongside so
/// callers can report them without losing the files that did load.
pub fn parse_paths(
    paths: &[PathBuf],
    filter: &dyn TestsFilter,
) -> (Vec<SpecFile>, Vec<SpecError>) {
    let mut errors = Vec::new();
    let mut files: Vec<PathBuf> = Vec::new();
    for p in paths {
        match discover(p) {
            Ok(mut found) => files.append(&mut found),
            Err(e) => errors.push(e),
        }
    }
    files.sort();
    files.dedup();

    let loaded: Vec<Result<Option<SpecFile>, SpecError>> = files
        .par_iter()
        .map(|f| load_spec_file(f, filter))
        .collect();

    let mut specs = Vec::new();
    for r in loaded {
        match r {
            Ok(Some(spec)) => specs.push(spec),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "skipping tests file");
                errors.push(e);
            }
        }
    }
    specs.sort_by(|a, b| a.path.cmp(&b.path));
    (specs, errors)
}

/// Whether `path` names a tests file.
pub fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| TEST_FILE_SUFFIXES.iter().any(|s| n.ends_with(s)))
}

/// Collect tests files from a file or directory path.
fn discover(path: &Path) -> Result<Vec<PathBuf>, SpecError> {
    if !path.exists() {
        return Err(SpecError::Missing(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(if is_test_file(path) {
            vec![absolute(path)]
        } else {
            debug!(path = %path.display(), "not a tests file, ignoring");
            Vec::new()
        });
    }
    let base = glob::Pattern::escape(&path.to_string_lossy());
    let mut out = Vec::new();
    for suffix in TEST_FILE_SUFFIXES {
        let pattern = format!("{}/**/*{}", base, suffix);
        let entries = glob(&pattern).map_err(|e| SpecError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in entries.flatten() {
            if entry.is_file() {
                out.push(absolute(&entry));
            }
        }
    }
    Ok(out)
}

/// Load one tests file. `Ok(None)` means the filter removed every case.
pub fn load_spec_file(
    path: &Path,
    filter: &dyn TestsFilter,
) -> Result<Option<SpecFile>, SpecError> {
    let path = absolute(path);
    let s = fs::read_to_string(&path).map_err(|source| SpecError::Read {
        path: path.clone(),
        source,
    })?;
    let mut spec: SpecFile = serde_yaml::from_str(&s).map_err(|source| SpecError::Decode {
        path: path.clone(),
        source,
    })?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let defaults = load_ruleset_defaults(&dir);
    spec.providers = merge_providers(&defaults.providers, &spec.providers);

    let rules = match spec.rules_path.take() {
        Some(p) if p.is_absolute() => p,
        Some(p) => dir.join(p),
        None => default_rules_path(&path),
    };
    spec.rules_path = Some(normalize_path(&rules));
    spec.path = path.clone();

    spec.validate().map_err(|source| SpecError::Invalid {
        path: path.clone(),
        source,
    })?;

    spec.tests = filter.filter(std::mem::take(&mut spec.tests));
    if spec.case_count() == 0 {
        debug!(path = %path.display(), "no test cases left after filtering");
        return Ok(None);
    }
    Ok(Some(spec))
}

/// Provider defaults for a ruleset directory; unreadable means none.
fn load_ruleset_defaults(dir: &Path) -> RulesetDefaults {
    let p = dir.join(RULESET_DEFAULTS_FILE);
    let Ok(s) = fs::read_to_string(&p) else {
        return RulesetDefaults::default();
    };
    match serde_yaml::from_str::<Option<RulesetDefaults>>(&s) {
        Ok(d) => d.unwrap_or_default(),
        Err(e) => {
            debug!(path = %p.display(), error = %e, "ignoring unreadable ruleset defaults");
            RulesetDefaults::default()
        }
    }
}

/// `foo.test.yaml` → `foo.yaml` next to it.
pub fn default_rules_path(spec_path: &Path) -> PathBuf {
    let name = spec_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let rules_name = if let Some(stem) = name.strip_suffix(".test.yaml") {
        format!("{}.yaml", stem)
    } else if let Some(stem) = name.strip_suffix(".test.yml") {
        format!("{}.yml", stem)
    } else {
        name
    };
    spec_path.with_file_name(rules_name)
}
