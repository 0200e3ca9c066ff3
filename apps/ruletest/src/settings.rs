//! Provider settings for one analysis group, and container volume planning.
//!
//! Templates come from an explicit `ProviderTable`. Per provider the group's
//! analysis params are applied first, then the fixture location, which is a
//! host path for local runs and a `/data`-rooted path inside the container.
//! Generic LSP families (`go`, `python`, `nodejs`) take the location as a
//! workspace folder and also get debug logging into the shared directory;
//! every other family takes it in `location`.

use crate::error::SettingsError;
use crate::models::provider::{InitConfig, ProviderConfig, ProviderTable};
use crate::models::spec::{AnalysisParams, SpecFile};
use crate::utils::normalize_path;
use serde_json::{json, Value as Json};
use std::path::{Component, Path, PathBuf};

pub const CONTAINER_DATA_DIR: &str = "/data";
pub const CONTAINER_SHARED_DIR: &str = "/shared";
pub const BUILTIN_PROVIDER: &str = "builtin";
const WORKSPACE_FOLDER_FAMILIES: [&str; 3] = ["go", "python", "nodejs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Local,
    Container,
}

#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    table: ProviderTable,
    mode: ExecutionMode,
}

impl SettingsBuilder {
    pub fn new(table: ProviderTable, mode: ExecutionMode) -> Self {
        Self { table, mode }
    }

    /// Directory providers write logs to, as seen by the analyzer.
    pub fn shared_dir(&self, group_dir: &Path) -> PathBuf {
        match self.mode {
            ExecutionMode::Local => group_dir.to_path_buf(),
            ExecutionMode::Container => PathBuf::from(CONTAINER_SHARED_DIR),
        }
    }

    /// Translate a host path into the path the analyzer sees.
    pub fn engine_path(&self, host: &Path) -> PathBuf {
        match self.mode {
            ExecutionMode::Local => host.to_path_buf(),
            ExecutionMode::Container => reroot(Path::new(CONTAINER_DATA_DIR), host),
        }
    }

    /// Provider settings document for one group, sorted by provider name.
    pub fn build(
        &self,
        spec: &SpecFile,
        params: &AnalysisParams,
        shared_dir: &Path,
    ) -> Result<Vec<ProviderConfig>, SettingsError> {
        let mut configs = Vec::new();
        let mut locations = Vec::new();
        for (name, host) in fixture_paths(spec) {
            let location = self.engine_path(&host).to_string_lossy().to_string();
            if !locations.contains(&location) {
                locations.push(location.clone());
            }
            if name == BUILTIN_PROVIDER {
                continue;
            }
            let template = self
                .table
                .get(&name)
                .ok_or_else(|| SettingsError::UnknownProvider(name.clone()))?;
            let mut cfg = template.clone();
            let mut init = cfg.init_config.first().cloned().unwrap_or_default();
            apply_params(&mut init, params);
            if WORKSPACE_FOLDER_FAMILIES.contains(&name.as_str()) {
                let psc = &mut init.provider_specific_config;
                psc.insert(
                    "workspaceFolders".into(),
                    json!([format!("file://{}", location)]),
                );
                let mut args = psc
                    .get("lspServerArgs")
                    .and_then(Json::as_array)
                    .cloned()
                    .unwrap_or_default();
                let log_file = shared_dir.join(format!("{}-server.log", name));
                args.push(json!("--log-level=debug"));
                args.push(json!(format!("--log-file={}", log_file.display())));
                psc.insert("lspServerArgs".into(), Json::Array(args));
            } else {
                init.location = Some(location);
            }
            cfg.init_config = vec![init];
            configs.push(cfg);
        }

        let mut builtin = self
            .table
            .get(BUILTIN_PROVIDER)
            .cloned()
            .unwrap_or_else(|| ProviderConfig {
                name: BUILTIN_PROVIDER.to_string(),
                ..Default::default()
            });
        let base = builtin.init_config.first().cloned().unwrap_or_default();
        builtin.init_config = locations
            .into_iter()
            .map(|loc| {
                let mut init = base.clone();
                apply_params(&mut init, params);
                init.location = Some(loc);
                init
            })
            .collect();
        configs.push(builtin);
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(configs)
    }

    /// Host-to-container bind mounts for a spec file's fixtures.
    ///
    /// Empty for local runs.
    pub fn volumes(&self, spec: &SpecFile) -> Vec<(PathBuf, PathBuf)> {
        if self.mode == ExecutionMode::Local {
            return Vec::new();
        }
        let hosts: Vec<PathBuf> = fixture_paths(spec).into_iter().map(|(_, p)| p).collect();
        dedup_mounts(&hosts)
            .into_iter()
            .map(|h| {
                let c = reroot(Path::new(CONTAINER_DATA_DIR), &h);
                (h, c)
            })
            .collect()
    }
}

fn apply_params(init: &mut InitConfig, params: &AnalysisParams) {
    if !params.mode.is_empty() {
        init.analysis_mode = Some(params.mode.clone());
    }
    if !params.dep_label_selector.is_empty() {
        init.provider_specific_config.insert(
            "depLabelSelector".into(),
            json!(params.dep_label_selector),
        );
    }
}

/// Absolute host fixture directory for each provider override.
pub fn fixture_paths(spec: &SpecFile) -> Vec<(String, PathBuf)> {
    let dir = spec.path.parent().unwrap_or_else(|| Path::new("/"));
    spec.providers
        .iter()
        .map(|p| (p.name.clone(), normalize_path(&dir.join(&p.data_path))))
        .collect()
}

/// Re-root an absolute host path under `base`.
pub fn reroot(base: &Path, host: &Path) -> PathBuf {
    let rel: PathBuf = host
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    base.join(rel)
}

/// Reduce mount candidates so that no kept path contains another.
///
/// Containment is by path components, so `a/bc` is not inside `a/b`. Equal
/// paths collapse to one; the result is sorted.
pub fn dedup_mounts(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = paths.iter().map(|p| normalize_path(p)).collect();
    kept.sort();
    kept.dedup();
    loop {
        let nested = (0..kept.len()).find(|&i| {
            (0..kept.len()).any(|j| i != j && kept[i].starts_with(&kept[j]))
        });
        match nested {
            Some(i) => {
                kept.remove(i);
            }
            None => break,
        }
    }
    kept
}
