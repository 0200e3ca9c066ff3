//! Provider settings document handed to the analyzer, and the base table
//! templates are taken from.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, rename = "binaryPath", skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<String>,
    #[serde(default, rename = "initConfig")]
    pub init_config: Vec<InitConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, rename = "analysisMode", skip_serializing_if = "Option::is_none")]
    pub analysis_mode: Option<String>,
    #[serde(default, rename = "providerSpecificConfig")]
    pub provider_specific_config: Map<String, Json>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Base provider configurations keyed by provider name.
///
/// Built once and handed to the settings builder; nothing mutates it
/// afterwards.
pub struct ProviderTable {
    providers: BTreeMap<String, ProviderConfig>,
}

impl ProviderTable {
    pub fn new(configs: Vec<ProviderConfig>) -> Self {
        let providers = configs.into_iter().map(|c| (c.name.clone(), c)).collect();
        Self { providers }
    }

    /// Providers as installed in the runner image.
    pub fn container_defaults() -> Self {
        Self::new(vec![
            template(
                "java",
                Some("/jdtls/bin/jdtls"),
                json!({
                    "lspServerName": "java",
                    "lspServerPath": "/jdtls/bin/jdtls",
                    "bundles": "/jdtls/java-analyzer-bundle/java-analyzer-bundle.core/target/java-analyzer-bundle.core-1.0.0-SNAPSHOT.jar",
                    "depOpenSourceLabelsFile": "/usr/local/etc/maven.default.index",
                }),
            ),
            template(
                "go",
                Some("/usr/local/bin/generic-external-provider"),
                json!({
                    "lspServerName": "generic",
                    "lspServerPath": "/root/go/bin/gopls",
                    "lspServerArgs": [],
                    "dependencyProviderPath": "/usr/local/bin/golang-dependency-provider",
                }),
            ),
            template(
                "python",
                Some("/usr/local/bin/generic-external-provider"),
                json!({
                    "lspServerName": "generic",
                    "lspServerPath": "/usr/local/bin/pylsp",
                    "lspServerArgs": [],
                }),
            ),
            template(
                "nodejs",
                Some("/usr/local/bin/generic-external-provider"),
                json!({
                    "lspServerName": "nodejs",
                    "lspServerPath": "/usr/local/bin/typescript-language-server",
                    "lspServerArgs": ["--stdio"],
                }),
            ),
            template(
                "dotnet",
                Some("/usr/local/bin/dotnet-external-provider"),
                json!({}),
            ),
            template("builtin", None, json!({})),
        ])
    }

    /// Load a table from a YAML or JSON list of provider configs.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let s = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let configs: Vec<ProviderConfig> =
            serde_yaml::from_str(&s).map_err(|e| SettingsError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self::new(configs))
    }

    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

fn template(name: &str, binary: Option<&str>, specific: Json) -> ProviderConfig {
    let provider_specific_config = match specific {
        Json::Object(m) => m,
        _ => Map::new(),
    };
    ProviderConfig {
        name: name.to_string(),
        address: None,
        binary_path: binary.map(str::to_string),
        init_config: vec![InitConfig {
            location: None,
            analysis_mode: None,
            provider_specific_config,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_cover_known_families() {
        let t = ProviderTable::container_defaults();
        let names: Vec<&str> = t.providers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["builtin", "dotnet", "go", "java", "nodejs", "python"]);
        assert!(t.get("builtin").unwrap().binary_path.is_none());
    }

    #[test]
    fn test_from_path_replaces_defaults() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("providers.yaml");
        fs::write(
            &p,
            r#"
- name: java
  binaryPath: /opt/jdtls/bin/jdtls
  initConfig:
    - providerSpecificConfig:
        lspServerName: java
- name: builtin
"#,
        )
        .unwrap();
        let t = ProviderTable::from_path(&p).unwrap();
        assert_eq!(t.providers.len(), 2);
        let java = t.get("java").unwrap();
        assert_eq!(java.binary_path.as_deref(), Some("/opt/jdtls/bin/jdtls"));
        assert_eq!(
            java.init_config[0].provider_specific_config["lspServerName"],
            "java"
        );
    }

    #[test]
    fn test_from_path_reports_decode_error() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("providers.yaml");
        fs::write(&p, "name: not-a-list").unwrap();
        let err = ProviderTable::from_path(&p).unwrap_err();
        assert!(matches!(err, SettingsError::Decode { .. }));
    }
}
