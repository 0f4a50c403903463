use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LensError, LensResult};

pub const CONFIG_FILENAME: &str = "jsonlens.json";
pub const CONFIG_VERSION: &str = "1.0.0";

pub const JQ_PATH_ENV: &str = "JSONLENS_JQ_PATH";
pub const VARIABLE_ENV: &str = "JSONLENS_VARIABLE";

pub const DEFAULT_WELCOME_TEXT: &str = r#"{
  // Paste or type JSON here. Comments and trailing commas are fine.
  "greeting": "hello",
  "items": [1, 2, 3],
}
"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LensConfig {
    pub version: String,
    pub editor: EditorPreferences,
    pub filter: FilterPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorPreferences {
    pub theme: String,
    /// Spaces per indentation level when formatting.
    pub indent: usize,
    pub tab_size: usize,
    pub line_numbers: bool,
    pub line_wrapping: bool,
    pub welcome_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterPreferences {
    /// Name the document is bound to inside the expression sandbox.
    pub variable: String,
    pub max_operations: u64,
    pub jq_path: String,
    /// Kill the jq process after this many milliseconds. Unbounded when unset.
    pub query_timeout_ms: Option<u64>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            editor: EditorPreferences::default(),
            filter: FilterPreferences::default(),
        }
    }
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            indent: 2,
            tab_size: 2,
            line_numbers: true,
            line_wrapping: false,
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
        }
    }
}

impl Default for FilterPreferences {
    fn default() -> Self {
        Self {
            variable: "data".to_string(),
            max_operations: 100_000,
            jq_path: "jq".to_string(),
            query_timeout_ms: None,
        }
    }
}

impl LensConfig {
    /// Apply `JSONLENS_*` environment overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(JQ_PATH_ENV) {
            if !path.trim().is_empty() {
                self.filter.jq_path = path;
            }
        }
        if let Ok(variable) = std::env::var(VARIABLE_ENV) {
            if !variable.trim().is_empty() {
                self.filter.variable = variable;
            }
        }
        self
    }
}

/// Load the config in `dir`, writing defaults first when the file is missing.
pub fn load_or_create_config(dir: &Path) -> LensResult<LensConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        LensError::Config(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = config_path(dir);
    if !path.exists() {
        let config = LensConfig::default();
        write_config(&path, &config)?;
        return Ok(config);
    }
    load_config(&path)
}

pub fn load_config(path: &Path) -> LensResult<LensConfig> {
    let data = std::fs::read_to_string(path).map_err(|error| {
        LensError::Config(format!("failed to read config {}: {error}", path.display()))
    })?;
    let mut config: LensConfig = serde_json::from_str(&data).map_err(|error| {
        LensError::Config(format!("failed to parse config {}: {error}", path.display()))
    })?;

    if config.version != CONFIG_VERSION {
        tracing::warn!(
            "config {} has version {}, expected {}; missing fields use defaults",
            path.display(),
            config.version,
            CONFIG_VERSION
        );
        config.version = CONFIG_VERSION.to_string();
    }

    Ok(config)
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

pub fn write_config(path: &Path, config: &LensConfig) -> LensResult<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        LensError::Config(format!(
            "failed to serialize config {}: {error}",
            path.display()
        ))
    })?;
    std::fs::write(path, data).map_err(|error| {
        LensError::Config(format!("failed to write config {}: {error}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_config_when_missing() {
        let dir = tempdir().expect("tempdir");
        let config = load_or_create_config(dir.path()).expect("load/create");

        assert!(config_path(dir.path()).exists());
        assert_eq!(config, LensConfig::default());
        assert_eq!(config.filter.variable, "data");
        assert_eq!(config.editor.indent, 2);
    }

    #[test]
    fn loads_existing_config() {
        let dir = tempdir().expect("tempdir");
        let mut original = LensConfig::default();
        original.editor.theme = "monokai".to_string();
        original.filter.query_timeout_ms = Some(500);
        write_config(&config_path(dir.path()), &original).expect("write config");

        let loaded = load_or_create_config(dir.path()).expect("load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = config_path(dir.path());
        std::fs::write(&path, r#"{ "version": "0.9.0", "editor": { "indent": 4 } }"#)
            .expect("write");

        let loaded = load_config(&path).expect("load config");
        assert_eq!(loaded.version, CONFIG_VERSION);
        assert_eq!(loaded.editor.indent, 4);
        assert_eq!(loaded.editor.theme, "default");
        assert_eq!(loaded.filter, FilterPreferences::default());
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let dir = tempdir().expect("tempdir");
        let path = config_path(dir.path());
        std::fs::write(&path, "{ not json").expect("write");

        match load_config(&path) {
            Err(LensError::Config(message)) => assert!(message.contains("failed to parse")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn env_overrides_replace_file_values() {
        // Only this test touches these variables.
        std::env::set_var(JQ_PATH_ENV, "/opt/jq/bin/jq");
        std::env::set_var(VARIABLE_ENV, "doc");
        let config = LensConfig::default().with_env_overrides();
        std::env::remove_var(JQ_PATH_ENV);
        std::env::remove_var(VARIABLE_ENV);

        assert_eq!(config.filter.jq_path, "/opt/jq/bin/jq");
        assert_eq!(config.filter.variable, "doc");
    }
}
