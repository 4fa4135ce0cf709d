//! TOML configuration parsing and validation.
//!
//! All commands read a single TOML file (default `./config/brief.toml`).
//! Every section except `[backend]` is optional and falls back to the
//! defaults the web client shipped with.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::reconcile::SourceConflict;

/// Environment variable that overrides `backend.base_url`.
pub const BASE_URL_ENV: &str = "BRIEF_BASE_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub prefs: PrefsConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    /// Request timeout. `None` keeps the HTTP client's default (no timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrefsConfig {
    #[serde(default = "default_prefs_path")]
    pub path: PathBuf,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            path: default_prefs_path(),
        }
    }
}

fn default_prefs_path() -> PathBuf {
    PathBuf::from("./data/prefs.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizeConfig {
    #[serde(default = "default_detail")]
    pub detail: i64,
    #[serde(default = "default_summarize_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub source_conflict: SourceConflict,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            detail: default_detail(),
            temperature: default_summarize_temperature(),
            source_conflict: SourceConflict::default(),
        }
    }
}

fn default_detail() -> i64 {
    40
}
fn default_summarize_temperature() -> f64 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerateConfig {
    #[serde(default = "default_generate_temperature")]
    pub temperature: f64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            temperature: default_generate_temperature(),
        }
    }
}

fn default_generate_temperature() -> f64 {
    0.6
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
        }
    }
}

fn default_collection() -> String {
    "knowledge".to_string()
}

impl Config {
    /// Configuration used when no file is present: a backend on localhost
    /// and every other section at its default.
    pub fn minimal() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                timeout_secs: None,
            },
            prefs: PrefsConfig::default(),
            summarize: SummarizeConfig::default(),
            generate: GenerateConfig::default(),
            admin: AdminConfig::default(),
        }
    }

    /// Apply environment overrides (currently only [`BASE_URL_ENV`]).
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = url.trim().to_string();
            }
        }
        self
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?.apply_env();
    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        let config = Config::minimal().apply_env();
        validate(&config)?;
        Ok(config)
    }
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

pub fn validate(config: &Config) -> Result<()> {
    let url = config.backend.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "backend.base_url must start with http:// or https:// (got '{}')",
            config.backend.base_url
        );
    }

    if config.backend.timeout_secs == Some(0) {
        anyhow::bail!("backend.timeout_secs must be > 0 when set");
    }

    if !(0..=100).contains(&config.summarize.detail) {
        anyhow::bail!("summarize.detail must be in [0, 100]");
    }

    if !(0.0..=1.0).contains(&config.summarize.temperature) {
        anyhow::bail!("summarize.temperature must be in [0.0, 1.0]");
    }

    if !(0.0..=1.0).contains(&config.generate.temperature) {
        anyhow::bail!("generate.temperature must be in [0.0, 1.0]");
    }

    if config.admin.collection.trim().is_empty() {
        anyhow::bail!("admin.collection must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_backend_only() {
        let cfg = parse_config("[backend]\nbase_url = \"http://localhost:9000\"\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.summarize.detail, 40);
        assert!((cfg.summarize.temperature - 0.2).abs() < 1e-9);
        assert!((cfg.generate.temperature - 0.6).abs() < 1e-9);
        assert_eq!(cfg.admin.collection, "knowledge");
        assert_eq!(cfg.summarize.source_conflict, SourceConflict::PreferUrl);
        assert_eq!(cfg.prefs.path, PathBuf::from("./data/prefs.json"));
        assert!(cfg.backend.timeout_secs.is_none());
    }

    #[test]
    fn test_full_config() {
        let cfg = parse_config(
            r#"
[backend]
base_url = "https://rag.example.com"
timeout_secs = 15

[prefs]
path = "/tmp/brief-prefs.json"

[summarize]
detail = 75
temperature = 0.35
source_conflict = "reject"

[generate]
temperature = 0.9

[admin]
collection = "papers"
"#,
        )
        .unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.backend.timeout_secs, Some(15));
        assert_eq!(cfg.summarize.detail, 75);
        assert_eq!(cfg.summarize.source_conflict, SourceConflict::Reject);
        assert_eq!(cfg.admin.collection, "papers");
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let cfg = parse_config("[backend]\nbase_url = \"ftp://x\"\n").unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_rejects_out_of_range_detail() {
        let cfg =
            parse_config("[backend]\nbase_url = \"http://x\"\n[summarize]\ndetail = 101\n").unwrap();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let cfg = parse_config("[backend]\nbase_url = \"http://x\"\n[generate]\ntemperature = 1.5\n")
            .unwrap();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_rejects_unknown_conflict_policy() {
        let res = parse_config(
            "[backend]\nbase_url = \"http://x\"\n[summarize]\nsource_conflict = \"coin_flip\"\n",
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_config(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("brief.toml");
        std::fs::write(&path, "[backend]\nbase_url = \"http://127.0.0.1:1\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.admin.collection, "knowledge");
    }
}
