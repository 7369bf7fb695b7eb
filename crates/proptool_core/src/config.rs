use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "proptool/0.2";
pub const DEFAULT_CONFIG_FILENAME: &str = "proptool.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ImportConfig {
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub user_agent: Option<String>,
}

impl ImportConfig {
    /// Resolve the admin API base URL: env PROPTOOL_API_URL > config > None.
    pub fn base_url(&self) -> Option<String> {
        if let Some(value) = non_empty_env("PROPTOOL_API_URL") {
            return Some(value);
        }
        self.api.base_url.clone()
    }

    /// Resolve the bearer token: env PROPTOOL_API_TOKEN > config > None.
    pub fn token(&self) -> Option<String> {
        if let Some(value) = non_empty_env("PROPTOOL_API_TOKEN") {
            return Some(value);
        }
        self.api.token.clone()
    }

    /// Resolve the user agent: env PROPTOOL_USER_AGENT > config > default.
    pub fn user_agent(&self) -> String {
        if let Some(value) = non_empty_env("PROPTOOL_USER_AGENT") {
            return value;
        }
        self.api
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// Load an ImportConfig from a TOML file. Returns defaults if the file
/// does not exist.
pub fn load_config(config_path: &Path) -> Result<ImportConfig> {
    if !config_path.exists() {
        return Ok(ImportConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ImportConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_has_no_api_settings() {
        let config = ImportConfig::default();
        assert!(config.api.base_url.is_none());
        assert!(config.api.token.is_none());
        assert_eq!(
            config.api.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            DEFAULT_USER_AGENT
        );
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/proptool.toml")).expect("load config");
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn load_config_parses_api_section() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("proptool.toml");
        fs::write(
            &config_path,
            r#"
[api]
base_url = "https://example.estate"
token = "secret"
user_agent = "test-agent/1.0"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.api.base_url.as_deref(), Some("https://example.estate"));
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.user_agent.as_deref(), Some("test-agent/1.0"));
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("proptool.toml");
        fs::write(&config_path, "[other]\nkey = 1\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(config.api.base_url.is_none());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("proptool.toml");
        fs::write(
            &config_path,
            r#"
[api]
base_url = "https://file.estate"
token = "file-token"
user_agent = "file-agent/1.0"
"#,
        )
        .expect("write config");
        let config = load_config(&config_path).expect("load config");

        unsafe {
            env::set_var("PROPTOOL_API_URL", "https://env.estate");
            env::set_var("PROPTOOL_API_TOKEN", "   ");
            env::set_var("PROPTOOL_USER_AGENT", "env-agent/2.0");
        }
        let base_url = config.base_url();
        let token = config.token();
        let user_agent = config.user_agent();
        unsafe {
            env::remove_var("PROPTOOL_API_URL");
            env::remove_var("PROPTOOL_API_TOKEN");
            env::remove_var("PROPTOOL_USER_AGENT");
        }

        assert_eq!(base_url.as_deref(), Some("https://env.estate"));
        // Blank env values fall through to the file.
        assert_eq!(token.as_deref(), Some("file-token"));
        assert_eq!(user_agent, "env-agent/2.0");
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("proptool.toml");
        fs::write(&config_path, "[api\nbase_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
