use crate::analyser::filter::DateFallback;
use crate::analyser::logic::CleaningOptions;
use anyhow::{Context as _, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the hosted chat-completion model used to generate commands
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Base URL of an OpenAI-compatible API
    pub api_base: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "Mistral-Nemo-12B-Instruct-2407".to_owned(),
            api_base: "https://api.arliai.com/v1".to_owned(),
            api_key_env: "JANITOR_API_KEY".to_owned(),
            max_tokens: 1024,
            temperature: 0.2,
            top_p: 0.9,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<SecretString> {
        let key = std::env::var(&self.api_key_env)
            .with_context(|| format!("API key not set: export {}", self.api_key_env))?;
        Ok(SecretString::new(key.into()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FilterSettings {
    pub date_fallback: DateFallback,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// Options used when cleaning without explicit options
    pub cleaning_defaults: CleaningOptions,
    pub filter: FilterSettings,
    /// Version name for generated commands that do not set one
    pub default_filename: String,
    /// Overrides the platform log directory
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            cleaning_defaults: CleaningOptions::recommended(),
            filter: FilterSettings::default(),
            default_filename: "filtered_data.csv".to_owned(),
            log_dir: None,
        }
    }
}

/// `<config_dir>/datajanitor/config.json`
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("datajanitor").join("config.json"))
}

/// Load the config from `path` (or the default location). Missing or unreadable files yield defaults.
pub fn load_app_config(path: Option<&Path>) -> AppConfig {
    let path = path.map(Path::to_path_buf).or_else(get_config_path);
    if let Some(path) = path
        && path.exists()
        && let Ok(content) = std::fs::read_to_string(&path)
        && let Ok(config) = serde_json::from_str::<AppConfig>(&content)
    {
        return config;
    }

    AppConfig::default()
}

pub fn save_app_config(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(get_config_path)
        .context("Failed to determine config directory")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret as _;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_app_config(Some(&dir.path().join("absent.json")));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.default_filename, "filtered_data.csv");
        assert!(config.cleaning_defaults.standardize_columns);
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("conf").join("config.json");
        let mut config = AppConfig::default();
        config.filter.date_fallback = DateFallback::Strict;
        config.llm.model = "local-model".to_owned();
        save_app_config(&config, Some(&path))?;

        let loaded = load_app_config(Some(&path));
        assert_eq!(loaded.filter.date_fallback, DateFallback::Strict);
        assert_eq!(loaded.llm.model, "local-model");
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"llm": {"max_tokens": 256}}"#)?;
        let config = load_app_config(Some(&path));
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.llm.api_key_env, "JANITOR_API_KEY");
        Ok(())
    }

    #[test]
    fn test_api_key_from_env() -> Result<()> {
        let config = LlmConfig {
            api_key_env: "DATAJANITOR_TEST_KEY_UNSET".to_owned(),
            ..Default::default()
        };
        assert!(config.api_key().is_err());

        let config = LlmConfig {
            api_key_env: "PATH".to_owned(),
            ..Default::default()
        };
        assert!(!config.api_key()?.expose_secret().is_empty());
        Ok(())
    }
}
