use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::client::{ClientConfig, DEFAULT_BASE_URL};
use crate::retry::RetryPolicy;

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "TUNECRAFT_CONFIG_PATH";
const ENV_API_KEY: &str = "SUNO_API_KEY";
const ENV_BASE_URL: &str = "TUNECRAFT_API_BASE_URL";
const ENV_TIMEOUT: &str = "TUNECRAFT_TIMEOUT_SECS";
const ENV_MAX_RETRIES: &str = "TUNECRAFT_MAX_RETRIES";
const ENV_ARTIFACT_DIR: &str = "TUNECRAFT_ARTIFACT_DIR";

#[derive(Clone)]
pub struct AppConfig {
    api_base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    max_retries: u32,
    artifact_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        if path.exists() {
            let partial = read_partial(&path)?;
            config.apply_partial(partial);
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    pub fn artifact_dir(&self) -> &PathBuf {
        &self.artifact_dir
    }

    /// Explicit settings handed to the generation client.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let base_url = Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid API base URL {}", self.api_base_url))?;
        Ok(ClientConfig::new(base_url, self.api_key.clone()).with_timeout(self.timeout()))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "Tunecraft", "Tunecraft")
            .ok_or_else(|| anyhow!("unable to determine config directory"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(url) = partial.api_base_url {
            self.api_base_url = url;
        }
        if let Some(key) = partial.api_key {
            self.api_key = Some(key);
        }
        if let Some(timeout) = partial.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = partial.max_retries {
            self.max_retries = retries;
        }
        if let Some(dir) = partial.artifact_dir {
            self.artifact_dir = dir;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_API_KEY) {
            if value.trim().is_empty() {
                self.api_key = None;
            } else {
                self.api_key = Some(value.trim().to_string());
            }
        }
        if let Some(value) = lookup(ENV_BASE_URL) {
            if !value.trim().is_empty() {
                self.api_base_url = value.trim().to_string();
            }
        }
        if let Some(value) = lookup(ENV_TIMEOUT) {
            if !value.trim().is_empty() {
                self.timeout_secs = value
                    .trim()
                    .parse::<u64>()
                    .context("TUNECRAFT_TIMEOUT_SECS must be a whole number of seconds")?;
            }
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            if !value.trim().is_empty() {
                self.max_retries = value
                    .trim()
                    .parse::<u32>()
                    .context("TUNECRAFT_MAX_RETRIES must be a non-negative integer")?;
            }
        }
        if let Some(value) = lookup(ENV_ARTIFACT_DIR) {
            if !value.trim().is_empty() {
                self.artifact_dir = PathBuf::from(value);
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 0,
            artifact_dir: default_artifact_dir(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("artifact_dir", &self.artifact_dir)
            .finish()
    }
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let partial: PartialConfig =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(partial)
}

fn default_artifact_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join("Music").join("Tunecraft"))
        .unwrap_or_else(|| PathBuf::from("./tracks"))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    api_base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    artifact_dir: Option<PathBuf>,
}
