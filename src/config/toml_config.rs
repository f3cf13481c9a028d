use crate::domain::ports::LibraryConfigProvider;
use crate::utils::error::{Result, TypeInfoError};
use crate::utils::validation::{
    validate_api_level, validate_file_extension, validate_non_empty_string, validate_path, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Optional settings file. Every section may be left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub android: Option<AndroidConfig>,
    pub cache: Option<CacheConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidConfig {
    pub api: Option<String>,
    pub sdk_root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TypeInfoError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(android) = &self.android {
            if let Some(api) = &android.api {
                validate_api_level("android.api", api)?;
            }
            if let Some(sdk_root) = &android.sdk_root {
                validate_path("android.sdk_root", sdk_root)?;
            }
        }

        if let Some(cache) = &self.cache {
            if let Some(path) = &cache.path {
                validate_path("cache.path", path)?;
                validate_file_extension("cache.path", path, &["json", "zip"])?;
            }
            for library in &cache.libraries {
                validate_non_empty_string("cache.libraries", library)?;
            }
        }

        if let Some(level) = self.log_level() {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(TypeInfoError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", LOG_LEVELS.join(", ")),
                });
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl LibraryConfigProvider for TomlConfig {
    fn sdk_root(&self) -> Option<PathBuf> {
        self.android
            .as_ref()
            .and_then(|a| a.sdk_root.as_ref())
            .map(PathBuf::from)
    }

    fn api_level(&self) -> Option<&str> {
        self.android.as_ref().and_then(|a| a.api.as_deref())
    }

    fn cache_path(&self) -> Option<&str> {
        self.cache.as_ref().and_then(|c| c.path.as_deref())
    }

    fn libraries(&self) -> &[String] {
        self.cache.as_ref().map(|c| c.libraries.as_slice()).unwrap_or(&[])
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
