//! Deployment configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) describes
//! the reference deployment: a 30 second wait under a 40 second timeout,
//! started through the `run` query of an IAM-authorized API.

use crate::error::ConfigError;
use crate::resources::{AuthorizationType, FieldLogLevel, StateMachineType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "STACKSYNTH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./stacksynth.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub stack: StackConfig,
    pub workflow: WorkflowConfig,
    pub api: ApiConfig,
    pub binding: BindingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub name: String,
    pub account: String,
    pub region: String,
    pub description: Option<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: "WorkflowTriggerStack".to_string(),
            // placeholder account; override for a real deployment
            account: "123456789012".to_string(),
            region: "ap-northeast-1".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default, rename = "type")]
    pub machine_type: StateMachineType,
}

fn default_wait_seconds() -> u64 {
    30
}

fn default_timeout_seconds() -> u64 {
    40
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            wait_seconds: default_wait_seconds(),
            timeout_seconds: default_timeout_seconds(),
            machine_type: StateMachineType::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Defaults to `<stack name>Api`.
    pub name: Option<String>,
    pub schema_path: PathBuf,
    pub authorization: AuthorizationType,
    pub field_log_level: FieldLogLevel,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name: None,
            schema_path: PathBuf::from("graphql/schema.graphql"),
            authorization: AuthorizationType::default(),
            field_log_level: FieldLogLevel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    pub type_name: String,
    pub field_name: String,
    pub data_source_name: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            type_name: "Query".to_string(),
            field_name: "run".to_string(),
            data_source_name: "HttpDataSource".to_string(),
        }
    }
}

impl Config {
    /// Reads `path`. A relative schema path is taken relative to the
    /// directory holding the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        if config.api.schema_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.api.schema_path = dir.join(&config.api.schema_path);
            }
        }
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses TOML without touching the filesystem or validating.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `$STACKSYNTH_CONFIG`, or `./stacksynth.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads an explicitly given file, which must exist. Without one, the
    /// default path is tried and a missing file yields [`Config::default`].
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn api_name(&self) -> String {
        self.api
            .name
            .clone()
            .unwrap_or_else(|| format!("{}Api", self.stack.name))
    }

    /// Checks values the constructs cannot check on their own. Timeout
    /// against wait is left to the workflow construct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };
        if self.stack.name.trim().is_empty() {
            return Err(invalid("stack.name", "must not be empty"));
        }
        if self.workflow.wait_seconds == 0 {
            return Err(invalid("workflow.wait_seconds", "must be greater than zero"));
        }
        if self.workflow.timeout_seconds == 0 {
            return Err(invalid("workflow.timeout_seconds", "must be greater than zero"));
        }
        if self.api.schema_path.as_os_str().is_empty() {
            return Err(invalid("api.schema_path", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_the_reference_deployment() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.workflow.wait_seconds, 30);
        assert_eq!(config.workflow.timeout_seconds, 40);
        assert_eq!(config.binding.field_name, "run");
        assert_eq!(config.api_name(), "WorkflowTriggerStackApi");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            [workflow]
            timeout_seconds = 60
            type = "express"

            [api]
            authorization = "api_key"
            field_log_level = "error"
            "#,
        )
        .unwrap();
        assert_eq!(config.workflow.wait_seconds, 30);
        assert_eq!(config.workflow.timeout_seconds, 60);
        assert_eq!(config.workflow.machine_type, StateMachineType::Express);
        assert_eq!(config.api.authorization, AuthorizationType::ApiKey);
        assert_eq!(config.api.field_log_level, FieldLogLevel::Error);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[workflow]\nwiat_seconds = 3\n").is_err());
    }
}
