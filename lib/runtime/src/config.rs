// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use derive_builder::Builder;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub mod environment_names;

/// Platform name reported in model metadata
pub const DEFAULT_PLATFORM: &str = "tensorgate";

/// Version reported for models loaded without an explicit version
pub const DEFAULT_MODEL_VERSION: &str = "1";

/// Default upper bound on the element count of a single tensor (16Mi elements)
pub const DEFAULT_MAX_BATCH_ELEMENTS: usize = 16 * 1024 * 1024;

/// System-wide serving configuration file
const SYSTEM_CONFIG_PATH: &str = "/opt/tensorgate/etc/serving.toml";

/// Serving configuration
/// Governs how requests are validated and how model metadata is reported.
#[derive(Serialize, Deserialize, Validate, Debug, Builder, Clone, PartialEq)]
#[builder(build_fn(private, name = "build_internal"), derive(Debug, Serialize))]
pub struct ServingConfig {
    /// Platform reported in the metadata of every model.
    /// Set this at runtime with environment variable TG_SERVING_PLATFORM.
    #[validate(length(min = 1))]
    #[builder(setter(into), default = "DEFAULT_PLATFORM.to_string()")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub platform: String,

    /// Version reported for models loaded without one.
    /// Set this at runtime with environment variable TG_SERVING_DEFAULT_MODEL_VERSION.
    #[validate(length(min = 1))]
    #[builder(setter(into), default = "DEFAULT_MODEL_VERSION.to_string()")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub default_model_version: String,

    /// When false (default), a request input the model does not declare is rejected.
    /// Set this at runtime with environment variable TG_SERVING_ALLOW_EXTRA_FIELDS.
    #[builder(default = "false")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub allow_extra_fields: bool,

    /// Largest element count accepted for a single tensor.
    /// Set this at runtime with environment variable TG_SERVING_MAX_BATCH_ELEMENTS.
    #[validate(range(min = 1))]
    #[builder(default = "DEFAULT_MAX_BATCH_ELEMENTS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub max_batch_elements: usize,
}

impl fmt::Display for ServingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "platform={}, ", self.platform)?;
        write!(f, "default_model_version={}, ", self.default_model_version)?;
        write!(f, "allow_extra_fields={}, ", self.allow_extra_fields)?;
        write!(f, "max_batch_elements={}", self.max_batch_elements)
    }
}

impl ServingConfig {
    pub fn builder() -> ServingConfigBuilder {
        ServingConfigBuilder::default()
    }

    pub(crate) fn figment() -> Figment {
        use environment_names::serving as env_serving;

        let config_path = std::env::var(env_serving::TG_SERVING_CONFIG_PATH).unwrap_or_default();
        Figment::new()
            .merge(Serialized::defaults(ServingConfig::default()))
            .merge(Toml::file(SYSTEM_CONFIG_PATH))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(env_serving::PREFIX).filter_map(|k| {
                let full_key = format!("{}{}", env_serving::PREFIX, k.as_str());
                // filters out empty environment variables and the config file pointer
                match std::env::var(&full_key) {
                    Ok(_) if full_key == env_serving::TG_SERVING_CONFIG_PATH => None,
                    Ok(v) if !v.is_empty() => Some(k.into()),
                    _ => None,
                }
            }))
    }

    /// Load the serving configuration from the environment and configuration files
    /// Configuration is prioritised in the following order, where the last has the lowest priority:
    /// 1. Environment variables prefixed with `TG_SERVING_`
    /// 2. The TOML file named by `TG_SERVING_CONFIG_PATH`
    /// 3. /opt/tensorgate/etc/serving.toml
    /// 4. Built-in defaults
    pub fn from_settings() -> Result<ServingConfig> {
        let config: ServingConfig = Self::figment().extract()?;
        config.validate()?;
        tracing::debug!(%config, "Loaded serving configuration");
        Ok(config)
    }
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            default_model_version: DEFAULT_MODEL_VERSION.to_string(),
            allow_extra_fields: false,
            max_batch_elements: DEFAULT_MAX_BATCH_ELEMENTS,
        }
    }
}

impl ServingConfigBuilder {
    /// Build and validate the serving configuration
    pub fn build(&self) -> Result<ServingConfig> {
        let config = self.build_internal()?;
        config.validate()?;
        Ok(config)
    }
}

/// Check if a string is truthy
/// Used to evaluate environment variables that should be read as a boolean value.
pub fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// Check if an environment variable is truthy
pub fn env_is_truthy(env: &str) -> bool {
    match std::env::var(env) {
        Ok(val) => is_truthy(val.as_str()),
        Err(_) => false,
    }
}

/// Check whether JSONL logging enabled
/// Set the `TG_LOGGING_JSONL` environment variable a [`is_truthy`] value
pub fn jsonl_logging_enabled() -> bool {
    env_is_truthy(environment_names::logging::TG_LOGGING_JSONL)
}

/// Check whether logging with ANSI terminal escape codes and colors is disabled.
/// Set the `TG_DISABLE_ANSI_LOGGING` environment variable a [`is_truthy`] value
pub fn disable_ansi_logging() -> bool {
    env_is_truthy(environment_names::logging::TG_DISABLE_ANSI_LOGGING)
}

/// Check whether to use local timezone for logging timestamps (default is UTC)
/// Set the `TG_LOG_USE_LOCAL_TZ` environment variable to a [`is_truthy`] value
pub fn use_local_timezone() -> bool {
    env_is_truthy(environment_names::logging::TG_LOG_USE_LOCAL_TZ)
}

#[cfg(test)]
mod tests {
    use super::*;
    use environment_names::serving;

    #[test]
    fn test_serving_config_defaults() -> Result<()> {
        temp_env::with_vars(
            vec![
                (serving::TG_SERVING_PLATFORM, None::<&str>),
                (serving::TG_SERVING_ALLOW_EXTRA_FIELDS, Some("")),
                (serving::TG_SERVING_CONFIG_PATH, None),
            ],
            || {
                let config = ServingConfig::from_settings()?;
                assert_eq!(config, ServingConfig::default());
                assert!(!config.allow_extra_fields);
                Ok(())
            },
        )
    }

    #[test]
    fn test_serving_config_with_env_vars() -> Result<()> {
        temp_env::with_vars(
            vec![
                (serving::TG_SERVING_PLATFORM, Some("mlflow")),
                (serving::TG_SERVING_ALLOW_EXTRA_FIELDS, Some("true")),
                (serving::TG_SERVING_MAX_BATCH_ELEMENTS, Some("128")),
                (serving::TG_SERVING_CONFIG_PATH, None),
            ],
            || {
                let config = ServingConfig::from_settings()?;
                assert_eq!(config.platform, "mlflow");
                assert!(config.allow_extra_fields);
                assert_eq!(config.max_batch_elements, 128);
                Ok(())
            },
        )
    }

    #[test]
    fn test_serving_config_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("serving.toml");
        std::fs::write(&path, "platform = \"from-file\"\ndefault_model_version = \"7\"\n")?;

        temp_env::with_vars(
            vec![
                (serving::TG_SERVING_CONFIG_PATH, Some(path.to_str().unwrap())),
                (serving::TG_SERVING_PLATFORM, None),
            ],
            || {
                let config = ServingConfig::from_settings()?;
                assert_eq!(config.platform, "from-file");
                assert_eq!(config.default_model_version, "7");
                Ok(())
            },
        )
    }

    #[test]
    fn test_serving_config_rejects_zero_batch_elements() {
        temp_env::with_vars(
            vec![
                (serving::TG_SERVING_MAX_BATCH_ELEMENTS, Some("0")),
                (serving::TG_SERVING_CONFIG_PATH, None),
            ],
            || {
                let result = ServingConfig::from_settings();
                assert!(result.is_err());
            },
        )
    }

    #[test]
    fn test_builder_validates() {
        let config = ServingConfig::builder()
            .platform("custom")
            .allow_extra_fields(true)
            .build()
            .unwrap();
        assert_eq!(config.platform, "custom");
        assert_eq!(config.default_model_version, DEFAULT_MODEL_VERSION);

        assert!(ServingConfig::builder().platform("").build().is_err());
    }

    #[test]
    fn test_is_truthy() {
        for val in ["1", "true", "True", "ON", "yes"] {
            assert!(is_truthy(val), "{val}");
        }
        for val in ["0", "false", "off", "", "random"] {
            assert!(!is_truthy(val), "{val}");
        }
    }
}
