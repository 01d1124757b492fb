// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable name constants for centralized management across the workspace
//!
//! Environment variables are organized by functional area:
//! - **Logging**: Log level, output format and configuration file
//! - **Serving**: Codec and metadata behaviour of the serving layer

/// Logging environment variables
pub mod logging {
    /// Log level / filter directives (e.g., "debug", "tensorgate_serving=trace")
    pub const TG_LOG: &str = "TG_LOG";

    /// Path to logging configuration file
    pub const TG_LOGGING_CONFIG_PATH: &str = "TG_LOGGING_CONFIG_PATH";

    /// Enable JSONL logging format
    pub const TG_LOGGING_JSONL: &str = "TG_LOGGING_JSONL";

    /// Disable ANSI terminal colors in logs
    pub const TG_DISABLE_ANSI_LOGGING: &str = "TG_DISABLE_ANSI_LOGGING";

    /// Use local timezone for logging timestamps (default is UTC)
    pub const TG_LOG_USE_LOCAL_TZ: &str = "TG_LOG_USE_LOCAL_TZ";
}

/// Serving layer environment variables
///
/// Every field of [`crate::ServingConfig`] can be set with the `TG_SERVING_` prefix
/// followed by the upper-cased field name.
pub mod serving {
    /// Prefix shared by all serving settings
    pub const PREFIX: &str = "TG_SERVING_";

    /// Path to an additional serving configuration file (TOML)
    pub const TG_SERVING_CONFIG_PATH: &str = "TG_SERVING_CONFIG_PATH";

    /// Platform name reported in model metadata
    pub const TG_SERVING_PLATFORM: &str = "TG_SERVING_PLATFORM";

    /// Version reported for models loaded without an explicit version
    pub const TG_SERVING_DEFAULT_MODEL_VERSION: &str = "TG_SERVING_DEFAULT_MODEL_VERSION";

    /// Accept request inputs the model signature does not declare
    pub const TG_SERVING_ALLOW_EXTRA_FIELDS: &str = "TG_SERVING_ALLOW_EXTRA_FIELDS";

    /// Upper bound on the element count of a single decoded tensor
    pub const TG_SERVING_MAX_BATCH_ELEMENTS: &str = "TG_SERVING_MAX_BATCH_ELEMENTS";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serving_names_share_prefix() {
        for name in [
            serving::TG_SERVING_CONFIG_PATH,
            serving::TG_SERVING_PLATFORM,
            serving::TG_SERVING_DEFAULT_MODEL_VERSION,
            serving::TG_SERVING_ALLOW_EXTRA_FIELDS,
            serving::TG_SERVING_MAX_BATCH_ELEMENTS,
        ] {
            assert!(name.starts_with(serving::PREFIX), "{name}");
        }
    }
}
