// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ConfigError;
use std::env;

pub const AGGREGATION_GROUP_NAME_VAR: &str = "AGGREGATION_GROUP_NAME";
pub const LOG_LEVEL_VAR: &str = "FORWARDER_LOG_LEVEL";
pub const ENDPOINT_URL_VAR: &str = "FORWARDER_ENDPOINT_URL";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the forwarder, read from the function's environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Log group every forwarded stream is written into
    pub aggregation_group_name: String,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Overrides the CloudWatch Logs endpoint, mainly for local stacks
    pub endpoint_url: Option<String>,
}

impl ForwarderConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let aggregation_group_name = env::var(AGGREGATION_GROUP_NAME_VAR)
            .map_err(|_| ConfigError::MissingVar(AGGREGATION_GROUP_NAME_VAR))?;
        let log_level = env::var(LOG_LEVEL_VAR)
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());
        let endpoint_url = env::var(ENDPOINT_URL_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty());

        let config = Self {
            aggregation_group_name,
            log_level,
            endpoint_url,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation_group_name.trim().is_empty() {
            return Err(ConfigError::MissingVar(AGGREGATION_GROUP_NAME_VAR));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
