// Portal configuration
//
// Supports configuration from multiple sources:
// 1. Environment variables with the PORTAL_ prefix (highest priority)
// 2. Config file from --config, or the path in PORTAL_CONFIG
// 3. ./portal.toml if it exists
// 4. Built in defaults (lowest priority)

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, StdEnvSource, ENV_PREFIX};
pub use sources::{load_config, load_with, DEFAULT_CONFIG_FILE};
pub use validation::validate_config;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortalConfig {
    #[serde(default)]
    pub stack: StackSettings,

    #[serde(default)]
    pub portal: PortalSettings,
}

/// properties of the deployable unit, passed through to the stack unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackSettings {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: "DeployUiWithCdkStack".to_string(),
            account: None,
            region: None,
            description: None,
            tags: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalSettings {
    /// id of the portal construct inside the stack. Every logical id in the
    /// template is derived from it.
    pub construct_id: String,
    /// directory of built web assets. Relative paths are resolved against the
    /// directory of the config file that sets them.
    pub source_dir: PathBuf,
    pub error_document: String,
    pub price_class: String,
    pub min_tls_version: String,
    pub enable_logging: bool,
    /// the fixed logical id of the console url output.
    pub console_url_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<CustomDomainConfig>,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            construct_id: "MagicPhotoWebUI".to_string(),
            source_dir: PathBuf::from("photo-magic-ui"),
            error_document: "/index.html".to_string(),
            price_class: "PriceClass_All".to_string(),
            min_tls_version: "TLSv1.2_2019".to_string(),
            enable_logging: false,
            console_url_output: "MagicPhotoWebConsoleUrl".to_string(),
            custom_domain: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomDomainConfig {
    pub aliases: Vec<String>,
    pub certificate_arn: String,
}

impl PortalConfig {
    /// parse a config file's contents. Missing fields keep their defaults.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_config(self)
    }
}
