use std::path::PathBuf;

use anyhow::{anyhow, Result};

use super::PortalConfig;

pub const ENV_PREFIX: &str = "PORTAL_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own overrides without touching the process environment.
pub trait EnvSource {
    /// look up `key` with the `PORTAL_` prefix applied.
    fn get(&self, key: &str) -> Option<String>;
}

pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

impl EnvSource for std::collections::BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::BTreeMap::get(self, &format!("{}{}", ENV_PREFIX, key)).cloned()
    }
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut PortalConfig, env: &E) -> Result<()> {
    if let Some(name) = get_env_string(env, "STACK_NAME") {
        config.stack.name = name;
    }
    if let Some(account) = get_env_string(env, "ACCOUNT") {
        config.stack.account = Some(account);
    }
    if let Some(region) = get_env_string(env, "REGION") {
        config.stack.region = Some(region);
    }

    if let Some(dir) = get_env_string(env, "SOURCE_DIR") {
        config.portal.source_dir = PathBuf::from(dir);
    }
    if let Some(doc) = get_env_string(env, "ERROR_DOCUMENT") {
        config.portal.error_document = doc;
    }
    if let Some(price_class) = get_env_string(env, "PRICE_CLASS") {
        config.portal.price_class = price_class;
    }
    if let Some(tls) = get_env_string(env, "MIN_TLS_VERSION") {
        config.portal.min_tls_version = tls;
    }
    if let Some(val) = get_env_bool(env, "ENABLE_LOGGING")? {
        config.portal.enable_logging = val;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(anyhow!("Invalid boolean for {}{}: {}", ENV_PREFIX, key, val)),
        },
        None => Ok(None),
    }
}
