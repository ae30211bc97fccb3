// Configuration source loading.
//
// Priority order:
// 1. Environment variables (PORTAL_* prefix)
// 2. Config file from --config, else the path in PORTAL_CONFIG
// 3. ./portal.toml
// 4. Defaults

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::env_overrides::{apply_env_overrides, EnvSource, StdEnvSource};
use super::PortalConfig;

pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

/// Load configuration from the process environment and working directory.
pub fn load_config(explicit: Option<&Path>) -> Result<PortalConfig> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    load_with(explicit, &StdEnvSource, &cwd)
}

/// Load configuration with an explicit environment and working directory.
/// After loading, `portal.source_dir` is absolute.
pub fn load_with<E: EnvSource>(explicit: Option<&Path>, env: &E, cwd: &Path) -> Result<PortalConfig> {
    let (mut config, base_dir) = match find_config_file(explicit, env, cwd) {
        Some(path) => {
            let config = load_from_file_path(&path)?;
            let base_dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => cwd.to_path_buf(),
            };
            tracing::debug!(path = %path.display(), "loaded config file");
            (config, base_dir)
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            (PortalConfig::default(), cwd.to_path_buf())
        }
    };
    // a relative file path is relative to the file that declared it,
    // a relative env path is relative to where the command runs
    let env_source_dir = env.get("SOURCE_DIR").map(|v| !v.trim().is_empty()).unwrap_or(false);
    let base_dir = if env_source_dir { cwd.to_path_buf() } else { base_dir };

    apply_env_overrides(&mut config, env)?;
    if config.portal.source_dir.is_relative() {
        config.portal.source_dir = absolute(&base_dir, cwd).join(&config.portal.source_dir);
    }

    config.validate()?;
    Ok(config)
}

fn absolute(dir: &Path, cwd: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        cwd.join(dir)
    }
}

fn find_config_file<E: EnvSource>(explicit: Option<&Path>, env: &E, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(absolute(path, cwd));
    }
    if let Some(path) = env.get("CONFIG") {
        return Some(absolute(Path::new(&path), cwd));
    }
    let default_path = cwd.join(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return Some(default_path);
    }
    None
}

/// Load configuration from a specific file path.
/// Returns error if file doesn't exist or can't be parsed.
fn load_from_file_path(path: &Path) -> Result<PortalConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    PortalConfig::from_toml(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}
