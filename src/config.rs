//! Configuration file loading.
//!
//! Search order:
//! 1. Explicit `--config` path (must exist)
//! 2. `hierplace.toml` in the current directory
//! 3. `~/.pcb/hierplace/config.toml`
//! 4. Built-in defaults

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::placer::{Options, Point, ScopeMode, Spacing, DEFAULT_SEPARATOR};

/// File name looked up in the working directory.
const LOCAL_CONFIG: &str = "hierplace.toml";

/// Placement settings read from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Clearance around each footprint, in mm.
    pub component_spacing: f64,
    /// Padding around each hierarchical group, in mm.
    pub group_spacing: f64,
    /// Separator between hierarchy path segments.
    pub path_separator: char,
    /// Fixed top-left corner for the placed cluster, in mm.
    pub anchor: Option<[f64; 2]>,
}

impl Default for Config {
    fn default() -> Self {
        let spacing = Spacing::default();
        Self {
            component_spacing: spacing.component,
            group_spacing: spacing.group,
            path_separator: DEFAULT_SEPARATOR,
            anchor: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("component_spacing", self.component_spacing),
            ("group_spacing", self.group_spacing),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{} must be a non-negative number, got {}", name, value);
            }
        }
        if self.path_separator.is_whitespace() || self.path_separator.is_control() {
            bail!("path_separator must be a visible character");
        }
        if let Some([x, y]) = self.anchor {
            if !x.is_finite() || !y.is_finite() {
                bail!("anchor must be two finite numbers");
            }
        }
        Ok(())
    }

    /// Placement options for a run in `mode`.
    pub fn options(&self, mode: ScopeMode) -> Options {
        Options {
            mode,
            spacing: Spacing {
                component: self.component_spacing,
                group: self.group_spacing,
            },
            separator: self.path_separator,
            anchor: self.anchor.map(|[x, y]| Point::new(x, y)),
        }
    }
}

/// `~/.pcb/hierplace/config.toml`, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pcb").join("hierplace").join("config.toml"))
}

/// Find and load the configuration.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    load_from(explicit, Path::new("."), user_config_path())
}

fn load_from(explicit: Option<&Path>, local_dir: &Path, user: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        info!(path:% = path.display(); "Loading configuration from explicit path");
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        return load_file(path);
    }

    let local = local_dir.join(LOCAL_CONFIG);
    if local.exists() {
        info!(path:% = local.display(); "Loading configuration from local path");
        return load_file(&local);
    }

    if let Some(user) = user {
        if user.exists() {
            info!(path:% = user.display(); "Loading configuration from user path");
            return load_file(&user);
        }
        debug!(path:% = user.display(); "User configuration file not found");
    }

    debug!("No configuration file found, using defaults");
    Ok(Config::default())
}

fn load_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(config)
}
