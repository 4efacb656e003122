//! Deployment configuration loading.
//!
//! The file path comes from `PETTRACK_CONFIG` (default `config.toml`); if
//! the file is missing the compiled-in default keeps local dev running
//! without any setup. All validation happens here, fail-fast: a malformed
//! table or a non-stochastic matrix aborts startup, and steady-state
//! operation never sees a configuration error.

use anyhow::{Context, Result};
use rssi_types::config::{RuntimeConfig, SystemConfig};

pub fn load() -> Result<RuntimeConfig> {
    let path = std::env::var("PETTRACK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());

    let cfg: SystemConfig =
        toml::from_str(&raw).with_context(|| format!("invalid TOML in {path}"))?;
    cfg.validate()
        .with_context(|| format!("invalid configuration in {path}"))
}
