// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "INDICADORES_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/indicadores.toml";

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_bcb_base_url() -> String {
    crate::fetch::bcb::DEFAULT_BASE_URL.to_string()
}
fn default_market_base_url() -> String {
    crate::fetch::market::DEFAULT_BASE_URL.to_string()
}
fn default_market_symbol() -> String {
    "^BVSP".to_string()
}
fn default_snapshot_base_url() -> String {
    "https://raw.githubusercontent.com/GugaCasanova/Comparador_Indexadores/main/data".to_string()
}
fn default_bigmac_url() -> String {
    "https://raw.githubusercontent.com/TheEconomist/big-mac-data/master/output-data/big-mac-full-index.csv"
        .to_string()
}
fn default_cache_capacity() -> usize {
    crate::fetch::cache::DEFAULT_CAPACITY
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1_000
}
fn default_http_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_bcb_base_url")]
    pub bcb_base_url: String,
    #[serde(default = "default_market_base_url")]
    pub market_base_url: String,
    #[serde(default = "default_market_symbol")]
    pub market_symbol: String,
    #[serde(default = "default_snapshot_base_url")]
    pub snapshot_base_url: String,
    #[serde(default = "default_bigmac_url")]
    pub bigmac_url: String,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        toml::from_str("").expect("defaults must deserialize")
    }
}

impl ServiceConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: ServiceConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $INDICADORES_CONFIG_PATH (must exist when set)
    /// 2) config/indicadores.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            anyhow::bail!("{ENV_CONFIG_PATH} points to non-existent path");
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.retry_delay_ms, 1_000);
        assert_eq!(cfg.http_timeout_secs, 10);
        assert_eq!(cfg.cache_capacity, 128);
        assert_eq!(cfg.market_symbol, "^BVSP");
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "bind_addr = \"127.0.0.1:9999\"\ncache_capacity = 4").unwrap();
        let cfg = ServiceConfig::load_from(f.path()).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9999");
        assert_eq!(cfg.cache_capacity, 4);
        assert_eq!(cfg.retry_attempts, 3);
    }

    #[serial_test::serial]
    #[test]
    fn env_path_must_exist_when_set() {
        std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
        assert!(ServiceConfig::load_default().is_err());
        std::env::remove_var(ENV_CONFIG_PATH);
    }
}
