use anyhow::{Context, Result};
use config::{Config, File};
use core_logic::{ConfigError, DecodePolicy, DelayConfig, DelayOverrides};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "chains/flipn/config.toml";

pub const DEFAULT_API_BASE_URL: &str = "https://api.dumpdump.fun/api/v1";
pub const DEFAULT_API_ORIGIN: &str = "https://test.flipn.fun";
pub const DEFAULT_API_REFERER: &str = "https://test.flipn.fun/";
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, Deserialize, Clone)]
pub struct FlipnConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_origin")]
    pub api_origin: String,
    #[serde(default = "default_api_referer")]
    pub api_referer: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_wallets_file")]
    pub wallets_file: String,
    #[serde(default)]
    pub target_tokens: Vec<String>,
    #[serde(default)]
    pub delays: DelayOverrides,
    /// Opt-in SHA-256 fallback for keys that match no encoding.
    #[serde(default)]
    pub allow_derived_keys: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_origin() -> String {
    DEFAULT_API_ORIGIN.to_string()
}

fn default_api_referer() -> String {
    DEFAULT_API_REFERER.to_string()
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_wallets_file() -> String {
    core_logic::WalletStore::DEFAULT_FILE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

fn default_page_limit() -> u32 {
    100
}

impl Default for FlipnConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_origin: default_api_origin(),
            api_referer: default_api_referer(),
            rpc_url: default_rpc_url(),
            wallets_file: default_wallets_file(),
            target_tokens: Vec::new(),
            delays: DelayOverrides::default(),
            allow_derived_keys: false,
            request_timeout_secs: default_request_timeout_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            page_limit: default_page_limit(),
        }
    }
}

impl FlipnConfig {
    /// Loads `path` when it exists, then applies environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        let mut config: FlipnConfig = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!(e))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `API_BASE_URL`, `API_ORIGIN`, `API_REFERER`, `RPC`,
    /// `TARGET_LIST` and `WALLETS_FILE` from `lookup`. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = get("API_ORIGIN") {
            self.api_origin = v;
        }
        if let Some(v) = get("API_REFERER") {
            self.api_referer = v;
        }
        if let Some(v) = get("RPC") {
            self.rpc_url = v;
        }
        if let Some(v) = get("WALLETS_FILE") {
            self.wallets_file = v;
        }
        if let Some(v) = get("TARGET_LIST") {
            self.target_tokens = parse_target_list(&v);
        }
    }

    pub fn decode_policy(&self) -> DecodePolicy {
        if self.allow_derived_keys {
            DecodePolicy::Permissive
        } else {
            DecodePolicy::Strict
        }
    }

    /// Resolves the configured delays, with `overrides` layered on top.
    pub fn delay_config(&self, overrides: &DelayOverrides) -> Result<DelayConfig, ConfigError> {
        self.delays.merged_with(overrides).resolve()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

/// Splits a comma separated token list, dropping blank entries.
pub fn parse_target_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
