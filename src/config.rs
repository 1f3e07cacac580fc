//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::ChainId;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 应用身份配置（写入钱包配对请求的自描述字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub app_url: String,
    pub icon_url: String,
}

/// 钱包连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// 回调深链接 scheme（钱包应用跳转回本应用使用）
    pub callback_scheme: String,
    /// 等待连接回调的超时（秒）
    pub connection_timeout_secs: u64,
    /// 等待签名回调的超时（秒）
    pub signing_timeout_secs: u64,
    /// RPC 会话校验超时（秒）
    pub rpc_timeout_secs: u64,
    /// 覆盖 Tezos Ghostnet RPC 端点（可选）
    #[serde(default)]
    pub tezos_rpc_url: Option<String>,
    /// 覆盖 Sui Devnet RPC 端点（可选）
    #[serde(default)]
    pub sui_rpc_url: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: std::env::var("CREDPOS_APP_NAME").unwrap_or_else(|_| "CredPOS".into()),
            app_url: std::env::var("CREDPOS_APP_URL")
                .unwrap_or_else(|_| "https://credpos.app".into()),
            icon_url: std::env::var("CREDPOS_APP_ICON")
                .unwrap_or_else(|_| "https://credpos.app/icon.png".into()),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            callback_scheme: std::env::var("WALLET_CALLBACK_SCHEME")
                .unwrap_or_else(|_| "credpos".into()),
            connection_timeout_secs: std::env::var("WALLET_CONNECTION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            signing_timeout_secs: std::env::var("WALLET_SIGNING_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            rpc_timeout_secs: std::env::var("WALLET_RPC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            tezos_rpc_url: std::env::var("TEZOS_RPC_URL").ok(),
            sui_rpc_url: std::env::var("SUI_RPC_URL").ok(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl WalletConfig {
    /// 链对应的 RPC 端点覆盖（未配置时走 NetworkProfile 默认值）
    pub fn rpc_override(&self, chain: ChainId) -> Option<&str> {
        match chain {
            ChainId::Tezos => self.tezos_rpc_url.as_deref(),
            ChainId::Sui => self.sui_rpc_url.as_deref(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app: AppConfig::default(),
            wallet: WalletConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.wallet.callback_scheme.is_empty()
            || !self
                .wallet
                .callback_scheme
                .chars()
                .all(|c| c.is_ascii_lowercase())
        {
            anyhow::bail!("WALLET_CALLBACK_SCHEME must be a non-empty lowercase ASCII scheme");
        }

        if self.wallet.connection_timeout_secs == 0 {
            anyhow::bail!("WALLET_CONNECTION_TIMEOUT_SECS must be at least 1");
        }

        if self.wallet.signing_timeout_secs == 0 {
            anyhow::bail!("WALLET_SIGNING_TIMEOUT_SECS must be at least 1");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
