//! CredPOS - 钱包连接核心（Tezos Ghostnet / Sui Devnet）
//!
//! 通过深链接唤起外部钱包应用，并将异步回调关联回原始请求。
//! 壳层（深链接启动、应用检测、键值存储、UI）以 trait 形式注入。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::WalletError;

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{ChainId, ConnectionState, NetworkProfile, Session, SigningResult},
        error::WalletError,
        service::{CallbackCorrelator, ChainRepository, WalletCoordinator},
    };
}
