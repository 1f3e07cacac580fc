//! Domain 模块
//!
//! 领域模型：链描述、连接状态、出站深链接构造

pub mod connection;
pub mod deep_link;
pub mod network_profile;

// 重新导出常用类型
pub use connection::{ConnectionState, Session, SigningResult, WalletUiState};
pub use network_profile::{ChainId, NetworkProfile};
