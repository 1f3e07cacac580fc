//! Service 模块
//!
//! 钱包连接协议的三个层次：回调关联器、链仓库、协调器

pub mod callback_correlator;
pub mod chain_repository;
pub mod wallet_coordinator;

// 重新导出常用类型
pub use callback_correlator::{CallbackCorrelator, ConnectionResponse, SigningResponse};
pub use chain_repository::ChainRepository;
pub use wallet_coordinator::WalletCoordinator;
