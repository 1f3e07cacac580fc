//! 错误类型定义
//!
//! 核心不向调用方抛出未捕获错误：所有失败最终落入
//! `ConnectionState::Error` 或 `SigningResult::Error`，这里的枚举
//! 是传递途中的分类。

use thiserror::Error;

/// 钱包连接/签名错误分类
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// 设备上没有可用的钱包应用，未发起任何启动
    #[error("No {0} wallet app found. Please install one of the supported wallets.")]
    NotInstalled(String),

    /// 系统层面打开外部应用失败
    #[error("Failed to open wallet app: {0}")]
    LaunchFailure(String),

    /// 钱包应用通过回调显式返回的错误
    #[error("{0}")]
    RemoteError(String),

    /// 回调到达但不包含可用地址
    #[error("No wallet address received from wallet app")]
    NoAddress,

    /// 未连接状态下发起签名
    #[error("Wallet not connected")]
    NotConnected,

    /// 回调 data 参数的 base64/JSON 解码失败（内部吞掉，不外抛）
    #[error("Failed to decode wallet callback data: {0}")]
    DecodeFailure(String),

    /// 显式取消，或等待中的请求被新请求顶替
    #[error("Connection cancelled")]
    Cancelled,

    /// 等待钱包回调超时
    #[error("Connection timed out")]
    Timeout,
}
