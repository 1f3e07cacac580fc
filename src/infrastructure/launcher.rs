//! 外部应用启动接口
//!
//! 深链接唤起、安装检测由宿主壳层（Android/iOS 容器）提供，核心
//! 只依赖这个 trait。启动是 fire-and-forget：成功仅代表系统接受了
//! 唤起请求，钱包应用是否给出响应完全取决于后续回调。

use anyhow::Result;
use async_trait::async_trait;

/// 壳层注入的应用启动能力
#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// 按应用标识检测是否已安装
    fn is_app_installed(&self, app_id: &str) -> bool;

    /// 检测某个深链接 scheme 是否有应用可以处理
    fn can_resolve_scheme(&self, scheme: &str) -> bool;

    /// 通过深链接 URI 唤起外部应用，同步失败（无应用可处理等）
    /// 返回 Err
    async fn launch(&self, uri: &str) -> Result<()>;
}
