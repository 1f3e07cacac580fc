//! 链描述注册表
//!
//! 每条支持链的静态描述：RPC 端点、浏览器地址、深链接 scheme、
//! 已知钱包应用标识。进程启动时构建一次，之后只读。
//! 仅支持测试网（Ghostnet / Devnet），不允许主网。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 支持的链
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Tezos,
    Sui,
}

impl ChainId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tezos => "tezos",
            Self::Sui => "sui",
        }
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 链的静态描述（不可变）
#[derive(Debug, Clone, Serialize)]
pub struct NetworkProfile {
    pub id: ChainId,
    /// UI 显示名
    pub display_name: &'static str,
    /// 测试网名称，写入配对/签名载荷（"ghostnet" / "devnet"）
    pub network_name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    /// 唤起钱包应用的深链接 scheme（首个为默认）
    pub deep_link_schemes: &'static [&'static str],
    /// 已知钱包应用标识（Android 包名）
    pub known_wallet_app_ids: &'static [&'static str],
    /// 入站回调 URI 的 host 段
    pub callback_host: &'static str,
}

static REGISTRY: Lazy<Vec<NetworkProfile>> = Lazy::new(|| {
    vec![
        NetworkProfile {
            id: ChainId::Tezos,
            display_name: "Tezos",
            network_name: "ghostnet",
            rpc_url: "https://ghostnet.ecadinfra.com",
            explorer_url: "https://ghostnet.tzkt.io/",
            deep_link_schemes: &["tezos://"],
            known_wallet_app_ids: &[
                "com.airgap.wallet",
                "io.temple.wallet",
                "com.kukai.wallet",
                "io.autonomy.wallet",
            ],
            callback_host: "callback",
        },
        NetworkProfile {
            id: ChainId::Sui,
            display_name: "Sui",
            network_name: "devnet",
            rpc_url: "https://fullnode.devnet.sui.io:443",
            explorer_url: "https://suiexplorer.com/?network=devnet/",
            deep_link_schemes: &["sui://", "suiet://"],
            known_wallet_app_ids: &[
                "com.mystenlabs.suiwallet",
                "io.suiet.app",
                "app.ethos.wallet",
                "com.martianwallet.sui",
            ],
            callback_host: "sui-callback",
        },
    ]
});

/// 全部链描述（顺序即 UI 显示顺序）
pub fn all() -> &'static [NetworkProfile] {
    &REGISTRY
}

/// 按链取描述
pub fn from_id(id: ChainId) -> &'static NetworkProfile {
    REGISTRY
        .iter()
        .find(|p| p.id == id)
        .expect("registry covers all ChainId variants")
}

/// 按名称取描述（大小写不敏感）
pub fn from_name(name: &str) -> Option<&'static NetworkProfile> {
    let lower = name.to_lowercase();
    REGISTRY.iter().find(|p| p.id.as_str() == lower)
}

impl NetworkProfile {
    /// 默认深链接 scheme
    pub fn default_scheme(&self) -> &'static str {
        self.deep_link_schemes[0]
    }
}
