//! 连接状态与签名结果
//!
//! `ConnectionState` 每链一份，由对应的 ChainRepository 独占持有，
//! 通过 watch 通道对外只读广播。

use serde::{Deserialize, Serialize};

use super::network_profile::ChainId;

/// 钱包连接状态（状态机见 ChainRepository）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// 深链接已发出，等待钱包回调
    Connecting,
    Connected {
        address: String,
        public_key: Option<String>,
    },
    Error {
        message: String,
    },
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected { .. } => "connected",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// 已连接地址（未连接返回 None）
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Connected { address, .. } => Some(address),
            _ => None,
        }
    }
}

/// 签名操作结果（一次性返回值，不持久化）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningResult {
    Success {
        signature: String,
        hash: Option<String>,
    },
    Error {
        message: String,
    },
    Cancelled,
}

/// 持久化的钱包会话，每链一条记录
///
/// 字段名即存储层的键名，保持与壳层既有记录兼容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "connected_address")]
    pub address: String,
    #[serde(rename = "public_key")]
    pub public_key: Option<String>,
    #[serde(rename = "session_id")]
    pub session_id: String,
}

/// Coordinator 对 UI 暴露的聚合状态
#[derive(Debug, Clone, PartialEq)]
pub struct WalletUiState {
    pub selected_chain: ChainId,
    pub connection_state: ConnectionState,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub last_signing_result: Option<SigningResult>,
}

impl Default for WalletUiState {
    fn default() -> Self {
        Self {
            selected_chain: ChainId::Tezos,
            connection_state: ConnectionState::Disconnected,
            is_loading: false,
            error_message: None,
            success_message: None,
            last_signing_result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_accessors() {
        let state = ConnectionState::Connected {
            address: "tz1abc".into(),
            public_key: Some("pk1".into()),
        };
        assert!(state.is_connected());
        assert_eq!(state.address(), Some("tz1abc"));
        assert_eq!(state.as_str(), "connected");

        assert_eq!(ConnectionState::Disconnected.address(), None);
    }

    #[test]
    fn test_session_wire_field_names() {
        let session = Session {
            address: "tz1abc".into(),
            public_key: None,
            session_id: "s-1".into(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["connected_address"], "tz1abc");
        assert!(json["public_key"].is_null());
        assert_eq!(json["session_id"], "s-1");

        let parsed: Session = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, session);
    }
}
