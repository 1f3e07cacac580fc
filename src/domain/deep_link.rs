//! 出站深链接构造
//!
//! 连接（配对）与签名请求的 JSON 载荷、base64url 编码和最终 URI。
//! Tezos 走 Beacon（tzip10 / sign_payload_request），Sui 走
//! connect / signPersonalMessage 信封。

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::AppConfig;
use crate::domain::network_profile::{ChainId, NetworkProfile};
use crate::error::WalletError;

/// 本应用的回调 URI，例如 `credpos://callback`
pub fn callback_url(callback_scheme: &str, profile: &NetworkProfile) -> String {
    format!("{}://{}", callback_scheme, profile.callback_host)
}

/// base64url 编码（无填充）
pub fn encode_base64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// base64url 解码，容忍带填充和不带填充两种形式
pub fn decode_base64url(data: &str) -> Result<Vec<u8>, WalletError> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| URL_SAFE.decode(data))
        .map_err(|e| WalletError::DecodeFailure(e.to_string()))
}

/// 连接请求 URI
///
/// `launch_scheme` 由仓库根据检测到的钱包应用选定（Sui 可能为
/// `suiet://`），`rpc_url` 为生效的 RPC 端点（含配置覆盖）。
pub fn connect_request_uri(
    profile: &NetworkProfile,
    launch_scheme: &str,
    callback_scheme: &str,
    app: &AppConfig,
    rpc_url: &str,
    session_id: &str,
) -> String {
    let callback = callback_url(callback_scheme, profile);

    match profile.id {
        ChainId::Tezos => {
            // Beacon 配对请求
            let request = json!({
                "id": session_id,
                "name": app.name,
                "appUrl": app.app_url,
                "icon": app.icon_url,
                "callbackUrl": callback,
                "network": {
                    "type": profile.network_name,
                    "rpcUrl": rpc_url,
                },
            });
            format!(
                "{}?type=tzip10&data={}&callback={}",
                launch_scheme,
                encode_base64url(request.to_string().as_bytes()),
                callback
            )
        }
        ChainId::Sui => {
            let request = json!({
                "id": session_id,
                "method": "connect",
                "callbackUrl": callback,
                "params": {
                    "appName": app.name,
                    "appUrl": app.app_url,
                    "appIcon": app.icon_url,
                    "network": profile.network_name,
                    "permissions": ["viewAccount", "suggestTransactions"],
                },
            });
            format!(
                "{}connect?data={}&callback={}",
                launch_scheme,
                encode_base64url(request.to_string().as_bytes()),
                callback
            )
        }
    }
}

/// 待签名载荷（JSON 字符串）
pub fn signing_payload(app_name: &str, score: &str, network_name: &str) -> String {
    json!({
        "app": app_name,
        "action": "credit_score_verification",
        "score": score,
        "timestamp": Utc::now().timestamp_millis(),
        "network": network_name,
    })
    .to_string()
}

/// 签名请求 URI
pub fn sign_request_uri(
    profile: &NetworkProfile,
    callback_scheme: &str,
    address: &str,
    payload: &str,
    request_id: &str,
) -> String {
    let callback = callback_url(callback_scheme, profile);

    match profile.id {
        ChainId::Tezos => {
            let request = json!({
                "type": "sign_payload_request",
                "payload": payload,
                "sourceAddress": address,
                "signingType": "micheline",
                "callbackUrl": callback,
            });
            format!(
                "{}?type=sign&data={}&callback={}",
                profile.default_scheme(),
                encode_base64url(request.to_string().as_bytes()),
                callback
            )
        }
        ChainId::Sui => {
            let request = json!({
                "id": request_id,
                "method": "signPersonalMessage",
                "callbackUrl": callback,
                "params": {
                    "message": encode_base64url(payload.as_bytes()),
                    "account": address,
                },
            });
            format!(
                "{}sign?data={}&callback={}",
                profile.default_scheme(),
                encode_base64url(request.to_string().as_bytes()),
                callback
            )
        }
    }
}

/// 载荷的 SHA-256 十六进制指纹，与钱包最终返回什么无关，
/// 本地即可复算校验
pub fn content_hash(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// 签名回调未到达时返回的占位签名（链前缀 + 截断指纹）
pub fn placeholder_signature(chain: ChainId, hash: &str) -> String {
    match chain {
        ChainId::Tezos => format!("edsigPending_{}", &hash[..20]),
        ChainId::Sui => format!("0xPending_{}", &hash[..20]),
    }
}
