//! 回调关联器
//!
//! 钱包应用通过深链接把结果送回本应用，壳层将 URI 原样交给这里。
//! 关联器按 (链, 回调类别) 维护待定槽：每链每类别同一时刻至多一个，
//! 重复注册覆盖前一个（不排队），覆盖会记录日志，被顶替的等待方
//! 通过通道关闭感知。
//!
//! 进程级生命周期，由组合根显式构造并注入各仓库，不做全局单例。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::{oneshot, watch};
use url::Url;

use crate::domain::network_profile::{self, ChainId};
use crate::domain::deep_link;
use crate::error::WalletError;

/// 显式取消时通过连接槽投递的错误文案
pub const CANCELLED_MESSAGE: &str = "Connection cancelled";
/// 回调中找不到地址时投递的错误文案
pub const NO_ADDRESS_MESSAGE: &str = "No wallet address in callback";

/// 连接回调结果：address / publicKey / error 三元组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionResponse {
    pub address: Option<String>,
    pub public_key: Option<String>,
    pub error: Option<String>,
}

impl ConnectionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            address: None,
            public_key: None,
            error: Some(message.into()),
        }
    }
}

/// 签名回调结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningResponse {
    pub signature: Option<String>,
    pub error: Option<String>,
}

#[derive(Default)]
struct Slots {
    connection: HashMap<ChainId, oneshot::Sender<ConnectionResponse>>,
    signing: HashMap<ChainId, oneshot::Sender<SigningResponse>>,
}

/// 从回调 URI 中提取的查询参数
#[derive(Debug, Default)]
struct CallbackParams {
    data: Option<String>,
    address: Option<String>,
    public_key: Option<String>,
    error: Option<String>,
    signature: Option<String>,
}

impl CallbackParams {
    fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        // publicKey 优先于 public_key
        let mut public_key_snake = None;

        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                "data" if params.data.is_none() => params.data = Some(value),
                "address" if params.address.is_none() => params.address = Some(value),
                "publicKey" if params.public_key.is_none() => params.public_key = Some(value),
                "public_key" if public_key_snake.is_none() => public_key_snake = Some(value),
                "error" if params.error.is_none() => params.error = Some(value),
                "signature" if params.signature.is_none() => params.signature = Some(value),
                _ => {}
            }
        }

        if params.public_key.is_none() {
            params.public_key = public_key_snake;
        }
        params
    }
}

/// 回调关联器
pub struct CallbackCorrelator {
    callback_scheme: String,
    slots: Mutex<Slots>,
    pending_connection: HashMap<ChainId, watch::Sender<bool>>,
}

impl CallbackCorrelator {
    pub fn new(callback_scheme: impl Into<String>) -> Self {
        let pending_connection = network_profile::all()
            .iter()
            .map(|p| (p.id, watch::channel(false).0))
            .collect();

        Self {
            callback_scheme: callback_scheme.into(),
            slots: Mutex::new(Slots::default()),
            pending_connection,
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().expect("correlator slot table poisoned")
    }

    fn set_pending(&self, chain: ChainId, pending: bool) {
        if let Some(flag) = self.pending_connection.get(&chain) {
            flag.send_replace(pending);
        }
    }

    /// 是否有等待中的连接请求（UI 可订阅）
    pub fn pending_connection(&self, chain: ChainId) -> watch::Receiver<bool> {
        self.pending_connection
            .get(&chain)
            .expect("registry covers all ChainId variants")
            .subscribe()
    }

    /// 注册连接回调槽，返回一次性接收端。
    /// 覆盖已有槽时旧的发送端被丢弃，等待方的通道随之关闭。
    pub fn register_connection(&self, chain: ChainId) -> oneshot::Receiver<ConnectionResponse> {
        let (tx, rx) = oneshot::channel();
        if self.slots().connection.insert(chain, tx).is_some() {
            tracing::warn!(
                chain = %chain,
                "replacing pending connection callback; previous caller is superseded"
            );
        }
        self.set_pending(chain, true);
        rx
    }

    /// 注册签名回调槽（与连接槽相互独立）
    pub fn register_signing(&self, chain: ChainId) -> oneshot::Receiver<SigningResponse> {
        let (tx, rx) = oneshot::channel();
        if self.slots().signing.insert(chain, tx).is_some() {
            tracing::warn!(
                chain = %chain,
                "replacing pending signing callback; previous caller is superseded"
            );
        }
        rx
    }

    /// 处理入站回调 URI。scheme/host 可识别返回 true（无论当时是否
    /// 有槽在等待），否则返回 false 且无任何副作用。
    pub fn dispatch(&self, uri: &str) -> bool {
        let parsed = match Url::parse(uri) {
            Ok(u) => u,
            Err(_) => return false,
        };

        if parsed.scheme() != self.callback_scheme {
            return false;
        }

        let host = parsed.host_str().unwrap_or_default();
        let chain = match network_profile::all().iter().find(|p| p.callback_host == host) {
            Some(profile) => profile.id,
            None => return false,
        };

        tracing::debug!(chain = %chain, uri = uri, "processing wallet callback");
        self.resolve(chain, CallbackParams::from_url(&parsed));
        true
    }

    /// 按优先级消解回调参数，命中即停：
    /// error > signature > address > data 信封 > 无地址兜底
    fn resolve(&self, chain: ChainId, params: CallbackParams) {
        if let Some(message) = params.error {
            tracing::error!(chain = %chain, error = %message, "wallet callback returned error");
            self.deliver_connection(chain, ConnectionResponse::failure(message.clone()));
            self.deliver_signing(
                chain,
                SigningResponse {
                    signature: None,
                    error: Some(message),
                },
            );
            return;
        }

        if let Some(signature) = params.signature {
            tracing::debug!(chain = %chain, "wallet signature received");
            // 仅清签名槽，连接槽保持不动
            self.deliver_signing(
                chain,
                SigningResponse {
                    signature: Some(signature),
                    error: None,
                },
            );
            return;
        }

        if let Some(address) = params.address {
            tracing::debug!(chain = %chain, address = %address, "wallet address received");
            self.deliver_connection(
                chain,
                ConnectionResponse {
                    address: Some(address),
                    public_key: params.public_key,
                    error: None,
                },
            );
            return;
        }

        if let Some(data) = params.data {
            match Self::decode_envelope(chain, &data) {
                Ok(Some((address, public_key))) => {
                    tracing::debug!(chain = %chain, address = %address, "wallet address parsed from data envelope");
                    self.deliver_connection(
                        chain,
                        ConnectionResponse {
                            address: Some(address),
                            public_key,
                            error: None,
                        },
                    );
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    // 解码失败不外抛，落入无地址兜底
                    tracing::warn!(chain = %chain, error = %e, "failed to parse callback data parameter");
                }
            }
        }

        tracing::warn!(chain = %chain, "no address found in wallet callback");
        self.deliver_connection(chain, ConnectionResponse::failure(NO_ADDRESS_MESSAGE));
    }

    /// 解析 base64url JSON 信封；Tezos 额外接受 `sourceAddress` 字段
    fn decode_envelope(
        chain: ChainId,
        data: &str,
    ) -> Result<Option<(String, Option<String>)>, WalletError> {
        let bytes = deep_link::decode_base64url(data)?;
        let text =
            String::from_utf8(bytes).map_err(|e| WalletError::DecodeFailure(e.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| WalletError::DecodeFailure(e.to_string()))?;

        let address = json
            .get("address")
            .and_then(|v| v.as_str())
            .or_else(|| match chain {
                ChainId::Tezos => json.get("sourceAddress").and_then(|v| v.as_str()),
                ChainId::Sui => None,
            });

        Ok(address.map(|a| {
            let public_key = json
                .get("publicKey")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            (a.to_string(), public_key)
        }))
    }

    /// 取消等待中的连接：向槽投递取消错误并清槽
    pub fn cancel_connection(&self, chain: ChainId) {
        self.deliver_connection(chain, ConnectionResponse::failure(CANCELLED_MESSAGE));
    }

    /// 手动设置地址：绕过深链接往返，直接向连接槽投递成功结果
    pub fn set_address_manually(
        &self,
        chain: ChainId,
        address: impl Into<String>,
        public_key: Option<String>,
    ) {
        self.deliver_connection(
            chain,
            ConnectionResponse {
                address: Some(address.into()),
                public_key,
                error: None,
            },
        );
    }

    /// 清槽不投递（等待方已超时放弃时使用）
    pub(crate) fn clear_connection(&self, chain: ChainId) {
        self.slots().connection.remove(&chain);
        self.set_pending(chain, false);
    }

    pub(crate) fn clear_signing(&self, chain: ChainId) {
        self.slots().signing.remove(&chain);
    }

    fn deliver_connection(&self, chain: ChainId, response: ConnectionResponse) {
        let sender = self.slots().connection.remove(&chain);
        self.set_pending(chain, false);
        if let Some(tx) = sender {
            // 接收端已丢弃则静默忽略
            let _ = tx.send(response);
        }
    }

    fn deliver_signing(&self, chain: ChainId, response: SigningResponse) {
        if let Some(tx) = self.slots().signing.remove(&chain) {
            let _ = tx.send(response);
        }
    }
}
