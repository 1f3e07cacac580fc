//! 钱包协调器
//!
//! 持有当前选中链及其仓库，向 UI 暴露统一的连接/断开/签名入口和
//! 聚合状态流。切链时断开旧链（若已连接）、换仓库并重新订阅其
//! 状态流。链特定逻辑只剩地址格式校验和提示文案拼装。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::domain::connection::{ConnectionState, SigningResult, WalletUiState};
use crate::domain::network_profile::{self, ChainId};
use crate::error::WalletError;
use crate::service::chain_repository::ChainRepository;
use crate::utils::address_validator::AddressValidator;
use crate::utils::string_utils;

struct Inner {
    selected: ChainId,
    observer: JoinHandle<()>,
}

/// 钱包协调器（UI 的唯一入口）
pub struct WalletCoordinator {
    repositories: HashMap<ChainId, Arc<ChainRepository>>,
    ui_tx: Arc<watch::Sender<WalletUiState>>,
    ui_rx: watch::Receiver<WalletUiState>,
    inner: Mutex<Inner>,
}

impl WalletCoordinator {
    /// 需要在 tokio 运行时内构造（内部起状态订阅任务）
    pub fn new(tezos: Arc<ChainRepository>, sui: Arc<ChainRepository>) -> Self {
        let mut repositories = HashMap::new();
        repositories.insert(ChainId::Tezos, tezos.clone());
        repositories.insert(ChainId::Sui, sui);

        let initial = WalletUiState {
            selected_chain: ChainId::Tezos,
            connection_state: tezos.current_state(),
            ..Default::default()
        };
        let (ui_tx, ui_rx) = watch::channel(initial);
        let ui_tx = Arc::new(ui_tx);

        let observer = Self::observe(ui_tx.clone(), tezos);

        Self {
            repositories,
            ui_tx,
            ui_rx,
            inner: Mutex::new(Inner {
                selected: ChainId::Tezos,
                observer,
            }),
        }
    }

    /// 订阅仓库状态流，把每次变化写进 UI 聚合状态
    fn observe(
        ui: Arc<watch::Sender<WalletUiState>>,
        repo: Arc<ChainRepository>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut rx = repo.state();
            loop {
                let state = rx.borrow_and_update().clone();
                ui.send_modify(|u| {
                    u.is_loading = matches!(state, ConnectionState::Connecting);
                    u.connection_state = state.clone();
                });
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// UI 聚合状态流
    pub fn ui_state(&self) -> watch::Receiver<WalletUiState> {
        self.ui_rx.clone()
    }

    pub async fn selected_chain(&self) -> ChainId {
        self.inner.lock().await.selected
    }

    /// 当前选中链的仓库
    pub async fn active_repository(&self) -> Arc<ChainRepository> {
        let inner = self.inner.lock().await;
        self.repositories[&inner.selected].clone()
    }

    /// 切换链：已连接的旧链先断开，换仓库并重新订阅状态流，
    /// 清空临时提示
    pub async fn select_chain(&self, chain: ChainId) {
        let mut inner = self.inner.lock().await;
        if inner.selected == chain {
            return;
        }

        let previous = self.repositories[&inner.selected].clone();
        if previous.current_state().is_connected() {
            previous.disconnect().await;
        }

        inner.observer.abort();
        inner.selected = chain;

        let repo = self.repositories[&chain].clone();
        self.ui_tx.send_modify(|u| {
            u.selected_chain = chain;
            u.connection_state = repo.current_state();
            u.is_loading = false;
            u.error_message = None;
            u.success_message = None;
        });
        inner.observer = Self::observe(self.ui_tx.clone(), repo);

        tracing::debug!(chain = %chain, "switched active chain");
    }

    /// 连接当前选中链的钱包
    pub async fn connect(&self) -> Result<String, WalletError> {
        let repo = self.active_repository().await;

        self.ui_tx.send_modify(|u| {
            u.is_loading = true;
            u.error_message = None;
            u.success_message = None;
        });

        match repo.connect().await {
            Ok(address) => {
                self.ui_tx.send_modify(|u| {
                    u.is_loading = false;
                    u.success_message = Some(format!(
                        "Connected: {}",
                        string_utils::shorten_address(&address)
                    ));
                });
                Ok(address)
            }
            Err(e) => {
                self.ui_tx.send_modify(|u| {
                    u.is_loading = false;
                    u.error_message = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// 断开当前钱包
    pub async fn disconnect(&self) {
        let repo = self.active_repository().await;
        repo.disconnect().await;

        self.ui_tx.send_modify(|u| {
            u.success_message = Some("Wallet disconnected".to_string());
            u.error_message = None;
        });
    }

    /// 用当前钱包对信用分签名
    pub async fn sign_credit_score(&self, score: &str) -> SigningResult {
        let repo = self.active_repository().await;

        self.ui_tx.send_modify(|u| {
            u.is_loading = true;
            u.error_message = None;
        });

        let result = repo.sign_credit_score(score).await;

        self.ui_tx.send_modify(|u| {
            u.is_loading = false;
            u.last_signing_result = Some(result.clone());
            u.success_message = match &result {
                SigningResult::Success { .. } => Some("Score signed successfully".to_string()),
                _ => None,
            };
            u.error_message = match &result {
                SigningResult::Error { message } => Some(message.clone()),
                SigningResult::Cancelled => Some("Signing was cancelled".to_string()),
                SigningResult::Success { .. } => None,
            };
        });

        result
    }

    /// 手动输入地址（深链接往返不可用时的兜底入口）。
    /// 格式校验失败只写入错误提示，不触达仓库。
    pub async fn set_address_manually(&self, address: &str) {
        let address = address.trim();

        if string_utils::is_blank(address) {
            self.ui_tx.send_modify(|u| {
                u.error_message = Some("Please enter a valid wallet address".to_string());
            });
            return;
        }

        let (chain, repo) = {
            let inner = self.inner.lock().await;
            (inner.selected, self.repositories[&inner.selected].clone())
        };

        if !AddressValidator::validate(chain, address) {
            let display = network_profile::from_id(chain).display_name;
            self.ui_tx.send_modify(|u| {
                u.error_message = Some(format!("Invalid {} address format", display));
            });
            return;
        }

        repo.set_address_manually(address, None).await;

        self.ui_tx.send_modify(|u| {
            u.success_message = Some(format!(
                "Connected: {}",
                string_utils::shorten_address(address)
            ));
            u.error_message = None;
        });
    }

    /// 当前链是否检测到可用钱包应用
    pub async fn is_wallet_installed(&self) -> bool {
        self.active_repository().await.is_wallet_installed()
    }

    /// 当前链的已连接地址
    pub async fn connected_address(&self) -> Option<String> {
        self.active_repository().await.connected_address()
    }

    pub fn clear_error(&self) {
        self.ui_tx.send_modify(|u| u.error_message = None);
    }

    pub fn clear_success(&self) {
        self.ui_tx.send_modify(|u| u.success_message = None);
    }
}
