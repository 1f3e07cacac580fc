//! 测试辅助模块
//! 提供壳层协作方的测试替身和通用构造函数

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use credpos_wallet::config::Config;
use credpos_wallet::domain::{ChainId, Session};
use credpos_wallet::infrastructure::{AppLauncher, SessionStore};
use credpos_wallet::service::{CallbackCorrelator, ChainRepository};

/// 可编程的启动器替身：记录唤起的 URI，可配置安装集与启动失败
pub struct FakeLauncher {
    installed: HashSet<String>,
    resolvable: HashSet<String>,
    fail_launch: AtomicBool,
    launched: Mutex<Vec<String>>,
}

impl FakeLauncher {
    pub fn with_installed(app_ids: &[&str]) -> Self {
        Self {
            installed: app_ids.iter().map(|s| s.to_string()).collect(),
            resolvable: HashSet::new(),
            fail_launch: AtomicBool::new(false),
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn nothing_installed() -> Self {
        Self::with_installed(&[])
    }

    /// 钱包已安装但系统层启动失败
    pub fn failing(app_ids: &[&str]) -> Self {
        let launcher = Self::with_installed(app_ids);
        launcher.fail_launch.store(true, Ordering::SeqCst);
        launcher
    }

    pub fn launched_uris(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppLauncher for FakeLauncher {
    fn is_app_installed(&self, app_id: &str) -> bool {
        self.installed.contains(app_id)
    }

    fn can_resolve_scheme(&self, scheme: &str) -> bool {
        self.resolvable.contains(scheme)
    }

    async fn launch(&self, uri: &str) -> Result<()> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(anyhow!("no activity found for intent"));
        }
        self.launched.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}

/// 读正常、写/清失败的存储替身
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn load(&self, _chain: ChainId) -> Result<Option<Session>> {
        Ok(None)
    }

    async fn save(&self, _chain: ChainId, _session: &Session) -> Result<()> {
        Err(anyhow!("storage unavailable"))
    }

    async fn clear(&self, _chain: ChainId) -> Result<()> {
        Err(anyhow!("storage unavailable"))
    }
}

/// 测试配置：可调超时，RPC 超时压短
pub fn test_config(connection_timeout_secs: u64, signing_timeout_secs: u64) -> Arc<Config> {
    let mut config = Config::default();
    config.wallet.connection_timeout_secs = connection_timeout_secs;
    config.wallet.signing_timeout_secs = signing_timeout_secs;
    config.wallet.rpc_timeout_secs = 2;
    Arc::new(config)
}

pub async fn build_repo(
    chain: ChainId,
    config: Arc<Config>,
    correlator: Arc<CallbackCorrelator>,
    launcher: Arc<FakeLauncher>,
    store: Arc<dyn SessionStore>,
) -> Arc<ChainRepository> {
    Arc::new(ChainRepository::new(chain, config, correlator, launcher, store).await)
}

/// 等待启动器记录到第一次唤起并返回该 URI
pub async fn wait_for_launch(launcher: &FakeLauncher) -> String {
    for _ in 0..200 {
        if let Some(uri) = launcher.launched_uris().first().cloned() {
            return uri;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("wallet launch was never observed");
}

pub fn session(address: &str, public_key: Option<&str>) -> Session {
    Session {
        address: address.into(),
        public_key: public_key.map(str::to_string),
        session_id: "test-session".into(),
    }
}
