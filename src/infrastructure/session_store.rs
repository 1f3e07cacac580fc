//! 会话持久化
//!
//! 按链隔离的键值存储：两条链各有独立命名空间，互不竞争。
//! 提供内存实现（测试/临时）和 JSON 文件实现（每链一个文件）。

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::connection::Session;
use crate::domain::network_profile::ChainId;

/// 链作用域的会话存储
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, chain: ChainId) -> Result<Option<Session>>;
    async fn save(&self, chain: ChainId, session: &Session) -> Result<()>;
    async fn clear(&self, chain: ChainId) -> Result<()>;
}

/// 内存会话存储
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<HashMap<ChainId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条会话（测试恢复路径用）
    pub async fn seed(&self, chain: ChainId, session: Session) {
        self.inner.write().await.insert(chain, session);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, chain: ChainId) -> Result<Option<Session>> {
        Ok(self.inner.read().await.get(&chain).cloned())
    }

    async fn save(&self, chain: ChainId, session: &Session) -> Result<()> {
        self.inner.write().await.insert(chain, session.clone());
        Ok(())
    }

    async fn clear(&self, chain: ChainId) -> Result<()> {
        self.inner.write().await.remove(&chain);
        Ok(())
    }
}

/// JSON 文件会话存储，每链一个文件：`<chain>_wallet_session.json`
pub struct JsonFileSessionStore {
    dir: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, chain: ChainId) -> PathBuf {
        self.dir.join(format!("{}_wallet_session.json", chain))
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn load(&self, chain: ChainId) -> Result<Option<Session>> {
        let path = self.path_for(chain);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let session = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt session record: {:?}", path))?;
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read session record: {:?}", path)),
        }
    }

    async fn save(&self, chain: ChainId, session: &Session) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create session dir: {:?}", self.dir))?;

        let path = self.path_for(chain);
        let bytes = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write session record: {:?}", path))?;
        Ok(())
    }

    async fn clear(&self, chain: ChainId) -> Result<()> {
        let path = self.path_for(chain);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to clear session record: {:?}", path))
            }
        }
    }
}
