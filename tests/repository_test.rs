//! ChainRepository 集成测试
//!
//! 覆盖连接状态机全部迁移路径：会话恢复、未安装钱包、启动失败、
//! 回调往返、超时、签名窗口和手动地址。

mod common;

use std::sync::Arc;

use credpos_wallet::domain::{ChainId, ConnectionState, SigningResult};
use credpos_wallet::infrastructure::{MemorySessionStore, SessionStore};
use credpos_wallet::service::CallbackCorrelator;
use credpos_wallet::WalletError;

use common::{
    build_repo, session, test_config, wait_for_launch, FailingSessionStore, FakeLauncher,
};

#[tokio::test]
async fn test_restored_session_yields_connected_without_launch() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());
    store
        .seed(ChainId::Tezos, session("tz1abc", Some("pk1")))
        .await;

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator,
        launcher.clone(),
        store,
    )
    .await;

    assert_eq!(
        repo.current_state(),
        ConnectionState::Connected {
            address: "tz1abc".into(),
            public_key: Some("pk1".into()),
        }
    );
    assert!(launcher.launched_uris().is_empty());
}

#[tokio::test]
async fn test_connect_without_wallet_installed() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::nothing_installed());
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator,
        launcher.clone(),
        store,
    )
    .await;

    let err = repo.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::NotInstalled(_)));
    assert_eq!(
        repo.current_state(),
        ConnectionState::Error {
            message: "No Tezos wallet installed".into(),
        }
    );
    // 未尝试任何启动
    assert!(launcher.launched_uris().is_empty());
}

#[tokio::test]
async fn test_connect_round_trip_via_callback() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator.clone(),
        launcher.clone(),
        store.clone(),
    )
    .await;

    let dispatcher = {
        let correlator = correlator.clone();
        let launcher = launcher.clone();
        tokio::spawn(async move {
            let uri = wait_for_launch(&launcher).await;
            assert!(uri.starts_with("tezos://?type=tzip10&data="));
            assert!(uri.ends_with("&callback=credpos://callback"));
            assert!(correlator.dispatch("credpos://callback?address=tz1xyz&publicKey=edpkXYZ"));
        })
    };

    let address = repo.connect().await.unwrap();
    assert_eq!(address, "tz1xyz");
    assert_eq!(
        repo.current_state(),
        ConnectionState::Connected {
            address: "tz1xyz".into(),
            public_key: Some("edpkXYZ".into()),
        }
    );

    // 会话已持久化，session_id 为本次连接生成
    let saved = store.load(ChainId::Tezos).await.unwrap().unwrap();
    assert_eq!(saved.address, "tz1xyz");
    assert_eq!(saved.public_key.as_deref(), Some("edpkXYZ"));
    assert!(!saved.session_id.is_empty());

    dispatcher.await.unwrap();
}

#[tokio::test]
async fn test_connect_remote_error_via_callback() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator.clone(),
        launcher.clone(),
        store,
    )
    .await;

    let dispatcher = {
        let correlator = correlator.clone();
        let launcher = launcher.clone();
        tokio::spawn(async move {
            wait_for_launch(&launcher).await;
            assert!(correlator.dispatch("credpos://callback?error=user%20rejected"));
        })
    };

    let err = repo.connect().await.unwrap_err();
    assert_eq!(err, WalletError::RemoteError("user rejected".into()));
    assert_eq!(
        repo.current_state(),
        ConnectionState::Error {
            message: "user rejected".into(),
        }
    );

    dispatcher.await.unwrap();
}

#[tokio::test]
async fn test_connect_launch_failure_cancels_slot() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::failing(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator.clone(),
        launcher,
        store,
    )
    .await;

    let err = repo.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::LaunchFailure(_)));
    assert_eq!(
        repo.current_state(),
        ConnectionState::Error {
            message: "Failed to open wallet".into(),
        }
    );
    // 槽已清理
    assert!(!*correlator.pending_connection(ChainId::Tezos).borrow());
}

#[tokio::test]
async fn test_connect_timeout() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    // 超时设为 0：唤起成功但没有任何回调到达
    let repo = build_repo(
        ChainId::Tezos,
        test_config(0, 5),
        correlator.clone(),
        launcher,
        store,
    )
    .await;

    let err = repo.connect().await.unwrap_err();
    assert_eq!(err, WalletError::Timeout);
    assert_eq!(
        repo.current_state(),
        ConnectionState::Error {
            message: "Connection timed out".into(),
        }
    );

    // 超时后槽已清空：迟到的回调被识别但无人接收，状态不变
    assert!(correlator.dispatch("credpos://callback?address=tz1late"));
    assert_eq!(
        repo.current_state(),
        ConnectionState::Error {
            message: "Connection timed out".into(),
        }
    );
}

#[tokio::test]
async fn test_connect_is_idempotent_when_connected() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator,
        launcher.clone(),
        store,
    )
    .await;

    repo.set_address_manually("tz1abc", Some("pk1")).await;

    let address = repo.connect().await.unwrap();
    assert_eq!(address, "tz1abc");
    assert!(launcher.launched_uris().is_empty());
}

#[tokio::test]
async fn test_set_address_manually_round_trip() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::nothing_installed());
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Sui,
        test_config(5, 5),
        correlator,
        launcher,
        store.clone(),
    )
    .await;

    repo.set_address_manually("0xabc", None).await;

    assert_eq!(repo.connected_address().as_deref(), Some("0xabc"));
    assert_eq!(
        repo.current_state(),
        ConnectionState::Connected {
            address: "0xabc".into(),
            public_key: None,
        }
    );
    assert!(store.load(ChainId::Sui).await.unwrap().is_some());
}

#[tokio::test]
async fn test_disconnect_swallows_storage_errors() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::nothing_installed());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator,
        launcher,
        Arc::new(FailingSessionStore),
    )
    .await;

    // 写失败被吞掉，状态照常迁移
    repo.set_address_manually("tz1abc", None).await;
    assert!(repo.current_state().is_connected());

    repo.disconnect().await;
    assert_eq!(repo.current_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_clears_persisted_session() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::nothing_installed());
    let store = Arc::new(MemorySessionStore::new());
    store.seed(ChainId::Tezos, session("tz1abc", None)).await;

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator,
        launcher,
        store.clone(),
    )
    .await;

    repo.disconnect().await;
    assert_eq!(repo.current_state(), ConnectionState::Disconnected);
    assert!(store.load(ChainId::Tezos).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_requires_connection() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator,
        launcher.clone(),
        store,
    )
    .await;

    let result = repo.sign_credit_score("720").await;
    assert_eq!(
        result,
        SigningResult::Error {
            message: "Wallet not connected".into(),
        }
    );
    // 未构造载荷、未尝试启动
    assert!(launcher.launched_uris().is_empty());
}

#[tokio::test]
async fn test_sign_receives_real_signature_within_window() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.temple.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Tezos,
        test_config(5, 5),
        correlator.clone(),
        launcher.clone(),
        store,
    )
    .await;
    repo.set_address_manually("tz1abc", None).await;

    let dispatcher = {
        let correlator = correlator.clone();
        let launcher = launcher.clone();
        tokio::spawn(async move {
            let uri = wait_for_launch(&launcher).await;
            assert!(uri.starts_with("tezos://?type=sign&data="));
            assert!(correlator.dispatch("credpos://callback?signature=edsigXYZ"));
        })
    };

    match repo.sign_credit_score("720").await {
        SigningResult::Success { signature, hash } => {
            assert_eq!(signature, "edsigXYZ");
            let hash = hash.expect("local fingerprint always present");
            assert_eq!(hash.len(), 64);
        }
        other => panic!("expected success, got {:?}", other),
    }

    dispatcher.await.unwrap();
}

#[tokio::test]
async fn test_sign_timeout_returns_placeholder() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.suiet.app"]));
    let store = Arc::new(MemorySessionStore::new());

    // 签名窗口 0：钱包不回跳
    let repo = build_repo(
        ChainId::Sui,
        test_config(5, 0),
        correlator,
        launcher,
        store,
    )
    .await;
    repo.set_address_manually("0xabc", None).await;

    match repo.sign_credit_score("720").await {
        SigningResult::Success { signature, hash } => {
            assert!(signature.starts_with("0xPending_"));
            assert_eq!(hash.expect("fingerprint").len(), 64);
        }
        other => panic!("expected provisional success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sui_connect_prefers_suiet_scheme() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["io.suiet.app"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Sui,
        test_config(5, 5),
        correlator.clone(),
        launcher.clone(),
        store,
    )
    .await;

    let dispatcher = {
        let correlator = correlator.clone();
        let launcher = launcher.clone();
        tokio::spawn(async move {
            let uri = wait_for_launch(&launcher).await;
            assert!(uri.starts_with("suiet://connect?data="));
            assert!(uri.ends_with("&callback=credpos://sui-callback"));
            assert!(correlator.dispatch("credpos://sui-callback?address=0xabc"));
        })
    };

    assert_eq!(repo.connect().await.unwrap(), "0xabc");
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn test_sui_connect_default_scheme_for_other_wallets() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::with_installed(&["app.ethos.wallet"]));
    let store = Arc::new(MemorySessionStore::new());

    let repo = build_repo(
        ChainId::Sui,
        test_config(5, 5),
        correlator.clone(),
        launcher.clone(),
        store,
    )
    .await;

    let dispatcher = {
        let correlator = correlator.clone();
        let launcher = launcher.clone();
        tokio::spawn(async move {
            let uri = wait_for_launch(&launcher).await;
            assert!(uri.starts_with("sui://connect?data="));
            assert!(correlator.dispatch("credpos://sui-callback?address=0xdef"));
        })
    };

    assert_eq!(repo.connect().await.unwrap(), "0xdef");
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn test_verify_connection_fails_open_on_unreachable_rpc() {
    let correlator = Arc::new(CallbackCorrelator::new("credpos"));
    let launcher = Arc::new(FakeLauncher::nothing_installed());
    let store = Arc::new(MemorySessionStore::new());

    let mut config = (*test_config(5, 5)).clone();
    config.wallet.tezos_rpc_url = Some("http://127.0.0.1:9".into());

    let repo = build_repo(
        ChainId::Tezos,
        Arc::new(config),
        correlator,
        launcher,
        store,
    )
    .await;

    // 未连接时直接 false
    assert!(!repo.verify_connection().await);

    repo.set_address_manually("tz1abc", None).await;
    // RPC 不可达：fail-open，会话保持有效
    assert!(repo.verify_connection().await);
}
