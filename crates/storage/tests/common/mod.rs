#![allow(dead_code)]

use mg_core::NewMemo;
use mg_storage::{EngineConfig, ManualClock, MemoEngine, MemoStore, MemoryStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

pub type Engine = MemoEngine<Arc<dyn MemoStore>>;

pub fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("mg_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn q3_draft() -> NewMemo {
    NewMemo::new("Q3 report", "draft body", "alice", "bob")
}

/// One engine per store backend, each driven by its own manual clock.
pub struct Backend {
    pub name: &'static str,
    pub engine: Engine,
    pub clock: Arc<ManualClock>,
}

pub fn backends(test_name: &str) -> Vec<Backend> {
    backends_with_config(test_name, EngineConfig::default())
}

pub fn backends_with_config(test_name: &str, config: EngineConfig) -> Vec<Backend> {
    init_tracing();

    let memory: Arc<dyn MemoStore> = Arc::new(MemoryStore::new());
    let sqlite: Arc<dyn MemoStore> = Arc::new(
        SqliteStore::open_with_config(temp_dir(test_name), &config).expect("open sqlite store"),
    );

    [("memory", memory), ("sqlite", sqlite)]
        .into_iter()
        .map(|(name, store)| {
            let clock = Arc::new(ManualClock::new(1_000));
            let engine = MemoEngine::with_config(store, config.clone()).with_clock(clock.clone());
            Backend {
                name,
                engine,
                clock,
            }
        })
        .collect()
}
