#![forbid(unsafe_code)]

//! The version graph engine: every read and write of memos goes through here.
//!
//! Writes are read-compute-swap loops against [`MemoStore::append_node`]. A
//! losing writer rebuilds its node on the new current version and tries again,
//! up to `max_write_retries` extra times.

mod clock;
mod error;
mod read;
mod view;
mod write;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, ErrorKind};

use crate::config::EngineConfig;
use crate::store::MemoStore;
use mg_core::{Memo, MemoId, NodeId, VersionNode};
use std::sync::Arc;

pub struct MemoEngine<S: MemoStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<S: MemoStore> MemoEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load_memo(&self, memo_id: &MemoId) -> Result<Memo, EngineError> {
        self.store
            .get_memo(memo_id)?
            .ok_or_else(|| EngineError::not_found(format_args!("memo {memo_id}")))
    }

    /// Resolves `node_id` and checks that it belongs to `memo_id`.
    fn load_node(&self, memo_id: &MemoId, node_id: &NodeId) -> Result<VersionNode, EngineError> {
        match self.store.get_node(node_id)? {
            Some(node) if node.memo_id() == memo_id => Ok(node),
            _ => Err(EngineError::not_found(format_args!(
                "node {node_id} (memo={memo_id})"
            ))),
        }
    }

    fn load_nodes(&self, memo_id: &MemoId) -> Result<Vec<VersionNode>, EngineError> {
        Ok(self.store.find_nodes_by_memo(memo_id)?)
    }
}

impl<S: MemoStore> std::fmt::Debug for MemoEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
