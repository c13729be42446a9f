#![forbid(unsafe_code)]

//! Persistence and write coordination for memo version graphs.
//!
//! [`MemoEngine`] is the entry point. It runs over any [`MemoStore`]: the
//! in-process [`MemoryStore`] or the file-backed [`SqliteStore`].

pub mod config;
pub mod engine;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Clock, EngineError, ErrorKind, ManualClock, MemoEngine, SystemClock};
pub use store::{AppendOutcome, MemoStore, MemoryStore, SqliteStore, StoreError};
