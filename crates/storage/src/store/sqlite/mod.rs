#![forbid(unsafe_code)]

mod rows;
mod schema;

use super::{AppendOutcome, MemoStore, StoreError};
use crate::config::EngineConfig;
use mg_core::{Memo, MemoId, NodeId, VersionNode};
use rows::{
    NODE_COLUMNS, load_memo, load_node, map_write_error, memo_parents, node_in_memo, node_parents,
    read_node_row,
};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const DB_FILENAME: &str = "memograph.db";

/// SQLite-backed store. One connection, serialized through a mutex; pointer
/// moves run inside `BEGIN IMMEDIATE` so separate processes sharing the file
/// also serialize.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(storage_dir, &EngineConfig::default())
    }

    pub fn open_with_config(
        storage_dir: impl AsRef<Path>,
        config: &EngineConfig,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILENAME))?;
        let store = Self::prepare(conn, config)?;
        Ok(Self {
            storage_dir: Some(storage_dir),
            ..store
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::prepare(Connection::open_in_memory()?, &EngineConfig::default())
    }

    fn prepare(conn: Connection, config: &EngineConfig) -> Result<Self, StoreError> {
        conn.busy_timeout(config.sqlite_busy_timeout())?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn, mg_core::time::now_ms())?;

        Ok(Self {
            conn: Mutex::new(conn),
            storage_dir: None,
        })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

impl MemoStore for SqliteStore {
    fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError> {
        let conn = self.lock()?;
        load_memo(&conn, id.as_str())
    }

    fn put_memo(&self, memo: &Memo) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let root_node_id = match load_memo(&tx, memo.id().as_str())? {
            Some(existing) => existing.root_node_id().clone(),
            None => memo.root_node_id().clone(),
        };
        for pointer in [&root_node_id, memo.current_node_id()] {
            if !node_in_memo(&tx, pointer.as_str(), memo.id().as_str())? {
                return Err(StoreError::InvalidInput(
                    "memo pointer must name a node of the memo",
                ));
            }
        }
        tx.execute(
            r#"
            INSERT INTO memos(id, root_node_id, current_node_id, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
              current_node_id=excluded.current_node_id,
              updated_at_ms=MAX(memos.updated_at_ms, excluded.updated_at_ms)
            "#,
            params![
                memo.id().as_str(),
                memo.root_node_id().as_str(),
                memo.current_node_id().as_str(),
                memo.created_at_ms(),
                memo.updated_at_ms(),
            ],
        )
        .map_err(map_write_error)?;
        tx.commit()?;
        Ok(())
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<VersionNode>, StoreError> {
        let conn = self.lock()?;
        load_node(&conn, id.as_str())
    }

    fn put_node(&self, node: &VersionNode) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        rows::insert_node(&tx, node)?;
        tx.commit()?;
        Ok(())
    }

    fn find_nodes_by_memo(&self, memo_id: &MemoId) -> Result<Vec<VersionNode>, StoreError> {
        let conn = self.lock()?;
        let mut parents = memo_parents(&conn, memo_id.as_str())?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM memo_nodes WHERE memo_id=?1 ORDER BY version ASC"
        ))?;
        let mut rows = stmt.query(params![memo_id.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let raw = read_node_row(row)?;
            let node_parents = parents.remove(&raw.id).unwrap_or_default();
            out.push(raw.into_node(node_parents)?);
        }
        Ok(out)
    }

    fn find_memos_by_user(&self, user_id: &str) -> Result<BTreeSet<MemoId>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT memo_id FROM memo_nodes \
             WHERE sender_id=?1 OR recipient_id=?1 OR assigned_to_id=?1",
        )?;
        let mut rows = stmt.query(params![user_id])?;
        let mut out = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let raw = row.get::<_, String>(0)?;
            let id = MemoId::try_new(raw.clone())
                .map_err(|err| StoreError::Corrupt(format!("memo id {raw:?}: {err}")))?;
            out.insert(id);
        }
        Ok(out)
    }

    fn find_node_by_version(
        &self,
        memo_id: &MemoId,
        version: u32,
    ) -> Result<Option<VersionNode>, StoreError> {
        let conn = self.lock()?;
        let id = conn
            .query_row(
                "SELECT id FROM memo_nodes WHERE memo_id=?1 AND version=?2",
                params![memo_id.as_str(), i64::from(version)],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match id {
            Some(id) => load_node(&conn, &id),
            None => Ok(None),
        }
    }

    fn find_children(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<Vec<VersionNode>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM memo_nodes \
             WHERE memo_id=?1 AND id IN (SELECT node_id FROM memo_node_parents WHERE parent_id=?2) \
             ORDER BY version ASC, created_at_ms ASC, id ASC"
        ))?;
        let mut rows = stmt.query(params![memo_id.as_str(), node_id.as_str()])?;
        let mut raw_rows = Vec::new();
        while let Some(row) = rows.next()? {
            raw_rows.push(read_node_row(row)?);
        }

        raw_rows
            .into_iter()
            .map(|raw| {
                let parents = node_parents(&conn, &raw.id)?;
                raw.into_node(parents)
            })
            .collect()
    }

    fn create_memo(&self, memo: &Memo, root: &VersionNode) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        rows::insert_node(&tx, root)?;
        tx.execute(
            "INSERT INTO memos(id, root_node_id, current_node_id, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                memo.id().as_str(),
                memo.root_node_id().as_str(),
                memo.current_node_id().as_str(),
                memo.created_at_ms(),
                memo.updated_at_ms(),
            ],
        )
        .map_err(map_write_error)?;
        tx.commit()?;
        Ok(())
    }

    fn append_node(
        &self,
        node: &VersionNode,
        expected_current: &NodeId,
        updated_at_ms: i64,
    ) -> Result<AppendOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(memo) = load_memo(&tx, node.memo_id().as_str())? else {
            return Err(StoreError::UnknownId);
        };
        if memo.current_node_id() != expected_current {
            return Ok(AppendOutcome::Conflict);
        }

        match rows::insert_node(&tx, node) {
            Ok(()) => {}
            Err(StoreError::DuplicateVersion { .. }) => return Ok(AppendOutcome::Conflict),
            Err(err) => return Err(err),
        }

        let advanced = memo.advanced_to(node.id().clone(), updated_at_ms);
        let changed = tx.execute(
            "UPDATE memos SET current_node_id=?2, updated_at_ms=?3 \
             WHERE id=?1 AND current_node_id=?4",
            params![
                advanced.id().as_str(),
                advanced.current_node_id().as_str(),
                advanced.updated_at_ms(),
                expected_current.as_str(),
            ],
        )?;
        if changed == 0 {
            return Ok(AppendOutcome::Conflict);
        }

        tx.commit()?;
        Ok(AppendOutcome::Appended(advanced))
    }
}
