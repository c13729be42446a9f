#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};

pub(super) const SCHEMA_VERSION: i64 = 1;

const MEMO_TABLES: [&str; 4] = ["memo_state", "memos", "memo_nodes", "memo_node_parents"];

/// What an opened database file holds, as far as this store is concerned.
#[derive(Debug, PartialEq, Eq)]
enum SchemaState {
    Blank,
    Current,
    ForeignTable,
    PartialInstall,
    StateRowMissing,
    OtherVersion(i64),
}

impl SchemaState {
    fn inspect(conn: &Connection) -> Result<Self, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        if tables.is_empty() {
            return Ok(Self::Blank);
        }
        if tables.iter().any(|t| !MEMO_TABLES.contains(&t.as_str())) {
            return Ok(Self::ForeignTable);
        }
        if tables.len() < MEMO_TABLES.len() {
            return Ok(Self::PartialInstall);
        }

        let version = conn
            .query_row(
                "SELECT schema_version FROM memo_state WHERE singleton=1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(match version {
            None => Self::StateRowMissing,
            Some(SCHEMA_VERSION) => Self::Current,
            Some(other) => Self::OtherVersion(other),
        })
    }

    fn reset_reason(&self) -> Option<&'static str> {
        match self {
            Self::Blank | Self::Current => None,
            Self::ForeignTable => Some("RESET_REQUIRED: unsupported tables detected"),
            Self::PartialInstall => Some("RESET_REQUIRED: required table is missing"),
            Self::StateRowMissing => Some("RESET_REQUIRED: schema state row is missing"),
            Self::OtherVersion(_) => Some("RESET_REQUIRED: schema version mismatch"),
        }
    }
}

/// Refuses to open a database that holds anything but a blank file or the
/// current memo schema.
pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let state = SchemaState::inspect(conn)?;
    match state.reset_reason() {
        None => Ok(()),
        Some(reason) => {
            tracing::warn!(?state, "sqlite store refused to open");
            Err(StoreError::InvalidInput(reason))
        }
    }
}

pub(super) fn install_schema(conn: &Connection, now_ms: i64) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS memo_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS memo_nodes (
          id TEXT PRIMARY KEY,
          memo_id TEXT NOT NULL,
          version INTEGER NOT NULL CHECK(version > 0),
          title TEXT NOT NULL,
          content TEXT NOT NULL,
          status TEXT NOT NULL,
          sender_id TEXT NOT NULL,
          recipient_id TEXT NOT NULL,
          assigned_to_id TEXT,
          action_type TEXT NOT NULL,
          action_by_id TEXT NOT NULL,
          action_comment TEXT,
          metadata_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          UNIQUE(memo_id, version)
        );

        CREATE INDEX IF NOT EXISTS idx_memo_nodes_sender ON memo_nodes(sender_id);
        CREATE INDEX IF NOT EXISTS idx_memo_nodes_recipient ON memo_nodes(recipient_id);
        CREATE INDEX IF NOT EXISTS idx_memo_nodes_assignee ON memo_nodes(assigned_to_id);

        CREATE TABLE IF NOT EXISTS memo_node_parents (
          node_id TEXT NOT NULL,
          ordinal INTEGER NOT NULL,
          parent_id TEXT NOT NULL,
          PRIMARY KEY(node_id, ordinal),
          UNIQUE(node_id, parent_id),
          FOREIGN KEY(node_id) REFERENCES memo_nodes(id) ON DELETE RESTRICT,
          FOREIGN KEY(parent_id) REFERENCES memo_nodes(id) ON DELETE RESTRICT,
          CHECK(node_id <> parent_id)
        );

        CREATE INDEX IF NOT EXISTS idx_memo_node_parents_parent
          ON memo_node_parents(parent_id);

        CREATE TABLE IF NOT EXISTS memos (
          id TEXT PRIMARY KEY,
          root_node_id TEXT NOT NULL,
          current_node_id TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(root_node_id) REFERENCES memo_nodes(id) ON DELETE RESTRICT,
          FOREIGN KEY(current_node_id) REFERENCES memo_nodes(id) ON DELETE RESTRICT
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO memo_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_classifies_each_shape() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(SchemaState::inspect(&conn).unwrap(), SchemaState::Blank);

        install_schema(&conn, 1_000).unwrap();
        assert_eq!(SchemaState::inspect(&conn).unwrap(), SchemaState::Current);

        conn.execute("UPDATE memo_state SET schema_version=7", []).unwrap();
        assert_eq!(SchemaState::inspect(&conn).unwrap(), SchemaState::OtherVersion(7));

        conn.execute("DELETE FROM memo_state", []).unwrap();
        assert_eq!(SchemaState::inspect(&conn).unwrap(), SchemaState::StateRowMissing);

        conn.execute_batch("DROP TABLE memo_node_parents").unwrap();
        assert_eq!(SchemaState::inspect(&conn).unwrap(), SchemaState::PartialInstall);

        conn.execute_batch("CREATE TABLE notes(id TEXT)").unwrap();
        let state = SchemaState::inspect(&conn).unwrap();
        assert_eq!(state, SchemaState::ForeignTable);
        assert_eq!(
            state.reset_reason(),
            Some("RESET_REQUIRED: unsupported tables detected")
        );
    }
}
