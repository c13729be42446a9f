#![forbid(unsafe_code)]

use super::super::StoreError;
use mg_core::{ActionType, Memo, MemoId, MemoStatus, Metadata, NodeId, NodeParts, VersionNode};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::collections::HashMap;

pub(super) const NODE_COLUMNS: &str = "id, memo_id, version, title, content, status, sender_id, \
     recipient_id, assigned_to_id, action_type, action_by_id, action_comment, metadata_json, \
     created_at_ms";

#[derive(Debug)]
pub(super) struct NodeRow {
    pub(super) id: String,
    memo_id: String,
    version: i64,
    title: String,
    content: String,
    status: String,
    sender_id: String,
    recipient_id: String,
    assigned_to_id: Option<String>,
    action_type: String,
    action_by_id: String,
    action_comment: Option<String>,
    metadata_json: String,
    created_at_ms: i64,
}

pub(super) fn read_node_row(row: &Row<'_>) -> Result<NodeRow, StoreError> {
    Ok(NodeRow {
        id: row.get(0)?,
        memo_id: row.get(1)?,
        version: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        sender_id: row.get(6)?,
        recipient_id: row.get(7)?,
        assigned_to_id: row.get(8)?,
        action_type: row.get(9)?,
        action_by_id: row.get(10)?,
        action_comment: row.get(11)?,
        metadata_json: row.get(12)?,
        created_at_ms: row.get(13)?,
    })
}

impl NodeRow {
    pub(super) fn into_node(self, parents: Vec<String>) -> Result<VersionNode, StoreError> {
        let corrupt = |what: &str| StoreError::Corrupt(format!("node {}: invalid {what}", self.id));

        let version = u32::try_from(self.version).map_err(|_| corrupt("version"))?;
        let status = MemoStatus::parse(&self.status).ok_or_else(|| corrupt("status"))?;
        let action_type =
            ActionType::parse(&self.action_type).ok_or_else(|| corrupt("action_type"))?;
        let metadata = serde_json::from_str::<Metadata>(&self.metadata_json)?;
        let id = NodeId::try_new(self.id.clone()).map_err(|_| corrupt("id"))?;
        let memo_id = MemoId::try_new(self.memo_id).map_err(|_| corrupt("memo_id"))?;
        let parent_node_ids = parents
            .into_iter()
            .map(NodeId::try_new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| corrupt("parent id"))?;

        VersionNode::from_parts(NodeParts {
            id,
            memo_id,
            version,
            title: self.title,
            content: self.content,
            status,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            assigned_to_id: self.assigned_to_id,
            action_type,
            action_by_id: self.action_by_id,
            action_comment: self.action_comment,
            parent_node_ids,
            metadata,
            created_at_ms: self.created_at_ms,
        })
        .map_err(|err| StoreError::Corrupt(format!("node {}: {err}", self.id)))
    }
}

pub(super) fn load_node(conn: &Connection, id: &str) -> Result<Option<VersionNode>, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {NODE_COLUMNS} FROM memo_nodes WHERE id=?1"),
            params![id],
            |row| Ok(read_node_row(row)),
        )
        .optional()?
        .transpose()?;

    match raw {
        Some(raw) => {
            let parents = node_parents(conn, &raw.id)?;
            Ok(Some(raw.into_node(parents)?))
        }
        None => Ok(None),
    }
}

pub(super) fn node_in_memo(
    conn: &Connection,
    node_id: &str,
    memo_id: &str,
) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM memo_nodes WHERE id=?1 AND memo_id=?2",
            params![node_id, memo_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub(super) fn node_parents(conn: &Connection, node_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT parent_id FROM memo_node_parents WHERE node_id=?1 ORDER BY ordinal ASC")?;
    let mut rows = stmt.query(params![node_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, String>(0)?);
    }
    Ok(out)
}

/// Ordered parent lists of every node of a memo, keyed by node id.
pub(super) fn memo_parents(
    conn: &Connection,
    memo_id: &str,
) -> Result<HashMap<String, Vec<String>>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT p.node_id, p.parent_id \
         FROM memo_node_parents p JOIN memo_nodes n ON n.id = p.node_id \
         WHERE n.memo_id=?1 \
         ORDER BY p.node_id ASC, p.ordinal ASC",
    )?;
    let mut rows = stmt.query(params![memo_id])?;
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        out.entry(row.get::<_, String>(0)?)
            .or_default()
            .push(row.get::<_, String>(1)?);
    }
    Ok(out)
}

pub(super) fn load_memo(conn: &Connection, id: &str) -> Result<Option<Memo>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, root_node_id, current_node_id, created_at_ms, updated_at_ms \
             FROM memos WHERE id=?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, root_node_id, current_node_id, created_at_ms, updated_at_ms)) = row else {
        return Ok(None);
    };
    let corrupt = |what: &str| StoreError::Corrupt(format!("memo {id}: invalid {what}"));
    Ok(Some(Memo::from_parts(
        MemoId::try_new(id.clone()).map_err(|_| corrupt("id"))?,
        NodeId::try_new(root_node_id).map_err(|_| corrupt("root_node_id"))?,
        NodeId::try_new(current_node_id).map_err(|_| corrupt("current_node_id"))?,
        created_at_ms,
        updated_at_ms,
    )))
}

pub(super) fn insert_node(conn: &Connection, node: &VersionNode) -> Result<(), StoreError> {
    let metadata_json = serde_json::to_string(node.metadata())?;
    conn.execute(
        &format!(
            "INSERT INTO memo_nodes({NODE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            node.id().as_str(),
            node.memo_id().as_str(),
            i64::from(node.version()),
            node.title(),
            node.content(),
            node.status().as_str(),
            node.sender_id(),
            node.recipient_id(),
            node.assigned_to_id(),
            node.action_type().as_str(),
            node.action_by_id(),
            node.action_comment(),
            metadata_json,
            node.created_at_ms(),
        ],
    )
    .map_err(|err| map_node_insert_error(err, node))?;

    for (ordinal, parent) in node.parent_node_ids().iter().enumerate() {
        let ordinal = i64::try_from(ordinal)
            .map_err(|_| StoreError::InvalidInput("numeric overflow"))?;
        conn.execute(
            "INSERT INTO memo_node_parents(node_id, ordinal, parent_id) VALUES (?1, ?2, ?3)",
            params![node.id().as_str(), ordinal, parent.as_str()],
        )
        .map_err(map_write_error)?;
    }
    Ok(())
}

fn map_node_insert_error(err: rusqlite::Error, node: &VersionNode) -> StoreError {
    if constraint_message(&err).is_some_and(|message| message.contains("memo_nodes.version")) {
        return StoreError::DuplicateVersion {
            memo_id: node.memo_id().to_string(),
            version: node.version(),
        };
    }
    map_write_error(err)
}

pub(super) fn map_write_error(err: rusqlite::Error) -> StoreError {
    match constraint_message(&err) {
        Some(message) if message.contains("FOREIGN KEY") => {
            StoreError::InvalidInput("referenced node is missing")
        }
        Some(message)
            if message.contains("UNIQUE constraint failed")
                || message.contains("PRIMARY KEY constraint failed") =>
        {
            StoreError::AlreadyExists
        }
        _ => StoreError::Sql(err),
    }
}

fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(code, message) if code.code == ErrorCode::ConstraintViolation => {
            Some(message.as_deref().unwrap_or(""))
        }
        _ => None,
    }
}
