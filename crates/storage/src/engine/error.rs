#![forbid(unsafe_code)]

use crate::store::StoreError;
use mg_core::NodeError;

/// Coarse failure classes surfaced to callers of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    WriteConflict,
    StorageUnavailable,
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(String),
    InvalidOperation(&'static str),
    WriteConflict { memo_id: String, attempts: u32 },
    StorageUnavailable(StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::WriteConflict { .. } => ErrorKind::WriteConflict,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::WriteConflict => "WRITE_CONFLICT",
            ErrorKind::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }

    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidOperation(message) => write!(f, "invalid operation: {message}"),
            Self::WriteConflict { memo_id, attempts } => {
                write!(f, "write conflict on memo {memo_id} after {attempts} attempts")
            }
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UnknownId => Self::NotFound("memo".to_string()),
            other => Self::StorageUnavailable(other),
        }
    }
}

/// A node the engine built from stored state failed validation; the stored
/// graph is not what it should be.
impl From<NodeError> for EngineError {
    fn from(value: NodeError) -> Self {
        Self::StorageUnavailable(StoreError::Corrupt(value.message().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_map_to_storage_unavailable() {
        let err = EngineError::from(StoreError::Unavailable("disk gone".to_string()));
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn unknown_id_maps_to_not_found() {
        let err = EngineError::from(StoreError::UnknownId);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn conflict_reports_attempts() {
        let err = EngineError::WriteConflict {
            memo_id: "m1".to_string(),
            attempts: 3,
        };
        assert_eq!(err.code(), "WRITE_CONFLICT");
        assert_eq!(err.to_string(), "write conflict on memo m1 after 3 attempts");
    }
}
