#![forbid(unsafe_code)]

use super::{EngineError, MemoEngine};
use crate::store::{AppendOutcome, MemoStore};
use mg_core::time::Rfc3339Ms;
use mg_core::{
    AssignMemo, Memo, MemoId, MemoStatus, MutationIntent, NewMemo, NodeId, UpdateMemo,
    VersionNode,
};

impl<S: MemoStore> MemoEngine<S> {
    /// Allocates a memo and its version-1 root in one store call.
    pub fn create_memo(&self, draft: NewMemo) -> Result<Memo, EngineError> {
        let memo_id = MemoId::generate();
        let root = VersionNode::root(NodeId::generate(), memo_id, draft, self.clock.now_ms());
        let memo = Memo::new(&root);
        self.store.create_memo(&memo, &root)?;

        tracing::info!(
            memo_id = %memo.id(),
            node_id = %root.id(),
            sender_id = root.sender_id(),
            recipient_id = root.recipient_id(),
            at = %Rfc3339Ms(root.created_at_ms()),
            "memo created"
        );
        Ok(memo)
    }

    /// Builds a successor of the current version and swaps it in. A lost race
    /// is retried against the winner's node; the loop gives up with
    /// [`EngineError::WriteConflict`] once the retry budget is spent.
    pub fn append_version(
        &self,
        memo_id: &MemoId,
        intent: &MutationIntent,
        actor_id: &str,
    ) -> Result<Memo, EngineError> {
        let attempts = self.config.max_write_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let memo = self.load_memo(memo_id)?;
            let current = self.load_node(memo_id, memo.current_node_id())?;
            let now_ms = self.clock.now_ms();
            let node = intent.apply(&current, NodeId::generate(), actor_id, now_ms)?;

            match self.store.append_node(&node, current.id(), now_ms)? {
                AppendOutcome::Appended(memo) => {
                    tracing::info!(
                        memo_id = %memo_id,
                        node_id = %node.id(),
                        version = node.version(),
                        action = %node.action_type(),
                        actor_id,
                        attempt,
                        at = %Rfc3339Ms(now_ms),
                        "version appended"
                    );
                    return Ok(memo);
                }
                AppendOutcome::Conflict => {
                    tracing::debug!(
                        memo_id = %memo_id,
                        expected_current = %current.id(),
                        attempt,
                        "current pointer moved; retrying"
                    );
                }
            }
        }

        tracing::warn!(memo_id = %memo_id, attempts, "write retries exhausted");
        Err(EngineError::WriteConflict {
            memo_id: memo_id.to_string(),
            attempts,
        })
    }

    pub fn update_memo(
        &self,
        memo_id: &MemoId,
        update: UpdateMemo,
        actor_id: &str,
    ) -> Result<Memo, EngineError> {
        self.append_version(memo_id, &MutationIntent::Update(update), actor_id)
    }

    /// Records an assignment by `assigned_by_id`; the memo moves to IN_PROGRESS.
    pub fn assign_memo(&self, memo_id: &MemoId, assign: AssignMemo) -> Result<Memo, EngineError> {
        let intent = MutationIntent::Assign {
            assigned_to_id: assign.assigned_to_id,
            comment: assign.comment,
        };
        self.append_version(memo_id, &intent, &assign.assigned_by_id)
    }

    pub fn change_status(
        &self,
        memo_id: &MemoId,
        status: MemoStatus,
        actor_id: &str,
    ) -> Result<Memo, EngineError> {
        self.append_version(memo_id, &MutationIntent::ChangeStatus { status }, actor_id)
    }

    pub fn comment_memo(
        &self,
        memo_id: &MemoId,
        comment: impl Into<String>,
        actor_id: &str,
    ) -> Result<Memo, EngineError> {
        let intent = MutationIntent::Comment {
            comment: comment.into(),
        };
        self.append_version(memo_id, &intent, actor_id)
    }
}
