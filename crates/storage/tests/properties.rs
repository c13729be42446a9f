mod common;

use common::q3_draft;
use mg_core::{AssignMemo, MemoStatus, UpdateMemo};
use mg_storage::{ManualClock, MemoEngine, MemoryStore};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Op {
    Retitle(String),
    Assign(String),
    Status(MemoStatus),
    Comment(String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Op::Retitle),
        "[a-z]{1,8}".prop_map(Op::Assign),
        proptest::sample::select(MemoStatus::ALL.to_vec()).prop_map(Op::Status),
        "[a-z ]{0,16}".prop_map(Op::Comment),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn any_write_sequence_keeps_the_graph_sound(
        ops in proptest::collection::vec(op(), 0..12),
        gaps in proptest::collection::vec(0i64..50, 12),
    ) {
        let clock = Arc::new(ManualClock::new(10_000));
        let engine = MemoEngine::new(MemoryStore::new()).with_clock(clock.clone());
        let memo = engine.create_memo(q3_draft()).expect("create memo");

        for (step, op) in ops.iter().enumerate() {
            clock.advance(gaps[step]);
            let after = match op {
                Op::Retitle(title) => engine.update_memo(
                    memo.id(),
                    UpdateMemo { title: Some(title.clone()), ..UpdateMemo::default() },
                    "alice",
                ),
                Op::Assign(to) => engine.assign_memo(
                    memo.id(),
                    AssignMemo { assigned_to_id: to.clone(), assigned_by_id: "bob".to_string(), comment: None },
                ),
                Op::Status(status) => engine.change_status(memo.id(), *status, "bob"),
                Op::Comment(text) => engine.comment_memo(memo.id(), text.clone(), "carol"),
            }
            .expect("write");
            prop_assert_eq!(after.root_node_id(), memo.root_node_id());
        }

        let history = engine.get_memo_history(memo.id()).expect("history");
        prop_assert_eq!(history.len(), ops.len() + 1);
        for node in &history[1..] {
            let parent_max = node
                .parent_node_ids()
                .iter()
                .map(|id| engine.get_node(memo.id(), id).expect("parent").version())
                .max()
                .expect("non-root has parents");
            prop_assert_eq!(node.version(), parent_max + 1);
        }

        let current = engine.get_current_node(memo.id()).expect("current");
        prop_assert_eq!(current.version() as usize, history.len());
        prop_assert!(engine.verify(memo.id()).expect("verify").is_empty());

        let again = engine.get_memo_history(memo.id()).expect("history");
        prop_assert_eq!(again, history);
    }
}
