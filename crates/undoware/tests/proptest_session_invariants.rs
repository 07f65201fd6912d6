#![forbid(unsafe_code)]

//! Property tests for [`Session`] invariants.
//!
//! Validates, under random commit/undo/redo sequences:
//! - The document value always matches a simple reference model.
//! - The undo depth never exceeds the configured bound.
//! - Committing always clears the redo stack.
//! - Undo and redo depths match the model exactly.

use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use undoware::{ComposeSpec, Request, RequestCore, Session, SessionConfig, TxnError};

// ============================================================================
// Fixture: delta requests over a shared integer
// ============================================================================

struct AddDelta {
    core: RequestCore,
    doc: Arc<Mutex<i64>>,
    delta: i64,
}

impl Request for AddDelta {
    fn core(&self) -> &RequestCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RequestCore {
        &mut self.core
    }

    fn on_commit(&mut self) -> Result<Value, TxnError> {
        *self.doc.lock().unwrap() += self.delta;
        Ok(json!(self.delta))
    }

    fn on_undo(&mut self) -> Result<(), TxnError> {
        *self.doc.lock().unwrap() -= self.delta;
        Ok(())
    }

    fn on_redo(&mut self) -> Result<(), TxnError> {
        *self.doc.lock().unwrap() += self.delta;
        Ok(())
    }

    fn compose_spec(&self) -> Option<Value> {
        Some(json!(self.delta))
    }

    fn on_compose(&mut self, spec: &ComposeSpec, _other: &mut dyn Request) -> bool {
        if spec.kind != self.core.kind() {
            return false;
        }
        match spec.data.as_i64() {
            Some(delta) => {
                self.delta += delta;
                true
            }
            None => false,
        }
    }
}

fn add(doc: &Arc<Mutex<i64>>, delta: i64) -> Box<dyn Request> {
    Box::new(AddDelta {
        core: RequestCore::new("add-delta"),
        doc: doc.clone(),
        delta,
    })
}

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Commit(i64),
    CommitMerged(i64),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (-100i64..=100).prop_map(Op::Commit),
        2 => (-100i64..=100).prop_map(Op::CommitMerged),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..=max_len)
}

/// Reference model: undo/redo stacks of per-slot deltas.
struct Model {
    value: i64,
    undo: Vec<i64>,
    redo: Vec<i64>,
    bound: usize,
}

impl Model {
    fn new(bound: usize) -> Self {
        Self {
            value: 0,
            undo: Vec::new(),
            redo: Vec::new(),
            bound,
        }
    }

    fn commit(&mut self, delta: i64, merge: bool) {
        self.value += delta;
        self.redo.clear();
        if merge {
            if let Some(top) = self.undo.last_mut() {
                *top += delta;
                return;
            }
        }
        self.undo.push(delta);
        if self.undo.len() > self.bound {
            self.undo.remove(0);
        }
    }

    fn undo(&mut self) -> bool {
        match self.undo.pop() {
            Some(delta) => {
                self.value -= delta;
                self.redo.push(delta);
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(delta) => {
                self.value += delta;
                self.undo.push(delta);
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn session_matches_reference_model(
        bound in 1usize..=8,
        ops in ops_strategy(60),
    ) {
        let doc = Arc::new(Mutex::new(0i64));
        let mut session = Session::new(SessionConfig::new(bound));
        let mut model = Model::new(bound);

        for op in ops {
            match op {
                Op::Commit(delta) => {
                    session.commit(add(&doc, delta), false).unwrap();
                    model.commit(delta, false);
                }
                Op::CommitMerged(delta) => {
                    session.commit(add(&doc, delta), true).unwrap();
                    model.commit(delta, true);
                }
                Op::Undo => {
                    let did = session.undo().is_ok();
                    prop_assert_eq!(did, model.undo());
                }
                Op::Redo => {
                    let did = session.redo().is_ok();
                    prop_assert_eq!(did, model.redo());
                }
            }

            prop_assert_eq!(*doc.lock().unwrap(), model.value);
            prop_assert_eq!(session.undo_depth(), model.undo.len());
            prop_assert_eq!(session.redo_depth(), model.redo.len());
            prop_assert!(session.undo_depth() <= bound);
        }
    }

    #[test]
    fn full_undo_then_full_redo_restores_value(
        deltas in prop::collection::vec(-100i64..=100, 1..=20),
    ) {
        let doc = Arc::new(Mutex::new(0i64));
        let mut session = Session::new(SessionConfig::new(deltas.len()));

        for delta in &deltas {
            session.commit(add(&doc, *delta), false).unwrap();
        }
        let committed_value = *doc.lock().unwrap();

        while session.can_undo() {
            session.undo().unwrap();
        }
        prop_assert_eq!(*doc.lock().unwrap(), 0);

        while session.can_redo() {
            session.redo().unwrap();
        }
        prop_assert_eq!(*doc.lock().unwrap(), committed_value);
    }

    #[test]
    fn folding_preserves_the_document_and_undoes_atomically(
        deltas in prop::collection::vec(-100i64..=100, 1..=20),
    ) {
        let doc = Arc::new(Mutex::new(0i64));
        let mut session = Session::new(SessionConfig::new(deltas.len()));
        for delta in &deltas {
            session.commit(add(&doc, *delta), false).unwrap();
        }
        let total: i64 = deltas.iter().sum();
        prop_assert_eq!(*doc.lock().unwrap(), total);

        let mut folded = session.to_request().unwrap();
        // Folding never re-applies committed work.
        prop_assert_eq!(*doc.lock().unwrap(), total);

        folded.undo().unwrap();
        prop_assert_eq!(*doc.lock().unwrap(), 0);
        folded.redo().unwrap();
        prop_assert_eq!(*doc.lock().unwrap(), total);
    }
}
