#![forbid(unsafe_code)]

//! Composite requests: atomic grouping of child requests.
//!
//! A [`CompositeRequest`] owns an ordered list of children so a group of
//! edits undoes and redoes as one unit. Children never appear
//! individually in a session's stacks; the composite is the single stack
//! entry that answers for all of them.
//!
//! # Invariants
//!
//! 1. `on_commit` applies children in push order; `on_undo` reverses them
//!    in the opposite order.
//! 2. The committed watermark (`committed_to`) marks the prefix of
//!    children whose effects are already applied; committing the
//!    composite never re-runs that prefix.
//! 3. If a child fails mid-commit, the children committed by that call
//!    are undone in reverse before the error propagates.

use serde_json::Value;

use crate::error::TxnError;
use crate::request::{Request, RequestCore};

/// Registry kind used by engine-built composites.
pub const COMPOSITE_KIND: &str = "composite";

/// A request that groups child requests for atomic undo/redo.
pub struct CompositeRequest {
    core: RequestCore,
    /// Children in commit order.
    children: Vec<Box<dyn Request>>,
    /// Index of the first child not yet committed.
    committed_to: usize,
}

impl std::fmt::Debug for CompositeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeRequest")
            .field("children", &self.children.len())
            .field("committed_to", &self.committed_to)
            .field("committed", &self.core.is_committed())
            .finish()
    }
}

impl Default for CompositeRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeRequest {
    /// Create an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: RequestCore::new(COMPOSITE_KIND),
            children: Vec::new(),
            committed_to: 0,
        }
    }

    /// Add an uncommitted child; it will run when the composite commits.
    pub fn push(&mut self, child: Box<dyn Request>) {
        self.children.push(child);
    }

    /// Adopt a child whose effect is already applied.
    ///
    /// The child joins the committed prefix, ahead of any pending
    /// children, so `on_commit` never re-runs it and never skips a
    /// pending one; it still participates in undo/redo.
    pub fn push_committed(&mut self, child: Box<dyn Request>) {
        self.children.insert(self.committed_to, child);
        self.committed_to += 1;
    }

    /// Build a composite representing work that has already been applied
    /// (e.g. a session's folded undo stack). The composite itself is born
    /// committed.
    #[must_use]
    pub fn from_committed(children: Vec<Box<dyn Request>>) -> Self {
        let mut composite = Self::new();
        for child in children {
            composite.push_committed(child);
        }
        composite.core.mark_committed();
        composite
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the composite has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Request for CompositeRequest {
    fn core(&self) -> &RequestCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RequestCore {
        &mut self.core
    }

    fn on_commit(&mut self) -> Result<Value, TxnError> {
        let start = self.committed_to;
        for i in start..self.children.len() {
            if let Err(err) = self.children[i].commit() {
                // Roll back the children this call committed.
                for j in (start..i).rev() {
                    let _ = self.children[j].undo();
                }
                self.committed_to = start;
                return Err(err);
            }
            self.committed_to = i + 1;
        }
        let results: Vec<Value> = self
            .children
            .iter()
            .map(|child| child.core().result().clone())
            .collect();
        Ok(Value::Array(results))
    }

    fn on_undo(&mut self) -> Result<(), TxnError> {
        for child in self.children[..self.committed_to].iter_mut().rev() {
            child.undo()?;
        }
        Ok(())
    }

    fn on_redo(&mut self) -> Result<(), TxnError> {
        for child in self.children[..self.committed_to].iter_mut() {
            child.redo()?;
        }
        Ok(())
    }

    fn on_dispose(&mut self) {
        for child in &mut self.children {
            child.on_dispose();
        }
    }

    fn has_active_child(&self) -> bool {
        self.committed_to < self.children.len()
    }

    fn active_child(&mut self) -> Option<&mut dyn Request> {
        if self.committed_to == self.children.len() {
            return None;
        }
        match self.children.last_mut() {
            Some(child) => Some(child.as_mut()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ComposeSpec;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Appends a token to a shared transcript on commit, removes it on
    /// undo.
    struct Append {
        core: RequestCore,
        buffer: Arc<Mutex<String>>,
        token: String,
        fail: bool,
    }

    impl Append {
        fn new(buffer: Arc<Mutex<String>>, token: &str) -> Self {
            Self {
                core: RequestCore::new("append"),
                buffer,
                token: token.to_string(),
                fail: false,
            }
        }

        fn failing(buffer: Arc<Mutex<String>>, token: &str) -> Self {
            let mut request = Self::new(buffer, token);
            request.fail = true;
            request
        }
    }

    impl Request for Append {
        fn core(&self) -> &RequestCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut RequestCore {
            &mut self.core
        }

        fn on_commit(&mut self) -> Result<Value, TxnError> {
            if self.fail {
                return Err(TxnError::Domain("append refused".to_string()));
            }
            self.buffer.lock().unwrap().push_str(&self.token);
            Ok(json!(self.token))
        }

        fn on_undo(&mut self) -> Result<(), TxnError> {
            let mut buffer = self.buffer.lock().unwrap();
            let keep = buffer.len() - self.token.len();
            buffer.truncate(keep);
            Ok(())
        }

        fn on_redo(&mut self) -> Result<(), TxnError> {
            self.buffer.lock().unwrap().push_str(&self.token);
            Ok(())
        }
    }

    #[test]
    fn test_commit_applies_children_in_order() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut composite = CompositeRequest::new();
        composite.push(Box::new(Append::new(buffer.clone(), "a")));
        composite.push(Box::new(Append::new(buffer.clone(), "b")));
        composite.push(Box::new(Append::new(buffer.clone(), "c")));

        composite.commit().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "abc");
        assert!(composite.core().is_committed());
    }

    #[test]
    fn test_undo_reverses_children() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut composite = CompositeRequest::new();
        composite.push(Box::new(Append::new(buffer.clone(), "a")));
        composite.push(Box::new(Append::new(buffer.clone(), "b")));

        composite.commit().unwrap();
        composite.undo().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "");

        composite.redo().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "ab");
    }

    #[test]
    fn test_child_failure_rolls_back_this_call() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut composite = CompositeRequest::new();
        composite.push(Box::new(Append::new(buffer.clone(), "a")));
        composite.push(Box::new(Append::failing(buffer.clone(), "b")));

        let err = composite.commit().unwrap_err();
        assert!(matches!(err, TxnError::Domain(_)));
        assert_eq!(*buffer.lock().unwrap(), "");
        assert!(!composite.core().is_committed());
    }

    #[test]
    fn test_from_committed_never_reruns_children() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut a = Append::new(buffer.clone(), "a");
        let mut b = Append::new(buffer.clone(), "b");
        a.commit().unwrap();
        b.commit().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "ab");

        let mut composite =
            CompositeRequest::from_committed(vec![Box::new(a), Box::new(b)]);
        assert!(composite.core().is_committed());

        // The folded group still undoes and redoes atomically.
        composite.undo().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "");
        composite.redo().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "ab");
    }

    #[test]
    fn test_push_committed_watermark_skips_prefix() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut done = Append::new(buffer.clone(), "x");
        done.commit().unwrap();

        let mut composite = CompositeRequest::new();
        composite.push_committed(Box::new(done));
        composite.push(Box::new(Append::new(buffer.clone(), "y")));

        composite.commit().unwrap();
        // "x" was not re-applied.
        assert_eq!(*buffer.lock().unwrap(), "xy");
    }

    #[test]
    fn test_push_committed_keeps_pending_children_runnable() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut done = Append::new(buffer.clone(), "x");
        done.commit().unwrap();

        let mut composite = CompositeRequest::new();
        composite.push(Box::new(Append::new(buffer.clone(), "y")));
        composite.push_committed(Box::new(done));

        composite.commit().unwrap();
        // The pending child still ran; the adopted one was not re-run.
        assert_eq!(*buffer.lock().unwrap(), "xy");

        composite.undo().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "");
        composite.redo().unwrap();
        assert_eq!(*buffer.lock().unwrap(), "xy");
    }

    #[test]
    fn test_active_child_is_last_uncommitted() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut composite = CompositeRequest::new();
        assert!(composite.active_child().is_none());

        composite.push(Box::new(Append::new(buffer.clone(), "a")));
        assert!(composite.has_active_child());
        assert!(composite.active_child().is_some());

        composite.commit().unwrap();
        assert!(!composite.has_active_child());
        assert!(composite.active_child().is_none());
    }

    #[test]
    fn test_message_routing_reaches_inner_child() {
        struct Sink {
            core: RequestCore,
            transacts: Arc<Mutex<Vec<String>>>,
        }

        impl Request for Sink {
            fn core(&self) -> &RequestCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut RequestCore {
                &mut self.core
            }

            fn on_receive(&mut self, msg: &str, _param: &Value) -> bool {
                msg == "drag"
            }

            fn on_transact(&mut self, target: &str, _data: &Value) {
                self.transacts.lock().unwrap().push(target.to_string());
            }

            fn on_commit(&mut self) -> Result<Value, TxnError> {
                Ok(Value::Null)
            }

            fn on_undo(&mut self) -> Result<(), TxnError> {
                Ok(())
            }

            fn on_redo(&mut self) -> Result<(), TxnError> {
                Ok(())
            }
        }

        let transacts = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeRequest::new();
        composite.push(Box::new(Sink {
            core: RequestCore::new("sink"),
            transacts: transacts.clone(),
        }));

        assert!(composite.deliver("drag", json!(1)));
        assert!(!composite.deliver("unknown", json!(1)));
        // The message log lives on the child, not the composite.
        assert!(composite.core().messages().is_empty());

        // Field transactions route through the same child chain.
        composite.transact("width", &json!(2));
        assert_eq!(*transacts.lock().unwrap(), vec!["width".to_string()]);
    }

    #[test]
    fn test_empty_composite_commits_to_empty_result() {
        let mut composite = CompositeRequest::new();
        let result = composite.commit().unwrap();
        assert_eq!(result, json!([]));
    }

    #[test]
    fn test_compose_spec_default_is_absent() {
        let composite = CompositeRequest::new();
        assert!(composite.compose_spec().is_none());
        let spec = ComposeSpec {
            kind: COMPOSITE_KIND.to_string(),
            data: Value::Null,
        };
        let mut target = CompositeRequest::new();
        let mut other = CompositeRequest::new();
        assert!(!target.on_compose(&spec, &mut other));
    }
}
