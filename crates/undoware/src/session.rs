#![forbid(unsafe_code)]

//! Per-document undo/redo history.
//!
//! A [`Session`] owns one undo stack and one redo stack of committed
//! requests, plus an explicit stack of staged (in-progress, uncommitted)
//! requests that accept interactive messages.
//!
//! # Invariants
//!
//! 1. Committing any new request clears the redo stack: a fresh edit
//!    invalidates the previously undone future.
//! 2. `undo_stack.len() <= max_undo_steps` after every commit; the oldest
//!    entry is evicted (and disposed) when the bound would be exceeded.
//! 3. A merged commit (`merge == true` and the top entry accepts the
//!    compose) leaves the undo depth unchanged; the top entry now answers
//!    for both edits.
//!
//! # Memory Model
//!
//! Stacks are `VecDeque`s with the top at the back, giving O(1) eviction
//! from the front.
//!
//! ```text
//! commit(C)                            undo() x2
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ Undo: [A, B, C]          │         │ Undo: [A]                │
//! │ Redo: []                 │  ────►  │ Redo: [C, B]  (B on top) │
//! └──────────────────────────┘         └──────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! All mutation happens through `&mut Session`; only one commit can be in
//! flight at a time per session, and `undo`/`redo` cannot interleave with
//! it. An async commit that never resolves leaves the session pending;
//! there is no engine-side timeout.

use std::collections::VecDeque;
use std::fmt;

use serde_json::Value;

use crate::error::{CommitError, TxnError};
use crate::replay::{compose_requests, RequestRecord};
use crate::request::Request;

/// Default bound on a session's undo stack.
pub const DEFAULT_MAX_UNDO_STEPS: usize = 25;

/// Predicate selecting which requests belong in a serialized history.
pub type RequestFilter = Box<dyn Fn(&dyn Request) -> bool + Send + Sync>;

/// Configuration for a session.
pub struct SessionConfig {
    max_undo_steps: usize,
    to_request_filter: Option<RequestFilter>,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("max_undo_steps", &self.max_undo_steps)
            .field("has_filter", &self.to_request_filter.is_some())
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
            to_request_filter: None,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the given undo bound.
    #[must_use]
    pub fn new(max_undo_steps: usize) -> Self {
        Self {
            max_undo_steps,
            to_request_filter: None,
        }
    }

    /// Set the undo bound.
    #[must_use]
    pub fn with_max_undo_steps(mut self, max_undo_steps: usize) -> Self {
        self.max_undo_steps = max_undo_steps;
        self
    }

    /// Set the predicate applied by [`Session::to_requests`] and
    /// [`Session::serialize_history`].
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&dyn Request) -> bool + Send + Sync + 'static,
    {
        self.to_request_filter = Some(Box::new(filter));
        self
    }

    /// The undo bound.
    #[must_use]
    pub fn max_undo_steps(&self) -> usize {
        self.max_undo_steps
    }
}

/// Undo/redo history for a single editable document.
pub struct Session {
    /// Committed requests available for undo (top at the back).
    undo_stack: VecDeque<Box<dyn Request>>,
    /// Undone requests available for redo (top at the back).
    redo_stack: VecDeque<Box<dyn Request>>,
    /// Staged in-progress requests, innermost gesture last.
    active_stack: Vec<Box<dyn Request>>,
    config: SessionConfig,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("active_depth", &self.active_stack.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    /// Create a session with the given configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            active_stack: Vec::new(),
            config,
        }
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Commit `request` and record it for undo.
    ///
    /// Runs the request's three-phase commit, then [`post_commit`]
    /// (merge/push/evict). On a hook failure the un-committed request is
    /// handed back inside the error so the caller can decide whether to
    /// abort it.
    ///
    /// [`post_commit`]: Session::post_commit
    pub fn commit(
        &mut self,
        mut request: Box<dyn Request>,
        merge_with_previous: bool,
    ) -> Result<Value, CommitError> {
        match request.commit() {
            Ok(result) => {
                self.post_commit(request, merge_with_previous);
                Ok(result)
            }
            Err(source) => Err(CommitError { request, source }),
        }
    }

    /// Async counterpart of [`commit`](Session::commit).
    pub async fn commit_async(
        &mut self,
        mut request: Box<dyn Request>,
        merge_with_previous: bool,
    ) -> Result<Value, CommitError> {
        match request.commit_async().await {
            Ok(result) => {
                self.post_commit(request, merge_with_previous);
                Ok(result)
            }
            Err(source) => Err(CommitError { request, source }),
        }
    }

    /// Record an already-committed request on the undo stack.
    ///
    /// Clears the redo stack, attempts a merge with the previous entry
    /// when asked, and enforces the undo bound (evicting and disposing
    /// the oldest entry).
    pub fn post_commit(&mut self, mut request: Box<dyn Request>, merge_with_previous: bool) {
        self.redo_stack.clear();

        if merge_with_previous {
            if let Some(top) = self.undo_stack.back_mut() {
                if top.compose(request.as_mut()) {
                    tracing::debug!(kind = request.core().kind(), "merged into previous request");
                    return;
                }
            }
        }

        tracing::debug!(kind = request.core().kind(), "recorded request for undo");
        self.undo_stack.push_back(request);
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        while self.undo_stack.len() > self.config.max_undo_steps {
            if let Some(mut evicted) = self.undo_stack.pop_front() {
                tracing::debug!(kind = evicted.core().kind(), "evicted oldest undo entry");
                evicted.on_dispose();
            }
        }
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Whether there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo the most recent commit, moving it to the redo stack.
    ///
    /// On a hook failure the request stays on the undo stack.
    pub fn undo(&mut self) -> Result<(), TxnError> {
        let mut request = self.undo_stack.pop_back().ok_or(TxnError::NothingToUndo)?;
        match request.undo() {
            Ok(()) => {
                self.redo_stack.push_back(request);
                Ok(())
            }
            Err(err) => {
                self.undo_stack.push_back(request);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone request, moving it back to the undo
    /// stack.
    ///
    /// On a hook failure the request stays on the redo stack.
    pub fn redo(&mut self) -> Result<(), TxnError> {
        let mut request = self.redo_stack.pop_back().ok_or(TxnError::NothingToRedo)?;
        match request.redo() {
            Ok(()) => {
                self.undo_stack.push_back(request);
                Ok(())
            }
            Err(err) => {
                self.redo_stack.push_back(request);
                Err(err)
            }
        }
    }

    /// The request `undo` would revert next, without mutating anything.
    #[must_use]
    pub fn peek_next_undo_request(&self) -> Option<&dyn Request> {
        self.undo_stack.back().map(|request| request.as_ref())
    }

    /// The request `redo` would re-apply next.
    #[must_use]
    pub fn peek_next_redo_request(&self) -> Option<&dyn Request> {
        self.redo_stack.back().map(|request| request.as_ref())
    }

    /// Undo stack depth.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Descriptions of the next undo candidates, most recent first.
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.undo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|request| request.description())
            .collect()
    }

    /// Descriptions of the next redo candidates, most recent first.
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.redo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|request| request.description())
            .collect()
    }

    // ========================================================================
    // Active requests and interactive messaging
    // ========================================================================

    /// Stage a request for interactive messaging, entering its active
    /// state.
    pub fn activate(&mut self, mut request: Box<dyn Request>) {
        request.activate();
        self.active_stack.push(request);
    }

    /// The request currently accepting messages, if any.
    #[must_use]
    pub fn active_request(&self) -> Option<&dyn Request> {
        self.active_stack.last().map(|request| request.as_ref())
    }

    /// Depth of the staged-request stack.
    #[must_use]
    pub fn active_depth(&self) -> usize {
        self.active_stack.len()
    }

    /// Deliver an interactive message to the innermost active request.
    ///
    /// There is no queueing: with no active request the message is simply
    /// not delivered and `false` is returned.
    pub fn receive(&mut self, msg: &str, param: Value) -> bool {
        match self.active_stack.last_mut() {
            Some(request) => request.deliver(msg, param),
            None => false,
        }
    }

    /// Async counterpart of [`receive`](Session::receive).
    pub async fn receive_async(&mut self, msg: &str, param: Value) -> bool {
        match self.active_stack.last_mut() {
            Some(request) => request.deliver_async(msg, param).await,
            None => false,
        }
    }

    /// Route a field transaction to the innermost active request; a no-op
    /// when nothing is active.
    pub fn transact(&mut self, target: &str, data: &Value) {
        if let Some(request) = self.active_stack.last_mut() {
            request.transact(target, data);
        }
    }

    /// Commit the innermost staged request. `None` when nothing is
    /// staged.
    pub fn commit_active(&mut self, merge_with_previous: bool) -> Option<Result<Value, CommitError>> {
        let request = self.active_stack.pop()?;
        Some(self.commit(request, merge_with_previous))
    }

    /// Abort the innermost staged request. `None` when nothing is staged.
    pub fn abort_active(&mut self) -> Option<Result<(), TxnError>> {
        let request = self.active_stack.pop()?;
        Some(self.abort(request))
    }

    /// Cancel a request that never reached [`post_commit`]. Touches
    /// neither stack.
    ///
    /// [`post_commit`]: Session::post_commit
    pub fn abort(&mut self, mut request: Box<dyn Request>) -> Result<(), TxnError> {
        request.abort()
    }

    // ========================================================================
    // Folding and serialization
    // ========================================================================

    /// Drain the undo stack (oldest first) and fold it into a single
    /// request via repeated compose/grouping. `None` when the stack is
    /// empty.
    pub fn to_request(&mut self) -> Option<Box<dyn Request>> {
        self.redo_stack.clear();
        let drained: Vec<Box<dyn Request>> = self.undo_stack.drain(..).collect();
        compose_requests(drained)
    }

    /// Drain the undo stack (oldest first), keeping only requests that
    /// pass the configured filter. Rejected entries are disposed.
    pub fn to_requests(&mut self) -> Vec<Box<dyn Request>> {
        self.redo_stack.clear();
        let drained: Vec<Box<dyn Request>> = self.undo_stack.drain(..).collect();
        match &self.config.to_request_filter {
            None => drained,
            Some(filter) => {
                let mut kept = Vec::new();
                for mut request in drained {
                    if filter(request.as_ref()) {
                        kept.push(request);
                    } else {
                        request.on_dispose();
                    }
                }
                kept
            }
        }
    }

    /// Produce the persisted-history records for this session's undo
    /// stack (oldest first), applying the configured filter.
    ///
    /// A request that passes the filter but lacks serialization hooks is
    /// a [`TxnError::NotSerializable`] error: the filter is the intended
    /// mechanism for excluding transient request types.
    pub fn serialize_history(&self) -> Result<Vec<RequestRecord>, TxnError> {
        let mut records = Vec::new();
        for request in &self.undo_stack {
            if let Some(filter) = &self.config.to_request_filter {
                if !filter(request.as_ref()) {
                    continue;
                }
            }
            let kind = request.core().kind().to_owned();
            let args = request
                .stringify_args()
                .ok_or_else(|| TxnError::NotSerializable(kind.clone()))?;
            let msgs = request
                .stringify_messages()
                .ok_or_else(|| TxnError::NotSerializable(kind.clone()))?;
            records.push(RequestRecord { kind, args, msgs });
        }
        Ok(records)
    }

    /// The undo bound this session enforces.
    #[must_use]
    pub fn max_undo_steps(&self) -> usize {
        self.config.max_undo_steps
    }

    /// Clear the undo and redo stacks, leaving staged requests in place.
    ///
    /// Dropped entries are not disposed; callers needing cleanup undo or
    /// dispose first.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Clear both stacks and the staged requests.
    ///
    /// Contained requests are dropped without `on_dispose`; callers
    /// needing cleanup must undo or dispose before resetting.
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.active_stack.clear();
    }
}
