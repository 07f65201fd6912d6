#![forbid(unsafe_code)]

//! Reversible request lifecycle.
//!
//! This module defines the [`Request`] trait: a self-contained reversible
//! unit of work with commit/undo/redo hooks and an optional interactive
//! message channel, plus the [`RequestCore`] bookkeeping every concrete
//! request embeds.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──activate()──► Active ──receive()*──► Committed ──undo()──► Reverted
//!                            │                      ▲    ◄──redo()──────┘
//!                            └──abort()──► Aborted  │
//!                                     (commit happens at most once)
//! ```
//!
//! # Invariants
//!
//! 1. A request commits at most once; a second `commit` returns
//!    [`TxnError::AlreadyCommitted`].
//! 2. `messages` is append-only while the request is active; commit moves
//!    the log aside for replay, abort discards it.
//! 3. `undo` and `redo` may alternate arbitrarily many times after the
//!    single commit; the engine does not police their ordering. That
//!    discipline lives in the session's stack management.
//!
//! # Failure Modes
//!
//! No hook is retried. An error from `on_commit` propagates to the caller
//! with the request left un-committed; the caller chooses whether to
//! `abort`. `on_receive` returning `false` means "not handled", not an
//! error.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TxnError;

/// One interactive message delivered to an active request.
///
/// The `is_async` flag records which channel carried the message so that
/// replay can reconstruct the exact delivery order and channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message name, interpreted by the request implementation.
    pub msg: String,
    /// Opaque payload.
    pub param: Value,
    /// Whether the message arrived through the async channel.
    #[serde(rename = "async")]
    pub is_async: bool,
}

impl Message {
    /// Create a sync-channel message.
    #[must_use]
    pub fn new(msg: impl Into<String>, param: Value) -> Self {
        Self {
            msg: msg.into(),
            param,
            is_async: false,
        }
    }
}

/// Compatibility descriptor handed to [`Request::on_compose`].
///
/// `kind` always carries the incoming request's kind; a concrete request
/// decides compatibility by comparing it against its own before merging
/// `data` (the incoming request's [`Request::compose_spec`] payload).
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeSpec {
    /// Kind of the request offering itself for composition.
    pub kind: String,
    /// The offering request's compose payload (`Value::Null` when it
    /// publishes none).
    pub data: Value,
}

/// Engine bookkeeping embedded by every concrete request.
///
/// Concrete requests expose it through [`Request::core`] and
/// [`Request::core_mut`]; the provided lifecycle methods keep it honest.
#[derive(Debug, Clone, Default)]
pub struct RequestCore {
    kind: String,
    args: Vec<Value>,
    messages: Vec<Message>,
    recorded: Vec<Message>,
    committed: bool,
    result: Value,
}

impl RequestCore {
    /// Create a core for the given request kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Attach construction arguments (used for reconstruction/replay).
    #[must_use]
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Stable identifier used for registry lookup and serialization.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Immutable construction parameters.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Messages received while the request has been active.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages the request had received when it committed.
    ///
    /// Empty until commit; this is what serialization hooks should encode
    /// so a replayed request sees the same interactive input.
    #[must_use]
    pub fn recorded_messages(&self) -> &[Message] {
        &self.recorded
    }

    /// Whether the request has committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Value produced by the domain mutation; opaque to the engine.
    #[must_use]
    pub fn result(&self) -> &Value {
        &self.result
    }

    pub(crate) fn set_kind(&mut self, kind: String) {
        self.kind = kind;
    }

    pub(crate) fn set_args(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    pub(crate) fn mark_committed(&mut self) {
        self.committed = true;
    }
}

/// A reversible unit of work.
///
/// Implementations provide the `on_*` hooks; the engine drives them
/// through the provided orchestration methods (`commit`, `receive`,
/// `abort`, `compose`, ...), which are not meant to be overridden.
///
/// Domain contract: `on_undo` must exactly reverse the externally visible
/// effects of `on_commit`. The engine does not verify this.
#[async_trait]
pub trait Request: Send {
    /// Engine bookkeeping for this request.
    fn core(&self) -> &RequestCore;

    /// Mutable engine bookkeeping.
    fn core_mut(&mut self) -> &mut RequestCore;

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Called when the request becomes active.
    fn on_activate(&mut self) {}

    /// Handle an interactive message. Return `false` for "not handled".
    fn on_receive(&mut self, _msg: &str, _param: &Value) -> bool {
        false
    }

    /// Async message hook; defaults to the sync hook.
    async fn on_receive_async(&mut self, msg: &str, param: &Value) -> bool {
        self.on_receive(msg, param)
    }

    /// Runs before `on_commit`.
    fn on_pre_commit(&mut self) -> Result<(), TxnError> {
        Ok(())
    }

    /// Apply the domain mutation and produce the request's result.
    fn on_commit(&mut self) -> Result<Value, TxnError>;

    /// Runs after `on_commit`.
    fn on_post_commit(&mut self) -> Result<(), TxnError> {
        Ok(())
    }

    /// Async pre-commit hook; defaults to the sync hook.
    async fn on_pre_commit_async(&mut self) -> Result<(), TxnError> {
        self.on_pre_commit()
    }

    /// Async commit hook; defaults to the sync hook.
    async fn on_commit_async(&mut self) -> Result<Value, TxnError> {
        self.on_commit()
    }

    /// Async post-commit hook; defaults to the sync hook.
    async fn on_post_commit_async(&mut self) -> Result<(), TxnError> {
        self.on_post_commit()
    }

    /// Reverse the externally visible effects of `on_commit`.
    fn on_undo(&mut self) -> Result<(), TxnError>;

    /// Re-apply the effects after an undo.
    fn on_redo(&mut self) -> Result<(), TxnError>;

    /// Cancellation hook. The default undoes whatever was partially
    /// applied.
    fn on_abort(&mut self) -> Result<(), TxnError> {
        self.on_undo()
    }

    /// Release resources when the request is evicted from a bounded
    /// history.
    fn on_dispose(&mut self) {}

    /// Field-level transaction hook for the innermost active request.
    fn on_transact(&mut self, _target: &str, _data: &Value) {}

    /// Payload this request publishes for composition into a predecessor.
    fn compose_spec(&self) -> Option<Value> {
        None
    }

    /// Merge the effect described by `spec` (offered by `other`) into this
    /// request. Return `false` to reject the merge.
    fn on_compose(&mut self, _spec: &ComposeSpec, _other: &mut dyn Request) -> bool {
        false
    }

    /// Whether this request currently forwards messages to an inner one.
    fn has_active_child(&self) -> bool {
        false
    }

    /// The inner request messages should be routed to, if any.
    fn active_child(&mut self) -> Option<&mut dyn Request> {
        None
    }

    /// Human-readable description for UI display ("Undo <description>").
    fn description(&self) -> &str {
        self.core().kind()
    }

    /// Serialize the construction arguments. `None` means this request
    /// type cannot be persisted.
    fn stringify_args(&self) -> Option<String> {
        None
    }

    /// Serialize the recorded messages. `None` means this request type
    /// cannot be persisted.
    fn stringify_messages(&self) -> Option<String> {
        None
    }

    /// Async variant of [`stringify_args`](Request::stringify_args).
    async fn stringify_args_async(&self) -> Option<String> {
        self.stringify_args()
    }

    /// Async variant of
    /// [`stringify_messages`](Request::stringify_messages).
    async fn stringify_messages_async(&self) -> Option<String> {
        self.stringify_messages()
    }

    // ------------------------------------------------------------------
    // Orchestration (provided; not meant to be overridden)
    // ------------------------------------------------------------------

    /// Enter the active state.
    fn activate(&mut self) {
        self.on_activate();
    }

    /// Append `msg` to the message log, then delegate to `on_receive`.
    fn receive(&mut self, msg: &str, param: Value) -> bool {
        self.core_mut().messages.push(Message {
            msg: msg.to_owned(),
            param: param.clone(),
            is_async: false,
        });
        self.on_receive(msg, &param)
    }

    /// Async counterpart of [`receive`](Request::receive); records the
    /// async channel in the log.
    async fn receive_async(&mut self, msg: &str, param: Value) -> bool {
        self.core_mut().messages.push(Message {
            msg: msg.to_owned(),
            param: param.clone(),
            is_async: true,
        });
        self.on_receive_async(msg, &param).await
    }

    /// Route a message to the innermost active request, then receive it
    /// there.
    fn deliver(&mut self, msg: &str, param: Value) -> bool {
        if let Some(child) = self.active_child() {
            return child.deliver(msg, param);
        }
        self.receive(msg, param)
    }

    /// Async counterpart of [`deliver`](Request::deliver).
    async fn deliver_async(&mut self, msg: &str, param: Value) -> bool {
        if let Some(child) = self.active_child() {
            return child.deliver_async(msg, param).await;
        }
        self.receive_async(msg, param).await
    }

    /// Route a field transaction to the innermost active request.
    fn transact(&mut self, target: &str, data: &Value) {
        if let Some(child) = self.active_child() {
            return child.transact(target, data);
        }
        self.on_transact(target, data);
    }

    /// Run `on_pre_commit` → `on_commit` → `on_post_commit`, mark the
    /// request committed, move the message log aside for replay, and
    /// store the result.
    fn commit(&mut self) -> Result<Value, TxnError> {
        if self.core().committed {
            return Err(TxnError::AlreadyCommitted(self.core().kind.clone()));
        }
        self.on_pre_commit()?;
        let result = self.on_commit()?;
        self.on_post_commit()?;
        let core = self.core_mut();
        core.committed = true;
        core.recorded = std::mem::take(&mut core.messages);
        core.result = result.clone();
        Ok(result)
    }

    /// Async counterpart of [`commit`](Request::commit), running the
    /// async hook triple.
    async fn commit_async(&mut self) -> Result<Value, TxnError> {
        if self.core().committed {
            return Err(TxnError::AlreadyCommitted(self.core().kind.clone()));
        }
        self.on_pre_commit_async().await?;
        let result = self.on_commit_async().await?;
        self.on_post_commit_async().await?;
        let core = self.core_mut();
        core.committed = true;
        core.recorded = std::mem::take(&mut core.messages);
        core.result = result.clone();
        Ok(result)
    }

    /// Cancel an in-progress request: run `on_abort`, then discard the
    /// message log.
    fn abort(&mut self) -> Result<(), TxnError> {
        let outcome = self.on_abort();
        self.core_mut().messages.clear();
        outcome
    }

    /// Thin wrapper over `on_undo`.
    fn undo(&mut self) -> Result<(), TxnError> {
        self.on_undo()
    }

    /// Thin wrapper over `on_redo`.
    fn redo(&mut self) -> Result<(), TxnError> {
        self.on_redo()
    }

    /// Attempt to merge the effect of `other` into this request.
    ///
    /// Builds a [`ComposeSpec`] from `other`'s kind and compose payload,
    /// offers it to `on_compose`, and on success adopts `other`'s result
    /// so this request answers for both edits.
    fn compose(&mut self, other: &mut dyn Request) -> bool {
        let spec = ComposeSpec {
            kind: other.core().kind().to_owned(),
            data: other.compose_spec().unwrap_or(Value::Null),
        };
        if self.on_compose(&spec, other) {
            self.core_mut().result = std::mem::take(&mut other.core_mut().result);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for dyn Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.core().kind())
            .field("committed", &self.core().is_committed())
            .field("messages", &self.core().messages().len())
            .finish()
    }
}
