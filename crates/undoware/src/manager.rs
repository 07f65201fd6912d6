#![forbid(unsafe_code)]

//! Transaction manager: registry, session stack, and history replay.
//!
//! A [`TransactionManager`] owns a registry of request types and a stack
//! of [`Session`]s. The bottom "default" session always exists; overlay
//! sessions are pushed for nested workflows (a dialog, a tool mode) and
//! torn down through token-guarded handles. All commits, messages, and
//! undo/redo traffic target the top of the stack.
//!
//! The manager is an owned value. Embedders construct one per document
//! and wire it into their own state; there is no global instance.
//!
//! # Invariants
//!
//! 1. One constructor per kind. Re-registration is an error, never a
//!    silent overwrite.
//! 2. Session handles are token-guarded: `commit_session` / `abort_session`
//!    / `end_session` act only when the token names the current top
//!    overlay, so a stale handle cannot tear down someone else's session.
//! 3. Undo/redo always navigate the topmost undo/redo-enabled session;
//!    overlays above it that opted out are aborted first.
//!
//! # Failure Modes
//!
//! Listener callbacks run synchronously on the calling thread; a slow
//! listener stalls the commit path. Token misuse is reported (`false` plus
//! a warning), not an error, matching the fire-and-forget way teardown
//! handles get dropped in practice.

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{CommitError, TxnError};
use crate::replay::{decode_messages, RequestRecord};
use crate::request::{Message, Request};
use crate::session::{Session, SessionConfig};

/// Constructor for a registered request kind. Receives the adapted
/// construction arguments.
pub type RequestCtor = Box<dyn Fn(&[Value]) -> Box<dyn Request> + Send + Sync>;

/// Normalizes caller-supplied arguments before construction (filling
/// defaults, migrating legacy shapes).
pub type ArgAdapter = Box<dyn Fn(Vec<Value>) -> Vec<Value> + Send + Sync>;

/// Sync parser for a record's `args` string.
pub type ParseArgsFn = Box<dyn Fn(&str) -> Result<Vec<Value>, TxnError> + Send + Sync>;

/// Sync parser for a record's `msgs` string.
pub type ParseMessagesFn = Box<dyn Fn(&str) -> Result<Vec<Message>, TxnError> + Send + Sync>;

/// Async parser for a record's `args` string.
pub type ParseArgsAsyncFn =
    Box<dyn Fn(String) -> BoxFuture<'static, Result<Vec<Value>, TxnError>> + Send + Sync>;

/// Async parser for a record's `msgs` string.
pub type ParseMessagesAsyncFn =
    Box<dyn Fn(String) -> BoxFuture<'static, Result<Vec<Message>, TxnError>> + Send + Sync>;

/// Parsers that turn a persisted record's opaque strings back into
/// arguments and messages.
///
/// The default codec is plain JSON, matching the default serialization
/// hooks. Kinds whose hooks emit a custom encoding override the parsers
/// to match; kinds whose parsing needs I/O add the async variants, which
/// only [`TransactionManager::replay_async`] consults.
pub struct RequestCodec {
    parse_args: ParseArgsFn,
    parse_messages: ParseMessagesFn,
    parse_args_async: Option<ParseArgsAsyncFn>,
    parse_messages_async: Option<ParseMessagesAsyncFn>,
}

impl fmt::Debug for RequestCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCodec")
            .field("has_async_args", &self.parse_args_async.is_some())
            .field("has_async_messages", &self.parse_messages_async.is_some())
            .finish()
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self {
            parse_args: Box::new(|encoded| Ok(serde_json::from_str(encoded)?)),
            parse_messages: Box::new(decode_messages),
            parse_args_async: None,
            parse_messages_async: None,
        }
    }
}

impl RequestCodec {
    /// Replace the argument parser.
    #[must_use]
    pub fn with_parse_args<F>(mut self, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<Value>, TxnError> + Send + Sync + 'static,
    {
        self.parse_args = Box::new(parse);
        self
    }

    /// Replace the message parser.
    #[must_use]
    pub fn with_parse_messages<F>(mut self, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<Message>, TxnError> + Send + Sync + 'static,
    {
        self.parse_messages = Box::new(parse);
        self
    }

    /// Add an async argument parser for [`TransactionManager::replay_async`].
    #[must_use]
    pub fn with_parse_args_async<F>(mut self, parse: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<Vec<Value>, TxnError>> + Send + Sync + 'static,
    {
        self.parse_args_async = Some(Box::new(parse));
        self
    }

    /// Add an async message parser for [`TransactionManager::replay_async`].
    #[must_use]
    pub fn with_parse_messages_async<F>(mut self, parse: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<Vec<Message>, TxnError>> + Send + Sync + 'static,
    {
        self.parse_messages_async = Some(Box::new(parse));
        self
    }
}

/// A registered request kind: constructor plus optional argument adapter
/// and codec.
pub struct RequestType {
    ctor: RequestCtor,
    arg_adapter: Option<ArgAdapter>,
    codec: RequestCodec,
}

impl fmt::Debug for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestType")
            .field("has_arg_adapter", &self.arg_adapter.is_some())
            .field("codec", &self.codec)
            .finish()
    }
}

impl RequestType {
    /// Register a constructor with the standard JSON codec.
    #[must_use]
    pub fn new<F>(ctor: F) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Request> + Send + Sync + 'static,
    {
        Self {
            ctor: Box::new(ctor),
            arg_adapter: None,
            codec: RequestCodec::default(),
        }
    }

    /// Attach an argument adapter, run on every `create_request` call
    /// before construction.
    #[must_use]
    pub fn with_arg_adapter<F>(mut self, adapter: F) -> Self
    where
        F: Fn(Vec<Value>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.arg_adapter = Some(Box::new(adapter));
        self
    }

    /// Replace the codec used when replaying persisted records.
    #[must_use]
    pub fn with_codec(mut self, codec: RequestCodec) -> Self {
        self.codec = codec;
        self
    }
}

/// Opaque handle naming an overlay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

/// Configuration for an overlay session.
#[derive(Debug)]
pub struct SessionOptions {
    undo_redo: bool,
    config: SessionConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            undo_redo: true,
            config: SessionConfig::default(),
        }
    }
}

impl SessionOptions {
    /// Whether undo/redo traffic may navigate this session's history.
    /// Sessions that opt out are aborted when undo/redo is invoked above
    /// them.
    #[must_use]
    pub fn with_undo_redo(mut self, undo_redo: bool) -> Self {
        self.undo_redo = undo_redo;
        self
    }

    /// Session configuration (undo bound, serialization filter).
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

/// Lifecycle notifications emitted by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnEvent {
    /// A request was built by the factory.
    Created { kind: String },
    /// A request (or a folded session) entered an undo stack.
    Committed { kind: String },
    /// An in-progress request was cancelled.
    Aborted { kind: String },
    /// A committed request was reverted.
    Undone { kind: String },
    /// An undone request was re-applied.
    Redone { kind: String },
    /// An overlay session was pushed.
    SessionStarted { token: SessionToken },
    /// An overlay session left the stack, by commit, abort, or teardown.
    SessionEnded { token: SessionToken },
}

/// Synchronous observer of [`TxnEvent`]s.
pub type EventListener = Box<dyn Fn(&TxnEvent) + Send + Sync>;

struct SessionEntry {
    token: SessionToken,
    undo_redo: bool,
    session: Session,
}

/// Registry, session stack, and replay front-end for one document.
pub struct TransactionManager {
    registry: HashMap<String, RequestType>,
    default_session: Session,
    overlays: Vec<SessionEntry>,
    listeners: Vec<EventListener>,
    next_token: u64,
    undo_redo_blocked: bool,
}

impl fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager")
            .field("registered_kinds", &self.registry.len())
            .field("overlay_sessions", &self.overlays.len())
            .field("undo_redo_blocked", &self.undo_redo_blocked)
            .finish()
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Create a manager whose default session uses the default
    /// configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a manager with the given default-session configuration.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            registry: HashMap::new(),
            default_session: Session::new(config),
            overlays: Vec::new(),
            listeners: Vec::new(),
            next_token: 0,
            undo_redo_blocked: false,
        }
    }

    /// Subscribe to lifecycle events. Listeners run synchronously, in
    /// subscription order.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&TxnEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&self, event: &TxnEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    // ========================================================================
    // Registry and factory
    // ========================================================================

    /// Register a request kind.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        request_type: RequestType,
    ) -> Result<(), TxnError> {
        let kind = kind.into();
        if self.registry.contains_key(&kind) {
            return Err(TxnError::DuplicateType(kind));
        }
        self.registry.insert(kind, request_type);
        Ok(())
    }

    /// Whether `kind` is registered.
    #[must_use]
    pub fn is_registered(&self, kind: &str) -> bool {
        self.registry.contains_key(kind)
    }

    /// Build a request through the registry.
    ///
    /// Runs the kind's argument adapter, constructs the request, and
    /// stamps its kind and (adapted) arguments into its core. The request
    /// is returned un-activated and un-committed; the caller stages or
    /// commits it.
    pub fn create_request(
        &self,
        kind: &str,
        args: Vec<Value>,
    ) -> Result<Box<dyn Request>, TxnError> {
        let request_type = self
            .registry
            .get(kind)
            .ok_or_else(|| TxnError::UnregisteredType(kind.to_string()))?;
        let args = match &request_type.arg_adapter {
            Some(adapter) => adapter(args),
            None => args,
        };
        let mut request = (request_type.ctor)(&args);
        request.core_mut().set_kind(kind.to_string());
        request.core_mut().set_args(args);
        self.emit(&TxnEvent::Created {
            kind: kind.to_string(),
        });
        Ok(request)
    }

    // ========================================================================
    // Session access
    // ========================================================================

    /// The session commits and messages currently target.
    #[must_use]
    pub fn session(&self) -> &Session {
        match self.overlays.last() {
            Some(entry) => &entry.session,
            None => &self.default_session,
        }
    }

    /// Mutable access to the current session.
    pub fn session_mut(&mut self) -> &mut Session {
        match self.overlays.last_mut() {
            Some(entry) => &mut entry.session,
            None => &mut self.default_session,
        }
    }

    fn undo_redo_session(&self) -> &Session {
        match self.overlays.iter().rfind(|entry| entry.undo_redo) {
            Some(entry) => &entry.session,
            None => &self.default_session,
        }
    }

    fn undo_redo_session_mut(&mut self) -> &mut Session {
        match self.overlays.iter_mut().rfind(|entry| entry.undo_redo) {
            Some(entry) => &mut entry.session,
            None => &mut self.default_session,
        }
    }

    // ========================================================================
    // Commit / abort
    // ========================================================================

    /// Commit a request into the current session.
    pub fn commit(
        &mut self,
        request: Box<dyn Request>,
        merge_with_previous: bool,
    ) -> Result<Value, CommitError> {
        let kind = request.core().kind().to_owned();
        let result = self.session_mut().commit(request, merge_with_previous)?;
        self.emit(&TxnEvent::Committed { kind });
        Ok(result)
    }

    /// Async counterpart of [`commit`](TransactionManager::commit).
    pub async fn commit_async(
        &mut self,
        request: Box<dyn Request>,
        merge_with_previous: bool,
    ) -> Result<Value, CommitError> {
        let kind = request.core().kind().to_owned();
        let result = self
            .session_mut()
            .commit_async(request, merge_with_previous)
            .await?;
        self.emit(&TxnEvent::Committed { kind });
        Ok(result)
    }

    /// Cancel a request that was never committed.
    pub fn abort(&mut self, mut request: Box<dyn Request>) -> Result<(), TxnError> {
        let kind = request.core().kind().to_owned();
        request.abort()?;
        self.emit(&TxnEvent::Aborted { kind });
        Ok(())
    }

    // ========================================================================
    // Interactive requests
    // ========================================================================

    /// Stage a request on the current session for interactive messaging.
    pub fn activate(&mut self, request: Box<dyn Request>) {
        self.session_mut().activate(request);
    }

    /// Deliver a message to the innermost active request of the current
    /// session.
    pub fn receive(&mut self, msg: &str, param: Value) -> bool {
        self.session_mut().receive(msg, param)
    }

    /// Async counterpart of [`receive`](TransactionManager::receive).
    pub async fn receive_async(&mut self, msg: &str, param: Value) -> bool {
        self.session_mut().receive_async(msg, param).await
    }

    /// Route a field transaction to the innermost active request.
    pub fn transact(&mut self, target: &str, data: &Value) {
        self.session_mut().transact(target, data);
    }

    /// Commit the innermost staged request of the current session.
    pub fn commit_active(
        &mut self,
        merge_with_previous: bool,
    ) -> Option<Result<Value, CommitError>> {
        let kind = self.session().active_request()?.core().kind().to_owned();
        let result = self.session_mut().commit_active(merge_with_previous)?;
        if result.is_ok() {
            self.emit(&TxnEvent::Committed { kind });
        }
        Some(result)
    }

    /// Abort the innermost staged request of the current session.
    pub fn abort_active(&mut self) -> Option<Result<(), TxnError>> {
        let kind = self.session().active_request()?.core().kind().to_owned();
        let result = self.session_mut().abort_active()?;
        if result.is_ok() {
            self.emit(&TxnEvent::Aborted { kind });
        }
        Some(result)
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Whether undo is currently possible (history present and not
    /// blocked).
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_redo_blocked && self.undo_redo_session().can_undo()
    }

    /// Whether redo is currently possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.undo_redo_blocked && self.undo_redo_session().can_redo()
    }

    /// Suppress undo/redo until [`unblock_undo_redo`] is called.
    ///
    /// [`unblock_undo_redo`]: TransactionManager::unblock_undo_redo
    pub fn block_undo_redo(&mut self) {
        self.undo_redo_blocked = true;
    }

    /// Lift an undo/redo block.
    pub fn unblock_undo_redo(&mut self) {
        self.undo_redo_blocked = false;
    }

    /// Whether undo/redo is currently blocked.
    #[must_use]
    pub fn undo_redo_blocked(&self) -> bool {
        self.undo_redo_blocked
    }

    /// Overlay sessions that opted out of undo/redo cannot survive a
    /// history navigation under them; abort them first.
    fn prepare_undo_redo(&mut self) {
        while let Some(entry) = self.overlays.last() {
            if entry.undo_redo {
                break;
            }
            let token = entry.token;
            tracing::warn!(
                token = token.0,
                "aborting session without undo/redo before history navigation"
            );
            self.abort_session(token);
        }
    }

    /// Undo the most recent commit of the undo/redo session.
    ///
    /// `Ok(false)` when undo/redo is blocked; otherwise the undo is
    /// performed or its failure propagates.
    pub fn undo(&mut self) -> Result<bool, TxnError> {
        if self.undo_redo_blocked {
            tracing::warn!("undo requested while undo/redo is blocked");
            return Ok(false);
        }
        self.prepare_undo_redo();
        let session = self.undo_redo_session_mut();
        let kind = session
            .peek_next_undo_request()
            .ok_or(TxnError::NothingToUndo)?
            .core()
            .kind()
            .to_owned();
        session.undo()?;
        self.emit(&TxnEvent::Undone { kind });
        Ok(true)
    }

    /// Redo the most recently undone request of the undo/redo session.
    ///
    /// `Ok(false)` when undo/redo is blocked.
    pub fn redo(&mut self) -> Result<bool, TxnError> {
        if self.undo_redo_blocked {
            tracing::warn!("redo requested while undo/redo is blocked");
            return Ok(false);
        }
        self.prepare_undo_redo();
        let session = self.undo_redo_session_mut();
        let kind = session
            .peek_next_redo_request()
            .ok_or(TxnError::NothingToRedo)?
            .core()
            .kind()
            .to_owned();
        session.redo()?;
        self.emit(&TxnEvent::Redone { kind });
        Ok(true)
    }

    // ========================================================================
    // Overlay sessions
    // ========================================================================

    /// Push an overlay session; commits and messages now target it.
    pub fn start_session(&mut self, options: SessionOptions) -> SessionToken {
        let token = SessionToken(self.next_token);
        self.next_token += 1;
        self.overlays.push(SessionEntry {
            token,
            undo_redo: options.undo_redo,
            session: Session::new(options.config),
        });
        self.emit(&TxnEvent::SessionStarted { token });
        token
    }

    fn take_top_session(&mut self, token: SessionToken, op: &str) -> Option<SessionEntry> {
        let top_matches = self
            .overlays
            .last()
            .is_some_and(|entry| entry.token == token);
        if !top_matches {
            tracing::warn!(token = token.0, op, "token does not name the top session");
            return None;
        }
        self.overlays.pop()
    }

    /// Pop the top overlay session and transfer its committed work into
    /// the session below.
    ///
    /// With `merge_into_one` the overlay's history is folded into a
    /// single request before the transfer, so it occupies one undo slot
    /// in the parent. Staged requests left on the overlay are aborted.
    /// Returns `false` (with a warning) when `token` does not name the
    /// top overlay.
    pub fn commit_session(&mut self, token: SessionToken, merge_into_one: bool) -> bool {
        let Some(mut entry) = self.take_top_session(token, "commit_session") else {
            return false;
        };
        while let Some(result) = entry.session.abort_active() {
            if let Err(err) = result {
                tracing::warn!(%err, "staged request failed to abort during session commit");
            }
        }
        if merge_into_one {
            if let Some(folded) = entry.session.to_request() {
                let kind = folded.core().kind().to_owned();
                self.session_mut().post_commit(folded, false);
                self.emit(&TxnEvent::Committed { kind });
            }
        } else {
            for request in entry.session.to_requests() {
                let kind = request.core().kind().to_owned();
                self.session_mut().post_commit(request, false);
                self.emit(&TxnEvent::Committed { kind });
            }
        }
        self.emit(&TxnEvent::SessionEnded { token });
        true
    }

    /// Pop the top overlay session, reverting everything it committed
    /// (newest first) and aborting its staged requests.
    ///
    /// Returns `false` (with a warning) when `token` does not name the
    /// top overlay.
    pub fn abort_session(&mut self, token: SessionToken) -> bool {
        let Some(mut entry) = self.take_top_session(token, "abort_session") else {
            return false;
        };
        while let Some(result) = entry.session.abort_active() {
            if let Err(err) = result {
                tracing::warn!(%err, "staged request failed to abort during session abort");
            }
        }
        while entry.session.can_undo() {
            if let Err(err) = entry.session.undo() {
                tracing::warn!(%err, "undo failed during session abort; remaining work kept");
                break;
            }
        }
        self.emit(&TxnEvent::SessionEnded { token });
        true
    }

    /// Pop the top overlay session and discard its history without
    /// reverting or transferring anything. For sessions whose work was
    /// already handed off elsewhere.
    ///
    /// Returns `false` (with a warning) when `token` does not name the
    /// top overlay.
    pub fn end_session(&mut self, token: SessionToken) -> bool {
        let Some(mut entry) = self.take_top_session(token, "end_session") else {
            return false;
        };
        entry.session.reset();
        self.emit(&TxnEvent::SessionEnded { token });
        true
    }

    /// Undo bound of the current session.
    #[must_use]
    pub fn max_undo_steps(&self) -> usize {
        self.session().max_undo_steps()
    }

    /// Clear the current session's undo and redo history, leaving staged
    /// requests and the session stack in place.
    pub fn clear(&mut self) {
        self.session_mut().clear_history();
    }

    /// Drop all overlay sessions and clear the default session's history
    /// and staged requests.
    pub fn reset(&mut self) {
        self.overlays.clear();
        self.default_session.reset();
        self.undo_redo_blocked = false;
    }

    // ========================================================================
    // Persistence and replay
    // ========================================================================

    /// Serialize the current session's undo history, oldest first.
    pub fn serialize_session(&self) -> Result<Vec<RequestRecord>, TxnError> {
        self.session().serialize_history()
    }

    fn decode_record(
        &self,
        record: &RequestRecord,
    ) -> Result<(Box<dyn Request>, Vec<Message>), TxnError> {
        let request_type = self
            .registry
            .get(&record.kind)
            .ok_or_else(|| TxnError::UnregisteredType(record.kind.clone()))?;
        let args = (request_type.codec.parse_args)(&record.args)?;
        let messages = (request_type.codec.parse_messages)(&record.msgs)?;
        let mut request = (request_type.ctor)(&args);
        request.core_mut().set_kind(record.kind.clone());
        request.core_mut().set_args(args);
        Ok((request, messages))
    }

    async fn decode_record_async(
        &self,
        record: &RequestRecord,
    ) -> Result<(Box<dyn Request>, Vec<Message>), TxnError> {
        let request_type = self
            .registry
            .get(&record.kind)
            .ok_or_else(|| TxnError::UnregisteredType(record.kind.clone()))?;
        let args = match &request_type.codec.parse_args_async {
            Some(parse) => parse(record.args.clone()).await?,
            None => (request_type.codec.parse_args)(&record.args)?,
        };
        let messages = match &request_type.codec.parse_messages_async {
            Some(parse) => parse(record.msgs.clone()).await?,
            None => (request_type.codec.parse_messages)(&record.msgs)?,
        };
        let mut request = (request_type.ctor)(&args);
        request.core_mut().set_kind(record.kind.clone());
        request.core_mut().set_args(args);
        Ok((request, messages))
    }

    /// Rebuild and commit each record, oldest first, re-delivering its
    /// recorded messages.
    ///
    /// Applied to the same starting document state, this reproduces the
    /// persisted edits. Records whose messages used the async channel are
    /// a [`TxnError::AsyncReplayRequired`] error; use
    /// [`replay_async`](TransactionManager::replay_async).
    pub fn replay(&mut self, records: &[RequestRecord]) -> Result<Vec<Value>, TxnError> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let (mut request, messages) = self.decode_record(record)?;
            if messages.iter().any(|message| message.is_async) {
                return Err(TxnError::AsyncReplayRequired(record.kind.clone()));
            }
            request.activate();
            for message in messages {
                request.deliver(&message.msg, message.param);
            }
            let result = self.commit(request, false).map_err(TxnError::from)?;
            results.push(result);
        }
        Ok(results)
    }

    /// Async counterpart of [`replay`](TransactionManager::replay).
    /// Messages are re-delivered on the channel they originally used.
    pub async fn replay_async(
        &mut self,
        records: &[RequestRecord],
    ) -> Result<Vec<Value>, TxnError> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let (mut request, messages) = self.decode_record_async(record).await?;
            request.activate();
            for message in messages {
                if message.is_async {
                    request.deliver_async(&message.msg, message.param).await;
                } else {
                    request.deliver(&message.msg, message.param);
                }
            }
            let result = self
                .commit_async(request, false)
                .await
                .map_err(TxnError::from)?;
            results.push(result);
        }
        Ok(results)
    }
}
