#![forbid(unsafe_code)]

//! Error taxonomy for the transaction engine.
//!
//! Engine-level invariants (registry lookup, stack preconditions, the
//! single-commit rule) fail loudly with a [`TxnError`]. Domain failures
//! raised inside request hooks propagate through the same type untouched;
//! the engine never retries a hook.
//!
//! Two outcomes are deliberately *not* errors:
//!
//! - a compose hook rejecting a merge (the request is pushed as a new
//!   stack entry instead),
//! - an interactive message going unhandled (`receive` returns `false`).

use std::fmt;

use crate::request::Request;

/// Errors surfaced by the transaction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnError {
    /// `create_request` was called with a kind nothing registered.
    UnregisteredType(String),
    /// A second registration was attempted under the same kind.
    DuplicateType(String),
    /// `commit` was called on a request that already committed.
    AlreadyCommitted(String),
    /// `undo` was called on an empty undo stack.
    NothingToUndo,
    /// `redo` was called on an empty redo stack.
    NothingToRedo,
    /// The request kind has no serialization hooks or codec.
    NotSerializable(String),
    /// A history record failed to parse.
    Codec(String),
    /// The record carries async-channel messages; use the async replay path.
    AsyncReplayRequired(String),
    /// Domain failure raised by a request hook.
    Domain(String),
}

impl fmt::Display for TxnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredType(kind) => {
                write!(f, "no request type registered under '{}'", kind)
            }
            Self::DuplicateType(kind) => {
                write!(f, "request type '{}' is already registered", kind)
            }
            Self::AlreadyCommitted(kind) => {
                write!(f, "request '{}' was already committed", kind)
            }
            Self::NothingToUndo => write!(f, "undo stack is empty"),
            Self::NothingToRedo => write!(f, "redo stack is empty"),
            Self::NotSerializable(kind) => {
                write!(f, "request type '{}' has no serialization hooks", kind)
            }
            Self::Codec(msg) => write!(f, "history codec error: {}", msg),
            Self::AsyncReplayRequired(kind) => {
                write!(
                    f,
                    "request '{}' recorded async messages; use replay_async",
                    kind
                )
            }
            Self::Domain(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TxnError {}

impl From<serde_json::Error> for TxnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

/// A failed commit, carrying the un-committed request back to the caller.
///
/// The engine does not roll back partial domain mutation on its own; the
/// caller decides whether to [`abort`](crate::request::Request::abort) the
/// returned request or retry with a fresh one.
pub struct CommitError {
    /// The request whose commit hook failed. It is *not* committed.
    pub request: Box<dyn Request>,
    /// The underlying failure.
    pub source: TxnError,
}

impl fmt::Debug for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitError")
            .field("kind", &self.request.core().kind())
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commit of '{}' failed: {}",
            self.request.core().kind(),
            self.source
        )
    }
}

impl std::error::Error for CommitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<CommitError> for TxnError {
    fn from(err: CommitError) -> Self {
        err.source
    }
}
