#![forbid(unsafe_code)]

//! Undoware
//!
//! A transactional undo/redo engine built on reversible requests. Every
//! document mutation is a [`Request`] with commit/undo/redo hooks;
//! sessions stack committed requests for history navigation, and a
//! [`TransactionManager`] ties a request-type registry, a session stack,
//! and history persistence together for one document.
//!
//! # Key Components
//!
//! - [`Request`] - Trait for reversible units of work with lifecycle hooks
//! - [`RequestCore`] - Engine bookkeeping embedded by every request
//! - [`CompositeRequest`] - Groups child requests for atomic undo/redo
//! - [`Session`] - Bounded undo/redo stacks plus staged-request routing
//! - [`TransactionManager`] - Registry, factory, session stack, replay
//! - [`RequestRecord`] - Persisted form of a committed request
//!
//! # How the pieces fit
//!
//! The manager is the front door. Embedders register request kinds, build
//! requests through [`TransactionManager::create_request`], and either
//! commit them directly or stage them for interactive messaging. Commits
//! land on the current [`Session`]; undo/redo navigate its stacks.
//! Overlay sessions scope nested workflows and fold their history into
//! the parent on commit. [`TransactionManager::replay`] reconstructs a
//! serialized history against a fresh document.

pub mod composite;
pub mod error;
pub mod manager;
pub mod replay;
pub mod request;
pub mod session;

pub use composite::{COMPOSITE_KIND, CompositeRequest};
pub use error::{CommitError, TxnError};
pub use manager::{
    ArgAdapter, EventListener, ParseArgsAsyncFn, ParseArgsFn, ParseMessagesAsyncFn,
    ParseMessagesFn, RequestCodec, RequestCtor, RequestType, SessionOptions, SessionToken,
    TransactionManager, TxnEvent,
};
pub use replay::{RequestRecord, compose_requests, decode_messages, encode_messages};
pub use request::{ComposeSpec, Message, Request, RequestCore};
pub use session::{DEFAULT_MAX_UNDO_STEPS, RequestFilter, Session, SessionConfig};
