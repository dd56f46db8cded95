//! Orchestration layer for chat timeline synchronization.
//!
//! Sequences the pure state machines in [`chatsync_core`] across a room's
//! open/close lifecycle, the optimistic-send protocol, and the push channel,
//! and provides a tokio runtime that executes the resulting actions against a
//! pluggable transport.
//!
//! # Components
//!
//! - [`SyncController`]: pure orchestration state machine (open, send, close,
//!   stale-response discard)
//! - [`EventRouter`]: push-channel binding with an explicit
//!   activate/deactivate lifecycle
//! - [`ChatTransport`]: trait the embedding application implements for its
//!   request/response and push I/O
//! - [`Runtime`] / [`SyncHandle`]: tokio event loop and the clonable handle
//!   the presentation layer drives
//!
//! Everything below [`Runtime`] is I/O-free and deterministic: time arrives
//! as explicit `now` inputs and transport completions as events, so every
//! ordering property is testable without a network or a clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod controller;
mod error;
mod event;
mod router;
mod runtime;
mod transport;

pub use controller::{HistoryState, ReadState, SessionInfo, SyncController};
pub use error::TransportError;
pub use event::{SyncAction, SyncEvent};
pub use router::EventRouter;
pub use runtime::{RoomView, Runtime, SyncHandle, TICK_INTERVAL};
pub use transport::{ChatTransport, MarkReadAck, PageRequest, PushEvent, RoomMetadata};
