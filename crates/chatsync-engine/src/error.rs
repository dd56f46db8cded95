//! Engine-side error types.
//!
//! Transport drivers define their own error types behind the
//! [`crate::ChatTransport`] associated `Error`; at the event boundary they
//! are carried as a stringly [`TransportError`] so completion events stay
//! independent of any concrete driver. This is boundary conversion only;
//! drivers keep their typed errors internally.

use thiserror::Error;

/// A transport operation failed.
///
/// Carried inside completion events ([`crate::SyncEvent::HistoryLoaded`] and
/// friends); the controller decides per operation whether the failure is
/// surfaced, scoped to one message, or merely logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(
    /// Driver error message.
    pub String,
);

impl TransportError {
    /// Wrap any driver error by its display representation.
    pub fn from_driver<E: std::fmt::Display>(err: &E) -> Self {
        Self(err.to_string())
    }
}
