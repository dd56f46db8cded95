//! Error types for the store layer.
//!
//! Strongly-typed errors so callers can distinguish a genuinely unknown
//! temporary id (a logic bug or a lost race) from a misuse of the store,
//! rather than matching on strings.

use thiserror::Error;

use crate::message::{MessageId, RoomId};

/// Errors that can occur when mutating a [`crate::RoomMessageStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No local (pending or failed) message carries this temporary id.
    #[error("unknown temporary id: {temp_id}")]
    UnknownTempId {
        /// The id that matched no local entry.
        temp_id: MessageId,
    },

    /// The candidate belongs to a different room than the store.
    #[error("room mismatch: store owns room {expected}, message is for {got}")]
    RoomMismatch {
        /// Room the store was opened for.
        expected: RoomId,
        /// Room carried by the rejected message.
        got: RoomId,
    },

    /// Retry requested for a message that has not failed.
    #[error("message {temp_id} is not in the failed state")]
    NotFailed {
        /// Id of the message in the wrong lifecycle state.
        temp_id: MessageId,
    },
}
