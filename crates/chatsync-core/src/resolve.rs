//! Message identity resolution.
//!
//! The transport round-trip for a send means the client creates a temporary
//! message before any server id exists. When the server's echo arrives
//! asynchronously over the push channel, resolution decides whether the
//! incoming message is new, a duplicate, or the confirmed counterpart of a
//! pending local message.

use std::collections::HashSet;

use crate::message::{Lifecycle, Message, MessageId};

/// Outcome of resolving an incoming message against the room's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not seen before and matches no pending send: append at the tail.
    Admit,
    /// Already admitted: the caller must no-op.
    Duplicate,
    /// Confirmed counterpart of the pending message with this temporary id:
    /// replace it in place, preserving list position.
    Reconcile(MessageId),
}

/// Resolve an incoming message to [`Admit`](Resolution::Admit),
/// [`Duplicate`](Resolution::Duplicate), or
/// [`Reconcile`](Resolution::Reconcile).
///
/// The seen-id check runs first, so under at-least-once delivery a redelivered
/// message is always a silent duplicate. Otherwise the first pending message
/// with the same sender and identical content is taken as the counterpart; no
/// timestamp comparison is made.
///
/// Known limitation: two distinct in-flight messages with identical content
/// from the same sender cannot be disambiguated, and the first pending match
/// wins. This mirrors the common case (one send, one echo) exactly and is
/// deliberately not strengthened.
pub fn resolve(
    candidate: &Message,
    seen: &HashSet<MessageId>,
    messages: &[Message],
) -> Resolution {
    if seen.contains(&candidate.id) {
        return Resolution::Duplicate;
    }

    let counterpart = messages.iter().find(|m| {
        matches!(m.lifecycle, Lifecycle::Pending)
            && m.sender_id == candidate.sender_id
            && m.content == candidate.content
    });

    match counterpart {
        Some(pending) => Resolution::Reconcile(pending.id.clone()),
        None => Resolution::Admit,
    }
}
