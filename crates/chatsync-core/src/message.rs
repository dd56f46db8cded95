//! Message data model.
//!
//! These types are the "view model" shared by the store, the router, and the
//! presentation layer: the subset of transport state needed to render a
//! timeline, without any wire-format concerns.

/// Room identifier assigned by the server.
pub type RoomId = u64;

/// Message identifier, unique within a room's message set.
///
/// Server-assigned ids and client-generated temporary ids share this type;
/// temporary ids carry the [`TEMP_ID_PREFIX`] namespace so the two id spaces
/// can never collide.
pub type MessageId = String;

/// Namespace prefix for client-generated temporary message ids.
pub const TEMP_ID_PREFIX: &str = "local-";

/// Delivery lifecycle of a message as known to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created locally, send in flight, not yet acknowledged.
    Pending,
    /// Acknowledged by the server (history, send response, or push echo).
    Confirmed,
    /// The send request errored; retried only by explicit user action.
    Failed,
}

/// One chat message as known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identity within the room's message set.
    pub id: MessageId,
    /// Owning room.
    pub room_id: RoomId,
    /// Sender's stable ID.
    pub sender_id: u64,
    /// Sender's display name.
    pub sender_display: String,
    /// Text payload.
    pub content: String,
    /// Server timestamp (milliseconds). Provisional for pending messages.
    pub created_at: u64,
    /// Delivery lifecycle.
    pub lifecycle: Lifecycle,
}

impl Message {
    /// True while the message exists only on this client (pending or failed).
    pub fn is_local_only(&self) -> bool {
        !matches!(self.lifecycle, Lifecycle::Confirmed)
    }

    /// True if the id is in the client-generated temporary namespace.
    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(lifecycle: Lifecycle) -> Message {
        Message {
            id: "42".into(),
            room_id: 1,
            sender_id: 7,
            sender_display: "ada".into(),
            content: "hello".into(),
            created_at: 1000,
            lifecycle,
        }
    }

    #[test]
    fn local_only_tracks_lifecycle() {
        assert!(message(Lifecycle::Pending).is_local_only());
        assert!(message(Lifecycle::Failed).is_local_only());
        assert!(!message(Lifecycle::Confirmed).is_local_only());
    }

    #[test]
    fn temp_id_namespace_detection() {
        let mut m = message(Lifecycle::Pending);
        assert!(!m.has_temp_id());
        m.id = format!("{TEMP_ID_PREFIX}3");
        assert!(m.has_temp_id());
    }
}
