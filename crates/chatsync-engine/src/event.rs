//! Controller events and actions.

use chatsync_core::{Message, MessageId, RoomId};

use crate::{
    error::TransportError,
    transport::{MarkReadAck, PushEvent, RoomMetadata},
};

/// Events the caller feeds into the [`crate::SyncController`].
///
/// The caller is responsible for:
/// - Forwarding presentation intents (open, send, keystrokes, close)
/// - Delivering push events and transport completions
/// - Driving time forward via ticks
///
/// Generic over `I` (instant type) to support both production
/// (`std::time::Instant`) and simulated clocks.
#[derive(Debug, Clone)]
pub enum SyncEvent<I = std::time::Instant> {
    /// The presentation layer opened a room view.
    OpenRoom {
        /// Room to open.
        room_id: RoomId,
    },

    /// The presentation layer navigated away from the active room.
    CloseRoom,

    /// The local user typed a character in the compose field.
    Keystroke {
        /// Current time.
        now: I,
    },

    /// The local user submitted a message.
    SendMessage {
        /// Message text.
        content: String,
    },

    /// Explicit user-driven retry of a failed send.
    RetrySend {
        /// Temporary id of the failed message.
        temp_id: MessageId,
    },

    /// Explicit retry of a failed history load.
    RetryHistory,

    /// Time tick for debounce and expiry processing.
    ///
    /// The caller should send ticks periodically; the controller compares
    /// `now` against its stored deadlines.
    Tick {
        /// Current time.
        now: I,
    },

    /// Event delivered by the push channel.
    Push {
        /// The room-scoped event.
        event: PushEvent,
        /// Arrival time, for remote typing deadlines.
        now: I,
    },

    /// A history fetch completed.
    HistoryLoaded {
        /// Room the fetch was issued for.
        room_id: RoomId,
        /// Newest-first page, or the failure to surface.
        result: Result<Vec<Message>, TransportError>,
    },

    /// A room-details fetch completed.
    RoomDetailsLoaded {
        /// Room the fetch was issued for.
        room_id: RoomId,
        /// Metadata, or a failure (logged, not surfaced).
        result: Result<RoomMetadata, TransportError>,
    },

    /// A send request completed.
    SendCompleted {
        /// Room the send was issued for.
        room_id: RoomId,
        /// Temporary id assigned at `append_optimistic` time.
        temp_id: MessageId,
        /// Server-confirmed message, or the failure that marks it failed.
        result: Result<Message, TransportError>,
    },

    /// A mark-as-read request completed.
    MarkReadCompleted {
        /// Room the request was issued for.
        room_id: RoomId,
        /// Unread count acknowledgement, or a failure (logged).
        result: Result<MarkReadAck, TransportError>,
    },

    /// Stop the engine. The controller itself ignores this; the runtime
    /// exits its loop.
    Shutdown,
}

/// Actions the controller produces for the runtime to execute.
///
/// Request actions carry the room id they were issued for; the matching
/// completion event echoes it back so the controller can discard responses
/// that outlive their room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Fetch room metadata.
    FetchRoomDetails {
        /// Target room.
        room_id: RoomId,
    },

    /// Fetch the first history page.
    FetchHistory {
        /// Target room.
        room_id: RoomId,
    },

    /// Mark the room read (fire-and-forget relative to the history load).
    MarkRead {
        /// Target room.
        room_id: RoomId,
    },

    /// Join the room on the membership service.
    JoinRoom {
        /// Target room.
        room_id: RoomId,
    },

    /// Leave the room on the membership service.
    LeaveRoom {
        /// Target room.
        room_id: RoomId,
    },

    /// Issue the send request for an optimistic message.
    Send {
        /// Target room.
        room_id: RoomId,
        /// Temporary id the completion event must echo back.
        temp_id: MessageId,
        /// Message text.
        content: String,
    },

    /// Announce the local user's typing state.
    SetTyping {
        /// Target room.
        room_id: RoomId,
        /// True on the started announcement, false on stopped.
        is_typing: bool,
    },

    /// Restore text to the compose field after a failed send.
    RestoreCompose {
        /// The text the user typed.
        content: String,
    },

    /// Republish the view snapshot to the presentation layer.
    Render,
}
