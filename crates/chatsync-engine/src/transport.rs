//! Transport trait and push-channel event types.
//!
//! The [`ChatTransport`] trait decouples the engine from the concrete
//! message transport (HTTP + socket, QUIC, in-memory mock). The embedding
//! application implements it once; the generic [`crate::Runtime`] handles all
//! orchestration, so the same engine code runs in production and in tests.

use std::future::Future;

use chatsync_core::{Message, RoomId};

/// Room metadata from the transport's details endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomMetadata {
    /// Room identifier.
    pub room_id: RoomId,
    /// Human-readable room name.
    pub name: String,
    /// Number of members, if the transport reports it.
    pub member_count: Option<u32>,
}

/// Pagination parameters for a history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 50 }
    }
}

/// Acknowledgement of a mark-as-read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkReadAck {
    /// Remaining unread count the server reports for this client.
    pub unread_count: u32,
}

/// Room-scoped events emitted by the push channel.
///
/// Every variant carries the room it belongs to; the
/// [`crate::EventRouter`] drops events for rooms other than the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A message reached the room (including the echo of our own sends).
    MessageReceived {
        /// Room the message belongs to.
        room_id: RoomId,
        /// The server-confirmed message.
        message: Message,
    },
    /// A user started typing.
    TypingStarted {
        /// Room the indicator belongs to.
        room_id: RoomId,
        /// Typing user's stable id.
        user_id: u64,
        /// Typing user's display name.
        user_name: String,
    },
    /// A user stopped typing.
    TypingStopped {
        /// Room the indicator belongs to.
        room_id: RoomId,
        /// User's stable id.
        user_id: u64,
        /// User's display name.
        user_name: String,
    },
    /// A user read the room.
    MessageRead {
        /// Room that was read.
        room_id: RoomId,
        /// Reading user's stable id.
        user_id: u64,
    },
}

impl PushEvent {
    /// Room this event is scoped to.
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::MessageReceived { room_id, .. }
            | Self::TypingStarted { room_id, .. }
            | Self::TypingStopped { room_id, .. }
            | Self::MessageRead { room_id, .. } => *room_id,
        }
    }
}

/// Abstracts the message transport for the engine runtime.
///
/// Request/response methods take `&self` and return `Send` futures so the
/// runtime can run them concurrently on clones of the driver handle (typical
/// HTTP clients are cheap-clone handles). The push channel is a pull-based
/// `&mut self` receiver, mirroring how a socket connection is owned.
///
/// Connectivity is the driver's concern: if the push channel is down,
/// `recv_push` simply yields nothing until reconnection, and the engine's
/// subscription stays bound.
pub trait ChatTransport: Send {
    /// Driver-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Fetch metadata for a room.
    fn fetch_room_details(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<RoomMetadata, Self::Error>> + Send;

    /// Fetch one page of room history, newest-first.
    fn fetch_message_page(
        &self,
        room_id: RoomId,
        page: PageRequest,
    ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send;

    /// Send a message; the response echoes it with the server-assigned id.
    fn send_message(
        &self,
        room_id: RoomId,
        content: String,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send;

    /// Mark the room read for this client.
    fn mark_read(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<MarkReadAck, Self::Error>> + Send;

    /// Announce the local user's typing state.
    fn set_typing(
        &self,
        room_id: RoomId,
        is_typing: bool,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Join the room on the membership service.
    fn join_room(&self, room_id: RoomId) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Leave the room on the membership service.
    fn leave_room(&self, room_id: RoomId) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next push event.
    ///
    /// Returns `None` when the push channel is closed for good.
    fn recv_push(&mut self) -> impl Future<Output = Option<PushEvent>> + Send;
}
