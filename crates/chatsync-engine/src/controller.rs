//! Synchronization controller.
//!
//! The [`SyncController`] sequences the core state machines across the room
//! open/close lifecycle and the optimistic-send protocol. It is a pure state
//! machine in the action style: it consumes [`SyncEvent`] inputs and returns
//! [`SyncAction`] instructions for the runtime to execute, with no I/O
//! dependencies, so every ordering property is testable deterministically.
//!
//! Request actions are tagged with the room they were issued for and the
//! matching completion events echo the tag back; a completion whose room is
//! no longer active is discarded, so a slow history fetch for an abandoned
//! room can never overwrite the current room's timeline.

use std::{collections::HashSet, ops::Sub, time::Duration};

use chatsync_core::{
    ConfirmOutcome, Message, RoomId, RoomMessageStore, StoreError, TypingSignal, TypingTracker,
    TypingUser,
};

use crate::{
    error::TransportError,
    event::{SyncAction, SyncEvent},
    router::EventRouter,
    transport::{MarkReadAck, RoomMetadata},
};

/// Identity of the local user, stamped onto optimistic sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Local user's stable id.
    pub sender_id: u64,
    /// Local user's display name.
    pub sender_display: String,
}

/// Loading state of the active room's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryState {
    /// Fetch in flight; the timeline is not yet authoritative.
    Loading,
    /// Timeline reflects the last fetched page.
    Loaded,
    /// The fetch failed; retryable, the timeline was left untouched.
    Failed(TransportError),
}

/// Read-state bookkeeping for the active room.
#[derive(Debug, Clone, Default)]
pub struct ReadState {
    read_by: HashSet<u64>,
    unread_count: Option<u32>,
}

impl ReadState {
    /// Empty read state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user_id` read the room. Returns true if newly recorded.
    pub fn record(&mut self, user_id: u64) -> bool {
        self.read_by.insert(user_id)
    }

    /// Users known to have read the room.
    pub fn read_by(&self) -> &HashSet<u64> {
        &self.read_by
    }

    /// Store the server-acknowledged unread count.
    pub fn set_unread_count(&mut self, count: u32) {
        self.unread_count = Some(count);
    }

    /// Last unread count the server acknowledged, if any.
    pub fn unread_count(&self) -> Option<u32> {
        self.unread_count
    }
}

/// Everything scoped to the currently open room. Dropped wholesale on close
/// or room switch, which is what cancels typing deadlines and invalidates
/// stale completions.
#[derive(Debug, Clone)]
struct ActiveRoom<I> {
    room_id: RoomId,
    store: RoomMessageStore,
    typing: TypingTracker<I>,
    read: ReadState,
    history: HistoryState,
    metadata: Option<RoomMetadata>,
}

impl<I> ActiveRoom<I> {
    fn new(room_id: RoomId, next_temp: u64) -> Self {
        Self {
            room_id,
            store: RoomMessageStore::with_next_temp(room_id, next_temp),
            typing: TypingTracker::new(),
            read: ReadState::new(),
            history: HistoryState::Loading,
            metadata: None,
        }
    }
}

/// Orchestration state machine for one active chat room.
///
/// Generic over the instant type `I`; production uses `std::time::Instant`,
/// tests use whatever clock they like.
#[derive(Debug, Clone)]
pub struct SyncController<I> {
    session: SessionInfo,
    router: EventRouter,
    active: Option<ActiveRoom<I>>,
    /// Temporary-id sequence, owned by the session rather than the room:
    /// surviving room resets keeps a stale send completion from a previous
    /// incarnation of the same room from ever naming a new pending message.
    next_temp: u64,
}

impl<I: Copy + Sub<Output = Duration>> SyncController<I> {
    /// Create a controller for the given local session.
    pub fn new(session: SessionInfo) -> Self {
        Self { session, router: EventRouter::new(), active: None, next_temp: 0 }
    }

    /// Process one event and return the actions to execute.
    pub fn handle(&mut self, event: SyncEvent<I>) -> Vec<SyncAction> {
        match event {
            SyncEvent::OpenRoom { room_id } => self.open_room(room_id),
            SyncEvent::CloseRoom => self.close_room(),
            SyncEvent::Keystroke { now } => self.keystroke(now),
            SyncEvent::SendMessage { content } => self.send_message(content),
            SyncEvent::RetrySend { temp_id } => self.retry_send(&temp_id),
            SyncEvent::RetryHistory => self.retry_history(),
            SyncEvent::Tick { now } => self.tick(now),
            SyncEvent::Push { event, now } => self.push(event, now),
            SyncEvent::HistoryLoaded { room_id, result } => self.history_loaded(room_id, result),
            SyncEvent::RoomDetailsLoaded { room_id, result } => {
                self.details_loaded(room_id, result)
            },
            SyncEvent::SendCompleted { room_id, temp_id, result } => {
                self.send_completed(room_id, &temp_id, result)
            },
            SyncEvent::MarkReadCompleted { room_id, result } => {
                self.mark_read_completed(room_id, result)
            },
            SyncEvent::Shutdown => vec![],
        }
    }

    /// Open sequence: reset room state, fetch details and history, mark
    /// read, then bind the push channel. Later steps assume earlier ones.
    fn open_room(&mut self, room_id: RoomId) -> Vec<SyncAction> {
        let mut actions = self.router.deactivate();
        self.active = Some(ActiveRoom::new(room_id, self.next_temp));

        actions.push(SyncAction::FetchRoomDetails { room_id });
        actions.push(SyncAction::FetchHistory { room_id });
        actions.push(SyncAction::MarkRead { room_id });
        actions.extend(self.router.activate(room_id));
        actions.push(SyncAction::Render);
        actions
    }

    /// Teardown: dropping the room state cancels all typing deadlines;
    /// unbinding is idempotent, so this is safe even after a partial open.
    fn close_room(&mut self) -> Vec<SyncAction> {
        let mut actions = self.router.deactivate();
        if self.active.take().is_some() {
            actions.push(SyncAction::Render);
        }
        actions
    }

    fn keystroke(&mut self, now: I) -> Vec<SyncAction> {
        let Some(room) = self.active.as_mut() else { return vec![] };
        match room.typing.keystroke(now) {
            Some(TypingSignal::Started) => {
                vec![SyncAction::SetTyping { room_id: room.room_id, is_typing: true }]
            },
            _ => vec![],
        }
    }

    /// Optimistic-send protocol: stop typing immediately, show the pending
    /// message before any round trip, then issue the request.
    fn send_message(&mut self, content: String) -> Vec<SyncAction> {
        let Some(room) = self.active.as_mut() else {
            tracing::warn!("send with no active room, dropped");
            return vec![];
        };
        if content.trim().is_empty() {
            return vec![];
        }

        let mut actions = Vec::new();
        if matches!(room.typing.message_sent(), Some(TypingSignal::Stopped)) {
            actions.push(SyncAction::SetTyping { room_id: room.room_id, is_typing: false });
        }

        let temp_id = room.store.append_optimistic(
            content.clone(),
            self.session.sender_id,
            self.session.sender_display.clone(),
        );
        self.next_temp = room.store.next_temp();
        actions.push(SyncAction::Render);
        actions.push(SyncAction::Send { room_id: room.room_id, temp_id, content });
        actions
    }

    fn retry_send(&mut self, temp_id: &str) -> Vec<SyncAction> {
        let Some(room) = self.active.as_mut() else { return vec![] };
        match room.store.retry(temp_id) {
            Ok(content) => vec![
                SyncAction::Render,
                SyncAction::Send { room_id: room.room_id, temp_id: temp_id.to_string(), content },
            ],
            Err(err) => {
                tracing::warn!(%err, temp_id, "retry rejected");
                vec![]
            },
        }
    }

    fn retry_history(&mut self) -> Vec<SyncAction> {
        let Some(room) = self.active.as_mut() else { return vec![] };
        if !matches!(room.history, HistoryState::Failed(_)) {
            return vec![];
        }
        room.history = HistoryState::Loading;
        vec![SyncAction::FetchHistory { room_id: room.room_id }, SyncAction::Render]
    }

    fn tick(&mut self, now: I) -> Vec<SyncAction> {
        let Some(room) = self.active.as_mut() else { return vec![] };

        let mut actions = Vec::new();
        if matches!(room.typing.poll_local(now), Some(TypingSignal::Stopped)) {
            actions.push(SyncAction::SetTyping { room_id: room.room_id, is_typing: false });
        }
        if room.typing.expire_remote(now) > 0 {
            actions.push(SyncAction::Render);
        }
        actions
    }

    fn push(&mut self, event: crate::transport::PushEvent, now: I) -> Vec<SyncAction> {
        let Some(room) = self.active.as_mut() else {
            tracing::trace!(room_id = event.room_id(), "push event with no open room, dropped");
            return vec![];
        };
        let changed =
            self.router.route(event, now, &mut room.store, &mut room.typing, &mut room.read);
        if changed { vec![SyncAction::Render] } else { vec![] }
    }

    fn history_loaded(
        &mut self,
        room_id: RoomId,
        result: Result<Vec<Message>, TransportError>,
    ) -> Vec<SyncAction> {
        let Some(room) = self.active_for(room_id, "history response") else { return vec![] };
        match result {
            Ok(page) => {
                room.store.load_history(page);
                room.history = HistoryState::Loaded;
            },
            Err(err) => {
                // Store untouched: the failure is surfaced as a retryable
                // state, not an empty timeline.
                tracing::warn!(%err, room_id, "history load failed");
                room.history = HistoryState::Failed(err);
            },
        }
        vec![SyncAction::Render]
    }

    fn details_loaded(
        &mut self,
        room_id: RoomId,
        result: Result<RoomMetadata, TransportError>,
    ) -> Vec<SyncAction> {
        let Some(room) = self.active_for(room_id, "room details") else { return vec![] };
        match result {
            Ok(metadata) => {
                room.metadata = Some(metadata);
                vec![SyncAction::Render]
            },
            Err(err) => {
                tracing::warn!(%err, room_id, "room details fetch failed");
                vec![]
            },
        }
    }

    fn send_completed(
        &mut self,
        room_id: RoomId,
        temp_id: &str,
        result: Result<Message, TransportError>,
    ) -> Vec<SyncAction> {
        let Some(room) = self.active_for(room_id, "send response") else { return vec![] };
        match result {
            Ok(confirmed) => match room.store.replace_on_confirm(temp_id, confirmed) {
                Ok(ConfirmOutcome::Replaced) => vec![SyncAction::Render],
                Ok(ConfirmOutcome::AlreadyConfirmed) => vec![],
                Err(err) => {
                    tracing::warn!(%err, temp_id, "send confirmation rejected");
                    vec![]
                },
            },
            Err(err) => {
                tracing::warn!(%err, temp_id, "send failed");
                match room.store.mark_failed(temp_id) {
                    Ok(content) => {
                        vec![SyncAction::Render, SyncAction::RestoreCompose { content }]
                    },
                    // Push echo confirmed the send before the request error
                    // arrived; the confirmed message is the truthful state.
                    Err(StoreError::UnknownTempId { .. }) => vec![],
                    Err(err) => {
                        tracing::warn!(%err, temp_id, "failure could not be recorded");
                        vec![]
                    },
                }
            },
        }
    }

    fn mark_read_completed(
        &mut self,
        room_id: RoomId,
        result: Result<MarkReadAck, TransportError>,
    ) -> Vec<SyncAction> {
        let Some(room) = self.active_for(room_id, "mark-read response") else { return vec![] };
        match result {
            Ok(ack) => {
                room.read.set_unread_count(ack.unread_count);
                vec![SyncAction::Render]
            },
            Err(err) => {
                // Recoverable: the next open re-issues mark-read.
                tracing::warn!(%err, room_id, "mark-read failed");
                vec![]
            },
        }
    }

    /// The active room, if `room_id` still is it; logs and drops otherwise.
    fn active_for(&mut self, room_id: RoomId, what: &'static str) -> Option<&mut ActiveRoom<I>> {
        match self.active.as_mut() {
            Some(room) if room.room_id == room_id => Some(room),
            _ => {
                tracing::trace!(room_id, what, "stale completion for inactive room, discarded");
                None
            },
        }
    }
}

impl<I: Copy + Sub<Output = Duration>> SyncController<I> {
    /// Local session identity.
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Currently open room, if any.
    pub fn active_room(&self) -> Option<RoomId> {
        self.active.as_ref().map(|room| room.room_id)
    }

    /// Timeline of the active room in display order, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.active.as_ref().map_or(&[], |room| room.store.messages())
    }

    /// Remote users currently typing in the active room.
    pub fn typing_users(&self) -> Vec<TypingUser> {
        self.active.as_ref().map_or_else(Vec::new, |room| room.typing.typing_users())
    }

    /// History loading state of the active room.
    pub fn history_state(&self) -> Option<&HistoryState> {
        self.active.as_ref().map(|room| &room.history)
    }

    /// Metadata of the active room, once fetched.
    pub fn room_metadata(&self) -> Option<&RoomMetadata> {
        self.active.as_ref().and_then(|room| room.metadata.as_ref())
    }

    /// Read-state bookkeeping of the active room.
    pub fn read_state(&self) -> Option<&ReadState> {
        self.active.as_ref().map(|room| &room.read)
    }
}
