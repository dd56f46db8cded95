//! Tokio runtime for the synchronization engine.
//!
//! The [`Runtime`] drives the event loop, coordinating between:
//! - [`SyncController`]: pure orchestration state machine
//! - [`ChatTransport`]: the embedding application's I/O driver
//! - [`SyncHandle`]: the presentation layer's command surface
//!
//! Request actions are executed by spawning the transport call on a clone of
//! the driver handle; the result comes back through the event channel as a
//! completion event, so a slow response never blocks push delivery or ticks.
//! The presentation layer observes a [`RoomView`] snapshot through a watch
//! channel, republished on every `Render` action.

use std::time::{Duration, Instant};

use chatsync_core::{Message, MessageId, RoomId, TypingUser};
use tokio::sync::{mpsc, watch};

use crate::{
    controller::{HistoryState, SessionInfo, SyncController},
    error::TransportError,
    event::{SyncAction, SyncEvent},
    transport::{ChatTransport, PageRequest, RoomMetadata},
};

/// Cadence at which the controller's deadlines are polled.
///
/// Fine enough for the second-scale typing windows.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Read-only snapshot of the active room for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct RoomView {
    /// Open room, if any.
    pub room_id: Option<RoomId>,
    /// Room metadata, once fetched.
    pub metadata: Option<RoomMetadata>,
    /// Timeline in display order, oldest first, with lifecycle state.
    pub messages: Vec<Message>,
    /// Remote users currently typing.
    pub typing_users: Vec<TypingUser>,
    /// History loading state; `HistoryState::Failed` is the retryable error
    /// the room view surfaces.
    pub history: Option<HistoryState>,
    /// Server-acknowledged unread count, once known.
    pub unread_count: Option<u32>,
    /// Text to restore to the compose field after a failed send. Cleared on
    /// the next send and whenever the room changes; a draft never follows
    /// the user into another room.
    pub compose_restore: Option<String>,
}

/// Clonable handle the presentation layer uses to drive the engine.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    events: mpsc::UnboundedSender<SyncEvent>,
    view: watch::Receiver<RoomView>,
}

impl SyncHandle {
    /// Open a room view, tearing down the previous one if any.
    pub fn open_room(&self, room_id: RoomId) {
        self.send(SyncEvent::OpenRoom { room_id });
    }

    /// Close the active room view.
    pub fn close_room(&self) {
        self.send(SyncEvent::CloseRoom);
    }

    /// Submit a message from the compose field.
    pub fn send_message(&self, content: impl Into<String>) {
        self.send(SyncEvent::SendMessage { content: content.into() });
    }

    /// Report a keystroke in the compose field.
    pub fn keystroke(&self) {
        self.send(SyncEvent::Keystroke { now: Instant::now() });
    }

    /// Retry a failed send by its temporary id.
    pub fn retry_send(&self, temp_id: MessageId) {
        self.send(SyncEvent::RetrySend { temp_id });
    }

    /// Retry a failed history load.
    pub fn retry_history(&self) {
        self.send(SyncEvent::RetryHistory);
    }

    /// Stop the engine loop.
    pub fn shutdown(&self) {
        self.send(SyncEvent::Shutdown);
    }

    /// Watch receiver for [`RoomView`] snapshots.
    pub fn view(&self) -> watch::Receiver<RoomView> {
        self.view.clone()
    }

    fn send(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("engine loop has stopped, command dropped");
        }
    }
}

/// Event loop binding the controller to a transport.
pub struct Runtime<T> {
    transport: T,
    controller: SyncController<Instant>,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
    view_tx: watch::Sender<RoomView>,
    compose_restore: Option<String>,
    push_closed: bool,
}

impl<T> Runtime<T>
where
    T: ChatTransport + Clone + Send + Sync + 'static,
{
    /// Create a runtime and the handle that drives it.
    pub fn new(transport: T, session: SessionInfo) -> (Self, SyncHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(RoomView::default());
        let handle = SyncHandle { events: events_tx.clone(), view: view_rx };
        let runtime = Self {
            transport,
            controller: SyncController::new(session),
            events_tx,
            events_rx,
            view_tx,
            compose_restore: None,
            push_closed: false,
        };
        (runtime, handle)
    }

    /// Run the event loop until [`SyncHandle::shutdown`] or until every
    /// handle is dropped.
    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    if matches!(event, SyncEvent::Shutdown) {
                        break;
                    }
                    self.dispatch(event);
                },
                push = self.transport.recv_push(), if !self.push_closed => {
                    match push {
                        Some(event) => {
                            self.dispatch(SyncEvent::Push { event, now: Instant::now() });
                        },
                        None => {
                            // Push channel closed for good; request/response
                            // and the next history reload still work.
                            tracing::warn!("push channel closed");
                            self.push_closed = true;
                        },
                    }
                },
                _ = tick.tick() => {
                    self.dispatch(SyncEvent::Tick { now: Instant::now() });
                },
            }
        }
    }

    fn dispatch(&mut self, event: SyncEvent) {
        if matches!(
            event,
            SyncEvent::SendMessage { .. } | SyncEvent::OpenRoom { .. } | SyncEvent::CloseRoom
        ) {
            self.compose_restore = None;
        }
        for action in self.controller.handle(event) {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: SyncAction) {
        match action {
            SyncAction::Render => self.publish_view(),
            SyncAction::RestoreCompose { content } => {
                self.compose_restore = Some(content);
                self.publish_view();
            },
            SyncAction::FetchRoomDetails { room_id } => {
                let (transport, tx) = (self.transport.clone(), self.events_tx.clone());
                tokio::spawn(async move {
                    let result = transport
                        .fetch_room_details(room_id)
                        .await
                        .map_err(|e| TransportError::from_driver(&e));
                    let _ = tx.send(SyncEvent::RoomDetailsLoaded { room_id, result });
                });
            },
            SyncAction::FetchHistory { room_id } => {
                let (transport, tx) = (self.transport.clone(), self.events_tx.clone());
                tokio::spawn(async move {
                    let result = transport
                        .fetch_message_page(room_id, PageRequest::default())
                        .await
                        .map_err(|e| TransportError::from_driver(&e));
                    let _ = tx.send(SyncEvent::HistoryLoaded { room_id, result });
                });
            },
            SyncAction::MarkRead { room_id } => {
                let (transport, tx) = (self.transport.clone(), self.events_tx.clone());
                tokio::spawn(async move {
                    let result = transport
                        .mark_read(room_id)
                        .await
                        .map_err(|e| TransportError::from_driver(&e));
                    let _ = tx.send(SyncEvent::MarkReadCompleted { room_id, result });
                });
            },
            SyncAction::Send { room_id, temp_id, content } => {
                let (transport, tx) = (self.transport.clone(), self.events_tx.clone());
                tokio::spawn(async move {
                    let result = transport
                        .send_message(room_id, content)
                        .await
                        .map_err(|e| TransportError::from_driver(&e));
                    let _ = tx.send(SyncEvent::SendCompleted { room_id, temp_id, result });
                });
            },
            SyncAction::SetTyping { room_id, is_typing } => {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    if let Err(err) = transport.set_typing(room_id, is_typing).await {
                        tracing::warn!(%err, room_id, "typing announcement failed");
                    }
                });
            },
            SyncAction::JoinRoom { room_id } => {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    if let Err(err) = transport.join_room(room_id).await {
                        tracing::warn!(%err, room_id, "room join failed");
                    }
                });
            },
            SyncAction::LeaveRoom { room_id } => {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    if let Err(err) = transport.leave_room(room_id).await {
                        tracing::warn!(%err, room_id, "room leave failed");
                    }
                });
            },
        }
    }

    fn publish_view(&self) {
        let view = RoomView {
            room_id: self.controller.active_room(),
            metadata: self.controller.room_metadata().cloned(),
            messages: self.controller.messages().to_vec(),
            typing_users: self.controller.typing_users(),
            history: self.controller.history_state().cloned(),
            unread_count: self.controller.read_state().and_then(|r| r.unread_count()),
            compose_restore: self.compose_restore.clone(),
        };
        self.view_tx.send_replace(view);
    }
}
