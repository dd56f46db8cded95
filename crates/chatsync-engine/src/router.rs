//! Socket event routing.
//!
//! [`EventRouter`] binds the shared push channel to the active room's
//! components for exactly the lifetime of that room being active. It is an
//! injected value with an explicit lifecycle, not ambient global state:
//! `activate` joins the room and establishes the binding, `deactivate`
//! removes it, and events that arrive outside the binding are dropped, never
//! queued.

use std::{ops::Sub, time::Duration};

use chatsync_core::{Admission, RoomId, RoomMessageStore, TypingTracker};

use crate::{controller::ReadState, event::SyncAction, transport::PushEvent};

/// Push-channel binding for the active room.
///
/// Holds only the room id the binding is scoped to; the routed-to components
/// are borrowed per event so the router owns no state it could leak.
#[derive(Debug, Clone, Default)]
pub struct EventRouter {
    active: Option<RoomId>,
}

impl EventRouter {
    /// Create a router with no active binding.
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Bind to `room_id` and join it on the membership service.
    ///
    /// Registration does not depend on the push channel being connected:
    /// the binding is in place so events flow as soon as connectivity
    /// resumes. Reconnection itself is the transport's concern.
    pub fn activate(&mut self, room_id: RoomId) -> Vec<SyncAction> {
        self.active = Some(room_id);
        vec![SyncAction::JoinRoom { room_id }]
    }

    /// Remove the binding and leave the room.
    ///
    /// Idempotent: with no prior `activate` this is a no-op, not an error.
    pub fn deactivate(&mut self) -> Vec<SyncAction> {
        match self.active.take() {
            Some(room_id) => vec![SyncAction::LeaveRoom { room_id }],
            None => vec![],
        }
    }

    /// Room the router is currently bound to.
    pub fn active_room(&self) -> Option<RoomId> {
        self.active
    }

    /// Dispatch one push event to the active room's components.
    ///
    /// Events scoped to any other room (or arriving with no binding) are
    /// dropped. Read receipts update bookkeeping only; they never produce a
    /// mark-read emission, which would loop acks between peers.
    ///
    /// Returns true if observable state changed and the view should
    /// re-render.
    pub fn route<I: Copy + Sub<Output = Duration>>(
        &self,
        event: PushEvent,
        now: I,
        store: &mut RoomMessageStore,
        typing: &mut TypingTracker<I>,
        read: &mut ReadState,
    ) -> bool {
        let Some(active) = self.active else {
            tracing::trace!(room_id = event.room_id(), "push event with no active binding, dropped");
            return false;
        };
        if event.room_id() != active {
            tracing::trace!(
                room_id = event.room_id(),
                active_room = active,
                "push event for inactive room, dropped"
            );
            return false;
        }

        match event {
            PushEvent::MessageReceived { message, .. } => match store.admit_incoming(message) {
                Ok(Admission::Duplicate) => false,
                Ok(Admission::Admitted | Admission::Reconciled { .. }) => true,
                Err(err) => {
                    // Unreachable while the binding matches the store's room.
                    tracing::warn!(%err, "push message rejected by store");
                    false
                },
            },
            PushEvent::TypingStarted { user_id, user_name, .. } => {
                typing.remote_started(user_id, user_name, now);
                true
            },
            PushEvent::TypingStopped { user_id, .. } => {
                typing.remote_stopped(user_id);
                true
            },
            PushEvent::MessageRead { user_id, .. } => read.record(user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use chatsync_core::{Lifecycle, Message};

    use super::*;

    const ROOM: RoomId = 5;

    fn components() -> (RoomMessageStore, TypingTracker<std::time::Instant>, ReadState) {
        (RoomMessageStore::new(ROOM), TypingTracker::new(), ReadState::new())
    }

    fn incoming(id: &str) -> PushEvent {
        PushEvent::MessageReceived {
            room_id: ROOM,
            message: Message {
                id: id.into(),
                room_id: ROOM,
                sender_id: 8,
                sender_display: "bea".into(),
                content: "yo".into(),
                created_at: 100,
                lifecycle: Lifecycle::Confirmed,
            },
        }
    }

    #[test]
    fn activate_joins_and_binds() {
        let mut router = EventRouter::new();
        let actions = router.activate(ROOM);
        assert_eq!(actions, [SyncAction::JoinRoom { room_id: ROOM }]);
        assert_eq!(router.active_room(), Some(ROOM));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut router = EventRouter::new();
        assert!(router.deactivate().is_empty());

        router.activate(ROOM);
        assert_eq!(router.deactivate(), [SyncAction::LeaveRoom { room_id: ROOM }]);
        assert!(router.deactivate().is_empty());
    }

    #[test]
    fn routes_message_to_store() {
        let (mut store, mut typing, mut read) = components();
        let mut router = EventRouter::new();
        router.activate(ROOM);

        let now = std::time::Instant::now();
        assert!(router.route(incoming("s1"), now, &mut store, &mut typing, &mut read));
        assert_eq!(store.messages().len(), 1);

        // Redelivery is a silent duplicate with no render.
        assert!(!router.route(incoming("s1"), now, &mut store, &mut typing, &mut read));
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn drops_events_for_other_rooms() {
        let (mut store, mut typing, mut read) = components();
        let mut router = EventRouter::new();
        router.activate(ROOM + 1);

        let now = std::time::Instant::now();
        assert!(!router.route(incoming("s1"), now, &mut store, &mut typing, &mut read));
        assert!(store.messages().is_empty());
    }

    #[test]
    fn drops_events_with_no_binding() {
        let (mut store, mut typing, mut read) = components();
        let router = EventRouter::new();

        let now = std::time::Instant::now();
        assert!(!router.route(incoming("s1"), now, &mut store, &mut typing, &mut read));
        assert!(store.messages().is_empty());
    }

    #[test]
    fn typing_events_reach_the_tracker() {
        let (mut store, mut typing, mut read) = components();
        let mut router = EventRouter::new();
        router.activate(ROOM);
        let now = std::time::Instant::now();

        let started =
            PushEvent::TypingStarted { room_id: ROOM, user_id: 8, user_name: "bea".into() };
        assert!(router.route(started, now, &mut store, &mut typing, &mut read));
        assert_eq!(typing.typing_users().len(), 1);

        let stopped =
            PushEvent::TypingStopped { room_id: ROOM, user_id: 8, user_name: "bea".into() };
        assert!(router.route(stopped, now, &mut store, &mut typing, &mut read));
        assert!(typing.typing_users().is_empty());
    }

    #[test]
    fn read_receipts_update_bookkeeping_without_actions() {
        let (mut store, mut typing, mut read) = components();
        let mut router = EventRouter::new();
        router.activate(ROOM);
        let now = std::time::Instant::now();

        let receipt = PushEvent::MessageRead { room_id: ROOM, user_id: 8 };
        assert!(router.route(receipt.clone(), now, &mut store, &mut typing, &mut read));
        assert!(read.read_by().contains(&8));

        // Idempotent: a repeated receipt changes nothing.
        assert!(!router.route(receipt, now, &mut store, &mut typing, &mut read));
    }
}
