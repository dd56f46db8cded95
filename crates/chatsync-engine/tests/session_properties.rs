//! Property tests for the controller under arbitrary event interleavings.
//!
//! The unit tests pin down the concrete sequences; these sweep random
//! interleavings of opens, closes, pushes, sends, and stale completions and
//! assert the invariants that must survive any ordering: the timeline only
//! ever holds messages of the active room, ids stay unique, and the
//! controller never loses track of which room is open.

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use chatsync_core::{Lifecycle, Message, RoomId};
use chatsync_engine::{PushEvent, SessionInfo, SyncController, SyncEvent, TransportError};
use proptest::prelude::*;

/// Simplified event script: everything the controller can observe, over a
/// two-room world with a small message-id alphabet.
#[derive(Debug, Clone)]
enum Step {
    Open(RoomId),
    Close,
    Push { room_id: RoomId, id: u8, sender: u64 },
    Send { content: &'static str },
    HistoryOk { room_id: RoomId, ids: Vec<u8> },
    HistoryErr { room_id: RoomId },
    Tick { seconds: u64 },
}

fn server_message(room_id: RoomId, id: u8, sender: u64, content: &str) -> Message {
    Message {
        id: format!("s{id}"),
        room_id,
        sender_id: sender,
        sender_display: format!("user-{sender}"),
        content: content.into(),
        created_at: u64::from(id) * 10,
        lifecycle: Lifecycle::Confirmed,
    }
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let room = prop::sample::select(vec![1u64, 2u64]);
    prop_oneof![
        room.clone().prop_map(Step::Open),
        Just(Step::Close),
        (room.clone(), 0u8..6, 1u64..4)
            .prop_map(|(room_id, id, sender)| Step::Push { room_id, id, sender }),
        prop::sample::select(vec!["hi", "yo"]).prop_map(|content| Step::Send { content }),
        (room.clone(), prop::collection::vec(0u8..6, 0..4))
            .prop_map(|(room_id, ids)| Step::HistoryOk { room_id, ids }),
        room.prop_map(|room_id| Step::HistoryErr { room_id }),
        (1u64..10).prop_map(|seconds| Step::Tick { seconds }),
    ]
}

proptest! {
    #[test]
    fn timeline_stays_scoped_and_unique(steps in prop::collection::vec(step_strategy(), 0..40)) {
        let session = SessionInfo { sender_id: 1, sender_display: "me".into() };
        let mut ctl: SyncController<Instant> = SyncController::new(session);
        let t0 = Instant::now();
        let mut clock = t0;

        for step in steps {
            match step {
                Step::Open(room_id) => { ctl.handle(SyncEvent::OpenRoom { room_id }); },
                Step::Close => { ctl.handle(SyncEvent::CloseRoom); },
                Step::Push { room_id, id, sender } => {
                    let event = PushEvent::MessageReceived {
                        room_id,
                        message: server_message(room_id, id, sender, "hi"),
                    };
                    ctl.handle(SyncEvent::Push { event, now: clock });
                },
                Step::Send { content } => {
                    ctl.handle(SyncEvent::SendMessage { content: content.into() });
                },
                Step::HistoryOk { room_id, ids } => {
                    let page = ids
                        .into_iter()
                        .map(|id| server_message(room_id, id, 2, "old"))
                        .collect();
                    ctl.handle(SyncEvent::HistoryLoaded { room_id, result: Ok(page) });
                },
                Step::HistoryErr { room_id } => {
                    ctl.handle(SyncEvent::HistoryLoaded {
                        room_id,
                        result: Err(TransportError("boom".into())),
                    });
                },
                Step::Tick { seconds } => {
                    clock += Duration::from_secs(seconds);
                    ctl.handle(SyncEvent::Tick { now: clock });
                },
            }

            // Invariant: every message belongs to the active room.
            if let Some(active) = ctl.active_room() {
                prop_assert!(ctl.messages().iter().all(|m| m.room_id == active));
            } else {
                prop_assert!(ctl.messages().is_empty());
            }

            // Invariant: timeline ids are unique.
            let mut ids = HashSet::new();
            for message in ctl.messages() {
                prop_assert!(ids.insert(message.id.clone()), "duplicate id {}", message.id);
            }
        }
    }

    /// History pages loaded after a room switch never land in the new room,
    /// whatever else happens in between.
    #[test]
    fn stale_history_never_crosses_rooms(
        interleaved in prop::collection::vec(step_strategy(), 0..10),
        ids in prop::collection::vec(0u8..6, 1..4),
    ) {
        let session = SessionInfo { sender_id: 1, sender_display: "me".into() };
        let mut ctl: SyncController<Instant> = SyncController::new(session);

        ctl.handle(SyncEvent::OpenRoom { room_id: 1 });
        ctl.handle(SyncEvent::OpenRoom { room_id: 2 });
        for step in interleaved {
            // Whatever the noise, room 1's late page must not apply unless
            // room 1 is re-opened, in which case its messages are its own.
            if let Step::Tick { seconds } = step {
                ctl.handle(SyncEvent::Tick { now: Instant::now() + Duration::from_secs(seconds) });
            }
        }
        let page: Vec<Message> =
            ids.into_iter().map(|id| server_message(1, id, 2, "old")).collect();
        ctl.handle(SyncEvent::HistoryLoaded { room_id: 1, result: Ok(page) });

        prop_assert_eq!(ctl.active_room(), Some(2));
        prop_assert!(ctl.messages().iter().all(|m| m.room_id == 2));
    }
}
