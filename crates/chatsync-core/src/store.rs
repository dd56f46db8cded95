//! Room message store.
//!
//! Holds the canonical in-memory timeline for the one active room: an
//! oldest-first, deduplicated sequence of [`Message`] mutated only through
//! the operations below. The store is never re-sorted except at a full
//! history reload; a reconciled message keeps the list position of the
//! pending entry it replaces.
//!
//! Admission control runs through a seen-id set owned by the store and
//! rebuilt whenever a room is (re)opened. The set exists purely for
//! deduplication; it is not part of the message data.

use std::collections::HashSet;

use crate::{
    error::StoreError,
    message::{Lifecycle, Message, MessageId, RoomId, TEMP_ID_PREFIX},
    resolve::{Resolution, resolve},
};

/// What `admit_incoming` did with a candidate message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Appended at the tail as a new message.
    Admitted,
    /// Already present; nothing changed.
    Duplicate,
    /// Replaced the pending local message with this temporary id in place.
    Reconciled {
        /// Temporary id of the pending message that was replaced.
        temp_id: MessageId,
    },
}

/// What `replace_on_confirm` did with a send response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The pending message was replaced in place by the confirmed one.
    Replaced,
    /// The push echo won the race; the confirmed id was already admitted.
    AlreadyConfirmed,
}

/// Ordered, deduplicated message timeline for one room.
#[derive(Debug, Clone)]
pub struct RoomMessageStore {
    room_id: RoomId,
    messages: Vec<Message>,
    seen: HashSet<MessageId>,
    next_temp: u64,
}

impl RoomMessageStore {
    /// Create an empty store scoped to `room_id`.
    pub fn new(room_id: RoomId) -> Self {
        Self::with_next_temp(room_id, 0)
    }

    /// Create an empty store whose temporary-id sequence starts at
    /// `next_temp`.
    ///
    /// Temporary ids must stay unique across reopenings of a room within a
    /// session: a send completion still in flight from a previous
    /// incarnation of the room must never share a temp id with a fresh
    /// pending message. The caller threads the sequence through room resets.
    pub fn with_next_temp(room_id: RoomId, next_temp: u64) -> Self {
        Self { room_id, messages: Vec::new(), seen: HashSet::new(), next_temp }
    }

    /// Next value of the temporary-id sequence.
    pub fn next_temp(&self) -> u64 {
        self.next_temp
    }

    /// Room this store was opened for.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Messages in display order, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True if `id` has been admitted into this room's message set.
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Replace the entire timeline with a freshly fetched history page.
    ///
    /// The server returns pages newest-first; the store reverses into
    /// oldest-first display order. Every entry is marked confirmed and the
    /// seen-id set is reseeded from the page, dropping any local-only state.
    pub fn load_history(&mut self, mut page: Vec<Message>) {
        page.reverse();
        for message in &mut page {
            message.lifecycle = Lifecycle::Confirmed;
        }
        self.seen = page.iter().map(|m| m.id.clone()).collect();
        self.messages = page;
    }

    /// Append an optimistic local send and return its temporary id.
    ///
    /// The message enters the timeline immediately, before any network round
    /// trip, in the pending state. Its `created_at` is clamped to the current
    /// tail so a skewed client clock cannot break the oldest-first invariant;
    /// the real server timestamp arrives with confirmation.
    pub fn append_optimistic(
        &mut self,
        content: impl Into<String>,
        sender_id: u64,
        sender_display: impl Into<String>,
    ) -> MessageId {
        let temp_id = format!("{TEMP_ID_PREFIX}{}", self.next_temp);
        self.next_temp += 1;

        let created_at = self.messages.last().map_or(0, |m| m.created_at);
        self.messages.push(Message {
            id: temp_id.clone(),
            room_id: self.room_id,
            sender_id,
            sender_display: sender_display.into(),
            content: content.into(),
            created_at,
            lifecycle: Lifecycle::Pending,
        });
        self.seen.insert(temp_id.clone());
        temp_id
    }

    /// Admit a message arriving from the push channel (or any external path).
    ///
    /// Runs identity resolution and applies the result: duplicates are a
    /// silent no-op, reconciliations replace the matched pending message in
    /// place, and everything else appends at the tail as confirmed.
    pub fn admit_incoming(&mut self, mut candidate: Message) -> Result<Admission, StoreError> {
        if candidate.room_id != self.room_id {
            return Err(StoreError::RoomMismatch {
                expected: self.room_id,
                got: candidate.room_id,
            });
        }
        candidate.lifecycle = Lifecycle::Confirmed;

        match resolve(&candidate, &self.seen, &self.messages) {
            Resolution::Duplicate => Ok(Admission::Duplicate),
            Resolution::Reconcile(temp_id) => {
                self.seen.insert(candidate.id.clone());
                self.replace_in_place(&temp_id, candidate)?;
                Ok(Admission::Reconciled { temp_id })
            },
            Resolution::Admit => {
                self.seen.insert(candidate.id.clone());
                self.messages.push(candidate);
                Ok(Admission::Admitted)
            },
        }
    }

    /// Confirm a pending send with the server's synchronous response.
    ///
    /// Guards the race with the asynchronous push echo for the same send: if
    /// the confirmed id is already in the seen set, the echo arrived first
    /// and this call is a no-op rather than a second reconciliation.
    pub fn replace_on_confirm(
        &mut self,
        temp_id: &str,
        mut confirmed: Message,
    ) -> Result<ConfirmOutcome, StoreError> {
        if confirmed.room_id != self.room_id {
            return Err(StoreError::RoomMismatch {
                expected: self.room_id,
                got: confirmed.room_id,
            });
        }
        if self.seen.contains(&confirmed.id) {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        // Locate the pending entry before touching the seen set, so a
        // rejected confirmation leaves no stray admission-control state.
        let index = self
            .messages
            .iter()
            .position(|m| m.id == temp_id)
            .ok_or_else(|| StoreError::UnknownTempId { temp_id: temp_id.to_string() })?;
        confirmed.lifecycle = Lifecycle::Confirmed;
        self.seen.insert(confirmed.id.clone());
        self.messages[index] = confirmed;
        Ok(ConfirmOutcome::Replaced)
    }

    /// Transition a pending send to failed in place.
    ///
    /// Content and position are preserved so the failure shows inline on the
    /// specific bubble. Returns the original content so the caller can
    /// restore the compose field.
    pub fn mark_failed(&mut self, temp_id: &str) -> Result<String, StoreError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == temp_id && matches!(m.lifecycle, Lifecycle::Pending))
            .ok_or_else(|| StoreError::UnknownTempId { temp_id: temp_id.to_string() })?;
        message.lifecycle = Lifecycle::Failed;
        Ok(message.content.clone())
    }

    /// Put a failed send back into the pending state for a user-driven retry.
    ///
    /// Returns the content to resend. The message keeps its temporary id and
    /// list position, so the eventual confirmation reconciles normally.
    pub fn retry(&mut self, temp_id: &str) -> Result<String, StoreError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == temp_id)
            .ok_or_else(|| StoreError::UnknownTempId { temp_id: temp_id.to_string() })?;
        if !matches!(message.lifecycle, Lifecycle::Failed) {
            return Err(StoreError::NotFailed { temp_id: temp_id.to_string() });
        }
        message.lifecycle = Lifecycle::Pending;
        Ok(message.content.clone())
    }

    /// Replace the local message with `temp_id` by `replacement`, keeping its
    /// index in the timeline.
    fn replace_in_place(&mut self, temp_id: &str, replacement: Message) -> Result<(), StoreError> {
        let index = self
            .messages
            .iter()
            .position(|m| m.id == temp_id)
            .ok_or_else(|| StoreError::UnknownTempId { temp_id: temp_id.to_string() })?;
        self.messages[index] = replacement;
        Ok(())
    }
}
