//! Typing presence tracking.
//!
//! Two concerns share this module: debouncing the local user's typing
//! announcements so the transport sees one "started" per burst instead of
//! one per keystroke, and mirroring remote users' typing state with a
//! defensive expiry so a lost "stopped" event cannot strand an entry.
//!
//! # Local state machine
//!
//! ```text
//!           keystroke                      window elapses
//! ┌──────┐ ──────────> ┌───────────┐ ──────────────────> ┌──────┐
//! │ Idle │   Started   │ Announced │       Stopped       │ Idle │
//! └──────┘             └───────────┘ <───┐
//!                        │    ↑          │ message sent
//!                        └────┘          │ Stopped (bypass)
//!                      keystroke
//!                     (timer reset,
//!                      no emission)
//! ```
//!
//! Time is an explicit input: every deadline is a stored instant compared
//! against the `now` passed into [`TypingTracker::poll_local`] and
//! [`TypingTracker::expire_remote`]. There are no owned timers to leak; a
//! torn-down tracker is just a dropped value.

use std::{collections::HashMap, ops::Sub, time::Duration};

/// Inactivity window after which a local typing burst is announced stopped.
pub const LOCAL_ANNOUNCE_WINDOW: Duration = Duration::from_secs(3);

/// Expiry for remote typing entries that never receive a "stopped" event.
///
/// Slightly longer than [`LOCAL_ANNOUNCE_WINDOW`] so a well-behaved peer's
/// own stop always arrives first.
pub const REMOTE_EXPIRY_WINDOW: Duration = Duration::from_secs(5);

/// Typing announcement the tracker asks the caller to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    /// Announce that the local user started typing.
    Started,
    /// Announce that the local user stopped typing.
    Stopped,
}

/// A remote user currently flagged as typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingUser {
    /// Stable user id.
    pub user_id: u64,
    /// Display name for the typing indicator.
    pub name: String,
}

/// Local announce state. `Announced` stores the last keystroke instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalState<I> {
    Idle,
    Announced { since: I },
}

/// Per-room typing presence: local debounce plus remote mirror.
///
/// Generic over the instant type so production (`std::time::Instant`) and
/// simulated clocks use the same code.
#[derive(Debug, Clone)]
pub struct TypingTracker<I> {
    local: LocalState<I>,
    remote: HashMap<u64, RemoteEntry<I>>,
}

#[derive(Debug, Clone)]
struct RemoteEntry<I> {
    name: String,
    last_seen: I,
}

impl<I> Default for TypingTracker<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> TypingTracker<I> {
    /// Create a tracker with no local announcement and no remote entries.
    pub fn new() -> Self {
        Self { local: LocalState::Idle, remote: HashMap::new() }
    }

    /// Clear all state. Equivalent to cancelling every outstanding timer.
    pub fn reset(&mut self) {
        self.local = LocalState::Idle;
        self.remote.clear();
    }
}

impl<I: Copy + Sub<Output = Duration>> TypingTracker<I> {
    /// Record a local keystroke at `now`.
    ///
    /// Returns [`TypingSignal::Started`] exactly once per burst: on the
    /// idle-to-announced transition. Further keystrokes only refresh the
    /// inactivity deadline.
    pub fn keystroke(&mut self, now: I) -> Option<TypingSignal> {
        let was_idle = matches!(self.local, LocalState::Idle);
        self.local = LocalState::Announced { since: now };
        was_idle.then_some(TypingSignal::Started)
    }

    /// The local user sent a message: bypass the debounce window.
    ///
    /// Returns [`TypingSignal::Stopped`] if an announcement was outstanding.
    pub fn message_sent(&mut self) -> Option<TypingSignal> {
        match self.local {
            LocalState::Announced { .. } => {
                self.local = LocalState::Idle;
                Some(TypingSignal::Stopped)
            },
            LocalState::Idle => None,
        }
    }

    /// Check the local inactivity deadline against `now`.
    ///
    /// Returns [`TypingSignal::Stopped`] when the announce window has elapsed
    /// with no further keystrokes.
    pub fn poll_local(&mut self, now: I) -> Option<TypingSignal> {
        match self.local {
            LocalState::Announced { since } if now - since >= LOCAL_ANNOUNCE_WINDOW => {
                self.local = LocalState::Idle;
                Some(TypingSignal::Stopped)
            },
            _ => None,
        }
    }

    /// True if a local "started" announcement is outstanding.
    pub fn is_announced(&self) -> bool {
        matches!(self.local, LocalState::Announced { .. })
    }

    /// Remote user `user_id` started (or continues) typing.
    ///
    /// Idempotent: a repeated "started" refreshes the expiry deadline.
    pub fn remote_started(&mut self, user_id: u64, name: impl Into<String>, now: I) {
        self.remote.insert(user_id, RemoteEntry { name: name.into(), last_seen: now });
    }

    /// Remote user `user_id` stopped typing. Unknown users are a no-op.
    pub fn remote_stopped(&mut self, user_id: u64) {
        self.remote.remove(&user_id);
    }

    /// Drop remote entries whose expiry window has elapsed.
    ///
    /// Returns the number of entries removed, guarding against lost
    /// "stopped" deliveries.
    pub fn expire_remote(&mut self, now: I) -> usize {
        let before = self.remote.len();
        self.remote.retain(|_, entry| now - entry.last_seen < REMOTE_EXPIRY_WINDOW);
        before - self.remote.len()
    }

    /// Remote users currently typing, ordered by user id for stable display.
    pub fn typing_users(&self) -> Vec<TypingUser> {
        let mut users: Vec<TypingUser> = self
            .remote
            .iter()
            .map(|(&user_id, entry)| TypingUser { user_id, name: entry.name.clone() })
            .collect();
        users.sort_by_key(|u| u.user_id);
        users
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn base() -> Instant {
        Instant::now()
    }

    #[test]
    fn burst_announces_started_once() {
        let mut tracker = TypingTracker::new();
        let t0 = base();

        assert_eq!(tracker.keystroke(t0), Some(TypingSignal::Started));
        for i in 1..10 {
            assert_eq!(tracker.keystroke(t0 + Duration::from_millis(i * 100)), None);
        }
        assert!(tracker.is_announced());
    }

    #[test]
    fn stop_emitted_after_quiet_window() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.keystroke(t0);

        assert_eq!(tracker.poll_local(t0 + Duration::from_secs(1)), None);
        assert_eq!(
            tracker.poll_local(t0 + LOCAL_ANNOUNCE_WINDOW),
            Some(TypingSignal::Stopped)
        );
        // Once idle, further polls emit nothing.
        assert_eq!(tracker.poll_local(t0 + Duration::from_secs(60)), None);
    }

    #[test]
    fn keystroke_resets_quiet_window() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.keystroke(t0);

        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(tracker.keystroke(t1), None);
        // The window now measures from t1, not t0.
        assert_eq!(tracker.poll_local(t0 + LOCAL_ANNOUNCE_WINDOW), None);
        assert_eq!(tracker.poll_local(t1 + LOCAL_ANNOUNCE_WINDOW), Some(TypingSignal::Stopped));
    }

    #[test]
    fn message_sent_bypasses_debounce() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.keystroke(t0);

        assert_eq!(tracker.message_sent(), Some(TypingSignal::Stopped));
        assert!(!tracker.is_announced());
        // No pending deadline remains.
        assert_eq!(tracker.poll_local(t0 + Duration::from_secs(60)), None);
    }

    #[test]
    fn message_sent_while_idle_is_silent() {
        let mut tracker: TypingTracker<Instant> = TypingTracker::new();
        assert_eq!(tracker.message_sent(), None);
    }

    #[test]
    fn remote_started_is_idempotent() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.remote_started(8, "bea", t0);
        tracker.remote_started(8, "bea", t0 + Duration::from_secs(1));

        let users = tracker.typing_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0], TypingUser { user_id: 8, name: "bea".into() });
    }

    #[test]
    fn remote_stop_removes_entry() {
        let mut tracker = TypingTracker::new();
        tracker.remote_started(8, "bea", base());
        tracker.remote_stopped(8);
        assert!(tracker.typing_users().is_empty());
        // Unknown user: no-op.
        tracker.remote_stopped(9);
    }

    #[test]
    fn remote_entries_expire_without_stop_event() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.remote_started(8, "bea", t0);
        tracker.remote_started(9, "cal", t0 + Duration::from_secs(2));

        assert_eq!(tracker.expire_remote(t0 + Duration::from_secs(2)), 0);
        assert_eq!(tracker.expire_remote(t0 + REMOTE_EXPIRY_WINDOW), 1);
        assert_eq!(tracker.typing_users()[0].user_id, 9);
    }

    #[test]
    fn repeated_started_refreshes_expiry() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.remote_started(8, "bea", t0);
        tracker.remote_started(8, "bea", t0 + Duration::from_secs(4));

        assert_eq!(tracker.expire_remote(t0 + REMOTE_EXPIRY_WINDOW), 0);
        assert_eq!(tracker.typing_users().len(), 1);
    }

    #[test]
    fn display_order_is_stable() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.remote_started(9, "cal", t0);
        tracker.remote_started(8, "bea", t0);

        let names: Vec<String> = tracker.typing_users().into_iter().map(|u| u.name).collect();
        assert_eq!(names, ["bea", "cal"]);
    }

    #[test]
    fn reset_clears_local_and_remote_state() {
        let mut tracker = TypingTracker::new();
        let t0 = base();
        tracker.keystroke(t0);
        tracker.remote_started(8, "bea", t0);

        tracker.reset();

        assert!(!tracker.is_announced());
        assert!(tracker.typing_users().is_empty());
        assert_eq!(tracker.poll_local(t0 + Duration::from_secs(60)), None);
    }
}
