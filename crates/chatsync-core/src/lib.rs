//! Core state machines for chat timeline synchronization.
//!
//! Pure, I/O-free building blocks that keep a client's view of one chat room
//! consistent across three concurrent sources of truth: a paginated history
//! fetch, locally originated optimistic sends, and asynchronous push events.
//!
//! # Components
//!
//! - [`resolve`]: message identity resolution (new / duplicate / counterpart
//!   of a pending local send)
//! - [`RoomMessageStore`]: ordered, deduplicated timeline for the active room
//! - [`TypingTracker`]: debounced local typing announcements and remote
//!   typing expiry
//!
//! All time-dependent behavior takes `now` as an explicit input, generic over
//! the instant type, so the same code runs against real and virtual clocks.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod message;
mod resolve;
mod store;
mod typing;

pub use error::StoreError;
pub use message::{Lifecycle, Message, MessageId, RoomId, TEMP_ID_PREFIX};
pub use resolve::{Resolution, resolve};
pub use store::{Admission, ConfirmOutcome, RoomMessageStore};
pub use typing::{
    LOCAL_ANNOUNCE_WINDOW, REMOTE_EXPIRY_WINDOW, TypingSignal, TypingTracker, TypingUser,
};
