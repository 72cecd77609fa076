//! Data providers for the display loops.
//!
//! A [`Poller`] owns the counter source and the round pipeline; the TUI and
//! batch loops only ask it for updates.

mod poller;

pub use poller::{PollUpdate, Poller, PollerStats, PollerStatus, StallPolicy};
