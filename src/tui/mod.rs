//! Terminal User Interface for gcam.
//!
//! An atop-like live display of the tables produced by the poller.

mod app;
mod event;
mod input;
mod render;
pub(crate) mod state;
pub(crate) mod style;
mod widgets;

pub use app::App;
pub use state::{AppState, SessionInfo};
