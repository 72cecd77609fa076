//! gcam: live GPFS I/O throughput monitor built on mmpmon.
//!
//! Provides:
//! - `collector`: mmpmon line parser, mmpmon/mmlsnode subprocess sources
//! - `rates`: per-key counter state and the delta engine
//! - `round`: groups samples into rounds
//! - `table`: per-round rate tables with filesystem, node and grand totals
//! - `provider`: the poller driving a source through the pipeline
//! - `view`: UI-agnostic view models (flat, separated, interlaced)
//! - `tui`: interactive terminal display (ratatui/crossterm)
//! - `report`: plain-text output for batch mode and exit
//! - `config`, `error`, `logging`, `fmt`, `util`: ambient helpers

pub mod collector;
pub mod config;
pub mod error;
pub mod fmt;
pub mod logging;
pub mod provider;
pub mod rates;
pub mod report;
pub mod round;
pub mod table;
pub mod tui;
pub mod util;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
