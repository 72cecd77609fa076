//! TUI widgets.

mod header;
mod help;
mod tables;

pub use header::{render_header, render_status, status_text};
pub use help::render_help;
pub use tables::{render_tables, table_lines};
