//! View models shared by the TUI and the plain-text printer.

pub mod common;
pub mod flat;
pub mod matrix;

pub use common::{Align, RowStyleClass, TableViewModel, ViewCell, ViewRow};
pub use flat::build_flat_view;
pub use matrix::{build_interlaced_view, build_separated_view, max_min_fair};

use crate::config::ViewMode;
use crate::table::IoTable;

/// Builds the tables for `mode`, fitting matrix views into `available_lines`.
pub fn build_view(table: &IoTable, mode: ViewMode, available_lines: usize) -> Vec<TableViewModel> {
    match mode {
        ViewMode::Flat => vec![build_flat_view(table)],
        ViewMode::Separated => build_separated_view(table, available_lines),
        ViewMode::Interlaced => vec![build_interlaced_view(table, available_lines)],
    }
}
