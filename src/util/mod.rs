//! Utility modules for gcam.

mod natsort;

pub use natsort::{natural_cmp, natural_sort};
