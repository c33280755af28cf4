//! Report module - Text rendering of the prepared data

mod renderer;

pub use renderer::{ReportRenderer, ReportView};
