//! Stats module - Summaries and descriptive statistics

mod calculator;

pub use calculator::{ColumnDescription, Correlation, StatsCalculator, Summary};
