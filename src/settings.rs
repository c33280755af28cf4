//! Command-line settings for a report run.

use crate::data::ORDERS_SHEET;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "global_superstore_2016.xlsx";
pub const DEFAULT_OUTPUT: &str = "cleaned_global_superstore_2016.xlsx";

/// User settings for a report run. The view toggles mirror the dashboard's
/// checkboxes; `--save` is its save button.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "superstore-prep",
    version,
    about = "Prepare the Superstore orders sheet and print a sales summary"
)]
pub struct Settings {
    /// Source workbook
    #[arg(long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Sheet holding the orders table
    #[arg(long, default_value = ORDERS_SHEET)]
    pub sheet: String,

    /// Where `--save` writes the cleaned table (overwritten)
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Show a preview, the shape and missing-value counts
    #[arg(long)]
    pub overview: bool,

    /// Rows in the overview preview
    #[arg(long, default_value_t = 5)]
    pub head_rows: usize,

    /// Show descriptive statistics of numeric columns
    #[arg(long)]
    pub describe: bool,

    /// Show the correlation matrix of numeric columns
    #[arg(long)]
    pub correlation: bool,

    /// Save the cleaned table to `--output`
    #[arg(long)]
    pub save: bool,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub json: bool,
}
