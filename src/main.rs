//! Superstore Prep - Orders Preparation & Sales Summary
//!
//! Loads the Orders sheet, cleans it, and prints the sales report views.

mod data;
mod report;
mod settings;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;
use data::{DataLoader, DataProcessor, WorkbookWriter};
use report::{ReportRenderer, ReportView};
use settings::Settings;
use stats::StatsCalculator;
use std::io::{self, Write};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // Logs go to stderr; the report owns stdout
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let settings = Settings::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&settings, &mut out)
}

/// One report pass: load (cached), clean, summarize, render, optionally save.
fn run<W: Write>(settings: &Settings, out: &mut W) -> Result<()> {
    let loader = DataLoader::new(&settings.input, &settings.sheet);
    let raw = loader
        .get_or_load()
        .with_context(|| format!("loading {}", loader.get_file_path().display()))?;

    let prepared = DataProcessor::clean(raw).context("cleaning orders table")?;
    let summary = StatsCalculator::summarize(&prepared).context("summarizing orders table")?;
    info!(
        rows = summary.rows,
        total_sales = summary.total_sales,
        correlation = !summary.correlation.is_empty(),
        "orders prepared"
    );

    if settings.json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    } else {
        let view = ReportView {
            overview: settings
                .overview
                .then(|| DataProcessor::overview(&prepared, settings.head_rows)),
            describe: if settings.describe {
                Some(StatsCalculator::describe(&prepared).context("describing numeric columns")?)
            } else {
                None
            },
            show_correlation: settings.correlation,
        };
        ReportRenderer::render(out, &summary, &view)?;
    }

    if settings.save {
        // A failed save is reported but does not end the session
        match WorkbookWriter::save(&prepared, &settings.output) {
            Ok(()) => {
                if !settings.json {
                    writeln!(out)?;
                    writeln!(out, "Cleaned data saved to: {}", settings.output.display())?;
                }
            }
            Err(e) => {
                error!(path = %settings.output.display(), "save failed: {}", e);
                if !settings.json {
                    writeln!(out)?;
                    writeln!(out, "Failed to save cleaned data: {}", e)?;
                }
            }
        }
    }

    Ok(())
}
