//! Text Report Renderer
//! Prints the dashboard views as plain text sections.
//!
//! Layout:
//! 1. Title
//! 2. Data overview and summary statistics (when toggled)
//! 3. Totals, then Sales/Profit by Category and Sales by Region
//! 4. Monthly sales grouped by year
//! 5. Correlation matrix or a warning (when toggled)

use crate::data::DataOverview;
use crate::stats::{ColumnDescription, Correlation, Summary};
use std::io::{self, Write};

pub const REPORT_TITLE: &str = "Global Superstore Sales Dashboard";

const NO_NUMERIC_WARNING: &str = "No numeric columns available for correlation analysis.";

/// Which optional sections to include.
#[derive(Debug, Default)]
pub struct ReportView {
    pub overview: Option<DataOverview>,
    pub describe: Option<Vec<ColumnDescription>>,
    pub show_correlation: bool,
}

pub struct ReportRenderer;

impl ReportRenderer {
    pub fn render<W: Write>(out: &mut W, summary: &Summary, view: &ReportView) -> io::Result<()> {
        writeln!(out, "{}", REPORT_TITLE)?;
        writeln!(out, "{}", "=".repeat(REPORT_TITLE.len()))?;

        if let Some(overview) = &view.overview {
            Self::write_overview(out, overview)?;
        }
        if let Some(descriptions) = &view.describe {
            Self::write_descriptions(out, descriptions)?;
        }

        Self::heading(out, "Total Sales and Profit")?;
        writeln!(out, "Total Sales: {}", format_currency(summary.total_sales))?;
        writeln!(out, "Total Profit: {}", format_currency(summary.total_profit))?;

        Self::heading(out, "Sales by Category")?;
        for totals in &summary.category_totals {
            Self::write_row(out, &totals.category, totals.sales)?;
        }

        Self::heading(out, "Profit by Category")?;
        for totals in &summary.category_totals {
            Self::write_row(out, &totals.category, totals.profit)?;
        }

        Self::heading(out, "Sales by Region")?;
        for total in &summary.region_sales {
            Self::write_row(out, &total.group, total.value)?;
        }

        Self::heading(out, "Monthly Sales Analysis")?;
        let mut current_year = None;
        for month in &summary.monthly_sales {
            if current_year != Some(month.year) {
                writeln!(out, "{}", month.year)?;
                current_year = Some(month.year);
            }
            Self::write_row(out, &month.month_name, month.sales)?;
        }

        if view.show_correlation {
            Self::write_correlation(out, &summary.correlation)?;
        }
        Ok(())
    }

    fn heading<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", title)?;
        writeln!(out, "{}", "-".repeat(title.len()))
    }

    fn write_row<W: Write>(out: &mut W, label: &str, value: f64) -> io::Result<()> {
        writeln!(out, "  {:<24} {:>18}", label, format_currency(value))
    }

    fn write_overview<W: Write>(out: &mut W, overview: &DataOverview) -> io::Result<()> {
        Self::heading(out, "Data Overview")?;
        writeln!(out, "{}", overview.head)?;
        writeln!(
            out,
            "Dataset Shape: ({}, {})",
            overview.rows, overview.columns
        )?;
        writeln!(out, "Missing Values:")?;
        for (column, missing) in &overview.missing {
            writeln!(out, "  {:<24} {:>8}", column, missing)?;
        }
        Ok(())
    }

    fn write_descriptions<W: Write>(
        out: &mut W,
        descriptions: &[ColumnDescription],
    ) -> io::Result<()> {
        Self::heading(out, "Summary Statistics")?;
        writeln!(
            out,
            "  {:<16} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )?;
        for d in descriptions {
            writeln!(
                out,
                "  {:<16} {:>8} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
                d.column, d.count, d.mean, d.std, d.min, d.p25, d.median, d.p75, d.max
            )?;
        }
        Ok(())
    }

    fn write_correlation<W: Write>(out: &mut W, correlation: &Correlation) -> io::Result<()> {
        Self::heading(out, "Correlation Matrix")?;
        let matrix = match correlation {
            Correlation::Matrix(matrix) => matrix,
            Correlation::NoNumericColumns => {
                return writeln!(out, "warning: {}", NO_NUMERIC_WARNING);
            }
        };

        write!(out, "  {:<16}", "")?;
        for column in &matrix.columns {
            write!(out, " {:>14}", truncate(column, 14))?;
        }
        writeln!(out)?;

        for (column, row) in matrix.columns.iter().zip(&matrix.values) {
            write!(out, "  {:<16}", truncate(column, 16))?;
            for value in row {
                write!(out, " {:>14.2}", value)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Dollar amount with thousands separators and two decimals.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.2}", value.abs());
    let (whole, cents) = formatted.split_once(".").unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{fixtures, DataProcessor};
    use crate::stats::StatsCalculator;

    fn render(view: &ReportView, summary: &Summary) -> String {
        let mut out = Vec::new();
        ReportRenderer::render(&mut out, summary, view).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(-5.0), "-$5.00");
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn default_view_prints_totals_and_groups_only() {
        let cleaned = DataProcessor::clean(&fixtures::orders_frame()).unwrap();
        let summary = StatsCalculator::summarize(&cleaned).unwrap();
        let text = render(&ReportView::default(), &summary);

        assert!(text.starts_with(REPORT_TITLE));
        assert!(text.contains("Total Sales: $370.00"));
        assert!(text.contains("Total Profit: $25.50"));
        assert!(text.contains("Sales by Region"));
        assert!(text.contains("2016\n"));
        assert!(!text.contains("Data Overview"));
        assert!(!text.contains("Correlation Matrix"));
    }

    #[test]
    fn toggled_sections_are_rendered() {
        let cleaned = DataProcessor::clean(&fixtures::orders_frame()).unwrap();
        let summary = StatsCalculator::summarize(&cleaned).unwrap();
        let view = ReportView {
            overview: Some(DataProcessor::overview(&cleaned, 2)),
            describe: Some(StatsCalculator::describe(&cleaned).unwrap()),
            show_correlation: true,
        };
        let text = render(&view, &summary);

        assert!(text.contains("Data Overview"));
        assert!(text.contains("Dataset Shape: (3, 10)"));
        assert!(text.contains("Summary Statistics"));
        assert!(text.contains("Correlation Matrix"));
        assert!(!text.contains(NO_NUMERIC_WARNING));
    }

    #[test]
    fn empty_correlation_prints_a_warning() {
        let summary = Summary {
            rows: 0,
            total_sales: 0.0,
            total_profit: 0.0,
            category_totals: Vec::new(),
            region_sales: Vec::new(),
            monthly_sales: Vec::new(),
            correlation: Correlation::NoNumericColumns,
        };
        let view = ReportView {
            show_correlation: true,
            ..ReportView::default()
        };

        assert!(render(&view, &summary).contains(NO_NUMERIC_WARNING));
    }
}
