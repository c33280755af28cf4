//! Workbook Writer Module
//! Serializes a DataFrame to an xlsx workbook, replacing any existing file.

use super::calendar;
use super::loader::ORDERS_SHEET;
use super::processor::is_numeric_dtype;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Failed to write workbook: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Table does not fit in a worksheet ({rows} rows, {columns} columns)")]
    TooLarge { rows: usize, columns: usize },
}

/// Number formats applied to temporal cells.
struct CellFormats {
    date: Format,
    datetime: Format,
}

/// Writes tables to a single-sheet xlsx workbook.
pub struct WorkbookWriter;

impl WorkbookWriter {
    /// Write `df` to `path` on a sheet named `Orders`, header row first.
    ///
    /// The file is rewritten from scratch. Dates keep a date number format so
    /// they load back as date cells; nulls and non-finite numbers stay blank.
    pub fn save(df: &DataFrame, path: &Path) -> Result<(), SaveError> {
        let too_large = || SaveError::TooLarge {
            rows: df.height(),
            columns: df.width(),
        };

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(ORDERS_SHEET)?;

        let formats = CellFormats {
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        };

        u32::try_from(df.height()).map_err(|_| too_large())?;

        for (idx, column) in df.get_columns().iter().enumerate() {
            let col = u16::try_from(idx).map_err(|_| too_large())?;
            worksheet.write_string(0, col, column.name().as_str())?;
            Self::write_column(worksheet, col, column, &formats)?;
        }

        workbook.save(path)?;
        info!(path = %path.display(), rows = df.height(), "saved workbook");
        Ok(())
    }

    fn write_column(
        worksheet: &mut Worksheet,
        col: u16,
        column: &Column,
        formats: &CellFormats,
    ) -> Result<(), SaveError> {
        match column.dtype() {
            DataType::Boolean => {
                for (idx, value) in column.bool()?.into_iter().enumerate() {
                    if let Some(b) = value {
                        worksheet.write_boolean(data_row(idx), col, b)?;
                    }
                }
            }
            DataType::String => {
                for (idx, value) in column.str()?.into_iter().enumerate() {
                    if let Some(s) = value {
                        worksheet.write_string(data_row(idx), col, s)?;
                    }
                }
            }
            DataType::Date => {
                let days = column.cast(&DataType::Int32)?;
                for (idx, value) in days.i32()?.into_iter().enumerate() {
                    if let Some(date) = value.and_then(calendar::days_to_date) {
                        worksheet.write_number_with_format(
                            data_row(idx),
                            col,
                            calendar::date_to_excel_serial(date),
                            &formats.date,
                        )?;
                    }
                }
            }
            DataType::Datetime(unit, _) => {
                let unit = *unit;
                let raw = column.cast(&DataType::Int64)?;
                for (idx, value) in raw.i64()?.into_iter().enumerate() {
                    let datetime = value.and_then(|v| {
                        let millis = match unit {
                            TimeUnit::Nanoseconds => v.div_euclid(1_000_000),
                            TimeUnit::Microseconds => v.div_euclid(1_000),
                            TimeUnit::Milliseconds => v,
                        };
                        calendar::epoch_millis_to_datetime(millis)
                    });
                    if let Some(datetime) = datetime {
                        worksheet.write_number_with_format(
                            data_row(idx),
                            col,
                            calendar::datetime_to_excel_serial(datetime),
                            &formats.datetime,
                        )?;
                    }
                }
            }
            dtype if is_numeric_dtype(dtype) => {
                let numbers = column.cast(&DataType::Float64)?;
                for (idx, value) in numbers.f64()?.into_iter().enumerate() {
                    if let Some(n) = value.filter(|n| n.is_finite()) {
                        worksheet.write_number(data_row(idx), col, n)?;
                    }
                }
            }
            _ => {
                let text = column.cast(&DataType::String)?;
                for (idx, value) in text.str()?.into_iter().enumerate() {
                    if let Some(s) = value {
                        worksheet.write_string(data_row(idx), col, s)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Worksheet row for a table row; row 0 holds the header. The caller has
/// already checked the height fits in a `u32`.
fn data_row(idx: usize) -> u32 {
    idx as u32 + 1
}
