//! Workbook Loader Module
//! Reads the orders sheet of a spreadsheet workbook into a Polars DataFrame.

use super::calendar;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Sheet the orders table lives on.
pub const ORDERS_SHEET: &str = "Orders";

/// Cell text read as a missing value, matched exactly.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Workbook not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Sheet '{sheet}' not found (available: {available:?})")]
    MissingSheet {
        sheet: String,
        available: Vec<String>,
    },
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Sheet '{0}' has no header row")]
    EmptySheet(String),
    #[error("Failed to build table: {0}")]
    Polars(#[from] PolarsError),
}

/// Loads the orders table once and keeps it for the lifetime of the loader.
///
/// There is no invalidation: if the workbook changes on disk after the first
/// load, callers keep seeing the first snapshot.
pub struct DataLoader {
    file_path: PathBuf,
    sheet: String,
    df: OnceCell<DataFrame>,
}

impl DataLoader {
    pub fn new(file_path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            sheet: sheet.into(),
            df: OnceCell::new(),
        }
    }

    /// Return the cached table, loading it on first call.
    pub fn get_or_load(&self) -> Result<&DataFrame, LoaderError> {
        self.df
            .get_or_try_init(|| Self::load_workbook(&self.file_path, &self.sheet))
    }

    pub fn get_file_path(&self) -> &Path {
        &self.file_path
    }

    /// Read `sheet` from the workbook at `path`, first row as header.
    pub fn load_workbook(path: &Path, sheet: &str) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.to_path_buf()));
        }

        let mut workbook = open_workbook_auto(path)?;
        let available: Vec<String> = workbook.sheet_names().to_owned();
        if !available.iter().any(|name| name == sheet) {
            return Err(LoaderError::MissingSheet {
                sheet: sheet.to_string(),
                available,
            });
        }

        let range = workbook.worksheet_range(sheet)?;
        let df = Self::range_to_dataframe(&range, sheet)?;

        info!(
            path = %path.display(),
            sheet,
            rows = df.height(),
            columns = df.width(),
            "loaded workbook"
        );
        Ok(df)
    }

    /// Convert a cell range to a DataFrame, inferring one dtype per column.
    fn range_to_dataframe(range: &Range<Data>, sheet: &str) -> Result<DataFrame, LoaderError> {
        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| LoaderError::EmptySheet(sheet.to_string()))?;
        let names = Self::header_names(header);
        let body: Vec<&[Data]> = rows.collect();

        let columns = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<&Data> = body
                    .iter()
                    .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                    .collect();
                Self::build_column(name, &cells)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DataFrame::new(columns)?)
    }

    /// Header cells as column names. Blanks become `Unnamed: <idx>` and
    /// repeats get `.1`, `.2`, ... suffixes.
    fn header_names(header: &[Data]) -> Vec<String> {
        let mut seen: HashMap<String, usize> = HashMap::new();

        header
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let base = match cell {
                    Data::Empty => format!("Unnamed: {}", idx),
                    Data::String(s) if s.trim().is_empty() => format!("Unnamed: {}", idx),
                    other => Self::cell_text(other),
                };

                let count = seen.entry(base.clone()).or_insert(0);
                let name = if *count == 0 {
                    base
                } else {
                    format!("{}.{}", base, count)
                };
                *count += 1;
                name
            })
            .collect()
    }

    /// Error cells (`#N/A`, `#DIV/0!`, ...) and NA markers are missing values.
    fn is_missing(cell: &Data) -> bool {
        match cell {
            Data::Empty | Data::Error(_) => true,
            Data::String(s) => NA_VALUES.contains(&s.as_str()),
            _ => false,
        }
    }

    fn build_column(name: &str, cells: &[&Data]) -> Result<Column, LoaderError> {
        let cells: Vec<&Data> = cells
            .iter()
            .map(|cell| if Self::is_missing(cell) { &Data::Empty } else { *cell })
            .collect();
        let cells = cells.as_slice();

        let mut any = false;
        let mut numeric = true;
        let mut integral = true;
        let mut boolean = true;
        let mut temporal = true;

        for cell in cells {
            match cell {
                Data::Empty => continue,
                Data::Int(_) => {
                    boolean = false;
                    temporal = false;
                }
                Data::Float(f) => {
                    boolean = false;
                    temporal = false;
                    if !f.is_finite() || f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
                        integral = false;
                    }
                }
                Data::Bool(_) => {
                    numeric = false;
                    temporal = false;
                }
                Data::DateTime(_) | Data::DateTimeIso(_) => {
                    numeric = false;
                    boolean = false;
                }
                _ => {
                    numeric = false;
                    boolean = false;
                    temporal = false;
                }
            }
            any = true;
        }

        if !any {
            let empty: Vec<Option<String>> = vec![None; cells.len()];
            debug!(column = name, "column has no values");
            return Ok(Column::new(name.into(), empty));
        }

        if numeric && integral {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            return Ok(Column::new(name.into(), values));
        }

        if numeric {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            return Ok(Column::new(name.into(), values));
        }

        if boolean {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            return Ok(Column::new(name.into(), values));
        }

        if temporal {
            let values: Vec<Option<NaiveDateTime>> =
                cells.iter().map(|cell| Self::cell_datetime(cell)).collect();
            let complete = cells
                .iter()
                .zip(&values)
                .all(|(cell, value)| matches!(cell, Data::Empty) || value.is_some());

            // Unreadable timestamps fall through to text so the date parser
            // can report them with their row.
            if complete {
                let millis: Vec<Option<i64>> = values
                    .into_iter()
                    .map(|v| v.map(calendar::datetime_to_epoch_millis))
                    .collect();
                let column = Column::new(name.into(), millis)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
                return Ok(column);
            }
        }

        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Empty => None,
                other => Some(Self::cell_text(other)),
            })
            .collect();
        Ok(Column::new(name.into(), values))
    }

    fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
        match cell {
            Data::DateTime(dt) => dt.as_datetime(),
            Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .or_else(|| calendar::parse_date_text(s).and_then(|d| d.and_hms_opt(0, 0, 0))),
            _ => None,
        }
    }

    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::String(s) => s.clone(),
            Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", *f as i64)
            }
            Data::DateTime(_) | Data::DateTimeIso(_) => Self::cell_datetime(cell)
                .map(calendar::format_datetime)
                .unwrap_or_else(|| cell.to_string()),
            other => other.to_string(),
        }
    }
}
