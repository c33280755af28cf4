//! Data Processor Module
//! Handles data cleaning and derivation of calendar and growth columns.

use super::calendar;
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

/// Identifier columns carry no analytic value and are always dropped.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["Row ID", "Order ID"];

pub const ORDER_DATE: &str = "Order Date";
pub const SHIP_DATE: &str = "Ship Date";
pub const SALES: &str = "Sales";
pub const PROFIT: &str = "Profit";
pub const CATEGORY: &str = "Category";
pub const REGION: &str = "Region";
pub const ORDER_MONTH: &str = "Order Month";
pub const ORDER_YEAR: &str = "Order Year";
pub const SALES_GROWTH: &str = "Sales Growth";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
    #[error("Unparseable date in column '{column}' at row {row}: '{value}'")]
    UnparseableDate {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Column '{column}' has type {dtype}, which cannot hold dates")]
    UnsupportedDateType { column: String, dtype: String },
}

/// Shape, preview and missing-value counts of a table.
#[derive(Debug, Clone)]
pub struct DataOverview {
    pub head: DataFrame,
    pub rows: usize,
    pub columns: usize,
    pub missing: Vec<(String, usize)>,
}

/// Whether a dtype counts as numeric for summaries and correlation.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Names of the numeric columns, in table order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Fetch a column, mapping absence to `MissingColumn`.
fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ProcessorError> {
    df.column(name)
        .map_err(|_| ProcessorError::MissingColumn(name.to_string()))
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Produce the prepared orders table.
    ///
    /// Drops identifier columns, parses both date columns, then derives
    /// `Order Month`, `Order Year` and `Sales Growth`. Re-applying to the
    /// output yields the same table.
    pub fn clean(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut df = Self::drop_identifiers(df)?;

        for name in [ORDER_DATE, SHIP_DATE] {
            let parsed = Self::parse_date_column(&df, name)?;
            df.with_column(parsed)?;
        }

        let (months, years) = Self::derive_calendar(&df)?;
        df.with_column(months)?;
        df.with_column(years)?;

        let growth = Self::sales_growth(&df)?;
        df.with_column(growth)?;

        debug!(rows = df.height(), columns = df.width(), "cleaned orders table");
        Ok(df)
    }

    /// Remove identifier columns; absent ones are ignored.
    pub fn drop_identifiers(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let keep: Vec<String> = df
            .get_column_names()
            .iter()
            .filter(|name| !IDENTIFIER_COLUMNS.contains(&name.as_str()))
            .map(|name| name.to_string())
            .collect();

        Ok(df.select(keep)?)
    }

    /// Parse one column into a polars `Date` column of the same name.
    pub fn parse_date_column(df: &DataFrame, name: &str) -> Result<Column, ProcessorError> {
        let column = required_column(df, name)?;
        let days: Vec<Option<i32>> = Self::date_values(column)?
            .into_iter()
            .map(|d| d.map(calendar::date_to_days))
            .collect();

        Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
    }

    /// Read a column as calendar dates. Nulls and blank text stay `None`;
    /// anything else that is not a date fails.
    fn date_values(column: &Column) -> Result<Vec<Option<NaiveDate>>, ProcessorError> {
        let name = column.name().to_string();

        match column.dtype() {
            DataType::Date => {
                let days = column.cast(&DataType::Int32)?;
                let values = days
                    .i32()?
                    .into_iter()
                    .map(|d| d.and_then(calendar::days_to_date))
                    .collect();
                Ok(values)
            }
            DataType::Datetime(unit, _) => {
                let unit = *unit;
                let raw = column.cast(&DataType::Int64)?;
                let values = raw
                    .i64()?
                    .into_iter()
                    .map(|v| {
                        v.and_then(|v| calendar::epoch_millis_to_datetime(to_millis(v, unit)))
                            .map(|dt| dt.date())
                    })
                    .collect();
                Ok(values)
            }
            DataType::String => column
                .str()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value {
                    None => Ok(None),
                    Some(text) if text.trim().is_empty() => Ok(None),
                    Some(text) => calendar::parse_date_text(text).map(Some).ok_or_else(|| {
                        ProcessorError::UnparseableDate {
                            column: name.clone(),
                            row,
                            value: text.to_string(),
                        }
                    }),
                })
                .collect(),
            dtype if is_numeric_dtype(dtype) => {
                let serials = column.cast(&DataType::Float64)?;
                serials
                    .f64()?
                    .into_iter()
                    .enumerate()
                    .map(|(row, value)| match value {
                        None => Ok(None),
                        Some(serial) => calendar::excel_serial_to_date(serial)
                            .map(Some)
                            .ok_or_else(|| ProcessorError::UnparseableDate {
                                column: name.clone(),
                                row,
                                value: serial.to_string(),
                            }),
                    })
                    .collect()
            }
            DataType::Null => Ok(vec![None; column.len()]),
            other => Err(ProcessorError::UnsupportedDateType {
                column: name,
                dtype: other.to_string(),
            }),
        }
    }

    /// English month name and calendar year of each `Order Date`.
    pub fn derive_calendar(df: &DataFrame) -> Result<(Column, Column), ProcessorError> {
        let dates = Self::date_values(required_column(df, ORDER_DATE)?)?;

        let mut months: Vec<Option<&'static str>> = Vec::with_capacity(dates.len());
        let mut years: Vec<Option<i32>> = Vec::with_capacity(dates.len());
        for date in dates {
            match date.map(calendar::year_month) {
                Some((year, month)) => {
                    months.push(calendar::month_name(month));
                    years.push(Some(year));
                }
                None => {
                    months.push(None);
                    years.push(None);
                }
            }
        }

        Ok((
            Column::new(ORDER_MONTH.into(), months),
            Column::new(ORDER_YEAR.into(), years),
        ))
    }

    /// Positional percent change of `Sales` against the previous row.
    pub fn sales_growth(df: &DataFrame) -> Result<Column, ProcessorError> {
        let sales = required_column(df, SALES)?.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = sales.f64()?.into_iter().collect();

        let (growth, zero_rows) = Self::positional_growth(&values);
        if !zero_rows.is_empty() {
            warn!(
                rows = ?zero_rows,
                "sales growth against a zero previous value set to 0"
            );
        }

        Ok(Column::new(SALES_GROWTH.into(), growth))
    }

    /// Percent change of each value against the last non-null value before
    /// it. NaN counts as null. The first row, null rows, and changes from
    /// zero are 0. Returns the
    /// growth values and the rows where a non-zero value followed a zero.
    pub fn positional_growth(values: &[Option<f64>]) -> (Vec<f64>, Vec<usize>) {
        let mut growth = Vec::with_capacity(values.len());
        let mut zero_rows = Vec::new();
        let mut previous: Option<f64> = None;

        for (row, value) in values.iter().enumerate() {
            let value = value.filter(|v| !v.is_nan());
            let change = match (previous, value) {
                (Some(prev), Some(current)) if prev == 0.0 => {
                    if current != 0.0 {
                        zero_rows.push(row);
                    }
                    0.0
                }
                (Some(prev), Some(current)) => (current - prev) / prev,
                _ => 0.0,
            };
            growth.push(if change.is_nan() { 0.0 } else { change });

            if value.is_some() {
                previous = value;
            }
        }

        (growth, zero_rows)
    }

    /// Preview rows, shape and per-column null counts.
    pub fn overview(df: &DataFrame, head_rows: usize) -> DataOverview {
        DataOverview {
            head: df.head(Some(head_rows)),
            rows: df.height(),
            columns: df.width(),
            missing: df
                .get_columns()
                .iter()
                .map(|col| (col.name().to_string(), col.null_count()))
                .collect(),
        }
    }
}

fn to_millis(value: i64, unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Nanoseconds => value.div_euclid(1_000_000),
        TimeUnit::Microseconds => value.div_euclid(1_000),
        TimeUnit::Milliseconds => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn growth_of(df: &DataFrame) -> Vec<f64> {
        df.column(SALES_GROWTH)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn clean_drops_identifier_columns() {
        let cleaned = DataProcessor::clean(&fixtures::orders_frame()).unwrap();
        let names: Vec<String> = cleaned
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        for id in IDENTIFIER_COLUMNS {
            assert!(!names.contains(&id.to_string()), "{id} still present");
        }
        assert_eq!(
            &names[names.len() - 3..],
            &[ORDER_MONTH, ORDER_YEAR, SALES_GROWTH]
        );
    }

    #[test]
    fn dropping_absent_identifiers_is_a_no_op() {
        let df = df!("Sales" => [1.0, 2.0]).unwrap();
        let dropped = DataProcessor::drop_identifiers(&df).unwrap();
        assert!(dropped.equals(&df));
    }

    #[test]
    fn clean_is_idempotent() {
        let once = DataProcessor::clean(&fixtures::orders_frame()).unwrap();
        let twice = DataProcessor::clean(&once).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn calendar_columns_follow_order_date() {
        let cleaned = DataProcessor::clean(&fixtures::orders_frame()).unwrap();

        assert_eq!(cleaned.column(ORDER_DATE).unwrap().dtype(), &DataType::Date);
        assert_eq!(cleaned.column(SHIP_DATE).unwrap().dtype(), &DataType::Date);

        let months: Vec<Option<&str>> = cleaned
            .column(ORDER_MONTH)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        let years: Vec<Option<i32>> = cleaned
            .column(ORDER_YEAR)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(months, vec![Some("January"), Some("February"), Some("January")]);
        assert_eq!(years, vec![Some(2015), Some(2015), Some(2016)]);
    }

    #[test]
    fn growth_is_positional_percent_change() {
        let df = df!("Sales" => [100.0, 150.0, 120.0]).unwrap();
        let growth = DataProcessor::sales_growth(&df).unwrap();
        let values: Vec<f64> = growth.f64().unwrap().into_iter().flatten().collect();

        assert_eq!(values.len(), 3);
        assert!(approx_eq(values[0], 0.0));
        assert!(approx_eq(values[1], 0.5));
        assert!(approx_eq(values[2], -0.2));
    }

    #[test]
    fn growth_from_zero_is_zero_and_reported() {
        let (growth, zero_rows) =
            DataProcessor::positional_growth(&[Some(0.0), Some(10.0), Some(0.0), Some(0.0)]);
        assert_eq!(growth, vec![0.0, 0.0, -1.0, 0.0]);
        assert_eq!(zero_rows, vec![1]);
    }

    #[test]
    fn growth_skips_null_sales() {
        let (growth, _) =
            DataProcessor::positional_growth(&[Some(100.0), None, Some(150.0)]);
        assert_eq!(growth, vec![0.0, 0.0, 0.5]);
    }

    #[test]
    fn nan_sales_do_not_reset_the_baseline() {
        let (growth, zero_rows) =
            DataProcessor::positional_growth(&[Some(100.0), Some(f64::NAN), Some(150.0)]);
        assert_eq!(growth, vec![0.0, 0.0, 0.5]);
        assert!(zero_rows.is_empty());
    }

    #[test]
    fn growth_of_cleaned_fixture_matches_row_order() {
        let cleaned = DataProcessor::clean(&fixtures::orders_frame()).unwrap();
        let growth = growth_of(&cleaned);
        assert!(approx_eq(growth[0], 0.0));
        assert!(approx_eq(growth[1], 0.5));
        assert!(approx_eq(growth[2], -0.2));
    }

    #[test]
    fn unparseable_date_fails_with_row() {
        let df = df!(
            "Order Date" => ["2016-01-03", "someday"],
            "Ship Date" => ["2016-01-05", "2016-01-06"],
            "Sales" => [1.0, 2.0]
        )
        .unwrap();

        match DataProcessor::clean(&df).unwrap_err() {
            ProcessorError::UnparseableDate { column, row, value } => {
                assert_eq!(column, ORDER_DATE);
                assert_eq!(row, 1);
                assert_eq!(value, "someday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn excel_serials_parse_as_dates() {
        let df = df!(
            "Order Date" => [42370i64, 42401],
            "Ship Date" => [42372.25, 42405.0],
            "Sales" => [1.0, 2.0]
        )
        .unwrap();

        let cleaned = DataProcessor::clean(&df).unwrap();
        let months: Vec<Option<&str>> = cleaned
            .column(ORDER_MONTH)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(months, vec![Some("January"), Some("February")]);
    }

    #[test]
    fn null_dates_yield_null_calendar_values() {
        let df = df!(
            "Order Date" => [Some("2016-01-03"), None],
            "Ship Date" => ["2016-01-05", ""],
            "Sales" => [1.0, 2.0]
        )
        .unwrap();

        let cleaned = DataProcessor::clean(&df).unwrap();
        assert_eq!(cleaned.column(ORDER_YEAR).unwrap().null_count(), 1);
        assert_eq!(cleaned.column(ORDER_MONTH).unwrap().null_count(), 1);
        assert_eq!(cleaned.column(SHIP_DATE).unwrap().null_count(), 1);
    }

    #[test]
    fn missing_sales_column_is_reported() {
        let df = df!(
            "Order Date" => ["2016-01-03"],
            "Ship Date" => ["2016-01-05"]
        )
        .unwrap();

        let err = DataProcessor::clean(&df).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingColumn(name) if name == SALES));
    }

    #[test]
    fn boolean_date_column_is_rejected() {
        let df = df!(
            "Order Date" => [true],
            "Ship Date" => ["2016-01-05"],
            "Sales" => [1.0]
        )
        .unwrap();

        let err = DataProcessor::clean(&df).unwrap_err();
        assert!(matches!(err, ProcessorError::UnsupportedDateType { .. }));
    }

    #[test]
    fn polars_failures_convert_to_polars_variant() {
        let err: ProcessorError = PolarsError::ColumnNotFound("Sales".into()).into();
        assert!(matches!(err, ProcessorError::Polars(_)));
        assert!(err.to_string().starts_with("Polars error"));
    }

    #[test]
    fn overview_counts_missing_values() {
        let df = df!(
            "Category" => [Some("Furniture"), None, None],
            "Sales" => [Some(1.0), Some(2.0), None]
        )
        .unwrap();

        let overview = DataProcessor::overview(&df, 2);
        assert_eq!(overview.head.height(), 2);
        assert_eq!((overview.rows, overview.columns), (3, 2));
        assert_eq!(
            overview.missing,
            vec![("Category".to_string(), 2), ("Sales".to_string(), 1)]
        );
    }

    #[test]
    fn numeric_columns_exclude_text_and_dates() {
        let cleaned = DataProcessor::clean(&fixtures::orders_frame()).unwrap();
        assert_eq!(
            numeric_column_names(&cleaned),
            vec!["Sales", "Profit", "Quantity", ORDER_YEAR, SALES_GROWTH]
        );
    }
}
