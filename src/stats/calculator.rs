//! Statistics Calculator Module
//! Handles totals, group-by sums, descriptive stats and correlation.

use crate::data::{
    calendar, numeric_column_names, CATEGORY, ORDER_MONTH, ORDER_YEAR, PROFIT, REGION, SALES,
};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
}

/// Sales and profit totals for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: String,
    pub sales: f64,
    pub profit: f64,
}

/// A single summed value for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub group: String,
    pub value: f64,
}

/// Sales summed over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub sales: f64,
}

/// Pairwise Pearson coefficients; `values[i][j]` pairs `columns[i]` with `columns[j]`.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Correlation result. `NoNumericColumns` is a warning for the caller, not a failure.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Correlation {
    Matrix(CorrelationMatrix),
    NoNumericColumns,
}

impl Correlation {
    pub fn is_empty(&self) -> bool {
        matches!(self, Correlation::NoNumericColumns)
    }
}

/// Aggregates the report views are built from.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub total_sales: f64,
    pub total_profit: f64,
    pub category_totals: Vec<CategoryTotals>,
    pub region_sales: Vec<GroupTotal>,
    pub monthly_sales: Vec<MonthlySales>,
    pub correlation: Correlation,
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDescription {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl ColumnDescription {
    fn empty(column: &str) -> Self {
        Self {
            column: column.to_string(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute every aggregate of a prepared orders table.
    ///
    /// Absent summary columns contribute nothing: no `Sales`/`Profit` gives
    /// zero totals, no `Category`/`Region` gives empty groups, and no
    /// calendar columns give no monthly sales.
    pub fn summarize(df: &DataFrame) -> Result<Summary, StatsError> {
        let sales = Self::optional_float_values(df, SALES)?;
        let profit = Self::optional_float_values(df, PROFIT)?;
        let categories = Self::optional_string_values(df, CATEGORY)?;
        let regions = Self::optional_string_values(df, REGION)?;

        let total_sales = sales.iter().flatten().sum();
        let total_profit = profit.iter().flatten().sum();

        let category_sales = Self::sum_by_key(&categories, &sales);
        let category_profit = Self::sum_by_key(&categories, &profit);
        let category_totals = category_sales
            .into_iter()
            .map(|(category, sales)| {
                let profit = category_profit.get(&category).copied().unwrap_or(0.0);
                CategoryTotals {
                    category,
                    sales,
                    profit,
                }
            })
            .collect();

        let region_sales = Self::sum_by_key(&regions, &sales)
            .into_iter()
            .map(|(group, value)| GroupTotal { group, value })
            .collect();

        let monthly_sales = Self::monthly_sales(df, &sales)?;
        let correlation = Self::correlation(df)?;

        debug!(rows = df.height(), "summarized orders table");
        Ok(Summary {
            rows: df.height(),
            total_sales,
            total_profit,
            category_totals,
            region_sales,
            monthly_sales,
            correlation,
        })
    }

    /// Sum `values` per non-null key, keys in sorted order. Null values add nothing.
    pub fn sum_by_key(keys: &[Option<String>], values: &[Option<f64>]) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        for (key, value) in keys.iter().zip(values) {
            if let Some(key) = key {
                *sums.entry(key.clone()).or_insert(0.0) += value.unwrap_or(0.0);
            }
        }
        sums
    }

    /// Sales per (year, month), chronological.
    fn monthly_sales(df: &DataFrame, sales: &[Option<f64>]) -> Result<Vec<MonthlySales>, StatsError> {
        if df.column(ORDER_YEAR).is_err() || df.column(ORDER_MONTH).is_err() {
            debug!("no calendar columns for monthly sales");
            return Ok(Vec::new());
        }

        let years: Vec<Option<i32>> = Self::column(df, ORDER_YEAR)?
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .collect();
        let months = Self::string_values(df, ORDER_MONTH)?;

        let mut sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for ((year, month), value) in years.iter().zip(&months).zip(sales) {
            let (Some(year), Some(month)) = (year, month.as_deref().and_then(calendar::month_number))
            else {
                continue;
            };
            *sums.entry((*year, month)).or_insert(0.0) += value.unwrap_or(0.0);
        }

        Ok(sums
            .into_iter()
            .map(|((year, month), sales)| MonthlySales {
                year,
                month,
                month_name: calendar::month_name(month).unwrap_or_default().to_string(),
                sales,
            })
            .collect())
    }

    /// Pearson correlation over all numeric columns, pairwise-complete.
    pub fn correlation(df: &DataFrame) -> Result<Correlation, StatsError> {
        let columns = numeric_column_names(df);
        if columns.is_empty() {
            debug!("no numeric columns for correlation");
            return Ok(Correlation::NoNumericColumns);
        }

        let data: Vec<Vec<Option<f64>>> = columns
            .iter()
            .map(|name| Self::float_values(df, name))
            .collect::<Result<_, _>>()?;

        // Use rayon for parallel computation, one matrix row per task
        let values: Vec<Vec<f64>> = (0..data.len())
            .into_par_iter()
            .map(|i| {
                (0..data.len())
                    .map(|j| {
                        let r = Self::pearson(&data[i], &data[j]);
                        if i == j && !r.is_nan() {
                            1.0
                        } else {
                            r
                        }
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();

        Ok(Correlation::Matrix(CorrelationMatrix { columns, values }))
    }

    /// Pearson coefficient over rows where both values are present.
    /// NaN with fewer than two pairs or zero variance.
    pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y)
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
                _ => None,
            })
            .unzip();

        if xs.len() < 2 {
            return f64::NAN;
        }

        let covariance = xs.iter().covariance(ys.iter());
        let r = covariance / (xs.iter().std_dev() * ys.iter().std_dev());
        if r.is_finite() {
            r.clamp(-1.0, 1.0)
        } else {
            f64::NAN
        }
    }

    /// Descriptive statistics for every numeric column, in table order.
    pub fn describe(df: &DataFrame) -> Result<Vec<ColumnDescription>, StatsError> {
        let columns = numeric_column_names(df);
        let data: Vec<Vec<f64>> = columns
            .iter()
            .map(|name| {
                Self::float_values(df, name)
                    .map(|values| {
                    values
                        .into_iter()
                        .flatten()
                        .filter(|v| v.is_finite())
                        .collect::<Vec<f64>>()
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(columns
            .par_iter()
            .zip(data.par_iter())
            .map(|(name, values)| Self::compute_descriptive_stats(name, values))
            .collect())
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(column: &str, values: &[f64]) -> ColumnDescription {
        let n = values.len();
        if n == 0 {
            return ColumnDescription::empty(column);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        ColumnDescription {
            column: column.to_string(),
            count: n,
            mean: values.iter().mean(),
            std: values.iter().std_dev(),
            min: sorted[0],
            p25: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, StatsError> {
        df.column(name)
            .map_err(|_| StatsError::MissingColumn(name.to_string()))
    }

    /// Column values as floats; nulls stay `None`.
    fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, StatsError> {
        let values = Self::column(df, name)?.cast(&DataType::Float64)?;
        Ok(values.f64()?.into_iter().collect())
    }

    /// Like `float_values`, but an absent column reads as all nulls.
    fn optional_float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, StatsError> {
        if df.column(name).is_err() {
            debug!(column = name, "summary column absent");
            return Ok(vec![None; df.height()]);
        }
        Self::float_values(df, name)
    }

    fn optional_string_values(
        df: &DataFrame,
        name: &str,
    ) -> Result<Vec<Option<String>>, StatsError> {
        if df.column(name).is_err() {
            debug!(column = name, "summary column absent");
            return Ok(vec![None; df.height()]);
        }
        Self::string_values(df, name)
    }

    /// Column values as owned strings; nulls stay `None`.
    fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, StatsError> {
        let values = Self::column(df, name)?.cast(&DataType::String)?;
        Ok(values
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect())
    }
}
