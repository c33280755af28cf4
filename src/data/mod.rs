//! Data module - workbook loading, cleaning and saving

pub mod calendar;
mod loader;
mod processor;
mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use loader::{DataLoader, ORDERS_SHEET};
pub use processor::{
    numeric_column_names, DataOverview, DataProcessor, CATEGORY, ORDER_MONTH, ORDER_YEAR, PROFIT,
    REGION, SALES,
};
pub use writer::WorkbookWriter;
