//! Shared test tables and workbooks.

use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// Three orders in the shape of the source sheet, dates as text.
pub fn orders_frame() -> DataFrame {
    df!(
        "Row ID" => [1i64, 2, 3],
        "Order ID" => ["CA-2015-1", "CA-2015-2", "CA-2016-3"],
        "Order Date" => ["2015-01-10", "2015-02-14", "2016-01-03"],
        "Ship Date" => ["2015-01-12", "2015-02-20", "2016-01-07"],
        "Category" => ["Furniture", "Technology", "Furniture"],
        "Region" => ["West", "East", "East"],
        "Sales" => [100.0, 150.0, 120.0],
        "Profit" => [10.0, -5.0, 20.5],
        "Quantity" => [2i64, 3, 1]
    )
    .unwrap()
}

/// Write the same orders to an xlsx file. Order dates are real date cells,
/// ship dates are text.
pub fn write_orders_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Orders").unwrap();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let headers = [
        "Row ID",
        "Order ID",
        "Order Date",
        "Ship Date",
        "Category",
        "Region",
        "Sales",
        "Profit",
    ];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).unwrap();
    }

    // (order id, order date serial, ship date, category, region, sales, profit)
    let rows = [
        ("CA-2015-1", 42014.0, "2015-01-12", "Furniture", "West", 100.25, 10.0),
        ("CA-2015-2", 42049.0, "2015-02-20", "Technology", "East", 150.5, -5.0),
        ("CA-2016-3", 42372.0, "2016-01-07", "Furniture", "East", 120.0, 20.5),
    ];
    for (idx, (order_id, order_date, ship_date, category, region, sales, profit)) in
        rows.iter().enumerate()
    {
        let row = idx as u32 + 1;
        worksheet.write_number(row, 0, (idx + 1) as f64).unwrap();
        worksheet.write_string(row, 1, *order_id).unwrap();
        worksheet
            .write_number_with_format(row, 2, *order_date, &date_format)
            .unwrap();
        worksheet.write_string(row, 3, *ship_date).unwrap();
        worksheet.write_string(row, 4, *category).unwrap();
        worksheet.write_string(row, 5, *region).unwrap();
        worksheet.write_number(row, 6, *sales).unwrap();
        worksheet.write_number(row, 7, *profit).unwrap();
    }

    workbook.save(path).unwrap();
}
