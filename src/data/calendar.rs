//! Calendar helpers shared by the loader, processor and writer.
//! Conversions between chrono dates, epoch offsets and Excel serial days.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Timelike};

/// English month names, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Excel serial 25569 is 1970-01-01.
const EXCEL_UNIX_OFFSET: i64 = 25_569;

/// Largest serial Excel accepts (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// 1-based month number for an English month name.
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name.trim()))
        .map(|idx| idx as u32 + 1)
}

/// Days since 1970-01-01, the physical value of a polars `Date`.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(unix_epoch()).num_days() as i32
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    let epoch = unix_epoch();
    if days >= 0 {
        epoch.checked_add_days(Days::new(days as u64))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs() as u64))
    }
}

pub fn epoch_millis_to_datetime(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

pub fn datetime_to_epoch_millis(datetime: NaiveDateTime) -> i64 {
    datetime.and_utc().timestamp_millis()
}

/// Excel serial day number to a date, dropping any time-of-day fraction.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    days_to_date((serial.floor() as i64 - EXCEL_UNIX_OFFSET) as i32)
}

pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    (date_to_days(date) as i64 + EXCEL_UNIX_OFFSET) as f64
}

pub fn datetime_to_excel_serial(datetime: NaiveDateTime) -> f64 {
    let seconds = datetime.num_seconds_from_midnight() as f64
        + datetime.nanosecond() as f64 / 1_000_000_000.0;
    date_to_excel_serial(datetime.date()) + seconds / SECONDS_PER_DAY
}

/// Parse a date written as text. Accepts ISO, US month-first and long-form
/// dates, with or without a time part. Returns `None` when no format matches.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Render a timestamp as text, omitting a midnight time part.
pub fn format_datetime(datetime: NaiveDateTime) -> String {
    if datetime.num_seconds_from_midnight() == 0 && datetime.nanosecond() == 0 {
        datetime.date().format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Calendar year and month of a date.
pub fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}
