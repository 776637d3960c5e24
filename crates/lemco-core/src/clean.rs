use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::schema::{
    require, string_values, DATE, DISCOUNT_RATE, QUANTITY, RETURN_REASON, TOTAL_COST, UNIT_PRICE,
};

pub const UNKNOWN_RETURN_REASON: &str = "unknown";

/// Temporal resolution every surviving `Date` is normalized to.
pub const DATE_UNIT: TimeUnit = TimeUnit::Milliseconds;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%B %d, %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanReport {
    pub input_rows: usize,
    pub unit_price_filled: usize,
    pub unit_price_mean: Option<f64>,
    pub total_cost_filled: usize,
    pub total_cost_mean: Option<f64>,
    pub discount_rate_filled: usize,
    pub return_reason_filled: usize,
    pub dropped_missing_date: usize,
    pub dropped_unparsable_date: usize,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: DataFrame,
    pub report: CleanReport,
}

/// Fill missing values, drop rows without a usable date and normalize dates.
///
/// Means are taken before any row is dropped, over the values present at that point.
pub fn clean(raw: &DataFrame) -> Result<Cleaned> {
    let mut table = raw.clone();
    let mut report = CleanReport {
        input_rows: raw.height(),
        ..Default::default()
    };

    let unit_price = parse_f64(require(raw, UNIT_PRICE)?)?;
    let (unit_price, filled, mean) = fill_with_mean(unit_price);
    report.unit_price_filled = filled;
    report.unit_price_mean = mean;
    table.with_column(unit_price.into_series())?;

    let total_cost = parse_f64(require(raw, TOTAL_COST)?)?;
    let (total_cost, filled, mean) = fill_with_mean(total_cost);
    report.total_cost_filled = filled;
    report.total_cost_mean = mean;
    table.with_column(total_cost.into_series())?;

    let discount = parse_f64(require(raw, DISCOUNT_RATE)?)?;
    report.discount_rate_filled = discount.null_count();
    table.with_column(fill_with(discount, 0.0).into_series())?;

    let reasons = string_values(require(raw, RETURN_REASON)?)?;
    let reasons: StringChunked = reasons
        .into_iter()
        .map(|value| match value {
            Some(text) if !text.trim().is_empty() => Some(text),
            _ => {
                report.return_reason_filled += 1;
                Some(UNKNOWN_RETURN_REASON)
            }
        })
        .collect();
    table.with_column(reasons.with_name(RETURN_REASON.into()).into_series())?;

    table.with_column(parse_quantity(require(raw, QUANTITY)?)?)?;

    let dates = string_values(require(raw, DATE)?)?;
    let mut keep = Vec::with_capacity(dates.len());
    let mut millis: Vec<Option<i64>> = Vec::with_capacity(dates.len());
    for value in dates.into_iter() {
        let text = value.map(str::trim).filter(|text| !text.is_empty());
        let parsed = match text {
            None => {
                report.dropped_missing_date += 1;
                None
            }
            Some(text) => {
                let parsed = parse_date(text);
                if parsed.is_none() {
                    report.dropped_unparsable_date += 1;
                }
                parsed
            }
        };
        keep.push(parsed.is_some());
        millis.push(parsed.map(|ts| ts.and_utc().timestamp_millis()));
    }

    let date_series =
        Series::new(DATE.into(), millis).cast(&DataType::Datetime(DATE_UNIT, None))?;
    table.with_column(date_series)?;

    let mask: BooleanChunked = keep.into_iter().collect();
    let table = table.filter(&mask)?;
    report.output_rows = table.height();

    info!(
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        dropped_missing_date = report.dropped_missing_date,
        dropped_unparsable_date = report.dropped_unparsable_date,
        unit_price_filled = report.unit_price_filled,
        total_cost_filled = report.total_cost_filled,
        "cleaning complete"
    );

    Ok(Cleaned { table, report })
}

/// Parse one date value in any of the accepted layouts. Slash dates are month-first.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.naive_utc())
}

fn parse_f64(column: &Column) -> Result<Float64Chunked> {
    let name = column.name().clone();
    let parsed: Float64Chunked = string_values(column)?
        .into_iter()
        .map(|value| {
            value
                .and_then(|text| text.trim().parse::<f64>().ok())
                .filter(|number| number.is_finite())
        })
        .collect();
    Ok(parsed.with_name(name))
}

/// Whole-number quantities become `Int64`. A fractional value anywhere keeps the
/// column `Float64` so distinct quantities never collapse together.
fn parse_quantity(column: &Column) -> Result<Series> {
    let parsed = parse_f64(column)?;
    let integral = parsed
        .into_iter()
        .flatten()
        .all(|number| number.fract() == 0.0 && number.abs() < i64::MAX as f64);
    let series = parsed.into_series();
    if integral {
        Ok(series.cast(&DataType::Int64)?)
    } else {
        Ok(series)
    }
}

/// Replace nulls with the mean of the present values (sum / count, independent of
/// chunking). A column with no values at all falls back to `0.0`.
fn fill_with_mean(values: Float64Chunked) -> (Float64Chunked, usize, Option<f64>) {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0_usize), |(sum, count), value| (sum + value, count + 1));
    let mean = (count > 0).then(|| sum / count as f64);

    if mean.is_none() && values.null_count() > 0 {
        warn!(column = %values.name(), "no values to average; filling with 0.0");
    }

    let filled = values.null_count();
    (fill_with(values, mean.unwrap_or(0.0)), filled, mean)
}

fn fill_with(values: Float64Chunked, fill: f64) -> Float64Chunked {
    let name = values.name().clone();
    let filled: Float64Chunked = values
        .into_iter()
        .map(|value| Some(value.unwrap_or(fill)))
        .collect();
    filled.with_name(name)
}
