//! Row builders for unit tests.

use polars::prelude::DataFrame;

use crate::schema::SOURCE_COLUMNS;
use crate::source::read_source_bytes;

const DEFAULTS: [&str; 25] = [
    "T000",
    "2023-03-15",
    "C001",
    "Ada Obi",
    "555-0100",
    "ada@example.com",
    "12 Wharf Road",
    "P001",
    "2",
    "10.0",
    "20.0",
    "0.05",
    "Pallet Wrap",
    "Online",
    "High",
    "WH-1",
    "Air",
    "Delivered",
    "Satisfied",
    "No",
    "",
    "Card",
    "Yes",
    "West",
    "Nigeria",
];

#[derive(Debug, Clone)]
pub(crate) struct Row {
    fields: Vec<String>,
}

impl Row {
    pub(crate) fn new(transaction_id: &str) -> Self {
        let mut fields: Vec<String> = DEFAULTS.iter().map(|v| v.to_string()).collect();
        fields[0] = transaction_id.to_string();
        Self { fields }
    }

    pub(crate) fn set(mut self, column: &str, value: &str) -> Self {
        let idx = SOURCE_COLUMNS
            .iter()
            .position(|name| *name == column)
            .unwrap_or_else(|| panic!("unknown column {column}"));
        self.fields[idx] = value.to_string();
        self
    }

    fn line(&self) -> String {
        self.fields.join(",")
    }
}

pub(crate) fn csv(rows: &[Row]) -> Vec<u8> {
    let mut out = SOURCE_COLUMNS.join(",");
    out.push('\n');
    for row in rows {
        out.push_str(&row.line());
        out.push('\n');
    }
    out.into_bytes()
}

pub(crate) fn frame(rows: &[Row]) -> DataFrame {
    read_source_bytes(&csv(rows)).expect("fixture rows should parse")
}
