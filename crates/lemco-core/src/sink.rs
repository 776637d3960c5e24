use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::config::LocalLayout;
use crate::decompose::StarSchema;
use crate::error::{PipelineError, Result};

pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write the three star-schema tables as CSV files under the layout's output directory.
pub fn write_local(star: &StarSchema, layout: &LocalLayout) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&layout.output_dir).map_err(|err| PipelineError::LocalWrite {
        path: layout.output_dir.clone(),
        reason: err.to_string(),
    })?;

    let mut written = Vec::with_capacity(3);
    for (name, table) in star.tables() {
        let path = layout.csv_path(name);
        write_csv(table, &path)?;
        info!(table = name, rows = table.height(), path = %path.display(), "table written locally");
        written.push(path);
    }
    Ok(written)
}

/// Header row, no index column, datetimes rendered at second resolution.
pub fn write_csv(table: &DataFrame, path: &Path) -> Result<()> {
    let local_error = |reason: String| PipelineError::LocalWrite {
        path: path.to_path_buf(),
        reason,
    };

    let mut file = File::create(path).map_err(|err| local_error(err.to_string()))?;
    let mut table = table.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_datetime_format(Some(CSV_DATETIME_FORMAT.to_string()))
        .finish(&mut table)
        .map_err(|err| local_error(err.to_string()))?;
    file.sync_all().map_err(|err| local_error(err.to_string()))?;
    Ok(())
}
