use std::io::Cursor;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Load the raw extract. Every column is read as `String` so no value is lost to type
/// inference; typing happens in the cleaner.
pub fn read_source(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|err| source_error(path, err))?;

    let df = trim_headers(df).map_err(|err| source_error(path, err))?;
    info!(path = %path.display(), rows = df.height(), columns = df.width(), "source loaded");
    Ok(df)
}

/// Same as [`read_source`] for an in-memory buffer.
pub fn read_source_bytes(bytes: &[u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .and_then(trim_headers)
        .map_err(|err| source_error(Path::new("<memory>"), err))?;
    Ok(df)
}

fn trim_headers(mut df: DataFrame) -> PolarsResult<DataFrame> {
    let trimmed: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    df.set_column_names(trimmed)?;
    Ok(df)
}

fn source_error(path: &Path, err: PolarsError) -> PipelineError {
    PipelineError::SourceRead {
        path: PathBuf::from(path),
        reason: err.to_string(),
    }
}
