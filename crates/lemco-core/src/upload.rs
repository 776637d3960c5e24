use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use lemco_bucket::BucketStore;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::DataFrame;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{PipelineError, Result};

pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Serializes tables to Parquet in memory and puts them into a bucket, one at a time.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn BucketStore>,
    cancel: CancellationToken,
}

impl Uploader {
    pub fn new(store: Arc<dyn BucketStore>, cancel: CancellationToken) -> Self {
        Self { store, cancel }
    }

    pub fn store(&self) -> &Arc<dyn BucketStore> {
        &self.store
    }

    /// Upload `table` to `key`, overwriting whatever is stored there. No retries.
    /// Returns the key written.
    pub async fn upload_table(&self, table: &DataFrame, key: &str) -> Result<String> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(format!("upload of {key}")));
        }

        let payload = parquet_bytes(table)?;
        let size = payload.len();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(PipelineError::Cancelled(format!("upload of {key}")))
            }
            result = self.store.put_object(key, Bytes::from(payload), PARQUET_CONTENT_TYPE) => {
                result.map_err(|source| PipelineError::Upload {
                    key: key.to_string(),
                    source,
                })?;
                info!(key, size, rows = table.height(), store = %self.store.describe(), "uploaded to blob storage");
                Ok(key.to_string())
            }
        }
    }
}

/// Encode a table as a Zstd-compressed Parquet file held entirely in memory.
pub fn parquet_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}
