// crates/lemco-core/src/pipeline.rs

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::clean::{clean, CleanReport};
use crate::config::PipelineConfig;
use crate::decompose::{decompose, JoinIntegrityWarning};
use crate::error::Result;
use crate::sink::write_local;
use crate::source::read_source;
use crate::upload::Uploader;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub source_rows: usize,
    pub cleaning: CleanReport,
    pub customer_rows: usize,
    pub product_rows: usize,
    pub fact_rows: usize,
    pub join_warnings: Vec<JoinIntegrityWarning>,
    pub local_files: Vec<PathBuf>,
    pub uploaded_keys: Vec<String>,
}

/// **The Orchestrator**: extract, clean, decompose, write locally, then upload.
///
/// Stages run strictly one after another. The first fatal error ends the run; files and
/// objects written before it stay where they are.
pub struct Pipeline {
    config: PipelineConfig,
    uploader: Option<Uploader>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            uploader: None,
        }
    }

    pub fn with_uploader(mut self, uploader: Uploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let raw = read_source(&self.config.source)?;
        let source_rows = raw.height();

        let cleaned = clean(&raw)?;
        let star = decompose(&cleaned.table)?;

        let local_files = write_local(&star, &self.config.layout)?;
        info!(
            output_dir = %self.config.layout.output_dir.display(),
            "files have been loaded temporarily into the local machine"
        );

        let mut uploaded_keys = Vec::new();
        match &self.uploader {
            Some(uploader) => {
                for (name, table) in star.tables() {
                    let key = self.config.remote_key(name);
                    uploaded_keys.push(uploader.upload_table(table, &key).await?);
                }
                info!(
                    store = %uploader.store().describe(),
                    objects = uploaded_keys.len(),
                    "tables uploaded to blob storage"
                );
            }
            None => info!("remote upload skipped"),
        }

        Ok(RunSummary {
            source: self.config.source.clone(),
            source_rows,
            cleaning: cleaned.report,
            customer_rows: star.customers.height(),
            product_rows: star.products.height(),
            fact_rows: star.facts.height(),
            join_warnings: star.warnings,
            local_files,
            uploaded_keys,
        })
    }
}
