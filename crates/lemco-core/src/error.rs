// crates/lemco-core/src/error.rs

use std::fmt;
use std::path::PathBuf;

use lemco_bucket::BucketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read source {path}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    #[error("expected column '{column}' is missing from the source")]
    MissingColumn { column: String },

    #[error("failed to write {path}: {reason}")]
    LocalWrite { path: PathBuf, reason: String },

    #[error("upload of {key} failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: BucketError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("run cancelled before {0} finished")]
    Cancelled(String),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl PipelineError {
    /// The pipeline stage a failure belongs to, for operator-facing messages.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::SourceRead { .. } => Stage::Extract,
            PipelineError::MissingColumn { .. } | PipelineError::Polars(_) => Stage::Transform,
            PipelineError::LocalWrite { .. } => Stage::LocalWrite,
            PipelineError::Upload { .. } | PipelineError::Cancelled(_) => Stage::Upload,
            PipelineError::Config(_) => Stage::Configure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    Extract,
    Transform,
    LocalWrite,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::LocalWrite => "local-write",
            Stage::Upload => "upload",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
