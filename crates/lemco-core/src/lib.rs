pub mod clean;
pub mod config;
pub mod decompose;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;
pub mod upload;

#[cfg(test)]
mod fixtures;

pub use clean::{clean, CleanReport, Cleaned};
pub use config::{LocalLayout, PipelineConfig, RemoteConfig, StoreKind};
pub use decompose::{decompose, Dimension, JoinIntegrityWarning, StarSchema};
pub use error::{PipelineError, Result, Stage};
pub use pipeline::{Pipeline, RunSummary};
pub use sink::write_local;
pub use source::{read_source, read_source_bytes};
pub use upload::Uploader;
