//! Blob storage backends used to persist the Lemco star-schema tables.
//!
//! Every backend implements [`BucketStore`]; uploads always overwrite the object at the
//! target key and never retry on their own.

mod blob;
mod connection_string;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use blob::ObjectStoreBucket;
pub use connection_string::AzureConnectionString;
pub use s3::{S3BucketStore, S3Config};

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication rejected: {0}")]
    Authentication(String),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("transient network failure: {0}")]
    Transient(String),
    #[error("size or quota limit exceeded: {0}")]
    QuotaExceeded(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl BucketError {
    /// Whether the failure is worth re-running the whole pipeline for.
    pub fn is_transient(&self) -> bool {
        matches!(self, BucketError::Transient(_))
    }

    /// Classify a free-form backend message when the SDK gives no structured status.
    pub(crate) fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();

        if lowered.contains("containernotfound") || lowered.contains("nosuchbucket") {
            BucketError::ContainerNotFound(message)
        } else if lowered.contains("authenticationfailed")
            || lowered.contains("authorizationfailure")
            || lowered.contains("401 unauthorized")
            || lowered.contains("403 forbidden")
        {
            BucketError::Authentication(message)
        } else if lowered.contains("requestbodytoolarge")
            || lowered.contains("413 payload too large")
            || lowered.contains("quota")
            || lowered.contains("entitytoolarge")
        {
            BucketError::QuotaExceeded(message)
        } else if lowered.contains("timed out")
            || lowered.contains("timeout")
            || lowered.contains("error sending request")
            || lowered.contains("connection")
            || lowered.contains("503 service unavailable")
        {
            BucketError::Transient(message)
        } else {
            BucketError::Backend(message)
        }
    }
}

#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Store `bytes` at `key`, replacing any object already there.
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError>;
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError>;
    /// Human readable location used in log lines, e.g. `azure://container`.
    fn describe(&self) -> String;
}
