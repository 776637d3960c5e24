//! Explicit run configuration. Built once at process start and passed down by reference.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use lemco_bucket::{AzureConnectionString, BucketStore, ObjectStoreBucket, S3BucketStore, S3Config};

use crate::error::{PipelineError, Result};

pub const DEFAULT_SOURCE: &str = "lemco_logistics_data.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "dataset";
pub const DEFAULT_REMOTE_PREFIX: &str = "rawdata/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLayout {
    pub output_dir: PathBuf,
}

impl LocalLayout {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn csv_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.csv"))
    }
}

impl Default for LocalLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: PathBuf,
    pub layout: LocalLayout,
    pub remote_prefix: String,
}

impl PipelineConfig {
    pub fn remote_key(&self, table: &str) -> String {
        format!("{}{table}.parquet", self.remote_prefix)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            layout: LocalLayout::default(),
            remote_prefix: DEFAULT_REMOTE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Azure,
    S3,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" | "blob" => Ok(StoreKind::Azure),
            "s3" => Ok(StoreKind::S3),
            "memory" | "in-memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown object store kind '{other}' (expected azure, s3 or memory)")),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreKind::Azure => "azure",
            StoreKind::S3 => "s3",
            StoreKind::Memory => "memory",
        })
    }
}

/// Resolved credentials and target for the remote uploader.
#[derive(Debug, Clone)]
pub enum RemoteConfig {
    Azure {
        connection: AzureConnectionString,
        container: String,
    },
    S3(S3Config),
    Memory,
}

impl RemoteConfig {
    pub fn from_env(kind: StoreKind) -> Result<Self> {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(kind: StoreKind, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| PipelineError::Config(format!("{key} must be set")))
        };

        match kind {
            StoreKind::Azure => {
                let raw = required("CONNECT_STR")?;
                let connection = AzureConnectionString::parse(&raw)
                    .map_err(|err| PipelineError::Config(format!("CONNECT_STR: {err}")))?;
                Ok(RemoteConfig::Azure {
                    connection,
                    container: required("CONTAINER_NAME")?,
                })
            }
            StoreKind::S3 => {
                let defaults = S3Config::default();
                let force_path_style = lookup("S3_FORCE_PATH_STYLE")
                    .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false);
                Ok(RemoteConfig::S3(S3Config {
                    bucket: required("S3_BUCKET")?,
                    region: lookup("S3_REGION").unwrap_or(defaults.region),
                    endpoint: lookup("S3_ENDPOINT_URL"),
                    access_key_id: lookup("S3_ACCESS_KEY_ID"),
                    secret_access_key: lookup("S3_SECRET_ACCESS_KEY"),
                    force_path_style,
                }))
            }
            StoreKind::Memory => Ok(RemoteConfig::Memory),
        }
    }

    /// Build the bucket client for this configuration.
    pub async fn connect(&self) -> Result<Arc<dyn BucketStore>> {
        let store: Arc<dyn BucketStore> = match self {
            RemoteConfig::Azure {
                connection,
                container,
            } => Arc::new(
                ObjectStoreBucket::azure(connection, container)
                    .map_err(|err| PipelineError::Config(err.to_string()))?,
            ),
            RemoteConfig::S3(config) => Arc::new(
                S3BucketStore::new(config.clone())
                    .await
                    .map_err(|err| PipelineError::Config(err.to_string()))?,
            ),
            RemoteConfig::Memory => Arc::new(ObjectStoreBucket::in_memory()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn azure_config_requires_connection_and_container() {
        let err = RemoteConfig::from_lookup(StoreKind::Azure, lookup(&[])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(message) if message.contains("CONNECT_STR")));

        let err = RemoteConfig::from_lookup(
            StoreKind::Azure,
            lookup(&[("CONNECT_STR", "AccountName=lemco;AccountKey=abc")]),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(message) if message.contains("CONTAINER_NAME")));
    }

    #[test]
    fn azure_config_resolves() {
        let config = RemoteConfig::from_lookup(
            StoreKind::Azure,
            lookup(&[
                ("CONNECT_STR", "AccountName=lemco;AccountKey=abc"),
                ("CONTAINER_NAME", "lemco-raw"),
            ]),
        )
        .expect("config");
        match config {
            RemoteConfig::Azure {
                connection,
                container,
            } => {
                assert_eq!(connection.account_name, "lemco");
                assert_eq!(container, "lemco-raw");
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn s3_config_reads_optional_settings() {
        let config = RemoteConfig::from_lookup(
            StoreKind::S3,
            lookup(&[
                ("S3_BUCKET", "lemco"),
                ("S3_ENDPOINT_URL", "http://localhost:9000"),
                ("S3_FORCE_PATH_STYLE", "true"),
            ]),
        )
        .expect("config");
        let RemoteConfig::S3(s3) = config else {
            panic!("expected s3 config");
        };
        assert_eq!(s3.bucket, "lemco");
        assert_eq!(s3.region, "us-east-1");
        assert!(s3.force_path_style);
    }

    #[test]
    fn store_kind_parses_case_insensitively() {
        assert_eq!("Azure".parse::<StoreKind>(), Ok(StoreKind::Azure));
        assert_eq!("s3".parse::<StoreKind>(), Ok(StoreKind::S3));
        assert!("ftp".parse::<StoreKind>().is_err());
    }

    #[test]
    fn remote_keys_use_prefix_and_parquet_extension() {
        let config = PipelineConfig::default();
        assert_eq!(config.remote_key("customer"), "rawdata/customer.parquet");
        assert_eq!(
            config.layout.csv_path("products"),
            PathBuf::from("dataset").join("products.csv")
        );
    }
}
