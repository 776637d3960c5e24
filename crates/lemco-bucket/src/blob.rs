use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig,
};
use tracing::debug;

use crate::{AzureConnectionString, BucketError, BucketStore};

/// [`BucketStore`] backed by any `object_store` implementation (Azure Blob, in-memory).
#[derive(Clone)]
pub struct ObjectStoreBucket {
    store: Arc<dyn ObjectStore>,
    container: String,
    scheme: &'static str,
}

impl ObjectStoreBucket {
    pub fn new(store: Arc<dyn ObjectStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            scheme: "object",
        }
    }

    pub fn azure(
        connection: &AzureConnectionString,
        container: &str,
    ) -> Result<Self, BucketError> {
        if container.is_empty() {
            return Err(BucketError::Configuration(
                "container name cannot be empty".into(),
            ));
        }

        let no_retry = RetryConfig {
            max_retries: 0,
            ..Default::default()
        };

        let mut builder = MicrosoftAzureBuilder::new()
            .with_container_name(container)
            .with_retry(no_retry);

        if connection.use_emulator {
            builder = builder.with_use_emulator(true);
        } else {
            builder = builder.with_account(&connection.account_name);

            if let Some(key) = &connection.account_key {
                builder = builder.with_access_key(key);
            }

            let sas = connection.sas_pairs()?;
            if !sas.is_empty() {
                builder = builder.with_sas_authorization(sas);
            }

            if let Some(endpoint) = connection.endpoint_override() {
                if endpoint.starts_with("http://") {
                    builder = builder.with_allow_http(true);
                }
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|err| BucketError::Configuration(err.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            container: container.to_string(),
            scheme: "azure",
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            container: "memory".to_string(),
            scheme: "memory",
        }
    }

    fn path(key: &str) -> Result<Path, BucketError> {
        Path::parse(key)
            .map_err(|err| BucketError::Configuration(format!("invalid object key '{key}': {err}")))
    }

    fn classify(&self, err: object_store::Error, key: &str, writing: bool) -> BucketError {
        let message = err.to_string();
        match err {
            object_store::Error::Unauthenticated { .. }
            | object_store::Error::PermissionDenied { .. } => BucketError::Authentication(message),
            // Blob puts create the object, so a 404 on write can only mean the container.
            object_store::Error::NotFound { .. } if writing => {
                BucketError::ContainerNotFound(self.container.clone())
            }
            object_store::Error::NotFound { .. } => {
                if message.to_ascii_lowercase().contains("containernotfound") {
                    BucketError::ContainerNotFound(self.container.clone())
                } else {
                    BucketError::NotFound(key.to_string())
                }
            }
            object_store::Error::InvalidPath { .. } => BucketError::Configuration(message),
            _ => BucketError::from_message(message),
        }
    }
}

#[async_trait]
impl BucketStore for ObjectStoreBucket {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        let path = Self::path(key)?;
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        debug!(key, size = bytes.len(), "putting object");
        self.store
            .put_opts(&path, PutPayload::from(bytes), options)
            .await
            .map_err(|err| self.classify(err, key, true))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let path = Self::path(key)?;
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|err| self.classify(err, key, false))?;
        result
            .bytes()
            .await
            .map_err(|err| self.classify(err, key, false))
    }

    fn describe(&self) -> String {
        format!("{}://{}", self.scheme, self.container)
    }
}
