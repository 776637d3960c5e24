use std::fmt;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::{BucketError, BucketStore};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        if config.bucket.is_empty() {
            return Err(BucketError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }
}

/// Sort an SDK failure into a [`BucketError`] kind by service error code or dispatch
/// failure.
fn classify<E, R>(bucket: &str, err: SdkError<E, R>, key: &str) -> BucketError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(service) => match service.err().code() {
            Some("NoSuchBucket") => BucketError::ContainerNotFound(bucket.to_string()),
            Some("NoSuchKey") => BucketError::NotFound(key.to_string()),
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"
                | "ExpiredToken" | "InvalidToken",
            ) => BucketError::Authentication(detail),
            Some("EntityTooLarge" | "QuotaExceeded" | "ServiceQuotaExceeded") => {
                BucketError::QuotaExceeded(detail)
            }
            Some("SlowDown" | "ServiceUnavailable" | "RequestTimeout" | "InternalError") => {
                BucketError::Transient(detail)
            }
            _ => BucketError::from_message(detail),
        },
        SdkError::DispatchFailure(failure) if failure.is_io() || failure.is_timeout() => {
            BucketError::Transient(detail)
        }
        SdkError::TimeoutError(_) | SdkError::ResponseError(_) => BucketError::Transient(detail),
        _ => BucketError::from_message(detail),
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| classify(&self.bucket, err, key))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(&self.bucket, err, key))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| BucketError::Transient(err.to_string()))?;
        Ok(data.into_bytes())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
