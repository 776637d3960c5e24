use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use lemco_bucket::{AzureConnectionString, BucketError, BucketStore, ObjectStoreBucket};

const REQUIRED_VARS: &[&str] = &["LEMCO_TEST_CONNECT_STR", "LEMCO_TEST_CONTAINER_NAME"];

struct AzureTestConfig {
    connection: String,
    container: String,
}

impl AzureTestConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            connection: std::env::var(REQUIRED_VARS[0]).ok()?,
            container: std::env::var(REQUIRED_VARS[1]).ok()?,
        })
    }
}

fn unique_key() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("rawdata/integration-{nanos}.parquet")
}

#[tokio::test]
async fn azure_blob_put_and_get() -> Result<(), BucketError> {
    let Some(config) = AzureTestConfig::from_env() else {
        eprintln!(
            "Skipping Azure blob test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    };

    let connection = AzureConnectionString::parse(&config.connection)?;
    let bucket = ObjectStoreBucket::azure(&connection, &config.container)?;
    let key = unique_key();
    let payload = Bytes::from_static(b"lemco integration test");

    bucket
        .put_object(&key, payload.clone(), "application/octet-stream")
        .await?;
    let stored = bucket.get_object(&key).await?;
    assert_eq!(stored, payload);
    Ok(())
}

#[tokio::test]
async fn azure_missing_container_is_reported() -> Result<(), BucketError> {
    let Some(config) = AzureTestConfig::from_env() else {
        eprintln!(
            "Skipping Azure missing-container test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    };

    let connection = AzureConnectionString::parse(&config.connection)?;
    let absent = format!("{}-absent", config.container);
    let bucket = ObjectStoreBucket::azure(&connection, &absent)?;

    let err = bucket
        .put_object(&unique_key(), Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .expect_err("container should not exist");
    assert!(matches!(err, BucketError::ContainerNotFound(_)), "got {err:?}");
    Ok(())
}
