use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use lemco_bucket::{BucketError, BucketStore, S3BucketStore, S3Config};

const REQUIRED_VARS: &[&str] = &[
    "LEMCO_TEST_S3_BUCKET",
    "LEMCO_TEST_S3_ENDPOINT",
    "LEMCO_TEST_S3_ACCESS_KEY_ID",
    "LEMCO_TEST_S3_SECRET_ACCESS_KEY",
];

fn config_from_env() -> Option<S3Config> {
    let var = |name: &str| std::env::var(name).ok();
    Some(S3Config {
        bucket: var(REQUIRED_VARS[0])?,
        region: var("LEMCO_TEST_S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        endpoint: Some(var(REQUIRED_VARS[1])?),
        access_key_id: Some(var(REQUIRED_VARS[2])?),
        secret_access_key: Some(var(REQUIRED_VARS[3])?),
        force_path_style: true,
    })
}

fn unique_key() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("rawdata/integration-{nanos}.parquet")
}

#[tokio::test]
async fn s3_put_get_and_missing_key() -> Result<(), BucketError> {
    let Some(config) = config_from_env() else {
        eprintln!(
            "Skipping S3 bucket test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    };

    let store = S3BucketStore::new(config.clone()).await?;
    assert_eq!(store.describe(), format!("s3://{}", config.bucket));

    let key = unique_key();
    let payload = Bytes::from_static(b"lemco integration test");
    store
        .put_object(&key, payload.clone(), "application/octet-stream")
        .await?;
    assert_eq!(store.get_object(&key).await?, payload);

    let missing = store
        .get_object(&format!("{key}.absent"))
        .await
        .expect_err("object should be absent");
    assert!(matches!(missing, BucketError::NotFound(_)), "got {missing:?}");
    Ok(())
}

#[tokio::test]
async fn s3_missing_bucket_is_reported() -> Result<(), BucketError> {
    let Some(mut config) = config_from_env() else {
        eprintln!(
            "Skipping S3 missing-bucket test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    };
    config.bucket = format!("{}-absent", config.bucket);

    let store = S3BucketStore::new(config).await?;
    let err = store
        .put_object(&unique_key(), Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .expect_err("bucket should not exist");
    assert!(matches!(err, BucketError::ContainerNotFound(_)), "got {err:?}");
    Ok(())
}
