//! S3 storage integration tests.
//!
//! Run with `cargo test -- --ignored` against a reachable bucket
//! (set `S3_ENDPOINT_URL` for MinIO or another S3 compatible).

use cmdclip_storage::S3Client;

/// Test S3 connectivity.
#[tokio::test]
#[ignore = "requires S3 credentials"]
async fn test_s3_connectivity() {
    dotenvy::dotenv().ok();

    let client = S3Client::from_env().await.expect("Failed to create client");
    client
        .check_connectivity()
        .await
        .expect("Failed to reach bucket");
}

/// Test upload, exists, download round trip.
#[tokio::test]
#[ignore = "requires S3 credentials"]
async fn test_upload_download_round_trip() {
    dotenvy::dotenv().ok();

    let client = S3Client::from_env().await.expect("Failed to create client");

    let dir = tempfile::tempdir().expect("tempdir");
    let src = dir.path().join("upload.bin");
    std::fs::write(&src, b"integration payload").expect("write");

    let key = "original/integration-test.bin";
    client
        .upload_file(&src, key, "application/octet-stream")
        .await
        .expect("Failed to upload");

    assert!(client.exists(key).await.expect("Failed to head object"));

    let bytes = client.download_bytes(key).await.expect("Failed to download");
    assert_eq!(bytes, b"integration payload");
}

/// Missing keys surface as a typed not-found error.
#[tokio::test]
#[ignore = "requires S3 credentials"]
async fn test_download_missing_key() {
    dotenvy::dotenv().ok();

    let client = S3Client::from_env().await.expect("Failed to create client");
    let err = client.download_bytes("original/does-not-exist.bin").await;
    assert!(err.is_err());
}
