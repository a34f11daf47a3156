//! S3 source against MinIO, and the full S3 -> PostgreSQL path
//!
//! Run with: cargo test -p mirr-ingest --test s3_source_test -- --ignored

mod common;

use std::sync::Arc;

use common::{comment_ids, comment_json, init_test_tracing, TestMinio, TestPostgres, COMMENTS_DIR};
use futures::TryStreamExt;
use mirr_ingest::config::RunConfig;
use mirr_ingest::{BatchWriter, IngestError, ItemKey, ItemSource, Pipeline, S3Source};

async fn seed(minio: &TestMinio, ids: &[String]) {
    for id in ids {
        minio
            .upload(&format!("{}/{}.json", COMMENTS_DIR, id), comment_json(id))
            .await
            .expect("upload failed");
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_listing_paginates_and_filters() {
    init_test_tracing();
    let minio = TestMinio::start().await.expect("Failed to start MinIO");

    let ids = comment_ids("WHD-2023-0001", 120);
    seed(&minio, &ids).await;
    minio
        .upload("WHD/WHD-2023-0001/text-WHD-2023-0001/docket/WHD-2023-0001.json", b"{}".to_vec())
        .await
        .unwrap();
    minio
        .upload(&format!("{}/notes.txt", COMMENTS_DIR), b"x".to_vec())
        .await
        .unwrap();
    minio
        .upload("EPA/EPA-2020-0001/text-EPA-2020-0001/comments/EPA-2020-0001-0001.json", b"{}".to_vec())
        .await
        .unwrap();

    let mut config = minio.source_config("WHD/");
    config.page_size = 50;
    let source = S3Source::connect(&config).await.unwrap();

    let mut keys: Vec<ItemKey> = source.items().try_collect().await.unwrap();
    keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    assert_eq!(keys.len(), 120);
    assert!(keys.iter().all(|k| k.as_str().starts_with("WHD/") && k.as_str().ends_with(".json")));
    assert_eq!(
        keys[0].as_str(),
        format!("{}/WHD-2023-0001-0000.json", COMMENTS_DIR)
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reader_fetches_objects() {
    init_test_tracing();
    let minio = TestMinio::start().await.expect("Failed to start MinIO");
    let ids = comment_ids("WHD-2023-0001", 1);
    seed(&minio, &ids).await;

    let source = S3Source::connect(&minio.source_config("")).await.unwrap();
    let key = source.items().try_next().await.unwrap().expect("one key");

    let mut reader = source.reader().await.unwrap();
    assert_eq!(reader.fetch(&key).await.unwrap(), comment_json(&ids[0]));

    let err = reader
        .fetch(&ItemKey::new(format!("{}/missing.json", COMMENTS_DIR)))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ItemFetch { .. }));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_missing_bucket_is_an_enumeration_error() {
    init_test_tracing();
    let minio = TestMinio::start().await.expect("Failed to start MinIO");

    let mut config = minio.source_config("");
    config.bucket = "no-such-bucket".to_string();
    let source = S3Source::connect(&config).await.unwrap();

    let err = source.items().try_collect::<Vec<_>>().await.unwrap_err();
    assert!(matches!(err, IngestError::SourceEnumeration { .. }));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_s3_to_postgres() {
    init_test_tracing();
    let minio = TestMinio::start().await.expect("Failed to start MinIO");
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    let ids = comment_ids("WHD-2023-0001", 30);
    seed(&minio, &ids).await;
    minio
        .upload(&format!("{}/broken.json", COMMENTS_DIR), b"{".to_vec())
        .await
        .unwrap();

    let source = Arc::new(S3Source::connect(&minio.source_config("WHD/")).await.unwrap());
    let run = RunConfig {
        batch_size: 8,
        concurrency: 3,
        ..RunConfig::default()
    };

    let summary = Pipeline::new(source, BatchWriter::new(pg.pool().clone()), &run)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.batches_total, 4);
    assert_eq!(summary.items_total, 31);
    assert_eq!(summary.items_dropped, 1);
    assert_eq!(summary.records_inserted, 30);
    assert_eq!(pg.count_comments().await.unwrap(), 30);
}
