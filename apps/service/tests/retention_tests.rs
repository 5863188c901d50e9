mod common;

use std::time::Duration;

use anyhow::Result;
use apiwatch_service::monitoring::ProbeFailure;
use apiwatch_service::orchestrator::{RetentionCleanup, RetentionPolicy};
use apiwatch_service::{Endpoint, HttpMethod, ProbeResult};
use chrono::{TimeZone, Utc};
use common::create_test_database;

#[tokio::test]
async fn test_cleanup_is_strict_and_idempotent() -> Result<()> {
    let (database, _dir) = create_test_database().await?;
    let endpoint_id = database
        .insert_endpoint(&Endpoint::new("api", "https://api.example.com", HttpMethod::Get))
        .await?;

    let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let old = ProbeResult::succeeded(endpoint_id, 40, 200).at(cutoff - chrono::Duration::milliseconds(1));
    let boundary = ProbeResult::succeeded(endpoint_id, 50, 200).at(cutoff);
    let newer = ProbeResult::failed(endpoint_id, 60, &ProbeFailure::Timeout { timeout_ms: 60 })
        .at(cutoff + chrono::Duration::hours(1));

    for result in [&old, &boundary, &newer] {
        database.append_result(result).await?;
    }

    let cleanup = RetentionCleanup::new(database.clone(), RetentionPolicy::default());
    assert_eq!(cleanup.cleanup_older_than(cutoff).await?, 1);
    assert_eq!(cleanup.cleanup_older_than(cutoff).await?, 0);

    let remaining = database.list_results(endpoint_id).await?;
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].checked_at, newer.checked_at);
    assert_eq!(remaining[1].checked_at, cutoff);

    Ok(())
}

#[tokio::test]
async fn test_expired_results_follow_policy() -> Result<()> {
    let (database, _dir) = create_test_database().await?;
    let endpoint_id = database
        .insert_endpoint(&Endpoint::new("api", "https://api.example.com", HttpMethod::Get))
        .await?;

    let now = Utc::now();
    for days in [1, 6, 8, 30] {
        let result = ProbeResult::succeeded(endpoint_id, 10, 200).at(now - chrono::Duration::days(days));
        database.append_result(&result).await?;
    }

    let policy = RetentionPolicy { result_days: 7, cleanup_interval: Duration::from_secs(3600) };
    let cleanup = RetentionCleanup::new(database.clone(), policy);

    assert_eq!(cleanup.cleanup_expired_results().await?, 2);
    assert_eq!(database.list_results(endpoint_id).await?.len(), 2);
    assert_eq!(cleanup.cleanup_expired_results().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_periodic_cleanup_runs_immediately_and_stops() -> Result<()> {
    let (database, _dir) = create_test_database().await?;
    let endpoint_id = database
        .insert_endpoint(&Endpoint::new("api", "https://api.example.com", HttpMethod::Get))
        .await?;
    let stale = ProbeResult::succeeded(endpoint_id, 10, 200).at(Utc::now() - chrono::Duration::days(10));
    database.append_result(&stale).await?;

    let cleanup = RetentionCleanup::new(database.clone(), RetentionPolicy::default());
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handle = cleanup.start_periodic_cleanup(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(database.list_results(endpoint_id).await?.is_empty());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle).await??;

    Ok(())
}

#[tokio::test]
async fn test_out_of_range_retention_fails_without_killing_the_loop() -> Result<()> {
    let (database, _dir) = create_test_database().await?;
    let policy = RetentionPolicy { result_days: 200_000_000, cleanup_interval: Duration::from_millis(20) };
    let cleanup = RetentionCleanup::new(database.clone(), policy);

    assert!(cleanup.cleanup_expired_results().await.is_err());

    let shutdown = tokio_util::sync::CancellationToken::new();
    let handle = cleanup.start_periodic_cleanup(shutdown.clone());

    // Several failing passes later the loop is still alive
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle).await??;

    Ok(())
}
