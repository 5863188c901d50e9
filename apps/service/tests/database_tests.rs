mod common;

use anyhow::Result;
use apiwatch_service::database::initialize_database;
use apiwatch_service::monitoring::ProbeFailure;
use apiwatch_service::pool::open_pool;
use apiwatch_service::{Endpoint, HttpMethod, ProbeOutcome, ProbeResult};
use chrono::{TimeZone, Utc};
use common::create_test_database;

#[tokio::test]
async fn test_migrations_are_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pool = open_pool(dir.path().join("twice.db"), 2).await?;
    let conn = pool.get().await.map_err(|e| anyhow::anyhow!("{e}"))?;

    initialize_database(&conn).await?;
    initialize_database(&conn).await?;

    let mut rows = conn.query("SELECT COUNT(*), MAX(version) FROM schema_migrations", ()).await?;
    let row = rows.next().await?.expect("count row");
    assert_eq!(row.get::<i64>(0)?, 1);
    assert_eq!(row.get::<i64>(1)?, 1);

    let mut rows = conn
        .query("SELECT COUNT(*) FROM pragma_table_info('probe_results') WHERE name = 'outcome'", ())
        .await?;
    let row = rows.next().await?.expect("column row");
    assert_eq!(row.get::<i64>(0)?, 1);

    Ok(())
}

#[tokio::test]
async fn test_endpoint_round_trip() -> Result<()> {
    let (database, _dir) = create_test_database().await?;

    let mut endpoint = Endpoint::new("Orders", "https://orders.example.com/health", HttpMethod::Options);
    endpoint.expected_status = 204;
    endpoint.timeout_ms = 1500;
    endpoint.check_interval_ms = 60_000;
    let id = database.insert_endpoint(&endpoint).await?;

    let stored = database.get_endpoint(id).await?.expect("endpoint stored");
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.name, "Orders");
    assert_eq!(stored.method, HttpMethod::Options);
    assert_eq!(stored.expected_status, 204);
    assert_eq!(stored.timeout_ms, 1500);
    assert_eq!(stored.check_interval_ms, 60_000);
    assert!(stored.active);
    assert_eq!(stored.created_at.timestamp_millis(), endpoint.created_at.timestamp_millis());

    assert!(database.get_endpoint(id + 1).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_active_listing() -> Result<()> {
    let (database, _dir) = create_test_database().await?;

    let mut paused = Endpoint::new("beta", "https://beta.example.com", HttpMethod::Get);
    paused.active = false;
    database.insert_endpoint(&paused).await?;
    database.insert_endpoint(&Endpoint::new("gamma", "https://gamma.example.com", HttpMethod::Get)).await?;
    database.insert_endpoint(&Endpoint::new("alpha", "https://alpha.example.com", HttpMethod::Get)).await?;

    let active: Vec<String> = database.list_active_endpoints().await?.into_iter().map(|e| e.name).collect();
    assert_eq!(active, vec!["alpha", "gamma"]);
    assert_eq!(database.list_endpoints().await?.len(), 3);
    assert_eq!(database.count_active_endpoints().await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_result_ordering_and_since() -> Result<()> {
    let (database, _dir) = create_test_database().await?;
    let endpoint_id = database
        .insert_endpoint(&Endpoint::new("api", "https://api.example.com", HttpMethod::Get))
        .await?;

    let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    let first = database.append_result(&ProbeResult::succeeded(endpoint_id, 10, 200).at(base)).await?;
    // Same timestamp: the later row sorts first
    let second = database
        .append_result(
            &ProbeResult::failed(endpoint_id, 20, &ProbeFailure::TransportFailure("reset".into())).at(base),
        )
        .await?;
    let third = database
        .append_result(&ProbeResult::succeeded(endpoint_id, 30, 200).at(base + chrono::Duration::minutes(1)))
        .await?;

    let ids: Vec<i64> = database.list_results(endpoint_id).await?.iter().filter_map(|r| r.id).collect();
    assert_eq!(ids, vec![third, second, first]);

    let latest = database.latest_result(endpoint_id).await?.expect("latest result");
    assert_eq!(latest.id, Some(third));

    let since = database.list_results_since(endpoint_id, base).await?;
    assert_eq!(since.len(), 3);
    let since = database.list_results_since(endpoint_id, base + chrono::Duration::seconds(1)).await?;
    assert_eq!(since.len(), 1);

    let failed = database.list_results(endpoint_id).await?.remove(1);
    assert_eq!(failed.outcome, ProbeOutcome::Transport);
    assert_eq!(failed.status_code, None);
    assert_eq!(failed.error_message.as_deref(), Some("Request failed: reset"));

    Ok(())
}

#[tokio::test]
async fn test_delete_endpoint_cascades() -> Result<()> {
    let (database, _dir) = create_test_database().await?;
    let doomed = database
        .insert_endpoint(&Endpoint::new("doomed", "https://doomed.example.com", HttpMethod::Get))
        .await?;
    let kept = database
        .insert_endpoint(&Endpoint::new("kept", "https://kept.example.com", HttpMethod::Get))
        .await?;

    database.append_result(&ProbeResult::succeeded(doomed, 10, 200)).await?;
    database.append_result(&ProbeResult::succeeded(kept, 10, 200)).await?;

    assert!(database.delete_endpoint(doomed).await?);
    assert!(!database.delete_endpoint(doomed).await?);

    assert!(database.list_results(doomed).await?.is_empty());
    assert_eq!(database.list_results(kept).await?.len(), 1);

    Ok(())
}
