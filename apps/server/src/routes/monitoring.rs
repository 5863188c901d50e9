use actix_web::{HttpResponse, get, post, web};
use apiwatch_service::Monitor;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Deserialize)]
pub struct SinceQuery {
    since: DateTime<Utc>,
}

#[get("/stats")]
pub async fn all_stats(monitor: web::Data<Monitor>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.get_all_stats().await?))
}

#[get("/stats/active")]
pub async fn active_stats(monitor: web::Data<Monitor>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.get_active_stats().await?))
}

#[get("/stats/{id}")]
pub async fn endpoint_stats(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.get_stats(id.into_inner()).await?))
}

/// Probe history, newest first
#[get("/health-checks/{id}")]
pub async fn health_checks(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.history(id.into_inner()).await?))
}

#[get("/health-checks/{id}/since")]
pub async fn health_checks_since(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
    query: web::Query<SinceQuery>,
) -> Result<HttpResponse, AppError> {
    let results = monitor.history_since(id.into_inner(), query.since).await?;
    Ok(HttpResponse::Ok().json(results))
}

// Registered ahead of `/check/{id}`
#[post("/check/all")]
pub async fn check_all(monitor: web::Data<Monitor>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.trigger_all_checks().await?))
}

#[post("/check/{id}")]
pub async fn check_endpoint(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.trigger_check(id.into_inner()).await?))
}
