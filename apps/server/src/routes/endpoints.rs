use actix_web::{HttpResponse, delete, get, post, put, web};
use apiwatch_service::{EndpointRequest, Monitor};

use crate::error::AppError;

#[get("")]
pub async fn list_endpoints(monitor: web::Data<Monitor>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.endpoints().list().await?))
}

#[post("")]
pub async fn create_endpoint(
    monitor: web::Data<Monitor>,
    request: web::Json<EndpointRequest>,
) -> Result<HttpResponse, AppError> {
    let endpoint = monitor.endpoints().create(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(endpoint))
}

#[get("/active")]
pub async fn list_active_endpoints(monitor: web::Data<Monitor>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.endpoints().list_active().await?))
}

/// Number of active endpoints as a bare JSON number
#[get("/count/active")]
pub async fn count_active_endpoints(monitor: web::Data<Monitor>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.endpoints().count_active().await?))
}

#[get("/{id}")]
pub async fn get_endpoint(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.endpoints().get(id.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_endpoint(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
    request: web::Json<EndpointRequest>,
) -> Result<HttpResponse, AppError> {
    let endpoint = monitor.endpoints().update(id.into_inner(), request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(endpoint))
}

/// Deletes the endpoint and its probe history
#[delete("/{id}")]
pub async fn delete_endpoint(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    monitor.endpoints().delete(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/toggle")]
pub async fn toggle_endpoint(
    monitor: web::Data<Monitor>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.endpoints().toggle(id.into_inner()).await?))
}
