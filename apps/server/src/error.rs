use std::io::Error as IoError;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use apiwatch_service::MonitorError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("{0}")]
    Config(#[from] apiwatch_service::config::Error),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Monitor(MonitorError::EndpointNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Monitor(MonitorError::Validation(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(ErrorBody { error: self.to_string() })
    }
}
