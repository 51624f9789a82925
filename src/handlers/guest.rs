//! Unauthenticated server lookups, rate limited per IP.
//!
//! Both endpoints answer from the panel configured in the global settings.

use actix_web::{web, HttpResponse};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ServerQuery;

fn require_server_id(query: &ServerQuery) -> AppResult<i64> {
    match query.server_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(AppError::Validation("Server ID is required".to_string())),
    }
}

/// GET /api/guest/servicepterodactyl/server_info?server_id=
pub async fn server_info(
    state: web::Data<AppState>,
    query: web::Query<ServerQuery>,
) -> AppResult<HttpResponse> {
    let server_id = require_server_id(&query)?;
    let info = state.provisioner.get_server_info(server_id).await?;
    Ok(HttpResponse::Ok().json(info))
}

/// GET /api/guest/servicepterodactyl/server_status?server_id=
pub async fn server_status(
    state: web::Data<AppState>,
    query: web::Query<ServerQuery>,
) -> AppResult<HttpResponse> {
    let server_id = require_server_id(&query)?;
    let status = state.provisioner.get_server_status(server_id).await?;
    Ok(HttpResponse::Ok().json(status))
}
