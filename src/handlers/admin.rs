//! Admin handlers: lifecycle actions on any order and the global panel
//! settings.
//!
//! All routes require an `admin` token. No ownership checks apply.

use actix_web::{web, HttpResponse};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminCaller;
use crate::models::{
    AdminChangePasswordRequest, OrderRequest, PanelSettings, PasswordChange, SuccessResponse,
    UpdateServiceRequest,
};
use crate::models::requests::require_order_id;
use crate::services::panel_config::{load_panel_settings, save_panel_settings};

/// POST /api/admin/servicepterodactyl/provision
///
/// Dispenses the service record if the order has none yet, then creates the
/// server.
pub async fn provision(
    admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> AppResult<HttpResponse> {
    let order_id = body.require_order_id()?;
    tracing::info!(admin_id = admin.admin_id, order_id, "Admin provision");

    state.provisioner.create(order_id).await?;
    let record = state.provisioner.provision(order_id).await?;

    Ok(HttpResponse::Ok().json(state.provisioner.to_api_view(record).await))
}

/// POST /api/admin/servicepterodactyl/unprovision
pub async fn unprovision(
    admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> AppResult<HttpResponse> {
    let order_id = body.require_order_id()?;
    tracing::info!(admin_id = admin.admin_id, order_id, "Admin unprovision");

    let record = state.provisioner.unprovision(order_id).await?;
    Ok(HttpResponse::Ok().json(state.provisioner.to_api_view(record).await))
}

/// POST /api/admin/servicepterodactyl/suspend
pub async fn suspend(
    admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> AppResult<HttpResponse> {
    let order_id = body.require_order_id()?;
    tracing::info!(admin_id = admin.admin_id, order_id, "Admin suspend");

    let record = state.provisioner.suspend(order_id).await?;
    Ok(HttpResponse::Ok().json(state.provisioner.to_api_view(record).await))
}

/// POST /api/admin/servicepterodactyl/unsuspend
pub async fn unsuspend(
    admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> AppResult<HttpResponse> {
    let order_id = body.require_order_id()?;
    tracing::info!(admin_id = admin.admin_id, order_id, "Admin unsuspend");

    let record = state.provisioner.unsuspend(order_id).await?;
    Ok(HttpResponse::Ok().json(state.provisioner.to_api_view(record).await))
}

/// POST /api/admin/servicepterodactyl/update
///
/// Replaces the stored order configuration. Takes effect on the next
/// lifecycle action; the running server is not modified.
pub async fn update(
    _admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<UpdateServiceRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let order_id = require_order_id(body.order_id)?;

    let record = state.provisioner.update(order_id, body.config).await?;
    Ok(HttpResponse::Ok().json(state.provisioner.to_api_view(record).await))
}

/// POST /api/admin/servicepterodactyl/change_account_password
pub async fn admin_change_password(
    admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<AdminChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let order_id = require_order_id(body.order_id)?;
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("Password is required.".to_string()))?;

    state
        .provisioner
        .change_account_password(PasswordChange { order_id, password })
        .await?;

    tracing::info!(admin_id = admin.admin_id, order_id, "Admin changed panel password");
    Ok(HttpResponse::Ok().json(SuccessResponse::ok("Password changed")))
}

/// GET /api/admin/servicepterodactyl/settings
pub async fn get_settings(
    _admin: AdminCaller,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let settings = load_panel_settings(state.settings.as_ref()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// POST /api/admin/servicepterodactyl/settings
pub async fn save_settings(
    admin: AdminCaller,
    state: web::Data<AppState>,
    body: web::Json<PanelSettings>,
) -> AppResult<HttpResponse> {
    save_panel_settings(state.settings.as_ref(), &body).await?;

    tracing::info!(admin_id = admin.admin_id, "Admin saved panel settings");
    Ok(HttpResponse::Ok().json(SuccessResponse::ok("Settings saved")))
}
