//! Client handlers. A client token may only act on orders it owns; orders
//! owned by someone else are reported as not found.

use actix_web::{web, HttpResponse};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::ClientCaller;
use crate::models::requests::require_order_id;
use crate::models::{
    ClientChangePasswordRequest, OrderRequest, PasswordChange, ServiceRecord, SuccessResponse,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Enforces the panel password policy: at least 8 characters with an
/// uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let rule = |ok: bool, message: &str| {
        if ok {
            Ok(())
        } else {
            Err(AppError::Validation(message.to_string()))
        }
    };

    rule(
        password.chars().count() >= MIN_PASSWORD_LEN,
        "Password must be at least 8 characters long.",
    )?;
    rule(
        password.chars().any(|c| c.is_ascii_uppercase()),
        "Password must contain at least one uppercase letter.",
    )?;
    rule(
        password.chars().any(|c| c.is_ascii_lowercase()),
        "Password must contain at least one lowercase letter.",
    )?;
    rule(
        password.chars().any(|c| c.is_ascii_digit()),
        "Password must contain at least one number.",
    )
}

/// Loads the caller's service record for `order_id`.
async fn owned_record(
    state: &AppState,
    client: &ClientCaller,
    order_id: i64,
) -> AppResult<ServiceRecord> {
    let record = state.provisioner.find(order_id).await?;
    if record.client_id != client.client_id {
        tracing::warn!(
            client_id = client.client_id,
            order_id,
            "Client requested an order it does not own"
        );
        return Err(AppError::NotFound("Order not found".to_string()));
    }
    Ok(record)
}

/// GET /api/client/servicepterodactyl/{order_id}
pub async fn get_service(
    client: ClientCaller,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let order_id = require_order_id(Some(path.into_inner()))?;
    let record = owned_record(&state, &client, order_id).await?;

    Ok(HttpResponse::Ok().json(state.provisioner.to_api_view(record).await))
}

/// POST /api/client/servicepterodactyl/restart
pub async fn restart(
    client: ClientCaller,
    state: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> AppResult<HttpResponse> {
    let order_id = body.require_order_id()?;
    owned_record(&state, &client, order_id).await?;

    state.provisioner.restart(order_id).await?;

    Ok(HttpResponse::Ok().json(SuccessResponse::ok("Server restart initiated")))
}

/// POST /api/client/servicepterodactyl/change_password
pub async fn change_password(
    client: ClientCaller,
    state: web::Data<AppState>,
    body: web::Json<ClientChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let order_id = require_order_id(body.order_id)?;

    let new_password = body
        .new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("New password is required.".to_string()))?;
    let confirm_password = body
        .confirm_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("Password confirmation is required.".to_string()))?;

    if new_password != confirm_password {
        return Err(AppError::Validation("Passwords do not match.".to_string()));
    }
    validate_password(&new_password)?;

    owned_record(&state, &client, order_id).await?;

    state
        .provisioner
        .change_account_password(PasswordChange {
            order_id,
            password: new_password,
        })
        .await?;

    Ok(HttpResponse::Ok().json(SuccessResponse::ok("Password changed")))
}
