//! Billing lifecycle events.
//!
//! The billing framework posts one signed event per order transition:
//! - order.created: dispense the service record
//! - order.activated: provision the server
//! - order.suspended / order.unsuspended
//! - order.cancelled / order.uncancelled (treated as suspend / unsuspend)
//! - order.deleted / order.terminated: remove the server
//!
//! Failures are returned to the sender so it can retry the event.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::AppState;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Billing-Signature";

/// Event envelope.
#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: BillingEventData,
}

#[derive(Debug, Deserialize)]
pub struct BillingEventData {
    pub order_id: Option<i64>,
}

/// Maximum age, in either direction, of a signed event's timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verifies a `t=<timestamp>,v1=<hex hmac>` header over `"<timestamp>.<body>"`
/// and rejects timestamps more than [`SIGNATURE_TOLERANCE_SECS`] from now.
pub fn verify_signature(
    payload: &str,
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), AppError> {
    verify_signature_at(
        payload,
        signature_header,
        webhook_secret,
        Utc::now().timestamp(),
    )
}

fn verify_signature_at(
    payload: &str,
    signature_header: &str,
    webhook_secret: &str,
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in signature_header.split(',') {
        if let Some((key, value)) = part.trim().split_once('=') {
            match key {
                "t" => timestamp = Some(value),
                "v1" => signature = Some(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        AppError::Validation("Missing timestamp in signature header".to_string())
    })?;
    let signature = signature
        .ok_or_else(|| AppError::Validation("Missing signature in header".to_string()))?;
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| AppError::Validation("Invalid timestamp in signature header".to_string()))?;

    let signed_payload = format!("{}.{}", timestamp, payload);

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".to_string()))?;
    mac.update(signed_payload.as_bytes());

    let signature_bytes = hex::decode(signature)
        .map_err(|_| AppError::Unauthorized("Invalid webhook signature".to_string()))?;
    mac.verify_slice(&signature_bytes)
        .map_err(|_| AppError::Unauthorized("Invalid webhook signature".to_string()))?;

    if now.abs_diff(issued_at) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        tracing::warn!(issued_at, now, "Billing event timestamp outside tolerance");
        return Err(AppError::Unauthorized(
            "Webhook timestamp outside tolerance".to_string(),
        ));
    }

    Ok(())
}

/// POST /webhooks/billing
pub async fn billing_event(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: String,
) -> AppResult<HttpResponse> {
    let secret = state
        .config
        .billing_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Internal("Billing webhook secret not configured".to_string()))?;

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing signature header".to_string()))?;

    verify_signature(&body, signature, secret)?;

    let event: BillingEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::Validation(format!("Invalid event payload: {}", e)))?;
    let order_id = match event.data.order_id {
        Some(id) if id > 0 => id,
        _ => return Err(AppError::Validation("Order ID is required".to_string())),
    };

    tracing::info!(
        event_id = ?event.id,
        event_type = %event.event_type,
        order_id,
        "Billing event received"
    );

    let provisioner = &state.provisioner;
    let record = match event.event_type.as_str() {
        "order.created" => Some(provisioner.create(order_id).await?),
        "order.activated" => {
            provisioner.create(order_id).await?;
            Some(provisioner.activate(order_id).await?)
        }
        "order.suspended" => Some(provisioner.suspend(order_id).await?),
        "order.unsuspended" => Some(provisioner.unsuspend(order_id).await?),
        "order.cancelled" => Some(provisioner.cancel(order_id).await?),
        "order.uncancelled" => Some(provisioner.uncancel(order_id).await?),
        "order.deleted" => Some(provisioner.delete(order_id).await?),
        "order.terminated" => Some(provisioner.unprovision(order_id).await?),
        other => {
            tracing::info!(event_type = other, "Unhandled billing event type");
            None
        }
    };

    Ok(HttpResponse::Ok().json(json!({
        "received": true,
        "status": record.map(|r| r.status),
    })))
}
