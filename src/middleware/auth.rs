//! Authentication extractors for JWT bearer tokens.
//!
//! This module provides:
//! - `AuthenticatedCaller` - any valid token, with its role and subject ID
//! - `AdminCaller` - a valid token with the `admin` role
//! - `ClientCaller` - a valid token with the `client` role

use actix_web::{
    dev::Payload, http::header, http::StatusCode, web, FromRequest, HttpRequest, HttpResponse,
    ResponseError,
};
use std::future::{ready, Ready};
use thiserror::Error;

use crate::handlers::AppState;
use crate::services::token::{decode_access_token, Role};

/// A caller whose bearer token validated against the shared JWT secret.
///
/// # Example
///
/// ```ignore
/// use crate::middleware::auth::AuthenticatedCaller;
///
/// async fn protected_route(caller: AuthenticatedCaller) -> impl Responder {
///     format!("Hello, {:?} {}", caller.role, caller.subject_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    /// Billing client ID for clients, admin ID for admins
    pub subject_id: i64,
    pub role: Role,
}

/// Caller with the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminCaller {
    pub admin_id: i64,
}

/// Caller with the `client` role.
#[derive(Debug, Clone)]
pub struct ClientCaller {
    pub client_id: i64,
}

/// Why a bearer token was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid authorization header format")]
    InvalidHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    /// `sub` is not a numeric billing ID
    #[error("Invalid subject in token")]
    InvalidSubject,

    /// Valid token, but for the other route group
    #[error("Insufficient permissions")]
    WrongRole,

    #[error("Internal server error")]
    MissingAppState,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::WrongRole => StatusCode::FORBIDDEN,
            AuthError::MissingAppState => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedCaller, AuthError> {
    // Extract token from Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidHeader)?,
        None => return Err(AuthError::MissingToken),
    };

    let app_state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(AuthError::MissingAppState)?;

    let claims = decode_access_token(token, &app_state.config.jwt_secret)
        .map_err(|_| AuthError::InvalidToken)?;

    let subject_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AuthError::InvalidSubject)?;

    Ok(AuthenticatedCaller {
        subject_id,
        role: claims.role,
    })
}

impl FromRequest for AuthenticatedCaller {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate_as(req: &HttpRequest, role: Role) -> Result<i64, AuthError> {
    let caller = authenticate(req)?;
    if caller.role != role {
        tracing::debug!(subject_id = caller.subject_id, role = ?caller.role, "Token role rejected");
        return Err(AuthError::WrongRole);
    }
    Ok(caller.subject_id)
}

impl FromRequest for AdminCaller {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate_as(req, Role::Admin).map(|admin_id| AdminCaller { admin_id }))
    }
}

impl FromRequest for ClientCaller {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate_as(req, Role::Client).map(|client_id| ClientCaller { client_id }))
    }
}
