//! Middleware for the provisioning API.
//!
//! This module contains:
//! - `auth` - JWT extractors for admin and client callers
//! - `rate_limit` - Guest rate limiting using Governor

pub mod auth;
pub mod rate_limit;

// Re-export commonly used types
pub use auth::{AdminCaller, AuthError, AuthenticatedCaller, ClientCaller};
pub use rate_limit::{
    create_guest_rate_limiter, guest_rate_limiter_config, RateLimiter, RateLimiterConfig,
};
