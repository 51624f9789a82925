//! Per-IP rate limiting for the unauthenticated guest endpoints.

use actix_governor::governor::middleware::NoOpMiddleware;
use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor};

/// Type alias for the rate limiter configuration.
pub type RateLimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Type alias for the rate limiter.
pub type RateLimiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Builds the governor config for `per_minute` requests per IP.
///
/// Tokens refill evenly across the minute and the whole minute's allowance
/// may be spent as one burst. Returns `None` when `per_minute` is zero.
pub fn guest_rate_limiter_config(per_minute: u32) -> Option<RateLimiterConfig> {
    if per_minute == 0 {
        return None;
    }

    // Governor counts whole seconds per token; round down to at least 1s.
    let seconds_per_request = (60 / u64::from(per_minute)).max(1);

    GovernorConfigBuilder::default()
        .seconds_per_request(seconds_per_request)
        .burst_size(per_minute)
        .finish()
}

/// Creates the guest rate limiter. Build one per worker and wrap the guest
/// scope with it.
///
/// # Example
///
/// ```ignore
/// use crate::middleware::rate_limit::create_guest_rate_limiter;
///
/// web::scope("/api/guest/servicepterodactyl")
///     .wrap(create_guest_rate_limiter(&config))
///     .route("/server_info", web::get().to(server_info))
/// ```
pub fn create_guest_rate_limiter(config: &RateLimiterConfig) -> RateLimiter {
    Governor::new(config)
}
