//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use workforce_common::errors::AppError;

/// Global limiter plus its configured rate for error reporting
#[derive(Clone)]
pub struct RequestLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    per_second: u32,
}

/// Create a new rate limiter; zero values fall back to the smallest quota
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> RequestLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);
    let quota = Quota::per_second(rate).allow_burst(burst);

    RequestLimiter {
        limiter: Arc::new(RateLimiter::direct(quota)),
        per_second: rate.get(),
    }
}

/// Rate limiting middleware
pub async fn rate_limit(
    State(limiter): State<RequestLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match limiter.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => Err(AppError::RateLimited {
            limit: limiter.per_second,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(100, 200);
        assert!(limiter.limiter.check().is_ok());
        assert_eq!(limiter.per_second, 100);
    }

    #[test]
    fn test_burst_is_enforced() {
        let limiter = create_rate_limiter(1, 2);
        tokio_test::assert_ok!(limiter.limiter.check());
        tokio_test::assert_ok!(limiter.limiter.check());
        tokio_test::assert_err!(limiter.limiter.check());
    }

    #[test]
    fn test_zero_rate_does_not_panic() {
        let limiter = create_rate_limiter(0, 0);
        assert_eq!(limiter.per_second, 1);
        assert!(limiter.limiter.check().is_ok());
    }
}
