//! Per-IP rate limiting with governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login, registration and token exchange (~10/min)
//! - `api_rate_limiter`: everything else under `/api` (~100/min)
//!
//! The per-user extraction budget is separate, see
//! [`crate::services::rate_limit::ExtractionLimiter`].

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers consulted for the client address, most trusted first.
const CLIENT_IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor reading the client IP from proxy headers, falling back to
/// the socket peer address.
///
/// `X-Forwarded-For` contributes its first (client-most) entry. The peer
/// address is only available when the server is started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
        CLIENT_IP_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Self::client_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// One token every `replenish_secs`, bursting to `burst`.
///
/// # Panics
///
/// Panics if either argument is zero. Callers in this module pass constants.
fn ip_limiter(replenish_secs: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()
        .expect("rate limiter config with non-zero period and burst is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Auth endpoints: one request every 6 seconds, burst of 5.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    ip_limiter(6, 5)
}

/// General API: one request per second, burst of 50.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    ip_limiter(1, 50)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cloudflare_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        headers.insert("cf-connecting-ip", "203.0.113.7".parse().unwrap());
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&headers),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn test_forwarded_for_uses_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", " 198.51.100.4 , 10.0.0.2".parse().unwrap());
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&headers),
            Some("198.51.100.4".parse().unwrap())
        );
    }

    #[test]
    fn test_garbage_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", "not-an-ip".parse().unwrap());
        headers.insert("fly-client-ip", "2001:db8::1".parse().unwrap());
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&headers),
            Some("2001:db8::1".parse().unwrap())
        );
        assert_eq!(ClientIpKeyExtractor::client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_peer_address_fallback() {
        use tower_governor::key_extractor::KeyExtractor;

        let mut req = Request::new(());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 51000))));
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).unwrap(),
            "192.0.2.10".parse::<IpAddr>().unwrap()
        );

        let bare = Request::new(());
        assert!(ClientIpKeyExtractor.extract(&bare).is_err());
    }
}
