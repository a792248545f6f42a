//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the credential endpoints are limited: token creation and
//! registration. Everything else is cheap or requires a token anyway.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor keyed on the client IP.
///
/// By default the key is the TCP peer address, so client-supplied headers
/// cannot move a caller into a fresh bucket. With `trust_proxy_headers` the
/// first `X-Forwarded-For` entry (then `X-Real-IP`) wins; enable that only
/// behind a proxy that overwrites those headers.
///
/// Requests with no usable address (in-process tests, unix sockets) share
/// the `0.0.0.0` bucket rather than failing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    /// Create an extractor, optionally honouring proxy headers.
    #[must_use]
    pub const fn new(trust_proxy_headers: bool) -> Self {
        Self {
            trust_proxy_headers,
        }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req, self.trust_proxy_headers))
    }
}

fn client_ip<T>(req: &Request<T>, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(req.headers()) {
            return ip;
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| {
            addr.ip()
        })
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // X-Forwarded-For: first IP in the chain is the client
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for credential endpoints: ~10 requests per minute per IP.
///
/// See [`ClientIpKeyExtractor`] for what `trust_proxy_headers` changes.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trust_proxy_headers))
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from_peer(peer: &str) -> Request<()> {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_peer_address_wins_by_default() {
        let req = from_peer("192.0.2.10:5555");
        assert_eq!(
            client_ip(&req, false),
            "192.0.2.10".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_spoofed_headers_share_peer_bucket() {
        let mut first = from_peer("192.0.2.10:5555");
        first
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.1".parse().unwrap());
        let mut second = from_peer("192.0.2.10:6666");
        second
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.99".parse().unwrap());

        assert_eq!(client_ip(&first, false), client_ip(&second, false));
    }

    #[test]
    fn test_trusted_forwarded_for_wins() {
        let req = from_peer("192.0.2.10:5555");
        assert_eq!(
            client_ip(&req, true),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_trusted_real_ip_then_peer() {
        let mut req = from_peer("192.0.2.10:5555");
        req.headers_mut().remove("x-forwarded-for");
        assert_eq!(
            client_ip(&req, true),
            "198.51.100.2".parse::<IpAddr>().unwrap()
        );

        req.headers_mut().remove("x-real-ip");
        assert_eq!(
            client_ip(&req, true),
            "192.0.2.10".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_unknown_client_shares_bucket() {
        let req = Request::builder()
            .header("x-forwarded-for", "not-an-ip")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&req, true), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(client_ip(&req, false), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
