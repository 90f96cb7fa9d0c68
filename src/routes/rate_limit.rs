use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// Keys requests by client IP.
///
/// Proxy headers (`X-Forwarded-For`, then `X-Real-IP`) take precedence over
/// the peer address. Requests with no identifiable client share the
/// loopback bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIpKeyExtractor;

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let first_hop = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    };
    first_hop("x-forwarded-for").or_else(|| first_hop("x-real-ip"))
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = || {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip())
        };
        Ok(forwarded_ip(req.headers())
            .or_else(peer)
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }
}
