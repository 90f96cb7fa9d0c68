//! Client key selection for the rate limiter.
//!
//! Run with: cargo test --test rate_limit_test

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{body::Body, extract::ConnectInfo, http::Request};
use device_telemetry::routes::rate_limit::ClientIpKeyExtractor;
use tower_governor::key_extractor::KeyExtractor;

fn request(headers: &[(&str, &str)], peer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/v1/devices");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut req = builder.body(Body::empty()).unwrap();
    if let Some(peer) = peer {
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
    }
    req
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn peer_address_keys_direct_clients() {
    let a = ClientIpKeyExtractor
        .extract(&request(&[], Some("203.0.113.7:51000")))
        .unwrap();
    let b = ClientIpKeyExtractor
        .extract(&request(&[], Some("198.51.100.9:51000")))
        .unwrap();

    assert_eq!(a, ip("203.0.113.7"));
    assert_eq!(b, ip("198.51.100.9"));
    assert_ne!(a, b);
}

#[test]
fn proxy_headers_take_precedence_over_peer() {
    let forwarded = request(
        &[("x-forwarded-for", "192.0.2.1, 10.0.0.1"), ("x-real-ip", "192.0.2.2")],
        Some("10.0.0.1:443"),
    );
    assert_eq!(ClientIpKeyExtractor.extract(&forwarded).unwrap(), ip("192.0.2.1"));

    let real_ip = request(&[("x-real-ip", "192.0.2.2")], Some("10.0.0.1:443"));
    assert_eq!(ClientIpKeyExtractor.extract(&real_ip).unwrap(), ip("192.0.2.2"));
}

#[test]
fn unparseable_header_falls_back_to_peer() {
    let req = request(&[("x-forwarded-for", "unknown")], Some("203.0.113.7:51000"));
    assert_eq!(ClientIpKeyExtractor.extract(&req).unwrap(), ip("203.0.113.7"));
}

#[test]
fn anonymous_requests_share_loopback_bucket() {
    assert_eq!(
        ClientIpKeyExtractor.extract(&request(&[], None)).unwrap(),
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    );
}
