//! Client IP extractor.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Header set by reverse proxies with the originating client first.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Best-effort address of the client that sent the request.
///
/// Proxy headers win over the socket peer address. `None` when nothing
/// parseable is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded.or_else(|| {
        headers
            .get(REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = ip_from_headers(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        });
        Ok(ClientIp(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_first_forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert(REAL_IP_HEADER, HeaderValue::from_static("10.0.0.2"));
        assert_eq!(ip_from_headers(&headers), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("unknown"));
        headers.insert(REAL_IP_HEADER, HeaderValue::from_static("2001:db8::1"));
        assert_eq!(ip_from_headers(&headers), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(ip_from_headers(&HeaderMap::new()), None);
    }
}
