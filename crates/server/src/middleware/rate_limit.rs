//! Rate limiting for the login endpoints using governor and `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Json,
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use serde_json::json;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client address
// =============================================================================

/// Client address from proxy headers: `CF-Connecting-IP`, then the first hop
/// of `X-Forwarded-For`, then `X-Real-IP`.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("cf-connecting-ip")
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
        .or_else(|| header("x-real-ip").and_then(|s| s.trim().parse().ok()))
}

/// Key extractor: proxy headers first, then the peer address recorded by
/// `into_make_service_with_connect_info`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for login endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// Never panics: `per_second(6)` and `burst_size(5)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Give rate-limit rejections the same JSON shape as every other error.
pub async fn json_rate_limit_body(response: Response) -> Response {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response.headers().get("retry-after").cloned();
        let mut json_response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "too many requests, try again later" })),
        )
            .into_response();
        if let Some(value) = retry_after {
            json_response.headers_mut().insert("retry-after", value);
        }
        return json_response;
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_client_ip_prefers_cloudflare_header() {
        let h = headers(&[
            ("cf-connecting-ip", "203.0.113.9"),
            ("x-forwarded-for", "198.51.100.1"),
        ]);
        assert_eq!(client_ip(&h), "203.0.113.9".parse().ok());
    }

    #[test]
    fn test_client_ip_uses_first_forwarded_hop() {
        let h = headers(&[("x-forwarded-for", "198.51.100.1, 10.0.0.2")]);
        assert_eq!(client_ip(&h), "198.51.100.1".parse().ok());
    }

    #[test]
    fn test_client_ip_ignores_garbage() {
        let h = headers(&[("x-forwarded-for", "unknown"), ("x-real-ip", "192.0.2.4")]);
        assert_eq!(client_ip(&h), "192.0.2.4".parse().ok());
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_rate_limit_body_is_json() {
        let response = json_rate_limit_body(StatusCode::TOO_MANY_REQUESTS.into_response()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
