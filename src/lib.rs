#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
pub mod feed;
pub mod stomp;
pub mod ws;

use url::Url;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Default feed endpoint, matching the server's conventional mount point.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/ws-stock-prices";

/// Path segment for the raw-WebSocket transport a SockJS-style server exposes
/// alongside its HTTP fallbacks.
const RAW_WEBSOCKET_SEGMENT: &str = "websocket";

/// Derive the WebSocket URL for a configured feed endpoint.
///
/// The feed endpoint is configured the way the server publishes it, as an
/// HTTP URL (e.g. `http://localhost:8080/ws-stock-prices`). The actual
/// transport is the raw-WebSocket endpoint underneath it, so the scheme is
/// rewritten (`http` → `ws`, `https` → `wss`) and the `websocket` path
/// segment appended. URLs already using a `ws`/`wss` scheme are accepted
/// as-is apart from the path segment.
///
/// # Errors
///
/// Returns a validation error if the URL cannot be parsed or uses a scheme
/// other than `http`, `https`, `ws` or `wss`.
pub fn websocket_endpoint(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;

    let scheme = match url.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        "ws" | "wss" => None,
        other => {
            return Err(Error::validation(format!(
                "unsupported feed endpoint scheme: {other}"
            )));
        }
    };
    if let Some(scheme) = scheme
        && url.set_scheme(scheme).is_err()
    {
        return Err(Error::validation(format!(
            "cannot rewrite scheme of feed endpoint: {endpoint}"
        )));
    }

    let needs_segment = !url.path().trim_end_matches('/').ends_with("/websocket");
    if needs_segment {
        url.path_segments_mut()
            .map_err(|()| Error::validation(format!("feed endpoint cannot be a base: {endpoint}")))?
            .pop_if_empty()
            .push(RAW_WEBSOCKET_SEGMENT);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_url_from_http() {
        let url = websocket_endpoint("http://localhost:8080/ws-stock-prices").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws-stock-prices/websocket");
    }

    #[test]
    fn derives_wss_url_from_https() {
        let url = websocket_endpoint("https://feed.example.com/ws-stock-prices").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://feed.example.com/ws-stock-prices/websocket"
        );
    }

    #[test]
    fn keeps_explicit_ws_scheme() {
        let url = websocket_endpoint("ws://127.0.0.1:9000/feed").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/feed/websocket");
    }

    #[test]
    fn does_not_duplicate_websocket_segment() {
        let url = websocket_endpoint("ws://127.0.0.1:9000/feed/websocket").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/feed/websocket");
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        let url = websocket_endpoint("http://localhost:8080/ws-stock-prices/").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws-stock-prices/websocket");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        websocket_endpoint("ftp://localhost/feed").unwrap_err();
    }

    #[test]
    fn rejects_unparseable_url() {
        websocket_endpoint("not a url").unwrap_err();
    }
}
