//! Single-hop reverse proxying to a datasource
//!
//! The inbound request is re-addressed at the datasource and sent as-is;
//! the datasource's status, headers and body are streamed back unchanged.

use crate::config::Datasource;
use crate::error::{AppError, AppResult};
use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::Response,
};
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

/// Headers scoped to a single connection; never copied across the proxy
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Build the backend URL for an inbound path and query
///
/// The base path and the inbound path are joined with exactly one slash.
/// A query on the base URL is kept and the inbound query appended to it.
pub fn upstream_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_path(&join_paths(base.path(), path));
    url.set_fragment(None);

    let base_query = base.query().filter(|q| !q.is_empty());
    let query = match (base_query, query.filter(|q| !q.is_empty())) {
        (Some(b), Some(q)) => Some(format!("{}&{}", b, q)),
        (Some(b), None) => Some(b.to_string()),
        (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    };
    url.set_query(query.as_deref());
    url
}

fn join_paths(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Map a reqwest failure onto the backend error taxonomy
pub fn transport_error(url: &Url, err: reqwest::Error, timeout: Option<Duration>) -> AppError {
    if err.is_timeout() {
        AppError::BackendTimeout {
            url: url.to_string(),
            timeout_seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }
    } else if err.is_decode() {
        AppError::BadUpstreamPayload {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        AppError::BackendUnreachable {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Copy headers, dropping `host` and everything hop-by-hop
///
/// Headers named by the `connection` header are connection-scoped too.
fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let connection_scoped: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut copied = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == header::HOST
            || HOP_BY_HOP_HEADERS.contains(&name.as_str())
            || connection_scoped.iter().any(|c| c == name.as_str())
        {
            continue;
        }
        copied.append(name.clone(), value.clone());
    }
    copied
}

/// True when the inbound request declares a body worth streaming
fn declares_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

fn append_forwarded_for(headers: &mut HeaderMap, client: SocketAddr) {
    let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client.ip()),
        None => client.ip().to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded) {
        headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
    }
}

/// Proxy `request` to `datasource` and stream the answer back
///
/// # Errors
///
/// Returns `BackendUnreachable` or `BackendTimeout` when the datasource cannot
/// be reached. HTTP error statuses from the datasource are not errors; they
/// are relayed like any other response.
pub async fn forward(
    client: &reqwest::Client,
    datasource: &Datasource,
    request: Request,
) -> AppResult<Response> {
    let (parts, body) = request.into_parts();
    let url = upstream_url(datasource.url(), parts.uri.path(), parts.uri.query());

    let mut headers = end_to_end_headers(&parts.headers);
    if let Some(ConnectInfo(client_addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        append_forwarded_for(&mut headers, *client_addr);
    }

    let mut outbound = client
        .request(parts.method.clone(), url.clone())
        .headers(headers);
    if declares_body(&parts.headers) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    tracing::debug!(
        method = %parts.method,
        upstream = %url,
        "Forwarding request to datasource"
    );

    let upstream = outbound
        .send()
        .await
        .map_err(|e| transport_error(&url, e, None))?;

    let status = upstream.status();
    let headers = end_to_end_headers(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid test url")
    }

    #[test]
    fn test_upstream_url_joins_paths_with_single_slash() {
        assert_eq!(
            upstream_url(&url("http://prom:9090"), "/api/v1/query", None).as_str(),
            "http://prom:9090/api/v1/query"
        );
        assert_eq!(
            upstream_url(&url("http://prom:9090/prefix"), "/api/v1/query", None).as_str(),
            "http://prom:9090/prefix/api/v1/query"
        );
        assert_eq!(
            upstream_url(&url("http://prom:9090/prefix/"), "/api/v1/query", None).as_str(),
            "http://prom:9090/prefix/api/v1/query"
        );
    }

    #[test]
    fn test_upstream_url_keeps_query_string() {
        let target = upstream_url(
            &url("http://prom:9090"),
            "/api/v1/query",
            Some("query=up&time=1600000000"),
        );
        assert_eq!(
            target.as_str(),
            "http://prom:9090/api/v1/query?query=up&time=1600000000"
        );
    }

    #[test]
    fn test_upstream_url_merges_base_query() {
        let target = upstream_url(
            &url("http://prom:9090/?tenant=a"),
            "/api/v1/query",
            Some("query=up"),
        );
        assert_eq!(
            target.as_str(),
            "http://prom:9090/api/v1/query?tenant=a&query=up"
        );
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/a/", "/b"), "/a/b");
        assert_eq!(join_paths("/a", "b"), "/a/b");
        assert_eq!(join_paths("/a", "/b"), "/a/b");
        assert_eq!(join_paths("/a/", "b"), "/a/b");
    }

    #[test]
    fn test_end_to_end_headers_drops_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy:8080"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        let copied = end_to_end_headers(&headers);
        assert_eq!(copied.len(), 2);
        assert_eq!(copied[header::ACCEPT], "application/json");
        assert_eq!(copied[header::AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn test_declares_body() {
        let mut headers = HeaderMap::new();
        assert!(!declares_body(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert!(!declares_body(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert!(declares_body(&headers));

        let mut chunked = HeaderMap::new();
        chunked.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert!(declares_body(&chunked));
    }

    #[test]
    fn test_append_forwarded_for() {
        let client: SocketAddr = "10.0.0.7:51234".parse().expect("valid addr");

        let mut fresh = HeaderMap::new();
        append_forwarded_for(&mut fresh, client);
        assert_eq!(fresh[X_FORWARDED_FOR], "10.0.0.7");

        let mut chained = HeaderMap::new();
        chained.insert(
            HeaderName::from_static(X_FORWARDED_FOR),
            HeaderValue::from_static("192.168.1.1"),
        );
        append_forwarded_for(&mut chained, client);
        assert_eq!(chained[X_FORWARDED_FOR], "192.168.1.1, 10.0.0.7");
    }
}
