//! Header manipulation for forwarded requests and responses.
//!
//! # Responsibilities
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host and `Forwarded`
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Existing X-Forwarded-For / Forwarded chains are appended to, not replaced
//! - Headers listed in `Connection` are treated as hop-by-hop too

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::net::IpAddr;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

// RFC 7230 Section 6.1: Hop-by-hop headers must not be forwarded by proxies.
static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}

/// What the proxy observed about the original caller.
#[derive(Debug, Clone, Copy)]
pub struct ForwardedFor<'a> {
    pub client: Option<IpAddr>,
    pub proto: &'a str,
    pub host: Option<&'a str>,
}

/// Append the caller's address, scheme and host to the forwarding headers.
pub fn append_forwarded(headers: &mut HeaderMap, forwarded: ForwardedFor<'_>) {
    if let Some(client) = forwarded.client {
        append_list(headers, X_FORWARDED_FOR, &client.to_string());
    }
    if let Ok(proto) = HeaderValue::from_str(forwarded.proto) {
        headers.insert(X_FORWARDED_PROTO, proto);
    }
    if let Some(host) = forwarded.host.and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(X_FORWARDED_HOST, host);
    }

    let mut element = Vec::new();
    if let Some(client) = forwarded.client {
        let node = match client {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        element.push(format!("for={}", quote_if_needed(&node)));
    }
    element.push(format!("proto={}", quote_if_needed(forwarded.proto)));
    if let Some(host) = forwarded.host {
        element.push(format!("host={}", quote_if_needed(host)));
    }
    append_list(headers, header::FORWARDED, &element.join(";"));
}

fn append_list(headers: &mut HeaderMap, name: HeaderName, item: &str) {
    let existing: Vec<&str> = headers
        .get_all(&name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    let combined = if existing.is_empty() {
        item.to_string()
    } else {
        format!("{}, {}", existing.join(", "), item)
    };

    if let Ok(value) = HeaderValue::from_str(&combined) {
        headers.insert(name, value);
    }
}

// RFC 7239 values outside the token charset must be quoted.
fn quote_if_needed(value: &str) -> String {
    let is_token = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c));
    if is_token {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hop_by_hop_and_connection_listed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-custom-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-custom-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn appends_to_existing_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4"));

        append_forwarded(
            &mut headers,
            ForwardedFor {
                client: Some("127.0.0.1".parse().unwrap()),
                proto: "http",
                host: Some("app.test"),
            },
        );

        assert_eq!(headers[&X_FORWARDED_FOR], "1.2.3.4, 127.0.0.1");
        assert_eq!(headers[&X_FORWARDED_PROTO], "http");
        assert_eq!(headers[&X_FORWARDED_HOST], "app.test");
        assert_eq!(headers[header::FORWARDED], "for=127.0.0.1;proto=http;host=app.test");
    }

    #[test]
    fn ipv6_and_ported_hosts_are_quoted() {
        let mut headers = HeaderMap::new();
        append_forwarded(
            &mut headers,
            ForwardedFor {
                client: Some("2001:db8:85a3:8d3:1319:8a2e:370:7348".parse().unwrap()),
                proto: "https",
                host: Some("localhost:8080"),
            },
        );

        assert_eq!(headers[&X_FORWARDED_FOR], "2001:db8:85a3:8d3:1319:8a2e:370:7348");
        assert_eq!(
            headers[header::FORWARDED],
            "for=\"[2001:db8:85a3:8d3:1319:8a2e:370:7348]\";proto=https;host=\"localhost:8080\""
        );
    }

    #[test]
    fn unknown_client_skips_for() {
        let mut headers = HeaderMap::new();
        append_forwarded(
            &mut headers,
            ForwardedFor {
                client: None,
                proto: "http",
                host: None,
            },
        );
        assert!(!headers.contains_key(&X_FORWARDED_FOR));
        assert_eq!(headers[header::FORWARDED], "proto=http");
    }
}
