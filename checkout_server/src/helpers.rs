use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::*;

/// Get the remote IP address for a request. Three sources are consulted, in decreasing order of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        result =
            req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()).and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for)
            .and_then(|s| IpAddr::from_str(&s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

// Extracts the `for=` element of a `Forwarded` header value, stripping optional quotes.
fn forwarded_for(value: &str) -> Option<String> {
    value
        .split(';')
        .find_map(|part| part.trim().strip_prefix("for="))
        .map(|s| s.trim_matches('"').to_string())
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn x_forwarded_for_wins_when_enabled() {
        let req = TestRequest::default().insert_header(("X-Forwarded-For", "203.0.113.9")).to_http_request();
        let ip = get_remote_ip(&req, true, false);
        assert_eq!(ip, Some(IpAddr::from_str("203.0.113.9").unwrap()));
        // disabled: the header is ignored and there is no peer address on a test request
        assert_eq!(get_remote_ip(&req, false, false), None);
    }

    #[test]
    fn forwarded_header_is_parsed() {
        let req =
            TestRequest::default().insert_header(("Forwarded", "for=\"198.51.100.7\";proto=https")).to_http_request();
        let ip = get_remote_ip(&req, false, true);
        assert_eq!(ip, Some(IpAddr::from_str("198.51.100.7").unwrap()));
    }
}
