// Redirect module
// The plain-HTTP listener answers every request with a 302 to the HTTPS origin

use hyper::{Request, Response};

use crate::http::{self, ResponseBody};

const DEFAULT_HTTPS_PORT: u16 = 443;

/// Build the HTTPS location for a plain-HTTP request
///
/// The hostname comes from the `Host` header with any port removed; the
/// HTTPS port is appended unless it is the default one.
pub fn redirect_location(host_header: Option<&str>, https_port: u16, path_and_query: &str) -> String {
    let host = host_header.map_or("localhost", strip_port);
    let host = if host.is_empty() { "localhost" } else { host };
    let path = if path_and_query.starts_with('/') {
        path_and_query
    } else {
        "/"
    };

    if https_port == DEFAULT_HTTPS_PORT {
        format!("https://{host}{path}")
    } else {
        format!("https://{host}:{https_port}{path}")
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal, keep the brackets
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

/// Answer a request on the redirect listener
pub fn handle_redirect<B>(req: &Request<B>, https_port: u16) -> Response<ResponseBody> {
    let host = req
        .headers()
        .get(hyper::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()));
    let path_and_query = req
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    http::build_redirect_response(&redirect_location(host, https_port, path_and_query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_omitted() {
        assert_eq!(
            redirect_location(Some("example.test"), 443, "/a/b.html?x=1"),
            "https://example.test/a/b.html?x=1"
        );
    }

    #[test]
    fn test_port_replaced() {
        assert_eq!(
            redirect_location(Some("localhost:80"), 8443, "/"),
            "https://localhost:8443/"
        );
        assert_eq!(
            redirect_location(Some("localhost:8080"), 443, "/index.html"),
            "https://localhost/index.html"
        );
    }

    #[test]
    fn test_ipv6_host() {
        assert_eq!(
            redirect_location(Some("[::1]:8080"), 8443, "/x"),
            "https://[::1]:8443/x"
        );
    }

    #[test]
    fn test_missing_host() {
        assert_eq!(redirect_location(None, 443, "/"), "https://localhost/");
        assert_eq!(redirect_location(Some(""), 443, "/"), "https://localhost/");
    }

    #[test]
    fn test_handle_redirect() {
        let req = Request::builder()
            .uri("/docs/page.html?lang=en")
            .header("host", "dev.local:80")
            .body(())
            .unwrap();
        let response = handle_redirect(&req, 8443);
        assert_eq!(response.status(), 302);
        assert_eq!(
            response.headers()["location"],
            "https://dev.local:8443/docs/page.html?lang=en"
        );
    }
}
