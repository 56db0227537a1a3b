use std::io::Read;
use std::time::Duration;

use blocknet::error::{Error, HttpError};
use blocknet::http::{serialize_head, write_request, HttpRequest, Method, Version};

#[test]
fn test_method_names() {
    assert_eq!("GET".parse::<Method>().unwrap(), Method::GET);
    assert_eq!("DELETE".parse::<Method>().unwrap(), Method::DELETE);
    assert_eq!(Method::PATCH.to_string(), "PATCH");
    assert_eq!(Method::default(), Method::GET);
    assert_eq!("get".parse::<Method>(), Err(HttpError::MalformedRequest));
    assert!("FETCH".parse::<Method>().is_err());
}

#[test]
fn test_new_request_defaults() {
    let request = HttpRequest::new(Method::GET, "example.com", "");
    assert_eq!(request.path(), "/");
    assert_eq!(request.scheme(), None);
    assert_eq!(request.port(), None);
    assert_eq!(request.version(), Version::Http11);
    assert_eq!(request.header("host"), Some("example.com"));
    assert!(!request.has_body());
    assert_eq!(request.timeout(), None);
}

#[test]
fn test_from_url_splits_target() {
    let request = HttpRequest::get("http://Example.COM:8080/search?q=rust&page=2").unwrap();
    assert_eq!(request.method(), Method::GET);
    assert_eq!(request.scheme(), Some("http"));
    assert_eq!(request.host(), "example.com");
    assert_eq!(request.port(), Some(8080));
    assert_eq!(request.path(), "/search");
    assert_eq!(request.query(), Some("q=rust&page=2"));
    assert_eq!(request.resource(), "/search?q=rust&page=2");
    assert_eq!(request.header("Host"), Some("example.com:8080"));
}

#[test]
fn test_from_url_rejects_bad_input() {
    for url in ["not a url", "/relative/path", "mailto:someone@example.com"] {
        let err = HttpRequest::get(url).unwrap_err();
        assert!(matches!(err, Error::Http(HttpError::MalformedRequest)), "{url}");
    }
}

#[test]
fn test_host_header_follows_target() {
    let mut request = HttpRequest::get("https://example.com/").unwrap();
    assert_eq!(request.header("Host"), Some("example.com"));

    // the well-known port is left out
    request.set_port(Some(443));
    assert_eq!(request.header("Host"), Some("example.com"));
    request.set_port(Some(8443));
    assert_eq!(request.header("Host"), Some("example.com:8443"));

    request.set_host("other.example");
    assert_eq!(request.header("Host"), Some("other.example:8443"));

    request.set_host("");
    assert_eq!(request.header("Host"), None);
}

#[test]
fn test_ipv6_host_is_bracketed() {
    let request = HttpRequest::get("http://[::1]:8080/").unwrap();
    assert_eq!(request.host(), "::1");
    assert_eq!(request.header("Host"), Some("[::1]:8080"));
}

#[test]
fn test_query_is_encoded() {
    let mut request = HttpRequest::new(Method::GET, "example.com", "/find");
    request.add_query("q", "a b&c");
    request.add_query("lang", "en");
    assert_eq!(request.resource(), "/find?q=a+b%26c&lang=en");
}

#[test]
fn test_url_query_is_sent_verbatim() {
    let request = HttpRequest::get("http://example.com/p?flag").unwrap();
    assert_eq!(request.resource(), "/p?flag");

    let request = HttpRequest::get("http://example.com/p?q=a%20b&t=x~y&e=").unwrap();
    assert_eq!(request.resource(), "/p?q=a%20b&t=x~y&e=");

    let request = HttpRequest::get("http://example.com/p?").unwrap();
    assert_eq!(request.resource(), "/p?");

    let request = HttpRequest::get("http://example.com/p").unwrap();
    assert_eq!(request.query(), None);
    assert_eq!(request.resource(), "/p");
}

#[test]
fn test_added_pairs_follow_url_query() {
    let mut request = HttpRequest::get("http://example.com/p?flag&x=%41").unwrap();
    request.add_query("name", "a b");
    assert_eq!(request.resource(), "/p?flag&x=%41&name=a+b");

    let request = HttpRequest::builder(Method::GET, "http://example.com/p?")
        .query("k", "v")
        .build()
        .unwrap();
    assert_eq!(request.resource(), "/p?k=v");
}

#[test]
fn test_builder() {
    let request = HttpRequest::builder(Method::POST, "http://example.com/submit")
        .header("Content-Type", "text/plain")
        .query("id", "7")
        .version(Version::Http10)
        .timeout(Duration::from_secs(3))
        .body("payload")
        .build()
        .unwrap();

    assert_eq!(request.method(), Method::POST);
    assert_eq!(request.resource(), "/submit?id=7");
    assert_eq!(request.version(), Version::Http10);
    assert_eq!(request.timeout(), Some(Duration::from_secs(3)));
    assert_eq!(request.header("content-type"), Some("text/plain"));
    assert_eq!(request.header("Content-Length"), Some("7"));
    assert!(request.has_body());
}

#[test]
fn test_builder_reports_url_error() {
    let err = HttpRequest::builder(Method::GET, "::nope::")
        .header("X", "y")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Http(HttpError::MalformedRequest)));
}

#[test]
fn test_serialize_head() {
    let mut request = HttpRequest::new(Method::GET, "example.com", "/index.html");
    request.set_header("Accept", "*/*");
    let head = serialize_head(&request);
    assert_eq!(
        String::from_utf8(head).unwrap(),
        "GET /index.html HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n"
    );
}

#[test]
fn test_write_request_consumes_body() {
    let mut request = HttpRequest::new(Method::PUT, "example.com", "/upload");
    request.set_body_bytes(&b"0123456789"[..]);

    let mut out = Vec::new();
    let written = write_request(&mut out, &mut request).unwrap();
    assert_eq!(written as usize, out.len());

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("PUT /upload HTTP/1.1\r\n"));
    assert!(text.contains("\r\nContent-Length: 10\r\n"));
    assert!(text.ends_with("\r\n\r\n0123456789"));
    assert!(!request.has_body());
}

#[test]
fn test_streamed_body() {
    let mut request = HttpRequest::new(Method::POST, "example.com", "/");
    request.set_body(std::io::Cursor::new(b"streamed".to_vec()));
    assert_eq!(request.header("Content-Length"), None);

    let mut body = request.take_body().unwrap();
    let mut text = String::new();
    body.read_to_string(&mut text).unwrap();
    assert_eq!(text, "streamed");
}
