use std::io::{BufRead, Cursor, Read};

use blocknet::error::{Error, HttpError};
use blocknet::http::{read_response, HttpResponse, ResponseParser, StatusCode, Version, MAX_HEADER_BYTES};

fn malformed(err: &Error) -> bool {
    matches!(err, Error::Http(HttpError::MalformedResponse))
}

#[test]
fn test_parse_simple_response() {
    let mut input = Cursor::new(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello".to_vec());
    let response = read_response(&mut input).unwrap();

    assert_eq!(response.version(), Version::Http11);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.reason(), "OK");
    assert_eq!(response.header("content-length"), Some("5"));
    assert_eq!(response.content_length(), Some(5));

    // reader is left at the body
    let mut rest = String::new();
    input.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "hello");
}

#[test]
fn test_reason_phrase_keeps_spaces() {
    let mut input = Cursor::new(b"HTTP/1.0 404 Not Found Here\r\n\r\n".to_vec());
    let response = read_response(&mut input).unwrap();
    assert_eq!(response.version(), Version::Http10);
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.reason(), "Not Found Here");
}

#[test]
fn test_bare_newlines_accepted() {
    let mut input = Cursor::new(b"HTTP/1.1 204 No Content\nServer: x\n\n".to_vec());
    let response = read_response(&mut input).unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.header("Server"), Some("x"));
}

#[test]
fn test_header_order_and_repeats() {
    let mut input = Cursor::new(
        b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nX-Other:   padded\r\nSet-Cookie: b=2\r\n\r\n".to_vec(),
    );
    let response = read_response(&mut input).unwrap();
    let cookies: Vec<&str> = response.headers().get_all("set-cookie").collect();
    assert_eq!(cookies, ["a=1", "b=2"]);
    assert_eq!(response.header("x-other"), Some("padded"));

    let names: Vec<&str> = response.headers().iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["Set-Cookie", "X-Other", "Set-Cookie"]);
}

#[test]
fn test_folded_header_is_joined() {
    let mut input = Cursor::new(b"HTTP/1.1 200 OK\r\nX-Long: first\r\n  second\r\n\tthird\r\n\r\n".to_vec());
    let response = read_response(&mut input).unwrap();
    assert_eq!(response.header("X-Long"), Some("first second third"));
}

#[test]
fn test_failure_leaves_response_unchanged() {
    let mut response = HttpResponse::new(Version::Http10, StatusCode::NOT_FOUND, "previous");
    response.headers_mut().append("X-Kept", "yes");
    let before = response.clone();

    let mut input = Cursor::new(b"HTTP/1.1 200 OK\r\nno colon here\r\n\r\n".to_vec());
    let err = ResponseParser::new().parse(&mut input, &mut response).unwrap_err();
    assert!(malformed(&err));
    assert_eq!(response, before);
}

#[test]
fn test_bad_status_lines() {
    let cases: &[&[u8]] = &[
        b"HTTP/1.1 20 OK\r\n\r\n",
        b"HTTP/1.1 2000 OK\r\n\r\n",
        b"HTTP/1.1 abc OK\r\n\r\n",
        b"HTTP/4.2 200 OK\r\n\r\n",
        b"HTTX/1.1 200 OK\r\n\r\n",
        b"garbage\r\n\r\n",
    ];
    for case in cases {
        let err = read_response(&mut Cursor::new(case.to_vec())).unwrap_err();
        assert!(malformed(&err), "{:?}", String::from_utf8_lossy(case));
    }
}

#[test]
fn test_bad_header_names() {
    for case in [": empty\r\n", "Bad Name: x\r\n", "Tab\tName: x\r\n"] {
        let input = format!("HTTP/1.1 200 OK\r\n{case}\r\n");
        let err = read_response(&mut Cursor::new(input.into_bytes())).unwrap_err();
        assert!(malformed(&err), "{case:?}");
    }
}

#[test]
fn test_fold_without_previous_header() {
    let mut input = Cursor::new(b"HTTP/1.1 200 OK\r\n continued\r\n\r\n".to_vec());
    assert!(malformed(&read_response(&mut input).unwrap_err()));
}

#[test]
fn test_newer_versions_are_recognized() {
    let mut input = Cursor::new(b"HTTP/2 200 OK\r\n\r\n".to_vec());
    assert_eq!(read_response(&mut input).unwrap().version(), Version::Http2);
    let mut input = Cursor::new(b"HTTP/3.0 200 OK\r\n\r\n".to_vec());
    assert_eq!(read_response(&mut input).unwrap().version(), Version::Http3);
}

#[test]
fn test_empty_input_is_eof() {
    let err = read_response(&mut Cursor::new(Vec::new())).unwrap_err();
    assert!(err.is_eof());
}

#[test]
fn test_truncated_head_is_malformed() {
    let err = read_response(&mut Cursor::new(b"HTTP/1.1 200 OK\r\nServer: x\r\n".to_vec())).unwrap_err();
    assert!(malformed(&err));

    let err = read_response(&mut Cursor::new(b"HTTP/1.1 200 O".to_vec())).unwrap_err();
    assert!(malformed(&err));
}

#[test]
fn test_header_size_limit() {
    let mut oversized = b"HTTP/1.1 200 OK\r\nX-Big: ".to_vec();
    oversized.extend(std::iter::repeat_n(b'a', MAX_HEADER_BYTES));
    oversized.extend_from_slice(b"\r\n\r\n");
    assert!(malformed(&read_response(&mut Cursor::new(oversized)).unwrap_err()));

    let small = b"HTTP/1.1 200 OK\r\nX-Big: aaaaaaaaaaaaaaaa\r\n\r\n".to_vec();
    let mut response = HttpResponse::default();
    let err = ResponseParser::with_limit(32)
        .parse(&mut Cursor::new(small.clone()), &mut response)
        .unwrap_err();
    assert!(malformed(&err));
    ResponseParser::with_limit(small.len())
        .parse(&mut Cursor::new(small), &mut response)
        .unwrap();
    assert_eq!(response.header("X-Big").map(str::len), Some(16));
}

#[test]
fn test_consecutive_responses() {
    let mut input = Cursor::new(b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\nLocation: /x\r\n\r\n".to_vec());
    let first = read_response(&mut input).unwrap();
    assert_eq!(first.status(), StatusCode::CONTINUE);
    let second = read_response(&mut input).unwrap();
    assert_eq!(second.status(), StatusCode::CREATED);
    assert_eq!(second.header("Location"), Some("/x"));
    assert!(input.fill_buf().unwrap().is_empty());
}
