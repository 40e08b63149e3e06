use coolipc::http::HttpMessage;
use coolipc::http::response::{Response, ResponseBuilder, StatusCode};
use coolipc::http::writer::{ResponseWriter, serialize_response};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::OK.reason_phrase(), Some("OK"));
    assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), Some("Bad Request"));
    assert_eq!(StatusCode::NOT_FOUND.reason_phrase(), Some("Not Found"));
    assert_eq!(
        StatusCode::METHOD_NOT_ALLOWED.reason_phrase(),
        Some("Method Not Allowed")
    );
    assert_eq!(
        StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
        Some("Internal Server Error")
    );
    assert_eq!(StatusCode(418).reason_phrase(), None);
}

#[test]
fn test_unknown_status_reason_defaults() {
    assert_eq!(Response::new(StatusCode(799)).reason(), "Unknown");
    assert_eq!(Response::new(StatusCode::NOT_FOUND).reason(), "Not Found");
}

#[test]
fn test_explicit_reason_overrides_table() {
    let response = ResponseBuilder::new(StatusCode::OK).reason("Fine").build();
    assert_eq!(response.reason(), "Fine");
}

#[test]
fn test_json_response_wire_format() {
    let response = Response::json(StatusCode::OK, json!({"rpm": 1200}));
    let wire = String::from_utf8(serialize_response(&response)).unwrap();

    assert_eq!(
        wire,
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 12\r\n\r\n{\"rpm\":1200}"
    );
}

#[test]
fn test_response_from_json_value() {
    let response: Response = json!({}).into();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), "application/json");
    assert_eq!(response.text(), "{}");
}

#[test]
fn test_text_response() {
    let response = Response::ok("hello");
    assert_eq!(response.content_type(), "text/plain");
    assert_eq!(response.headers().value("content-length"), Some("5"));
}

#[test]
fn test_empty_response_has_no_content_headers() {
    let response = Response::not_found();
    assert!(response.headers().is_empty());
    assert_eq!(
        String::from_utf8(serialize_response(&response)).unwrap(),
        "HTTP/1.1 404 Not Found\r\n\r\n"
    );
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let response = Response::method_not_allowed(&["GET", "POST"]);
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().value("Allow"), Some("GET, POST"));
}

#[test]
fn test_builder_keeps_explicit_content_length() {
    let response = ResponseBuilder::new(StatusCode::OK)
        .header("Content-Length", 3)
        .body("abc", "text/plain")
        .build();
    let names: Vec<&str> = response.headers().iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["Content-Length", "Content-Type"]);
}

#[test]
fn test_response_writer_tracks_remaining_bytes() {
    let response = Response::ok("x");
    let writer = ResponseWriter::new(&response);
    assert_eq!(writer.remaining(), serialize_response(&response).len());
    assert!(!writer.is_done());
    assert!(ResponseWriter::from_bytes(Vec::new()).is_done());
}
