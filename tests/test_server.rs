use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use coolipc::http::HttpMessage;
use coolipc::http::response::StatusCode;
use coolipc::{Client, ClientError, ParseError, Request, Response, Server, ServerHandle};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn socket_path(dir: &TempDir) -> PathBuf {
    dir.path().join("coold.sock")
}

fn start(path: &Path) -> ServerHandle {
    let mut server = Server::new(path).with_server_header("coold-test");
    server
        .endpoint(&["GET"], "/a", |_| Ok(Response::ok("a")))
        .endpoint(&["GET", "POST"], "/echo", |req| {
            let host = req.headers().value("Host").unwrap_or_default().to_string();
            let mut builder = Response::builder(StatusCode::OK)
                .header("X-Echo-Host", host)
                .header("X-Echo-Method", req.method());
            if !req.args().is_empty() {
                builder = builder.header("X-Echo-Args", req.args());
            }
            Ok(builder.body(req.body().to_vec(), req.content_type()).build())
        })
        .endpoint(&["GET"], "/header", |req| {
            let value = req.headers().value("X-Big").unwrap_or_default().to_string();
            Ok(Response::ok(value))
        })
        .endpoint(&["GET"], "/fail", |_| Err(anyhow!("sensor unplugged")))
        .endpoint(&["GET"], "/panic", |_| panic!("handler blew up"))
        .endpoint(&["GET"], "/big", |_| Ok(Response::ok("x".repeat(1 << 20))));
    server.serve().unwrap()
}

#[test]
fn test_unknown_route_then_clean_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let handle = start(&path);
    assert!(path.exists());
    assert!(handle.is_serving());

    let response = Client::new(&path).get("/zzz").unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let started = Instant::now();
    handle.terminate().unwrap();
    handle.wait_until_done().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!path.exists());
}

#[test]
fn test_routing_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);
    let client = Client::new(&path);

    let ok = client.get("/a").unwrap();
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.text(), "a");

    let not_allowed = client.send(Request::new("POST", "/a")).unwrap();
    assert_eq!(not_allowed.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(not_allowed.headers().value("Allow"), Some("GET"));

    let missing = client.get("/b").unwrap();
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_route_and_method_match_ignore_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let response = Client::new(&path).send(Request::new("get", "/A")).unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[test]
fn test_responses_are_decorated() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let response = Client::new(&path).get("/a").unwrap();
    let headers = response.headers();
    assert_eq!(headers.value("Content-Length"), Some("1"));
    assert_eq!(headers.value("Server"), Some("coold-test"));
    assert_eq!(headers.value("Connection"), Some("close"));
    assert_eq!(headers.value("X-Framework"), Some(coolipc::framework_id().as_str()));
}

#[test]
fn test_client_sends_host_and_body() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);
    let client = Client::new(&path).with_host("ctl");

    let response = client.post_json("/echo", &serde_json::json!({"pwm": 40})).unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers().value("X-Echo-Host"), Some("ctl"));
    assert_eq!(response.headers().value("X-Echo-Method"), Some("POST"));
    assert_eq!(response.content_type(), "application/json");
    assert_eq!(response.text(), r#"{"pwm":40}"#);
}

#[test]
fn test_client_default_host_and_query_args() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let mut args = coolipc::http::ArgTable::new();
    args.add("unit", "°C");
    let response = Client::new(&path)
        .send_request("GET", "/echo", Some(&args), None, "", "")
        .unwrap();
    assert_eq!(
        response.headers().value("X-Echo-Host"),
        Some(coolipc::framework_id().as_str())
    );
    assert_eq!(response.headers().value("X-Echo-Args"), Some("?unit=%C2%B0C"));
    assert!(response.body().is_empty());
}

#[test]
fn test_undecodable_query_gets_400() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let response = Client::new(&path).get("/echo?k=%FF").unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), ParseError::InvalidEncoding.to_string());
}

#[test]
fn test_handler_error_becomes_500() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);
    let client = Client::new(&path);

    let failed = client.get("/fail").unwrap();
    assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failed.text(), "sensor unplugged");

    let panicked = client.get("/panic").unwrap();
    assert_eq!(panicked.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(panicked.text(), "handler blew up");

    // The loop survives both.
    assert_eq!(client.get("/a").unwrap().status, StatusCode::OK);
}

#[test]
fn test_malformed_request_gets_400() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let mut stream = UnixStream::connect(&path).unwrap();
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nContent-Length: abc\r\n\r\n")
        .unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();

    assert!(reply.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{reply}");
    assert!(reply.contains("Connection: close\r\n"));
}

#[test]
fn test_large_response_survives_partial_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let response = Client::new(&path).get("/big").unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body().len(), 1 << 20);
    assert!(response.body().iter().all(|&b| b == b'x'));
}

#[test]
fn test_large_request_body_is_sent_in_full() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let body = vec![b'p'; 4 << 20];
    let request = Request::builder("POST", "/echo")
        .body(body.clone(), "application/octet-stream")
        .build();
    let response = Client::new(&path).send(request).unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body().len(), body.len());
    assert_eq!(response.body(), &body[..]);
}

#[test]
fn test_header_larger_than_read_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let value = "h".repeat(10_000);
    let request = Request::builder("GET", "/header").header("X-Big", &value).build();
    let response = Client::new(&path).send(request).unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), value);
}

#[test]
fn test_concurrent_clients() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let _handle = start(&path);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let client = Client::new(&path);
            thread::spawn(move || {
                let body = format!("client {i}");
                let request = Request::builder("POST", "/echo").text(body.clone()).build();
                let response = client.send(request).unwrap();
                assert_eq!(response.text(), body);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    std::fs::write(&path, b"leftover").unwrap();

    let _handle = start(&path);
    assert_eq!(Client::new(&path).get("/a").unwrap().status, StatusCode::OK);
}

#[test]
fn test_shutdown_from_another_thread_and_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let handle = start(&path);

    let shutdown = handle.shutdown_handle();
    thread::spawn(move || shutdown.terminate().unwrap())
        .join()
        .unwrap();
    handle.wait_until_done().unwrap();
    assert!(!path.exists());

    let dropped = start(&path);
    drop(dropped);
    assert!(!path.exists());
}

#[test]
fn test_client_without_server_is_transient() {
    let dir = tempfile::tempdir().unwrap();
    let err = Client::new(socket_path(&dir)).get("/a").unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_transient());
}

/// Accepts one connection, reads the request head, then runs `reply`.
fn fake_server(path: &Path, reply: impl FnOnce(&mut UnixStream) + Send + 'static) -> thread::JoinHandle<()> {
    let listener = UnixListener::bind(path).unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 256];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        reply(&mut stream);
    })
}

#[test]
fn test_peer_closing_without_response() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let server = fake_server(&path, |_| {});

    let err = Client::new(&path).get("/a").unwrap_err();
    assert!(matches!(err, ClientError::PeerClosed), "{err:?}");
    assert!(!err.is_transient());
    server.join().unwrap();
}

#[test]
fn test_malformed_response_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = socket_path(&dir);
    let server = fake_server(&path, |stream| {
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n")
            .unwrap();
    });

    let err = Client::new(&path).get("/a").unwrap_err();
    assert!(
        matches!(err, ClientError::Parse(ParseError::InvalidContentLength(ref v)) if v == "lots"),
        "{err:?}"
    );
    server.join().unwrap();
}
