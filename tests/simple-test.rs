use std::io::{Read, Write};
use std::time::{Duration, Instant};

mod support;

#[test]
fn serve_file_round_trip_test() {
    let content = "0123456789".repeat(1000);
    let server = support::serve(&[("data.bin", &content)], Duration::from_secs(1));

    let mut stream = support::client(server.addr);
    stream.write_all(b"GET /data.bin HTTP/1.1\r\n\r\n").unwrap();

    let (head, body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 10000\r\n"));
    assert!(head.contains("Content-Type: application/octet-stream\r\n"));
    assert!(head.contains("Server: tiny-serve/"));
    assert_eq!(body, content.as_bytes());
}

#[test]
fn root_serves_expanded_index_test() {
    let server = support::serve(
        &[
            ("index.html", "<body>\n####part.txt\n</body>\n"),
            ("part.txt", "included content"),
        ],
        Duration::from_secs(1),
    );

    let mut stream = support::client(server.addr);
    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

    let (head, body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: text/html\r\n"));
    assert_eq!(body, b"<body>\nincluded content\n</body>\n");
}

#[test]
fn missing_file_generic_404_test() {
    let server = support::serve(&[], Duration::from_secs(1));

    let mut stream = support::client(server.addr);
    stream.write_all(b"GET /ghost.html HTTP/1.1\r\n\r\n").unwrap();

    let (head, body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(!head.contains("Content-Type"));
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("<h2>404 Not Found</h2>"));
}

#[test]
fn missing_file_fallback_page_test() {
    let server = support::serve(
        &[("404page.html", "<p>nothing here</p>\n")],
        Duration::from_secs(1),
    );

    let mut stream = support::client(server.addr);
    stream.write_all(b"GET /ghost.html HTTP/1.1\r\n\r\n").unwrap();

    let (head, body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"<p>nothing here</p>\n");
}

#[test]
fn wrong_method_501_test() {
    let server = support::serve(&[], Duration::from_secs(1));

    let mut stream = support::client(server.addr);
    stream.write_all(b"POST / HTTP/1.1\r\n\r\n").unwrap();

    let (head, body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    assert!(body.is_empty());
}

#[test]
fn short_request_400_test() {
    let server = support::serve(&[], Duration::from_secs(1));

    let mut stream = support::client(server.addr);
    stream.write_all(b"GET /\r\n\r\n").unwrap();

    let (head, body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(body.is_empty());
}

#[test]
fn bad_version_505_test() {
    let server = support::serve(&[], Duration::from_secs(1));

    let mut stream = support::client(server.addr);
    stream.write_all(b"GET / HTTP/2.0\r\n\r\n").unwrap();

    let (head, _body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 505 HTTP Version Not Supported\r\n"));
}

#[test]
fn sandbox_escape_answered_404_test() {
    let server = support::serve(&[], Duration::from_secs(1));

    let mut stream = support::client(server.addr);
    stream
        .write_all(b"GET /../../../etc/passwd HTTP/1.1\r\n\r\n")
        .unwrap();

    let (head, _body) = support::read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn keepalive_serves_second_request_test() {
    let server = support::serve(
        &[("a.txt", "first"), ("b.txt", "second")],
        Duration::from_secs(2),
    );

    let mut stream = support::client(server.addr);

    stream.write_all(b"GET /a.txt HTTP/1.1\r\n\r\n").unwrap();
    let (_, body) = support::read_response(&mut stream);
    assert_eq!(body, b"first");

    stream.write_all(b"GET /b.txt HTTP/1.1\r\n\r\n").unwrap();
    let (_, body) = support::read_response(&mut stream);
    assert_eq!(body, b"second");
}

#[test]
fn idle_connection_closed_silently_test() {
    let server = support::serve(&[], Duration::from_millis(300));

    let mut stream = support::client(server.addr);

    // send nothing; the keepalive window must close the connection
    // without any response bytes
    let started = Instant::now();
    let mut buf = Vec::new();
    let received = stream.read_to_end(&mut buf).unwrap();

    assert_eq!(received, 0);
    assert!(started.elapsed() < Duration::from_secs(4));

    // the worker is reclaimed afterwards
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.live_sessions() != 0 {
        assert!(Instant::now() < deadline, "idle session never reaped");
        std::thread::sleep(Duration::from_millis(10));
    }
}
