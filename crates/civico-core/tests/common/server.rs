//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves static routes from a background thread. Media routes honour
//! `Range: bytes=N-` with 206 (or 416 past the end) unless configured to
//! ignore ranges. Every request path and Range header is recorded.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, no Content-Length is sent and the body ends at close.
    pub send_length: bool,
    /// If set, the connection closes after this many body bytes even though
    /// the advertised length is larger.
    pub cut_after: Option<usize>,
}

impl Route {
    pub fn media(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            content_type: "application/octet-stream",
            support_ranges: true,
            send_length: true,
            cut_after: None,
        }
    }

    pub fn json(json: &str) -> Self {
        Self {
            status: 200,
            body: json.as_bytes().to_vec(),
            content_type: "application/json",
            support_ranges: false,
            send_length: true,
            cut_after: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"error".to_vec(),
            content_type: "text/plain",
            support_ranges: false,
            send_length: true,
            cut_after: None,
        }
    }

    pub fn ignoring_ranges(mut self) -> Self {
        self.support_ranges = false;
        self
    }

    pub fn without_length(mut self) -> Self {
        self.send_length = false;
        self
    }

    pub fn cut_after(mut self, bytes: usize) -> Self {
        self.cut_after = Some(bytes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub path: String,
    pub range: Option<String>,
}

pub struct TestServer {
    base: String,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    /// Starts serving `routes` on an ephemeral port until the process exits.
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_server = Arc::clone(&log);

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log_server);
                thread::spawn(move || handle(stream, &routes, &log));
            }
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            log,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, log: &Mutex<Vec<Recorded>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&raw).into_owned();
    let (path, range) = parse_request(&request);
    log.lock().unwrap().push(Recorded {
        path: path.clone(),
        range: range.clone(),
    });

    let route = match routes.get(&path) {
        Some(route) => route,
        None => {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
    };

    if route.status != 200 {
        let head = format!(
            "HTTP/1.1 {} Error\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            route.status,
            route.content_type,
            route.body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&route.body);
        return;
    }

    let total = route.body.len() as u64;
    let start = range
        .as_deref()
        .filter(|_| route.support_ranges)
        .and_then(parse_range_start);

    let (status_line, extra, body): (&str, String, &[u8]) = match start {
        Some(start) if start >= total => {
            let head = format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                total
            );
            let _ = stream.write_all(head.as_bytes());
            return;
        }
        Some(start) => (
            "HTTP/1.1 206 Partial Content",
            format!("Content-Range: bytes {}-{}/{}\r\n", start, total - 1, total),
            &route.body[start as usize..],
        ),
        None => ("HTTP/1.1 200 OK", String::new(), &route.body[..]),
    };

    let length = if route.send_length {
        format!("Content-Length: {}\r\n", body.len())
    } else {
        String::new()
    };
    let head = format!(
        "{}\r\nContent-Type: {}\r\nAccept-Ranges: bytes\r\n{}{}Connection: close\r\n\r\n",
        status_line, route.content_type, extra, length
    );
    let body = match route.cut_after {
        Some(cut) => &body[..cut.min(body.len())],
        None => body,
    };
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn parse_request(request: &str) -> (String, Option<String>) {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let range = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .map(|(_, value)| value.trim().to_string());
    (path, range)
}

/// `bytes=N-` -> N
fn parse_range_start(value: &str) -> Option<u64> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, _) = spec.split_once('-')?;
    start.trim().parse().ok()
}

/// Deterministic, non-repeating-looking test payload
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}
