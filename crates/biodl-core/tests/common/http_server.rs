//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves static bodies by path and answers 404 for anything else. Every accepted
//! connection is counted so tests can assert that no network I/O happened.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct HttpServer {
    base: String,
    hits: Arc<AtomicUsize>,
}

impl HttpServer {
    /// URL for `path` on this server (path without leading slash).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Number of connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

struct Files {
    bodies: HashMap<String, Vec<u8>>,
    /// Paths answered with the full `Content-Length` but only half the body.
    truncated: HashSet<String>,
}

/// Starts a server in a background thread serving `files` (path -> body).
/// The server runs until the process exits.
pub fn start(files: &[(&str, Vec<u8>)]) -> HttpServer {
    start_with_truncated(files, &[])
}

/// Like [`start`], but responses for `truncated` paths close the connection halfway
/// through the announced body.
pub fn start_with_truncated(files: &[(&str, Vec<u8>)], truncated: &[&str]) -> HttpServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let key = |p: &str| format!("/{}", p.trim_start_matches('/'));
    let files = Arc::new(Files {
        bodies: files.iter().map(|(p, b)| (key(*p), b.clone())).collect(),
        truncated: truncated.iter().map(|p| key(*p)).collect(),
    });
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            counter.fetch_add(1, Ordering::SeqCst);
            let files = Arc::clone(&files);
            thread::spawn(move || handle(stream, &files));
        }
    });
    HttpServer {
        base: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(mut stream: TcpStream, files: &Files) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/");

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    match files.bodies.get(path) {
        Some(body) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let sent = if files.truncated.contains(path) {
                &body[..body.len() / 2]
            } else {
                &body[..]
            };
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(sent);
            let _ = stream.flush();
        }
        None => {
            let body = b"not found";
            let head = format!(
                "HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
    }
}

/// A loopback address nothing listens on.
pub fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/{}", port, path)
}
