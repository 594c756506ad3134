//! Minimal passive-mode FTP server for integration tests.
//!
//! Understands USER, PASS, TYPE, CWD, PASV, RETR and QUIT. Bodies are written to the
//! data connection in small chunks so the client sees many short reads. Every command
//! line received is recorded.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const DATA_CHUNK: usize = 1000;

pub struct FtpServer {
    port: u16,
    sessions: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<String>>>,
}

struct Files {
    bodies: HashMap<String, Vec<u8>>,
    /// Paths whose transfer stops halfway and ends with `426`.
    aborted: HashSet<String>,
}

impl FtpServer {
    /// URL for `path` on this server (path without leading slash).
    pub fn url(&self, path: &str) -> String {
        format!("ftp://127.0.0.1:{}/{}", self.port, path)
    }

    /// Number of control connections accepted so far.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Command lines received so far, across all sessions, without line endings.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread serving `files` (path -> body).
pub fn start(files: &[(&str, Vec<u8>)]) -> FtpServer {
    start_with_aborts(files, &[])
}

/// Like [`start`], but retrievals of `aborted` paths close the data connection after
/// half the body and reply `426`.
pub fn start_with_aborts(files: &[(&str, Vec<u8>)], aborted: &[&str]) -> FtpServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files = Arc::new(Files {
        bodies: files
            .iter()
            .map(|(p, b)| (p.trim_start_matches('/').to_string(), b.clone()))
            .collect(),
        aborted: aborted
            .iter()
            .map(|p| p.trim_start_matches('/').to_string())
            .collect(),
    });
    let sessions = Arc::new(AtomicUsize::new(0));
    let commands = Arc::new(Mutex::new(Vec::new()));
    let counter = Arc::clone(&sessions);
    let log = Arc::clone(&commands);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            counter.fetch_add(1, Ordering::SeqCst);
            let files = Arc::clone(&files);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &files, &log));
        }
    });
    FtpServer {
        port,
        sessions,
        commands,
    }
}

fn send(out: &mut TcpStream, line: &str) {
    let _ = out.write_all(line.as_bytes());
    let _ = out.write_all(b"\r\n");
    let _ = out.flush();
}

fn handle(stream: TcpStream, files: &Files, log: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut out = match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut reader = BufReader::new(stream);
    send(&mut out, "220-biodl test server");
    send(&mut out, "220 ready");

    let mut passive: Option<TcpListener> = None;
    let mut cwd: Vec<String> = Vec::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\r', '\n']);
        log.lock().unwrap().push(line.to_string());
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => send(&mut out, "331 Password required"),
            "PASS" => send(&mut out, "230 Logged in"),
            "TYPE" => send(&mut out, "200 Type set to I"),
            "CWD" => {
                let prefix = format!("{}/", join(&cwd, arg));
                if files.bodies.keys().any(|p| p.starts_with(&prefix)) {
                    cwd.push(arg.to_string());
                    send(&mut out, "250 Directory changed");
                } else {
                    send(&mut out, "550 No such directory");
                }
            }
            "PASV" => {
                let data = TcpListener::bind("127.0.0.1:0").expect("bind data");
                let port = data.local_addr().unwrap().port();
                // Advertise a bogus address; clients should use the control peer.
                send(
                    &mut out,
                    &format!("227 Entering Passive Mode (10,0,0,1,{},{})", port >> 8, port & 0xff),
                );
                passive = Some(data);
            }
            "RETR" => {
                let path = join(&cwd, arg);
                match (files.bodies.get(&path), passive.take()) {
                    (Some(body), Some(data)) => {
                        send(&mut out, "150 Opening BINARY mode data connection");
                        let aborted = files.aborted.contains(&path);
                        let sent = if aborted { &body[..body.len() / 2] } else { &body[..] };
                        if let Ok((mut conn, _)) = data.accept() {
                            for chunk in sent.chunks(DATA_CHUNK) {
                                if conn.write_all(chunk).is_err() {
                                    break;
                                }
                                let _ = conn.flush();
                            }
                        }
                        if aborted {
                            send(&mut out, "426 Connection closed; transfer aborted");
                        } else {
                            send(&mut out, "226 Transfer complete");
                        }
                    }
                    (None, _) => send(&mut out, "550 No such file or directory"),
                    (Some(_), None) => send(&mut out, "425 Use PASV first"),
                }
            }
            "QUIT" => {
                send(&mut out, "221 Goodbye");
                return;
            }
            _ => send(&mut out, "502 Command not implemented"),
        }
    }
}

fn join(cwd: &[String], name: &str) -> String {
    if cwd.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", cwd.join("/"), name)
    }
}
