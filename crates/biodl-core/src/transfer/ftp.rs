//! Passive-mode FTP retrieval.
//!
//! A control connection logs in (anonymously unless the URL carries credentials),
//! switches to binary mode, changes into each directory of the URL path with one
//! `CWD` per segment and requests a passive data port. The data connection is
//! then a plain byte channel, copied into the destination file with the fixed-buffer
//! loop in [`super::copy_buffered`].
//!
//! Per transfer the state moves `Idle -> Connecting -> Streaming -> Completed | Failed`.
//! Both connections and the file are dropped on every exit path.

use super::{copy_buffered, TransferSettings, Transport};
use crate::error::{TransferCause, TransportError};
use crate::url_model::percent_decode;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};
use url::Url;

const DEFAULT_USER: &str = "anonymous";
const DEFAULT_PASSWORD: &str = "anonymous@";

pub struct FtpTransport {
    settings: TransferSettings,
}

impl FtpTransport {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings }
    }

    /// Logs in, walks to the file's directory, enters passive mode and issues `RETR`. Returns the control session and
    /// the data channel positioned at the first byte of the file.
    fn open(&self, url: &Url, deadline: Option<Instant>) -> Result<(ControlConnection, TcpStream), TransferCause> {
        let host = url
            .host_str()
            .ok_or_else(|| TransferCause::FtpProtocol(format!("no host in {}", url)))?;
        let port = url.port_or_known_default().unwrap_or(21);
        let (user, password) = credentials(url)?;
        let (directories, file_name) = remote_path(url)?;
        let idle = nonzero(self.settings.low_speed_time);

        let control = connect(host, port, self.settings.connect_timeout)?;
        control.set_read_timeout(idle)?;
        let peer = control.peer_addr()?.ip();
        let mut session = ControlConnection::new(control)?;

        session.expect_reply(&[220])?;
        session.login(&user, &password)?;
        session.command("TYPE I", &[200])?;
        for directory in &directories {
            session.command(&format!("CWD {}", directory), &[250])?;
        }
        let pasv = session.command("PASV", &[227])?;
        let data_port = parse_pasv_port(&pasv.text)?;

        // The advertised address is often a private one; the data port lives on the
        // host we are already talking to.
        let data_addr = SocketAddr::new(peer, data_port);
        tracing::trace!("ftp data channel {}", data_addr);
        let data = connect_addr(&data_addr, self.settings.connect_timeout)?;
        data.set_read_timeout(remaining(idle, deadline))?;

        session.command(&format!("RETR {}", file_name), &[125, 150])?;
        Ok((session, data))
    }
}

impl Transport for FtpTransport {
    fn fetch(&self, url: &Url, destination: &Path) -> Result<u64, TransportError> {
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);

        tracing::trace!("ftp {}: connecting", url);
        let (mut session, data) = self.open(url, deadline).map_err(TransportError::connecting)?;

        tracing::trace!("ftp {}: streaming", url);
        let mut file = File::create(destination).map_err(TransportError::streaming)?;
        let mut source = DeadlineReader { inner: data, deadline };
        let copied = copy_buffered(&mut source, &mut file, self.settings.ftp_buffer_bytes);
        // Closing the data channel tells the server we are done reading.
        drop(source);
        let copied = copied.map_err(TransportError::streaming)?;
        file.sync_all().map_err(TransportError::streaming)?;

        session.expect_reply(&[226, 250]).map_err(TransportError::streaming)?;
        session.quit();
        tracing::trace!("ftp {}: completed ({} bytes)", url, copied);
        Ok(copied)
    }
}

/// Reply to an FTP command: three-digit code plus the text of the final line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    text: String,
}

struct ControlConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl ControlConnection {
    fn new(stream: TcpStream) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    fn login(&mut self, user: &str, password: &str) -> Result<(), TransferCause> {
        let reply = self.command(&format!("USER {}", user), &[230, 331])?;
        if reply.code == 331 {
            self.command(&format!("PASS {}", password), &[230, 202])?;
        }
        Ok(())
    }

    fn send(&mut self, line: &str) -> io::Result<()> {
        if line.starts_with("PASS ") {
            tracing::trace!("ftp > PASS ****");
        } else {
            tracing::trace!("ftp > {}", line);
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()
    }

    fn command(&mut self, line: &str, accept: &[u16]) -> Result<Reply, TransferCause> {
        self.send(line)?;
        self.expect_reply(accept)
    }

    fn expect_reply(&mut self, accept: &[u16]) -> Result<Reply, TransferCause> {
        let reply = read_reply(&mut self.reader)?;
        tracing::trace!("ftp < {} {}", reply.code, reply.text);
        if accept.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(TransferCause::FtpReply {
                code: reply.code,
                message: reply.text,
            })
        }
    }

    fn quit(mut self) {
        if self.send("QUIT").is_ok() {
            let _ = read_reply(&mut self.reader);
        }
    }
}

/// Reads one reply, following `123-` continuation lines up to the closing `123 ` line.
fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply, TransferCause> {
    let first = read_line(reader)?;
    let (code, separator, text) = split_reply_line(&first)?;
    if separator != '-' {
        return Ok(Reply { code, text });
    }
    let closing = format!("{} ", code);
    loop {
        let line = read_line(reader)?;
        if let Some(text) = line.strip_prefix(&closing) {
            return Ok(Reply {
                code,
                text: text.to_string(),
            });
        }
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String, TransferCause> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(TransferCause::FtpProtocol("control connection closed".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn split_reply_line(line: &str) -> Result<(u16, char, String), TransferCause> {
    let malformed = || TransferCause::FtpProtocol(format!("unexpected reply line {:?}", line));
    let code = line
        .get(..3)
        .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(malformed)?;
    let mut rest = line[3..].chars();
    let separator = rest.next().unwrap_or(' ');
    if separator != ' ' && separator != '-' {
        return Err(malformed());
    }
    Ok((code, separator, rest.as_str().to_string()))
}

/// Extracts the data port from `Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
fn parse_pasv_port(text: &str) -> Result<u16, TransferCause> {
    let malformed = || TransferCause::FtpProtocol(format!("unexpected PASV reply: {}", text));
    let start = text.find('(').ok_or_else(malformed)?;
    let end = text[start..].find(')').map(|e| start + e).ok_or_else(malformed)?;
    let numbers: Vec<u8> = text[start + 1..end]
        .split(',')
        .map(|n| n.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;
    match numbers.as_slice() {
        [_, _, _, _, high, low] => Ok(u16::from(*high) << 8 | u16::from(*low)),
        _ => Err(malformed()),
    }
}

/// Decoded command argument. CR, LF or NUL would let the value end the command line
/// and start another one.
fn command_arg(raw: &str, what: &str) -> Result<String, TransferCause> {
    let decoded = percent_decode(raw);
    if decoded.contains(['\r', '\n', '\0']) {
        return Err(TransferCause::FtpProtocol(format!(
            "line break or NUL in FTP {}",
            what
        )));
    }
    Ok(decoded)
}

/// `USER` and `PASS` arguments, anonymous unless the URL carries credentials.
fn credentials(url: &Url) -> Result<(String, String), TransferCause> {
    let user = match url.username() {
        "" => DEFAULT_USER.to_string(),
        u => command_arg(u, "user name")?,
    };
    let password = match url.password() {
        Some(p) => command_arg(p, "password")?,
        None => DEFAULT_PASSWORD.to_string(),
    };
    Ok((user, password))
}

/// `CWD` arguments and the `RETR` file name: one decoded entry per non-empty path segment.
fn remote_path(url: &Url) -> Result<(Vec<String>, String), TransferCause> {
    let mut segments = Vec::new();
    for segment in url.path_segments().into_iter().flatten().filter(|s| !s.is_empty()) {
        segments.push(command_arg(segment, "path")?);
    }
    let file_name = segments
        .pop()
        .ok_or_else(|| TransferCause::FtpProtocol(format!("no file name in {}", url)))?;
    Ok((segments, file_name))
}

fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match connect_addr(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("{} resolved to no address", host))
    }))
}

fn connect_addr(addr: &SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    match nonzero(timeout) {
        Some(t) => TcpStream::connect_timeout(addr, t),
        None => TcpStream::connect(addr),
    }
}

fn nonzero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

fn remaining(idle: Option<Duration>, deadline: Option<Instant>) -> Option<Duration> {
    let left = deadline.map(|d| d.saturating_duration_since(Instant::now()).max(Duration::from_millis(1)));
    match (idle, left) {
        (Some(i), Some(l)) => Some(i.min(l)),
        (i, l) => i.or(l),
    }
}

/// Data channel reader that fails once the transfer deadline has passed.
struct DeadlineReader {
    inner: TcpStream,
    deadline: Option<Instant>,
}

impl Read for DeadlineReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "transfer deadline exceeded"));
            }
        }
        self.inner.read(buf)
    }
}
