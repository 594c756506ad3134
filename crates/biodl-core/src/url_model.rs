//! URL helpers: file name derivation and path decoding.

use url::Url;

/// Extracts the last non-empty path segment of `url` for use as a local file name.
///
/// Returns `None` when the path is empty/root or the segment is `.` or `..`.
/// The segment is returned as written in the URL (percent-encoding kept).
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Percent-decodes a URL path (e.g. for FTP `RETR` arguments).
///
/// Malformed escapes are kept literally; invalid UTF-8 is replaced lossily.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let high = bytes.get(i + 1).copied().and_then(hex_digit);
            let low = bytes.get(i + 2).copied().and_then(hex_digit);
            if let (Some(high), Some(low)) = (high, low) {
                out.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
