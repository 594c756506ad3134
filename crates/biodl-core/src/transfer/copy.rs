//! Fixed-buffer channel-to-channel copy used by the FTP transport.

use std::io::{self, Read, Write};

/// Reference buffer size for the copy loop.
pub const DEFAULT_FTP_BUFFER_BYTES: usize = 2048;

/// Copies `source` into `sink` through one reusable buffer of `capacity` bytes.
///
/// Each cycle reads whatever the source has ready into the buffer, then writes the
/// filled region out, repeating the write while bytes remain unwritten: a single
/// `write` may accept only part of the buffer. A zero-length read ends the copy.
/// Returns the number of bytes copied.
pub fn copy_buffered<R, W>(source: &mut R, sink: &mut W, capacity: usize) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; capacity.max(1)];
    let mut total = 0u64;
    loop {
        let filled = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut drained = 0;
        while drained < filled {
            match sink.write(&buffer[drained..filled]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("sink accepted 0 of {} pending bytes", filled - drained),
                    ))
                }
                Ok(n) => drained += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        total += filled as u64;
    }
    sink.flush()?;
    Ok(total)
}
