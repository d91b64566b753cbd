//! Bounded capture of child process output

use tokio::io::{AsyncBufReadExt, BufReader};

/// Marker appended when a stream exceeded its ceiling
pub(crate) const TRUNCATION_MARKER: &str = "\n... (output truncated due to size limit)";

/// Read `reader` to EOF, keeping at most `max_bytes`
///
/// Reading continues past the ceiling so the child never blocks on a full pipe.
pub(crate) async fn read_output_limited<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
    max_bytes: u64,
) -> String {
    let mut reader = BufReader::new(reader);
    let mut output = String::new();
    let mut total_bytes: u64 = 0;
    let mut truncated = false;
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(n) => {
                total_bytes += n as u64;
                if truncated {
                    continue;
                }
                if total_bytes > max_bytes {
                    output.push_str(TRUNCATION_MARKER);
                    truncated = true;
                    continue;
                }
                output.push_str(&String::from_utf8_lossy(&line));
            }
            Err(_) => break,
        }
    }

    output
}
