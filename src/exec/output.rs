/// Bounded output collection.
///
/// Each captured stream gets its own collector thread with a hard byte
/// limit, so a submission that floods stdout cannot exhaust host memory and
/// cannot deadlock the watchdog by filling the pipe.
use std::io::{BufReader, Read};
use std::thread::{self, JoinHandle};

/// One collected stream.
#[derive(Debug, Clone, Default)]
pub struct CollectedStream {
    pub data: Vec<u8>,
    /// True when the byte limit cut the stream short
    pub truncated: bool,
}

impl CollectedStream {
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Spawn a collector thread reading `stream` up to `limit` bytes.
///
/// Reads to EOF even after truncation so the child never blocks on a full
/// pipe; bytes past the limit are discarded, not buffered.
pub fn spawn_collector<R: Read + Send + 'static>(
    stream: R,
    limit: usize,
) -> JoinHandle<CollectedStream> {
    thread::spawn(move || collect_stream(stream, limit))
}

fn collect_stream<R: Read>(stream: R, limit: usize) -> CollectedStream {
    let mut reader = BufReader::new(stream);
    let mut collected = CollectedStream::default();
    let mut chunk = [0u8; 4096];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if collected.truncated {
                    continue; // drain without storing
                }
                if collected.data.len() + n > limit {
                    let remaining = limit - collected.data.len();
                    collected.data.extend_from_slice(&chunk[..remaining]);
                    collected.truncated = true;
                } else {
                    collected.data.extend_from_slice(&chunk[..n]);
                }
            }
            // Broken pipe just means the child died mid-write; whatever was
            // captured so far is the output.
            Err(_) => break,
        }
    }

    collected
}
