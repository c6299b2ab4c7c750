//! Gzip + newline-delimited JSON record decoding
//!
//! The decompressed body holds one JSON object per line. Decoding is lazy and
//! forward-only: [`RecordIter`] pulls one line at a time from the gzip stream,
//! and [`RecordStream`] runs that iterator on a blocking thread and hands
//! records over a bounded channel.
//!
//! A line that fails to parse, or runs past [`MAX_LINE_BYTES`], is yielded as
//! an error and the sequence continues. A decompression failure is yielded
//! once and ends the sequence.

use crate::{ArchiveError, CertificateRecord, Result};
use flate2::read::GzDecoder;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Records buffered between the decoding thread and the consumer
const CHANNEL_CAPACITY: usize = 16;

/// Longest line buffered as one record (16 MiB)
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Lazy, async sequence of decoded records
pub type RecordStream = ReceiverStream<Result<CertificateRecord>>;

/// Forward-only iterator over the records of a decompressed stream
pub struct RecordIter<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
    max_line: usize,
    finished: bool,
}

impl<R: BufRead> RecordIter<R> {
    /// Iterate records from an already-decompressed line reader
    pub fn new(reader: R) -> Self {
        Self::with_max_line(reader, MAX_LINE_BYTES)
    }

    /// Iterate records, rejecting lines longer than `max_line` bytes
    pub fn with_max_line(reader: R, max_line: usize) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::with_capacity(4096),
            max_line: max_line.max(1),
            finished: false,
        }
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> Iterator for RecordIter<R> {
    type Item = Result<CertificateRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.buf.clear();
            let limit = self.max_line as u64 + 1;
            let read = (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf);
            match read {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line += 1;
                    if self.buf.len() > self.max_line && self.buf.last() != Some(&b'\n') {
                        if let Err(e) = skip_line(&mut self.reader) {
                            return Some(Err(self.decompression_failed(e)));
                        }
                        return Some(Err(ArchiveError::malformed_record(
                            self.line,
                            format!("line exceeds {} bytes", self.max_line),
                        )));
                    }

                    let line = trim_line(&self.buf);
                    if line.is_empty() {
                        continue;
                    }

                    return Some(
                        serde_json::from_slice(line)
                            .map_err(|e| ArchiveError::malformed_record(self.line, e)),
                    );
                }
                Err(e) => return Some(Err(self.decompression_failed(e))),
            }
        }

        None
    }
}

impl<R> RecordIter<R> {
    fn decompression_failed(&mut self, e: std::io::Error) -> ArchiveError {
        self.finished = true;
        ArchiveError::decompression_failed(format!(
            "Gzip decompression failed after line {}: {e}",
            self.line
        ))
    }
}

/// Discard input up to and including the next newline without buffering it
fn skip_line<R: BufRead>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

fn trim_line(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &buf[..end]
}

/// Decompress a single gzip member and iterate its records
pub fn records<R: Read>(compressed: R) -> RecordIter<BufReader<GzDecoder<R>>> {
    RecordIter::new(BufReader::new(GzDecoder::new(compressed)))
}

/// Decode records from any readable gzip stream on a blocking thread
///
/// Dropping the returned stream stops the decoding thread at its next send.
pub fn stream_records<R>(compressed: R) -> RecordStream
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        for item in records(compressed) {
            if tx.blocking_send(item).is_err() {
                tracing::debug!("record consumer dropped; stopping decoder");
                break;
            }
        }
    });

    ReceiverStream::new(rx)
}

/// Open a gzip archive on disk and decode its records lazily
///
/// # Errors
///
/// Returns `ArchiveError::Open` if the file cannot be opened.
pub async fn open_archive<P: AsRef<Path>>(path: P) -> Result<RecordStream> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| ArchiveError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(stream_records(file.into_std().await))
}
