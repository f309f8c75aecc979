use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use symphonia::core::io::MediaSource;
use tracing::{debug, trace};

const LOG_TARGET: &str = "r_focusplay::audio::stream_wrapper";

/// A remote body held fully in memory, since Symphonia wants `Read + Seek`.
pub struct BufferedRemoteSource {
    buffer: Cursor<Vec<u8>>,
}

impl BufferedRemoteSource {
    /// Collects `body` into memory.
    ///
    /// `on_progress` receives a percentage whenever it advances. Without a known
    /// `expected_len` it is only told about completion.
    pub async fn download(
        body: impl Stream<Item = Result<Bytes, reqwest::Error>>,
        expected_len: Option<u64>,
        mut on_progress: impl FnMut(u8),
    ) -> Result<Self, reqwest::Error> {
        let mut buffer = Vec::with_capacity(expected_len.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut body = Box::pin(body);
        let mut reported = 0u8;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
            trace!(target: LOG_TARGET, received = buffer.len(), "Chunk buffered.");
            if let Some(total) = expected_len.filter(|t| *t > 0) {
                let percent = ((buffer.len() as u64 * 100) / total).min(99) as u8;
                if percent > reported {
                    reported = percent;
                    on_progress(percent);
                }
            }
        }
        on_progress(100);
        debug!(target: LOG_TARGET, bytes = buffer.len(), "Remote media buffered.");

        Ok(Self::from_bytes(buffer))
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer: Cursor::new(buffer) }
    }

    pub fn len(&self) -> usize {
        self.buffer.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.get_ref().is_empty()
    }
}

impl Read for BufferedRemoteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buffer.read(buf)
    }
}

impl Seek for BufferedRemoteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buffer.seek(pos)
    }
}

impl MediaSource for BufferedRemoteSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}
