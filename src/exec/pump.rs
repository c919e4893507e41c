// src/exec/pump.rs

//! Stream pumps and the sinks they write into.
//!
//! A pump copies one child output stream into an [`OutputSink`] in bounded
//! chunks until it observes end-of-stream. There is always a pump per
//! stream, even when the caller doesn't want the output: an undrained pipe
//! fills up and stalls the child, so uncaptured streams go to [`NullSink`].

use std::fmt::Debug;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::thread;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{trace, warn};

/// Default pump chunk size.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Append-only destination for captured output.
///
/// Writes take `&self`; implementations serialise concurrent writers
/// internally so one sink can be shared between pumps or inspected by the
/// caller while a run is in progress.
pub trait OutputSink: Send + Sync + Debug {
    fn write_chunk(&self, chunk: &[u8]);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking writer can't leave a Vec<u8> in a torn state.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_chunk(&self, _chunk: &[u8]) {}
}

/// Collects output in memory.
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything captured so far.
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.buf).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.buf).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Captured output decoded as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&lock(&self.buf)).into_owned()
    }
}

impl OutputSink for CaptureSink {
    fn write_chunk(&self, chunk: &[u8]) {
        lock(&self.buf).extend_from_slice(chunk);
    }
}

/// Forwards output to a blocking writer such as the terminal.
///
/// Chunks are handed to a dedicated writer thread, so a slow or stalled
/// writer never blocks the pump that feeds this sink. Call
/// [`WriterSink::finish`] to flush and get the writer back.
#[derive(Debug)]
pub struct WriterSink<W> {
    tx: mpsc::Sender<Vec<u8>>,
    worker: thread::JoinHandle<W>,
}

impl<W> WriterSink<W>
where
    W: Write + Send + Debug + 'static,
{
    pub fn new(writer: W) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let worker = thread::Builder::new()
            .name("xcproc-writer".into())
            .spawn(move || forward_chunks(writer, rx))?;
        Ok(Self { tx, worker })
    }

    /// Wait for every queued chunk to be written, then return the writer.
    pub fn finish(self) -> io::Result<W> {
        let Self { tx, worker } = self;
        drop(tx);
        worker
            .join()
            .map_err(|_| io::Error::other("output writer thread panicked"))
    }
}

fn forward_chunks<W: Write>(mut writer: W, rx: mpsc::Receiver<Vec<u8>>) -> W {
    for chunk in rx {
        if let Err(e) = writer.write_all(&chunk).and_then(|_| writer.flush()) {
            warn!(error = %e, "failed to forward process output to writer");
        }
    }
    writer
}

impl<W: Send + Debug> OutputSink for WriterSink<W> {
    fn write_chunk(&self, chunk: &[u8]) {
        if self.tx.send(chunk.to_vec()).is_err() {
            warn!("output writer thread is gone; dropping chunk");
        }
    }
}

/// Writes every chunk to each inner sink, in order.
#[derive(Debug, Clone)]
pub struct TeeSink {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Arc<dyn OutputSink>>) -> Self {
        Self { sinks }
    }
}

impl OutputSink for TeeSink {
    fn write_chunk(&self, chunk: &[u8]) {
        for sink in &self.sinks {
            sink.write_chunk(chunk);
        }
    }
}

/// Result of draining one stream.
#[derive(Debug)]
pub struct PumpReport {
    /// Total bytes handed to the sink.
    pub bytes: u64,
    /// The read error that ended the drain early, if any.
    pub error: Option<io::Error>,
}

/// Copy `reader` into `sink` until end-of-stream.
///
/// Reads at most `buffer_size` bytes at a time and only returns after a
/// zero-length read. A read error other than `Interrupted` ends the drain
/// and is reported in [`PumpReport::error`] rather than returned, since the
/// exit code is what decides the outcome of a run.
pub async fn pump<R>(mut reader: R, sink: &dyn OutputSink, buffer_size: usize) -> PumpReport
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut bytes = 0u64;

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                return PumpReport { bytes, error: None };
            }
            Ok(n) => {
                sink.write_chunk(&buf[..n]);
                bytes += n as u64;
                trace!(chunk = n, total = bytes, "pumped chunk");
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, bytes, "stream read failed; treating as end-of-stream");
                return PumpReport {
                    bytes,
                    error: Some(e),
                };
            }
        }
    }
}
