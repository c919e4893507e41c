// tests/pump.rs

use std::collections::VecDeque;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::{Arc, mpsc};
use std::task::{Context, Poll};
use std::time::Duration;

use proptest::prelude::*;
use tokio::io::{AsyncRead, ReadBuf};

use xcproc::exec::pump::{DEFAULT_BUFFER_SIZE, pump};
use xcproc::exec::{CaptureSink, NullSink, OutputSink, TeeSink, WriterSink};

/// Reader that replays a fixed script of chunks and errors.
struct ScriptedReader {
    steps: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedReader {
    fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.steps.pop_front() {
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.remaining());
                buf.put_slice(&bytes[..n]);
                Poll::Ready(Ok(()))
            }
            Some(Err(e)) => Poll::Ready(Err(e)),
            None => Poll::Ready(Ok(())),
        }
    }
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(f)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Sizes go well past a typical 64 KiB pipe buffer.
    #[test]
    fn pumped_bytes_equal_source_bytes(
        data in proptest::collection::vec(any::<u8>(), 0..150_000),
        buffer_size in 1usize..8192,
    ) {
        let sink = CaptureSink::new();
        let report = block_on(pump(&data[..], &sink, buffer_size));

        prop_assert!(report.error.is_none());
        prop_assert_eq!(report.bytes, data.len() as u64);
        prop_assert_eq!(sink.contents(), data);
    }
}

#[test]
fn interrupted_reads_are_retried() {
    let reader = ScriptedReader::new(vec![
        Ok(b"abc".to_vec()),
        Err(io::Error::from(io::ErrorKind::Interrupted)),
        Ok(b"def".to_vec()),
    ]);
    let sink = CaptureSink::new();

    let report = block_on(pump(reader, &sink, DEFAULT_BUFFER_SIZE));

    assert!(report.error.is_none());
    assert_eq!(report.bytes, 6);
    assert_eq!(sink.to_string_lossy(), "abcdef");
}

#[test]
fn read_error_ends_the_drain_and_keeps_earlier_output() {
    let reader = ScriptedReader::new(vec![
        Ok(b"before".to_vec()),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        Ok(b"after".to_vec()),
    ]);
    let sink = CaptureSink::new();

    let report = block_on(pump(reader, &sink, DEFAULT_BUFFER_SIZE));

    assert_eq!(report.bytes, 6);
    assert_eq!(
        report.error.map(|e| e.kind()),
        Some(io::ErrorKind::BrokenPipe)
    );
    assert_eq!(sink.to_string_lossy(), "before");
}

#[test]
fn null_sink_still_consumes_everything() {
    let data = vec![7u8; 100_000];

    let report = block_on(pump(&data[..], &NullSink, 512));

    assert_eq!(report.bytes, 100_000);
}

#[test]
fn empty_stream_completes_immediately() {
    let sink = CaptureSink::new();

    let report = block_on(pump(&b""[..], &sink, DEFAULT_BUFFER_SIZE));

    assert_eq!(report.bytes, 0);
    assert!(sink.is_empty());
}

#[test]
fn capture_sink_clones_share_one_buffer() {
    let sink = CaptureSink::new();
    let handle = sink.clone();

    sink.write_chunk(b"xc");
    handle.write_chunk(b"run");

    assert_eq!(sink.to_string_lossy(), "xcrun");
    assert_eq!(handle.len(), 5);
}

#[test]
fn tee_and_writer_sinks_see_every_chunk() {
    let capture = Arc::new(CaptureSink::new());
    let writer = Arc::new(WriterSink::new(Vec::<u8>::new()).unwrap());
    let tee = TeeSink::new(vec![
        capture.clone() as Arc<dyn OutputSink>,
        writer.clone() as Arc<dyn OutputSink>,
    ]);

    let report = block_on(pump(&b"simctl list"[..], &tee, 4));
    drop(tee);

    assert_eq!(report.bytes, 11);
    assert_eq!(capture.to_string_lossy(), "simctl list");
    let writer = Arc::try_unwrap(writer).expect("tee dropped, writer has one owner");
    assert_eq!(writer.finish().unwrap(), b"simctl list".to_vec());
}

/// Writer whose every `write` waits for a permit on `gate`.
#[derive(Debug)]
struct GatedWriter {
    gate: mpsc::Receiver<()>,
    buf: Vec<u8>,
}

impl Write for GatedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.gate
            .recv()
            .map_err(|_| io::Error::other("gate closed"))?;
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn stalled_writer_does_not_block_the_pump() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let sink = Arc::new(
        WriterSink::new(GatedWriter {
            gate: gate_rx,
            buf: Vec::new(),
        })
        .unwrap(),
    );

    let (done_tx, done_rx) = mpsc::channel();
    let pumping = {
        let sink = Arc::clone(&sink);
        std::thread::spawn(move || {
            let report = block_on(pump(&b"booted device"[..], sink.as_ref(), 4));
            done_tx.send(report.bytes).unwrap();
        })
    };

    // The writer hasn't been allowed to write anything yet.
    let bytes = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("pump finished while the writer was stalled");
    assert_eq!(bytes, 13);
    pumping.join().unwrap();

    for _ in 0..4 {
        gate_tx.send(()).unwrap();
    }
    let sink = Arc::try_unwrap(sink).expect("pump thread dropped its handle");
    let writer = sink.finish().unwrap();
    assert_eq!(writer.buf, b"booted device".to_vec());
}

#[test]
fn sink_shared_between_threads_keeps_whole_chunks() {
    let sink = Arc::new(CaptureSink::new());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || {
                let chunk = vec![b'a' + i as u8; 64];
                for _ in 0..100 {
                    sink.write_chunk(&chunk);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let contents = sink.contents();
    assert_eq!(contents.len(), 4 * 64 * 100);
    for chunk in contents.chunks(64) {
        assert!(chunk.iter().all(|b| *b == chunk[0]), "chunks must not interleave");
    }
}
