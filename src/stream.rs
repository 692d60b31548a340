use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use http_body::{Body, Frame, SizeHint};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::{ByteWindow, Error};

/// Pause after each chunk when the speed limit is enabled.
pub const THROTTLE_INTERVAL: Duration = Duration::from_secs(1);

/// Copies a byte window from a seekable source to a sink in bounded chunks.
///
/// Each chunk is flushed before the next one is read, so the receiver sees
/// bytes as they are produced. With a throttle interval set, the streamer
/// sleeps that long after each chunk, the last one included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedStreamer {
    chunk_size: usize,
    throttle: Option<Duration>,
}

impl ChunkedStreamer {
    /// `chunk_size` must be non-zero, see [`SenderConfig::validate`](crate::SenderConfig::validate).
    pub fn new(chunk_size: usize) -> Self {
        ChunkedStreamer { chunk_size, throttle: None }
    }

    pub fn throttled(mut self, interval: Duration) -> Self {
        self.throttle = Some(interval);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn throttle(&self) -> Option<Duration> {
        self.throttle
    }

    /// Writes exactly `window.len()` bytes of `source`, starting at
    /// `window.offset`, to `sink`. Returns the number of bytes written.
    ///
    /// Never reads past the end of the window. The first failure aborts the
    /// copy; bytes already flushed stay flushed.
    pub async fn stream<R, W>(&self, source: &mut R, window: ByteWindow, sink: &mut W) -> Result<u64, Error>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        if window.is_empty() {
            return Ok(0);
        }

        source
            .seek(SeekFrom::Start(window.offset))
            .await
            .map_err(Error::Source)?;

        let buffer_len = usize::try_from(window.len())
            .unwrap_or(usize::MAX)
            .min(self.chunk_size);
        let mut buffer = BytesMut::zeroed(buffer_len);

        let mut remaining = window.len();
        let mut position = window.offset;
        let mut chunks = 0u64;

        while remaining > 0 {
            // n <= buffer_len, so it fits a usize
            let n = remaining.min(buffer_len as u64) as usize;
            let chunk = &mut buffer[..n];

            let filled = read_chunk(source, chunk).await.map_err(Error::Source)?;
            if filled < n {
                return Err(Error::SourceExhausted {
                    offset: position + filled as u64,
                    missing: remaining - filled as u64,
                });
            }

            sink.write_all(chunk).await.map_err(Error::Sink)?;
            sink.flush().await.map_err(Error::Sink)?;

            remaining -= n as u64;
            position += n as u64;
            chunks += 1;
            trace!(chunk = chunks, len = n, remaining, "wrote chunk");

            if let Some(interval) = self.throttle {
                tokio::time::sleep(interval).await;
            }
        }

        Ok(window.len())
    }
}

/// Reads until `chunk` is full or the source is exhausted.
async fn read_chunk<R>(source: &mut R, chunk: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < chunk.len() {
        match source.read(&mut chunk[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Response body fed by a [`ChunkedStreamer`] running in its own task.
/// Implements [`Stream`] and [`Body`].
///
/// The streamer writes into one end of an in-memory pipe sized to a single
/// chunk, the body reads from the other. A failed copy is reported as an
/// error after the bytes that were already delivered.
pub struct StreamedBody {
    length: u64,
    stream: BoxStream<'static, io::Result<Bytes>>,
}

impl StreamedBody {
    /// Spawns the copy of `window` from `source` onto the current tokio runtime.
    pub(crate) fn spawn<R>(streamer: ChunkedStreamer, mut source: R, window: ByteWindow) -> Self
    where
        R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
    {
        let (mut writer, reader) = tokio::io::duplex(streamer.chunk_size());
        let task = tokio::spawn(async move {
            let result = streamer.stream(&mut source, window, &mut writer).await;
            if let Err(err) = &result {
                warn!(error = %err, offset = window.offset, length = window.len(), "streaming body failed");
            }
            result
        });

        StreamedBody {
            length: window.len(),
            stream: drain(reader, task, streamer.chunk_size()).boxed(),
        }
    }
}

fn drain(
    mut reader: DuplexStream,
    task: JoinHandle<Result<u64, Error>>,
    chunk_size: usize,
) -> impl Stream<Item = io::Result<Bytes>> {
    try_stream! {
        let mut buffer = BytesMut::with_capacity(chunk_size);
        loop {
            buffer.reserve(chunk_size);
            if reader.read_buf(&mut buffer).await? == 0 {
                break;
            }
            yield buffer.split().freeze();
        }

        let outcome = match task.await {
            Ok(result) => result.map_err(io::Error::other),
            Err(err) => Err(io::Error::other(err)),
        };
        let written = outcome?;
        debug!(written, "body stream finished");
    }
}

impl std::fmt::Debug for StreamedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedBody")
            .field("length", &self.length)
            .finish()
    }
}

impl Stream for StreamedBody {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl Body for StreamedBody {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length)
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Option<io::Result<Frame<Bytes>>>>
    {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;
    use tokio::time::Instant;

    use super::*;

    const CONTENT: &[u8] = b"This is a sample file that will be streamed during the unit tests.";

    /// Sink that records every flushed chunk separately.
    #[derive(Default)]
    struct ChunkSink {
        pending: Vec<u8>,
        flushed: Vec<Vec<u8>>,
    }

    impl AsyncWrite for ChunkSink {
        fn poll_write(mut self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.pending.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            if !self.pending.is_empty() {
                let chunk = std::mem::take(&mut self.pending);
                self.flushed.push(chunk);
            }
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.poll_flush(cx)
        }
    }

    /// Sink whose every write fails.
    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away")))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn collect(streamer: ChunkedStreamer, window: ByteWindow) -> Vec<u8> {
        let mut out = Vec::new();
        let written = streamer
            .stream(&mut Cursor::new(CONTENT), window, &mut out)
            .await
            .unwrap();
        assert_eq!(window.len(), written);
        out
    }

    #[tokio::test]
    async fn test_full_window() {
        let out = collect(ChunkedStreamer::new(8192), ByteWindow::full(66)).await;
        assert_eq!(CONTENT, &out[..]);
    }

    #[tokio::test]
    async fn test_partial_window() {
        let out = collect(ChunkedStreamer::new(10), ByteWindow::new(4, 6)).await;
        assert_eq!(b" is a ", &out[..]);

        let out = collect(ChunkedStreamer::new(10), ByteWindow::new(65, 1)).await;
        assert_eq!(b".", &out[..]);
    }

    #[tokio::test]
    async fn test_every_window_matches_slice() {
        let streamer = ChunkedStreamer::new(7);
        for start in 0..CONTENT.len() {
            for end in start..CONTENT.len() {
                let window = ByteWindow::inclusive(start as u64, end as u64);
                let out = collect(streamer, window).await;
                assert_eq!(&CONTENT[start..=end], &out[..]);
            }
        }
    }

    #[tokio::test]
    async fn test_chunks_are_bounded_and_flushed() {
        let mut sink = ChunkSink::default();
        ChunkedStreamer::new(10)
            .stream(&mut Cursor::new(CONTENT), ByteWindow::new(6, 60), &mut sink)
            .await
            .unwrap();

        assert_eq!(6, sink.flushed.len());
        assert!(sink.flushed.iter().all(|chunk| chunk.len() == 10));
        assert_eq!(&CONTENT[6..], &sink.flushed.concat()[..]);
    }

    #[tokio::test]
    async fn test_last_chunk_is_short() {
        let mut sink = ChunkSink::default();
        ChunkedStreamer::new(40)
            .stream(&mut Cursor::new(CONTENT), ByteWindow::full(66), &mut sink)
            .await
            .unwrap();

        let lengths: Vec<_> = sink.flushed.iter().map(Vec::len).collect();
        assert_eq!(vec![40, 26], lengths);
    }

    #[tokio::test]
    async fn test_empty_window_writes_nothing() {
        let mut sink = ChunkSink::default();
        let written = ChunkedStreamer::new(10)
            .stream(&mut Cursor::new(CONTENT), ByteWindow::new(66, 0), &mut sink)
            .await
            .unwrap();

        assert_eq!(0, written);
        assert!(sink.flushed.is_empty());
    }

    #[tokio::test]
    async fn test_does_not_read_past_window() {
        let mut source = Cursor::new(CONTENT);
        let mut out = Vec::new();
        ChunkedStreamer::new(4)
            .stream(&mut source, ByteWindow::new(4, 6), &mut out)
            .await
            .unwrap();

        assert_eq!(10, source.position());
    }

    #[tokio::test]
    async fn test_short_source() {
        let mut out = Vec::new();
        let result = ChunkedStreamer::new(10)
            .stream(&mut Cursor::new(CONTENT), ByteWindow::new(50, 20), &mut out)
            .await;

        assert_matches!(result, Err(Error::SourceExhausted { offset: 66, missing: 4 }));
        // the complete first chunk went out, the short second one did not
        assert_eq!(&CONTENT[50..60], &out[..]);
    }

    #[tokio::test]
    async fn test_sink_failure_is_propagated() {
        let result = ChunkedStreamer::new(10)
            .stream(&mut Cursor::new(CONTENT), ByteWindow::full(66), &mut BrokenSink)
            .await;

        assert_matches!(result, Err(Error::Sink(err)) if err.kind() == io::ErrorKind::BrokenPipe);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_paces_chunks() {
        let streamer = ChunkedStreamer::new(40).throttled(THROTTLE_INTERVAL);

        let started = Instant::now();
        let out = collect(streamer, ByteWindow::full(66)).await;

        assert_eq!(CONTENT, &out[..]);
        // two chunks, each followed by a pause
        assert!(started.elapsed() >= THROTTLE_INTERVAL * 2);
        assert!(started.elapsed() < THROTTLE_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_pauses_after_single_chunk() {
        let streamer = ChunkedStreamer::new(100).throttled(THROTTLE_INTERVAL);

        let started = Instant::now();
        let out = collect(streamer, ByteWindow::full(66)).await;

        assert_eq!(CONTENT, &out[..]);
        assert!(started.elapsed() >= THROTTLE_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_skips_empty_window() {
        let streamer = ChunkedStreamer::new(10).throttled(THROTTLE_INTERVAL);

        let started = Instant::now();
        let out = collect(streamer, ByteWindow::new(4, 0)).await;

        assert!(out.is_empty());
        assert!(started.elapsed() < THROTTLE_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_scales_with_chunk_count() {
        let streamer = ChunkedStreamer::new(10).throttled(THROTTLE_INTERVAL);

        let started = Instant::now();
        let out = collect(streamer, ByteWindow::full(66)).await;

        assert_eq!(CONTENT, &out[..]);
        assert!(started.elapsed() >= THROTTLE_INTERVAL * 7);
    }

    #[tokio::test]
    async fn test_streamed_body() {
        let source = Cursor::new(CONTENT.to_vec());
        let body = StreamedBody::spawn(ChunkedStreamer::new(10), source, ByteWindow::new(6, 60));
        assert_eq!(Some(60), Body::size_hint(&body).exact());

        let chunks: Vec<Bytes> = body.map(Result::unwrap).collect().await;
        assert_eq!(&CONTENT[6..], &chunks.concat()[..]);
    }

    #[tokio::test]
    async fn test_streamed_body_reports_failure() {
        let source = Cursor::new(CONTENT.to_vec());
        let body = StreamedBody::spawn(ChunkedStreamer::new(10), source, ByteWindow::new(50, 20));

        let items: Vec<io::Result<Bytes>> = body.collect().await;
        let (last, delivered) = items.split_last().unwrap();
        assert!(last.is_err());

        let delivered: Vec<u8> = delivered.iter().flat_map(|chunk| chunk.as_ref().unwrap().to_vec()).collect();
        assert_eq!(&CONTENT[50..60], &delivered[..]);
    }
}
