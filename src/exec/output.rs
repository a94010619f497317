// src/exec/output.rs

//! Tee for child output: every chunk read from the child's pipe is written
//! straight through to a sink (our own stdout/stderr) and also kept in an
//! in-memory buffer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

const CHUNK_SIZE: usize = 8 * 1024;

/// Copy `reader` to `sink` until EOF, returning the captured bytes.
///
/// - Forwarding is best effort: the first write error disables the sink for
///   the rest of the stream, but capture carries on.
/// - At most `limit` bytes are retained; older output is dropped first.
/// - A read error ends the stream like EOF.
pub async fn forward_stream<R, W>(
    mut reader: R,
    mut sink: Option<W>,
    limit: usize,
    label: &'static str,
    run_id: u64,
) -> Vec<u8>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                debug!(run_id, stream = label, error = %err, "read from child failed");
                break;
            }
        };

        if let Some(out) = sink.as_mut() {
            let written = async {
                out.write_all(&chunk[..n]).await?;
                out.flush().await
            }
            .await;
            if let Err(err) = written {
                debug!(run_id, stream = label, error = %err, "forwarding disabled after write error");
                sink = None;
            }
        }

        push_tail(&mut captured, &chunk[..n], limit);
    }

    trace!(run_id, stream = label, bytes = captured.len(), "stream drained");
    captured
}

fn push_tail(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) {
    buf.extend_from_slice(chunk);
    if buf.len() > limit {
        let excess = buf.len() - limit;
        buf.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    /// Sink that rejects every write.
    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn forwards_and_captures() {
        let mut sink: Vec<u8> = Vec::new();
        let captured =
            forward_stream(&b"hello\nworld\n"[..], Some(&mut sink), 1024, "stdout", 1).await;

        assert_eq!(captured, b"hello\nworld\n");
        assert_eq!(sink, b"hello\nworld\n");
    }

    #[tokio::test]
    async fn capture_survives_sink_failure() {
        let captured = forward_stream(&b"still here"[..], Some(BrokenPipe), 1024, "stderr", 1).await;
        assert_eq!(captured, b"still here");
    }

    #[tokio::test]
    async fn capture_without_sink() {
        let captured = forward_stream(&b"quiet"[..], None::<Vec<u8>>, 1024, "stdout", 1).await;
        assert_eq!(captured, b"quiet");
    }

    #[test]
    fn keeps_only_the_most_recent_bytes() {
        let mut buf = Vec::new();
        push_tail(&mut buf, b"abcdef", 4);
        assert_eq!(buf, b"cdef");
        push_tail(&mut buf, b"gh", 4);
        assert_eq!(buf, b"efgh");
    }
}
