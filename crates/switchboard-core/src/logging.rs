//! Asynchronous console logging.
//!
//! Formatted log lines are enqueued onto a bounded channel and written out
//! by a single sink task, so logging callers never wait on stdout. The sink
//! batches up to 100 lines, flushes after 3ms of idleness, and under a log
//! storm discards the queued backlog rather than grow without bound.

use crate::config::LogConfig;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::FmtSubscriber;

/// Handle to the write-behind console sink. Cloning shares the queue.
#[derive(Clone)]
pub struct AsyncConsole {
    tx: mpsc::Sender<Vec<u8>>,
}

impl AsyncConsole {
    /// Sink draining to stdout. Must be called from within a tokio runtime.
    pub fn stdout() -> Self {
        Self::with_writer(tokio::io::stdout())
    }

    /// Sink draining to an arbitrary writer.
    pub fn with_writer<W>(out: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(LogConfig::QUEUE_CAPACITY);
        tokio::spawn(drain(rx, out));
        AsyncConsole { tx }
    }
}

impl<'a> MakeWriter<'a> for AsyncConsole {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> LineWriter {
        LineWriter {
            tx: self.tx.clone(),
        }
    }
}

/// Per-event writer handed to the subscriber; each write is one formatted
/// line.
pub struct LineWriter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl io::Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A full queue drops the line rather than block the caller.
        let _ = self.tx.try_send(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn drain<W: AsyncWrite + Unpin>(mut rx: mpsc::Receiver<Vec<u8>>, mut out: W) {
    let mut batch: Vec<Vec<u8>> = Vec::new();
    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => {
                    batch.push(line);
                    if batch.len() >= LogConfig::BATCH_LINES {
                        write_batch(&mut out, &mut batch).await;
                        discard_backlog(&mut rx, &mut out).await;
                    }
                }
                None => {
                    write_batch(&mut out, &mut batch).await;
                    break;
                }
            },
            _ = tokio::time::sleep(LogConfig::IDLE_FLUSH), if !batch.is_empty() => {
                write_batch(&mut out, &mut batch).await;
            }
        }
    }
}

async fn write_batch<W: AsyncWrite + Unpin>(out: &mut W, batch: &mut Vec<Vec<u8>>) {
    for line in batch.drain(..) {
        let _ = out.write_all(&line).await;
    }
    let _ = out.flush().await;
}

/// Bounds memory during log storms: once a full batch has been written, any
/// backlog beyond the threshold is thrown away after a one-line notice.
async fn discard_backlog<W: AsyncWrite + Unpin>(rx: &mut mpsc::Receiver<Vec<u8>>, out: &mut W) {
    let queued = rx.len();
    if queued <= LogConfig::BACKLOG_DROP_THRESHOLD {
        return;
    }
    let notice = format!("log backlog dropped {} lines\n", queued);
    let _ = out.write_all(notice.as_bytes()).await;
    let _ = out.flush().await;
    for _ in 0..queued {
        if rx.try_recv().is_err() {
            break;
        }
    }
}

/// Install the global subscriber: compact console lines with second
/// resolution timestamps, drained through the async sink. Must be called
/// from within a tokio runtime.
pub fn init(debug: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_timer(ChronoLocal::new(LogConfig::TIMESTAMP_FORMAT.to_owned()))
        .with_target(false)
        .with_writer(AsyncConsole::stdout())
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_single_line_flushes_after_idle() {
        let (sink_end, mut read_end) = tokio::io::duplex(64 * 1024);
        let console = AsyncConsole::with_writer(sink_end);

        let mut writer = console.make_writer();
        writer.write_all(b"hello sink\n").unwrap();

        let mut buf = vec![0u8; 64];
        let n = timeout(Duration::from_secs(1), read_end.read(&mut buf))
            .await
            .expect("sink never flushed")
            .unwrap();
        assert_eq!(&buf[..n], b"hello sink\n");
    }

    #[tokio::test]
    async fn test_full_batch_is_written_out() {
        let (sink_end, mut read_end) = tokio::io::duplex(256 * 1024);
        let console = AsyncConsole::with_writer(sink_end);

        let mut writer = console.make_writer();
        for i in 0..LogConfig::BATCH_LINES {
            writer.write_all(format!("line {}\n", i).as_bytes()).unwrap();
        }

        let mut collected = Vec::new();
        let mut buf = vec![0u8; 4096];
        while collected.iter().filter(|&&b| b == b'\n').count() < LogConfig::BATCH_LINES {
            let n = timeout(Duration::from_secs(2), read_end.read(&mut buf))
                .await
                .expect("sink stalled")
                .unwrap();
            collected.extend_from_slice(&buf[..n]);
        }

        let text = String::from_utf8(collected).unwrap();
        assert!(text.starts_with("line 0\n"));
        assert!(text.contains(&format!("line {}\n", LogConfig::BATCH_LINES - 1)));
    }
}
