//! Streamed file transfer adapters.
//!
//! SFTP is request/response: every Read and Write names an explicit offset.
//! These adapters recover ordinary sequential byte-stream I/O by pairing an
//! in-memory pipe with a background task that issues chunked requests and
//! tracks the running offset. The pipe gives natural back-pressure in both
//! directions: a slow consumer stalls the download task, a full upload pipe
//! stalls the producer.

use crate::sftp::client::SftpClient;
use crate::sftp::types::{FileHandle, StatusCode};
use bytes::{Buf, Bytes};
use fxp_platform::{FxpError, FxpResult};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Streamed reader over a remote file.
///
/// Returned by [`SftpClient::file_reader`]. A background task issues
/// sequential Read requests, advancing the offset by the bytes actually
/// returned, and closes the remote handle on every exit path: end of file,
/// a remote error, or the reader being dropped.
///
/// A Status(EOF) from the server ends the stream cleanly; any other failure
/// surfaces as an error from `poll_read`.
pub struct FileReader {
    chunks: mpsc::Receiver<std::io::Result<Bytes>>,
    current: Option<Bytes>,
}

impl FileReader {
    pub(crate) fn spawn(client: SftpClient, handle: FileHandle, chunk_size: u32) -> Self {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(fetch(client, handle, chunk_size, tx));
        Self {
            chunks: rx,
            current: None,
        }
    }
}

/// Issues sequential Read requests and feeds the chunk pipe.
async fn fetch(
    client: SftpClient,
    handle: FileHandle,
    chunk_size: u32,
    tx: mpsc::Sender<std::io::Result<Bytes>>,
) {
    let mut offset = 0u64;

    loop {
        match client.read(&handle, offset, chunk_size).await {
            Ok(data) => {
                if data.is_empty() {
                    break;
                }
                offset += data.len() as u64;
                if tx.send(Ok(Bytes::from(data))).await.is_err() {
                    debug!("download consumer went away, aborting fetch");
                    break;
                }
            }
            Err(e) if e.remote_code() == Some(StatusCode::Eof as u32) => break,
            Err(e) => {
                let _ = tx.send(Err(std::io::Error::other(e))).await;
                break;
            }
        }
    }

    if let Err(e) = client.close(&handle).await {
        warn!("failed to close remote read handle: {}", e);
    }
}

impl AsyncRead for FileReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = this.current.as_mut() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                chunk.advance(n);
                if chunk.is_empty() {
                    this.current = None;
                }
                return Poll::Ready(Ok(()));
            }

            match this.chunks.poll_recv(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    if !chunk.is_empty() {
                        this.current = Some(chunk);
                    }
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Err(e)),
                // producer finished: clean end of stream
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Streamed writer over a remote file.
///
/// Returned by [`SftpClient::file_writer`]. Bytes written here land in an
/// in-memory pipe; a background task drains it in chunks, issuing a Write
/// for exactly the bytes it pulled each time and advancing the offset by
/// that amount. The remote handle is closed when the pipe reaches end of
/// input or a request fails.
///
/// Dropping the writer closes the pipe and lets the upload finish in the
/// background; call [`FileWriter::finish`] instead to observe the outcome.
pub struct FileWriter {
    pipe: DuplexStream,
    task: Option<JoinHandle<FxpResult<u64>>>,
}

impl FileWriter {
    pub(crate) fn spawn(
        client: SftpClient,
        handle: FileHandle,
        chunk_size: usize,
        pipe_buffer: usize,
    ) -> Self {
        let (near, far) = tokio::io::duplex(pipe_buffer);
        let task = tokio::spawn(store(client, handle, chunk_size, far));
        Self {
            pipe: near,
            task: Some(task),
        }
    }

    /// Flushes remaining bytes, closes the remote handle and returns the
    /// total number of bytes written.
    pub async fn finish(mut self) -> FxpResult<u64> {
        use tokio::io::AsyncWriteExt;

        self.pipe.shutdown().await.map_err(FxpError::Io)?;

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| FxpError::Closed(format!("upload task failed: {}", e)))?,
            None => Ok(0),
        }
    }
}

/// Drains the byte pipe into sequential Write requests.
async fn store(
    client: SftpClient,
    handle: FileHandle,
    chunk_size: usize,
    mut pipe: DuplexStream,
) -> FxpResult<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut offset = 0u64;

    let outcome = loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break Ok(()),
            Ok(n) => {
                // only the bytes actually pulled from the pipe are written
                if let Err(e) = client.write(&handle, offset, &buf[..n]).await {
                    break Err(e);
                }
                offset += n as u64;
            }
            Err(e) => break Err(FxpError::Io(e)),
        }
    };

    // Dropping our pipe end makes further caller writes fail fast.
    drop(pipe);

    let close_outcome = client.close(&handle).await;
    outcome?;
    close_outcome?;

    Ok(offset)
}

impl AsyncWrite for FileWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().pipe).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().pipe).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().pipe).poll_shutdown(cx)
    }
}
