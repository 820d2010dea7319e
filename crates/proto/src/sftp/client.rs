//! SFTP client connection and request API.
//!
//! The client owns two byte streams (already authenticated and framed by the
//! SSH layer or a subprocess pipe) and runs three long-lived tasks:
//!
//! - the *reader pump*, draining inbound bytes into a packet channel,
//! - the *writer pump*, draining the outbound packet channel onto the wire,
//! - the *dispatch loop*, decoding inbound packets and handing the resulting
//!   messages to the [`Router`] for delivery to waiting callers.
//!
//! Requests from any number of tasks are multiplexed over the single link;
//! transmission order follows enqueue order, replies are correlated by id.

use crate::sftp::file::{FileReader, FileWriter};
use crate::sftp::message::{Message, SFTP_VERSION};
use crate::sftp::packet::{self, Packet};
use crate::sftp::router::{ResolveError, Router};
use crate::sftp::state::ConnectionState;
use crate::sftp::types::{
    status_error, DirEntry, Extension, FileAttributes, FileHandle, FileMode, OpenFlags, StatusCode,
};
use fxp_platform::{FxpError, FxpResult};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

/// Default depth of the inbound and outbound packet channels.
pub const DEFAULT_CHANNEL_DEPTH: usize = 64;

/// Default chunk size for the streaming file adapters: 32 KiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 32 * 1024;

/// Default in-memory pipe capacity for the streaming file adapters: 64 KiB.
pub const DEFAULT_PIPE_BUFFER: usize = 64 * 1024;

/// Tuning knobs for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound of the packet channels; sending suspends when full.
    pub channel_depth: usize,
    /// Bytes requested per Read / written per Write by the file adapters.
    pub chunk_size: u32,
    /// Capacity of the byte pipe between a file adapter and its caller.
    pub pipe_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel_depth: DEFAULT_CHANNEL_DEPTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pipe_buffer: DEFAULT_PIPE_BUFFER,
        }
    }
}

struct Shared {
    router: Router,
    outbound: Mutex<Option<mpsc::Sender<Packet>>>,
    state: Mutex<ConnectionState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    reader_abort: AbortHandle,
    version: u32,
    extensions: Vec<Extension>,
    config: ClientConfig,
}

/// Handle to an SFTP connection.
///
/// Cloning is cheap and all clones drive the same connection, so the client
/// can be handed to any number of concurrent tasks.
#[derive(Clone)]
pub struct SftpClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SftpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpClient").finish()
    }
}

/// Connects an SFTP client over the given byte streams.
///
/// Equivalent to [`SftpClient::new`].
pub async fn new_client<R, W>(reader: R, writer: W) -> FxpResult<SftpClient>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    SftpClient::new(reader, writer).await
}

impl SftpClient {
    /// Connects over the given byte streams with default configuration.
    ///
    /// The streams must already carry raw SFTP packets: either the payload
    /// side of an SSH "sftp" subsystem channel, or the stdio of a spawned
    /// `sftp-server` process. The version handshake runs to completion
    /// before this returns; on failure both pumps are torn down and no
    /// client value escapes.
    pub async fn new<R, W>(reader: R, writer: W) -> FxpResult<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_config(reader, writer, ClientConfig::default()).await
    }

    /// Connects with explicit configuration.
    pub async fn with_config<R, W>(reader: R, writer: W, config: ClientConfig) -> FxpResult<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(config.channel_depth);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.channel_depth);
        let (status_tx, status_rx) = mpsc::channel(2);

        let reader_task = tokio::spawn(reader_pump(reader, inbound_tx, status_tx.clone()));
        let writer_task = tokio::spawn(writer_pump(writer, outbound_rx, status_tx));
        let reader_abort = reader_task.abort_handle();

        let (version, extensions) = match handshake(&outbound_tx, &mut inbound_rx).await {
            Ok(negotiated) => negotiated,
            Err(e) => {
                error!("SFTP handshake failed: {}", e);
                // Closing the outbound channel stops the writer; the reader
                // is parked on a read and has to be cancelled.
                drop(outbound_tx);
                reader_task.abort();
                let _ = writer_task.await;
                let _ = reader_task.await;
                return Err(e);
            }
        };

        info!(version, "SFTP handshake complete");

        let mut state = ConnectionState::Connecting;
        state.transition(ConnectionState::Active { version })?;

        let shared = Arc::new(Shared {
            router: Router::new(),
            outbound: Mutex::new(Some(outbound_tx)),
            state: Mutex::new(state),
            tasks: Mutex::new(vec![reader_task, writer_task]),
            reader_abort,
            version,
            extensions,
            config,
        });

        let dispatch = tokio::spawn(dispatch_loop(Arc::clone(&shared), inbound_rx, status_rx));
        shared.tasks.lock().await.push(dispatch);

        Ok(Self { shared })
    }

    /// Negotiated protocol version; always 3.
    pub fn version(&self) -> u32 {
        self.shared.version
    }

    /// Extension pairs announced by the server during the handshake.
    pub fn extensions(&self) -> &[Extension] {
        &self.shared.extensions
    }

    /// Opens a directory and returns its handle.
    ///
    /// Paths are opaque bytes on the wire; anything `AsRef<[u8]>` works,
    /// including `&str` and the `filename` of a listed [`DirEntry`].
    pub async fn open_dir(&self, path: impl AsRef<[u8]>) -> FxpResult<FileHandle> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::OpenDir { id, path }).await?;
        expect_handle(reply, "open_dir")
    }

    /// Fetches the next batch of entries from an open directory handle.
    ///
    /// The server signals the end of the listing with a Status(EOF) reply,
    /// surfaced here as a [`FxpError::Remote`] carrying the EOF code; see
    /// [`SftpClient::list`] for the aggregated variant.
    pub async fn read_dir(&self, handle: &FileHandle) -> FxpResult<Vec<DirEntry>> {
        let handle = handle.as_bytes().to_vec();
        let reply = self.rpc(|id| Message::ReadDir { id, handle }).await?;
        expect_name(reply, "read_dir")
    }

    /// Closes a file or directory handle.
    pub async fn close(&self, handle: &FileHandle) -> FxpResult<()> {
        let handle = handle.as_bytes().to_vec();
        let reply = self.rpc(|id| Message::Close { id, handle }).await?;
        expect_status_ok(reply, "close")
    }

    /// Lists a directory: OpenDir, ReadDir until EOF, Close.
    ///
    /// The directory handle is closed on the error path as well.
    pub async fn list(&self, path: impl AsRef<[u8]>) -> FxpResult<Vec<DirEntry>> {
        let handle = self.open_dir(path).await?;

        let mut entries = Vec::new();
        let outcome = loop {
            match self.read_dir(&handle).await {
                Ok(batch) => entries.extend(batch),
                Err(e) if e.remote_code() == Some(StatusCode::Eof as u32) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        let close_outcome = self.close(&handle).await;
        outcome?;
        close_outcome?;

        Ok(entries)
    }

    /// Opens a file and returns its handle.
    ///
    /// `flags` is a bitwise-OR of [`OpenFlags`] values; `attrs` supplies
    /// initial attributes when the open may create the file.
    pub async fn open(
        &self,
        path: impl AsRef<[u8]>,
        flags: u32,
        attrs: Option<FileAttributes>,
    ) -> FxpResult<FileHandle> {
        let filename = path.as_ref().to_vec();
        let attrs = attrs.unwrap_or_default();
        let reply = self
            .rpc(|id| Message::Open {
                id,
                filename,
                pflags: flags,
                attrs,
            })
            .await?;
        expect_handle(reply, "open")
    }

    /// Reads up to `length` bytes starting at `offset`.
    ///
    /// Short reads are normal and not an error; end of file is reported as
    /// a [`FxpError::Remote`] with the EOF status code.
    pub async fn read(&self, handle: &FileHandle, offset: u64, length: u32) -> FxpResult<Vec<u8>> {
        let handle = handle.as_bytes().to_vec();
        let reply = self
            .rpc(|id| Message::Read {
                id,
                handle,
                offset,
                length,
            })
            .await?;
        expect_data(reply, "read")
    }

    /// Writes `data` at `offset`.
    pub async fn write(&self, handle: &FileHandle, offset: u64, data: &[u8]) -> FxpResult<()> {
        let handle = handle.as_bytes().to_vec();
        let data = data.to_vec();
        let reply = self
            .rpc(|id| Message::Write {
                id,
                handle,
                offset,
                data,
            })
            .await?;
        expect_status_ok(reply, "write")
    }

    /// Removes a file.
    pub async fn remove(&self, path: impl AsRef<[u8]>) -> FxpResult<()> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::Remove { id, path }).await?;
        expect_status_ok(reply, "remove")
    }

    /// Renames a file or directory.
    pub async fn rename(
        &self,
        old_path: impl AsRef<[u8]>,
        new_path: impl AsRef<[u8]>,
    ) -> FxpResult<()> {
        let old_path = old_path.as_ref().to_vec();
        let new_path = new_path.as_ref().to_vec();
        let reply = self
            .rpc(|id| Message::Rename {
                id,
                old_path,
                new_path,
            })
            .await?;
        expect_status_ok(reply, "rename")
    }

    /// Creates a directory.
    pub async fn mkdir(
        &self,
        path: impl AsRef<[u8]>,
        attrs: Option<FileAttributes>,
    ) -> FxpResult<()> {
        let path = path.as_ref().to_vec();
        let attrs = attrs.unwrap_or_default();
        let reply = self.rpc(|id| Message::MkDir { id, path, attrs }).await?;
        expect_status_ok(reply, "mkdir")
    }

    /// Removes a directory.
    pub async fn rmdir(&self, path: impl AsRef<[u8]>) -> FxpResult<()> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::RmDir { id, path }).await?;
        expect_status_ok(reply, "rmdir")
    }

    /// Stats a path, following symlinks.
    pub async fn stat(&self, path: impl AsRef<[u8]>) -> FxpResult<FileAttributes> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::Stat { id, path }).await?;
        expect_attrs(reply, "stat")
    }

    /// Stats a path without following symlinks.
    pub async fn lstat(&self, path: impl AsRef<[u8]>) -> FxpResult<FileAttributes> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::LStat { id, path }).await?;
        expect_attrs(reply, "lstat")
    }

    /// Stats an open handle.
    pub async fn fstat(&self, handle: &FileHandle) -> FxpResult<FileAttributes> {
        let handle = handle.as_bytes().to_vec();
        let reply = self.rpc(|id| Message::FStat { id, handle }).await?;
        expect_attrs(reply, "fstat")
    }

    /// Sets attributes on a path.
    pub async fn set_stat(&self, path: impl AsRef<[u8]>, attrs: FileAttributes) -> FxpResult<()> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::SetStat { id, path, attrs }).await?;
        expect_status_ok(reply, "set_stat")
    }

    /// Sets attributes on an open handle.
    pub async fn fset_stat(&self, handle: &FileHandle, attrs: FileAttributes) -> FxpResult<()> {
        let handle = handle.as_bytes().to_vec();
        let reply = self
            .rpc(|id| Message::FSetStat { id, handle, attrs })
            .await?;
        expect_status_ok(reply, "fset_stat")
    }

    /// Canonicalizes a path server-side.
    ///
    /// Returns the canonical path as opaque bytes, exactly as the server
    /// reported it.
    pub async fn real_path(&self, path: impl AsRef<[u8]>) -> FxpResult<Vec<u8>> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::RealPath { id, path }).await?;
        expect_single_name(reply, "real_path")
    }

    /// Reads the target of a symlink, as opaque bytes.
    pub async fn read_link(&self, path: impl AsRef<[u8]>) -> FxpResult<Vec<u8>> {
        let path = path.as_ref().to_vec();
        let reply = self.rpc(|id| Message::ReadLink { id, path }).await?;
        expect_single_name(reply, "read_link")
    }

    /// Creates a symlink at `link_path` pointing at `target_path`.
    pub async fn symlink(
        &self,
        link_path: impl AsRef<[u8]>,
        target_path: impl AsRef<[u8]>,
    ) -> FxpResult<()> {
        let link_path = link_path.as_ref().to_vec();
        let target_path = target_path.as_ref().to_vec();
        let reply = self
            .rpc(|id| Message::Symlink {
                id,
                link_path,
                target_path,
            })
            .await?;
        expect_status_ok(reply, "symlink")
    }

    /// Opens a file for streamed reading.
    ///
    /// A background task issues sequential Read requests and feeds the
    /// returned [`FileReader`]; the remote handle is closed when the stream
    /// ends, errors, or the reader is dropped.
    pub async fn file_reader(&self, path: impl AsRef<[u8]>) -> FxpResult<FileReader> {
        let handle = self.open(path, OpenFlags::READ, None).await?;
        Ok(FileReader::spawn(
            self.clone(),
            handle,
            self.shared.config.chunk_size,
        ))
    }

    /// Opens a file for streamed writing, creating or truncating it.
    ///
    /// Bytes written to the returned [`FileWriter`] are forwarded as
    /// sequential Write requests by a background task. Call
    /// [`FileWriter::finish`] to flush and observe the final status.
    pub async fn file_writer(&self, path: impl AsRef<[u8]>) -> FxpResult<FileWriter> {
        let handle = self
            .open(
                path,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
                Some(FileAttributes::with_permissions(FileMode::DEFAULT_FILE)),
            )
            .await?;
        Ok(FileWriter::spawn(
            self.clone(),
            handle,
            self.shared.config.chunk_size as usize,
            self.shared.config.pipe_buffer,
        ))
    }

    /// Shuts the connection down and releases every pending caller.
    ///
    /// Safe to call more than once.
    pub async fn close_connection(&self) -> FxpResult<()> {
        info!("closing SFTP connection");

        {
            let mut state = self.shared.state.lock().await;
            if let Err(e) = state.transition(ConnectionState::Closing) {
                debug!("close after shutdown: {}", e);
            }
        }

        // Closing the outbound channel lets the writer drain and exit;
        // the reader is parked on a read and has to be cancelled.
        self.shared.outbound.lock().await.take();
        self.shared.reader_abort.abort();
        self.shared.router.shutdown("connection closed").await;

        self.wait().await
    }

    /// Waits for all connection tasks to finish.
    ///
    /// Reports the connection's fatal error, if it died on one. Subsequent
    /// calls return immediately.
    pub async fn wait(&self) -> FxpResult<()> {
        let handles: Vec<_> = {
            let mut tasks = self.shared.tasks.lock().await;
            tasks.drain(..).collect()
        };

        for handle in handles {
            // Cancelled tasks surface as JoinErrors; that is expected for
            // the aborted reader pump.
            let _ = handle.await;
        }

        let state = self.shared.state.lock().await;
        match state.error() {
            Some(cause) => Err(FxpError::Closed(cause.to_string())),
            None => Ok(()),
        }
    }

    /// Number of requests currently awaiting a reply.
    pub async fn pending_requests(&self) -> usize {
        self.shared.router.pending().await
    }

    /// Sends one request and awaits its reply.
    async fn rpc(&self, build: impl FnOnce(u32) -> Message) -> FxpResult<Message> {
        {
            let state = self.shared.state.lock().await;
            if !state.is_active() {
                return Err(FxpError::Closed(
                    state
                        .error()
                        .unwrap_or("connection is shut down")
                        .to_string(),
                ));
            }
        }

        let (id, reply) = self.shared.router.reserve().await;
        let message = build(id);
        debug!(id, kind = ?message.message_type(), "sending request");

        if let Err(e) = self.send_packet(message.encode()).await {
            self.shared.router.forget(id).await;
            return Err(e);
        }

        match reply.await {
            Ok(outcome) => outcome,
            Err(_) => Err(FxpError::Closed(
                "connection closed while awaiting reply".to_string(),
            )),
        }
    }

    async fn send_packet(&self, packet: Packet) -> FxpResult<()> {
        let tx = {
            let outbound = self.shared.outbound.lock().await;
            match outbound.as_ref() {
                Some(tx) => tx.clone(),
                None => return Err(FxpError::Closed("connection is shut down".to_string())),
            }
        };

        tx.send(packet)
            .await
            .map_err(|_| FxpError::Closed("writer pump stopped".to_string()))
    }
}

/// Sends Init and validates the Version reply.
///
/// The protocol says to settle on the lower of the two versions; this engine
/// requires exactly version 3 and rejects anything else, which is stricter
/// but predictable against the servers it targets.
async fn handshake(
    outbound: &mpsc::Sender<Packet>,
    inbound: &mut mpsc::Receiver<Packet>,
) -> FxpResult<(u32, Vec<Extension>)> {
    let init = Message::Init {
        version: SFTP_VERSION,
        extensions: Vec::new(),
    };
    outbound
        .send(init.encode())
        .await
        .map_err(|_| FxpError::Handshake("writer stopped before handshake".to_string()))?;

    let packet = inbound
        .recv()
        .await
        .ok_or_else(|| FxpError::Handshake("transport closed during handshake".to_string()))?;

    let message = Message::decode(&packet)
        .map_err(|e| FxpError::Handshake(format!("invalid packet during handshake: {}", e)))?;

    match message {
        Message::Version {
            version,
            extensions,
        } => {
            if version != SFTP_VERSION {
                return Err(FxpError::Handshake(format!(
                    "unsupported version {} (requested {})",
                    version, SFTP_VERSION
                )));
            }
            Ok((version, extensions))
        }
        other => Err(FxpError::Handshake(format!(
            "expected version message, got {:?}",
            other.message_type()
        ))),
    }
}

/// Drains inbound bytes into the packet channel until the transport ends.
async fn reader_pump<R>(
    mut reader: R,
    inbound: mpsc::Sender<Packet>,
    status: mpsc::Sender<FxpResult<()>>,
) where
    R: AsyncRead + Unpin,
{
    let outcome = loop {
        match packet::read_packet(&mut reader).await {
            Ok(packet) => {
                if inbound.send(packet).await.is_err() {
                    // dispatch loop has gone away
                    break Ok(());
                }
            }
            Err(e) => break Err(e),
        }
    };

    match &outcome {
        Ok(()) => info!("SFTP reader pump exited"),
        Err(e) => info!("SFTP reader pump exited: {}", e),
    }

    let _ = status.send(outcome).await;
}

/// Drains the outbound packet channel onto the wire.
///
/// Exits when the channel is closed (normal shutdown) or on a write error.
async fn writer_pump<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Packet>,
    status: mpsc::Sender<FxpResult<()>>,
) where
    W: AsyncWrite + Unpin,
{
    let outcome = loop {
        match outbound.recv().await {
            Some(packet) => {
                if let Err(e) = packet::write_packet(&mut writer, &packet).await {
                    break Err(e);
                }
            }
            None => break Ok(()),
        }
    };

    let _ = writer.shutdown().await;

    match &outcome {
        Ok(()) => info!("SFTP writer pump exited"),
        Err(e) => info!("SFTP writer pump exited: {}", e),
    }

    let _ = status.send(outcome).await;
}

/// Decodes inbound packets and routes replies until a pump reports its end.
async fn dispatch_loop(
    shared: Arc<Shared>,
    mut inbound: mpsc::Receiver<Packet>,
    mut status: mpsc::Receiver<FxpResult<()>>,
) {
    let cause: Option<FxpError> = loop {
        tokio::select! {
            packet = inbound.recv() => match packet {
                Some(packet) => match Message::decode(&packet) {
                    Ok(message) => match shared.router.resolve(message).await {
                        Ok(()) => {}
                        // An orphan reply is logged and dropped; the
                        // connection stays up.
                        Err(ResolveError::Orphan(id)) => {
                            warn!(id, "dropping reply for unknown request");
                        }
                        // A reply with no id at all is a protocol
                        // violation, fatal like any other decode failure.
                        Err(e @ ResolveError::MissingId(_)) => {
                            let e = FxpError::Protocol(e.to_string());
                            error!("protocol violation: {}", e);
                            break Some(e);
                        }
                    },
                    Err(e) => {
                        error!("failed to decode inbound packet: {}", e);
                        break Some(e);
                    }
                },
                None => {
                    // Reader pump gone; pick up its terminal status if it
                    // beat us to the channel.
                    match status.try_recv() {
                        Ok(Err(e)) => break Some(e),
                        _ => break None,
                    }
                }
            },
            terminal = status.recv() => match terminal {
                Some(Ok(())) => break None,
                Some(Err(e)) => break Some(e),
                None => break None,
            },
        }
    };

    let cause_text = cause.as_ref().map(|e| e.to_string());
    if let Some(text) = &cause_text {
        error!("SFTP connection failed: {}", text);
    } else {
        info!("SFTP dispatch loop exited");
    }

    // Stop accepting requests, stop the writer, release every waiter.
    {
        let mut state = shared.state.lock().await;
        if let Err(e) = state.transition(ConnectionState::Closed {
            error: cause_text.clone(),
        }) {
            debug!("dispatch teardown: {}", e);
        }
    }
    shared.outbound.lock().await.take();
    shared
        .router
        .shutdown(cause_text.as_deref().unwrap_or("connection closed"))
        .await;
}

fn expect_status_ok(reply: Message, op: &str) -> FxpResult<()> {
    match reply {
        Message::Status { code, message, .. } => {
            if code == StatusCode::Ok as u32 {
                Ok(())
            } else {
                Err(status_error(code, message))
            }
        }
        other => Err(FxpError::Protocol(format!(
            "{}: unexpected reply {:?}",
            op,
            other.message_type()
        ))),
    }
}

fn expect_handle(reply: Message, op: &str) -> FxpResult<FileHandle> {
    match reply {
        Message::Handle { handle, .. } => Ok(FileHandle::new(handle)),
        Message::Status { code, message, .. } if code != StatusCode::Ok as u32 => {
            Err(status_error(code, message))
        }
        other => Err(FxpError::Protocol(format!(
            "{}: unexpected reply {:?}",
            op,
            other.message_type()
        ))),
    }
}

fn expect_data(reply: Message, op: &str) -> FxpResult<Vec<u8>> {
    match reply {
        Message::Data { data, .. } => Ok(data),
        Message::Status { code, message, .. } if code != StatusCode::Ok as u32 => {
            Err(status_error(code, message))
        }
        other => Err(FxpError::Protocol(format!(
            "{}: unexpected reply {:?}",
            op,
            other.message_type()
        ))),
    }
}

fn expect_name(reply: Message, op: &str) -> FxpResult<Vec<DirEntry>> {
    match reply {
        Message::Name { entries, .. } => Ok(entries),
        Message::Status { code, message, .. } if code != StatusCode::Ok as u32 => {
            Err(status_error(code, message))
        }
        other => Err(FxpError::Protocol(format!(
            "{}: unexpected reply {:?}",
            op,
            other.message_type()
        ))),
    }
}

fn expect_single_name(reply: Message, op: &str) -> FxpResult<Vec<u8>> {
    let mut entries = expect_name(reply, op)?;
    if entries.is_empty() {
        return Err(FxpError::Protocol(format!("{}: empty name reply", op)));
    }
    Ok(entries.remove(0).filename)
}

fn expect_attrs(reply: Message, op: &str) -> FxpResult<FileAttributes> {
    match reply {
        Message::Attrs { attrs, .. } => Ok(attrs),
        Message::Status { code, message, .. } if code != StatusCode::Ok as u32 => {
            Err(status_error(code, message))
        }
        other => Err(FxpError::Protocol(format!(
            "{}: unexpected reply {:?}",
            op,
            other.message_type()
        ))),
    }
}
