//! Length-prefixed packet framing.
//!
//! Every SFTP packet travels as `u32 length | u8 type | payload`, big-endian,
//! where `length` counts the type byte plus the payload. The framing routines
//! below move whole packets between raw byte streams and the in-memory
//! [`Packet`] representation; partial reads are absorbed by always filling
//! the fixed header before sizing the payload buffer.

use bytes::{BufMut, Bytes, BytesMut};
use fxp_platform::{FxpError, FxpResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum accepted payload size for a single packet: 256 KiB.
///
/// A peer announcing a larger frame is treated as a fatal protocol error.
pub const MAX_PAYLOAD: usize = 256 * 1024;

/// A raw framed packet: type byte plus undecoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Wire type byte (SSH_FXP_*)
    pub ty: u8,
    /// Message payload, excluding the type byte
    pub payload: Bytes,
}

impl Packet {
    /// Creates a packet from a type byte and payload.
    pub fn new(ty: u8, payload: Bytes) -> Self {
        Self { ty, payload }
    }

    /// Total size of the packet on the wire, including the length prefix.
    pub fn wire_len(&self) -> usize {
        4 + 1 + self.payload.len()
    }
}

/// Reads one packet from the stream.
///
/// A clean end-of-stream on the length header surfaces as
/// [`FxpError::Closed`] so callers can tell an orderly remote shutdown from
/// a torn frame; end-of-stream anywhere later in the frame is a protocol
/// error.
pub async fn read_packet<R>(reader: &mut R) -> FxpResult<Packet>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut header).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(FxpError::Closed("transport ended".to_string()));
        }
        return Err(FxpError::Io(e));
    }

    let length = u32::from_be_bytes(header) as usize;
    if length == 0 {
        return Err(FxpError::Protocol("zero-length frame".to_string()));
    }
    if length - 1 > MAX_PAYLOAD {
        return Err(FxpError::Protocol(format!(
            "frame of {} bytes exceeds the {} byte limit",
            length, MAX_PAYLOAD
        )));
    }

    let mut ty = [0u8; 1];
    reader.read_exact(&mut ty).await.map_err(truncated)?;

    let mut payload = vec![0u8; length - 1];
    reader.read_exact(&mut payload).await.map_err(truncated)?;

    Ok(Packet::new(ty[0], Bytes::from(payload)))
}

/// Writes one packet to the stream as a single buffered write, then flushes.
///
/// Assembling the frame before writing keeps concurrent packets from
/// interleaving on the wire.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> FxpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(packet.wire_len());
    buf.put_u32((packet.payload.len() + 1) as u32);
    buf.put_u8(packet.ty);
    buf.put_slice(&packet.payload);

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

fn truncated(e: std::io::Error) -> FxpError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FxpError::Protocol("truncated frame".to_string())
    } else {
        FxpError::Io(e)
    }
}
