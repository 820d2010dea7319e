//! SFTP protocol messages and their wire codec.
//!
//! Every message kind from draft-ietf-secsh-filexfer-02 is represented as one
//! arm of [`Message`]; encoding and decoding are match expressions over the
//! tag, so the codec is stateless and reentrant. All non-handshake messages
//! carry a request id immediately after the type byte; Init and Version
//! start directly with the protocol version.
//!
//! Wire strings (paths, handles, status text) are opaque byte vectors: the
//! protocol does not guarantee UTF-8 for filenames, and a decode followed by
//! an encode must reproduce the exact bytes the server sent.

use crate::sftp::packet::Packet;
use crate::sftp::types::{DirEntry, Extension, FileAttributes};
use crate::sftp::wire::{WireReader, WireWriter};
use fxp_platform::{FxpError, FxpResult};

/// SFTP protocol version implemented by this engine (v3).
pub const SFTP_VERSION: u32 = 3;

/// SFTP message type byte (SSH_FXP_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// SSH_FXP_INIT - Begin version handshake
    Init = 1,
    /// SSH_FXP_VERSION - Handshake response
    Version = 2,
    /// SSH_FXP_OPEN - Open file
    Open = 3,
    /// SSH_FXP_CLOSE - Close file/directory handle
    Close = 4,
    /// SSH_FXP_READ - Read from file
    Read = 5,
    /// SSH_FXP_WRITE - Write to file
    Write = 6,
    /// SSH_FXP_LSTAT - Stat without following symlinks
    LStat = 7,
    /// SSH_FXP_FSTAT - Stat an open handle
    FStat = 8,
    /// SSH_FXP_SETSTAT - Set attributes by path
    SetStat = 9,
    /// SSH_FXP_FSETSTAT - Set attributes by handle
    FSetStat = 10,
    /// SSH_FXP_OPENDIR - Open directory
    OpenDir = 11,
    /// SSH_FXP_READDIR - Read directory entries
    ReadDir = 12,
    /// SSH_FXP_REMOVE - Remove file
    Remove = 13,
    /// SSH_FXP_MKDIR - Create directory
    MkDir = 14,
    /// SSH_FXP_RMDIR - Remove directory
    RmDir = 15,
    /// SSH_FXP_REALPATH - Canonicalize path
    RealPath = 16,
    /// SSH_FXP_STAT - Stat following symlinks
    Stat = 17,
    /// SSH_FXP_RENAME - Rename file/directory
    Rename = 18,
    /// SSH_FXP_READLINK - Read symlink target
    ReadLink = 19,
    /// SSH_FXP_SYMLINK - Create symlink
    Symlink = 20,

    /// SSH_FXP_STATUS - Status response
    Status = 101,
    /// SSH_FXP_HANDLE - Handle response
    Handle = 102,
    /// SSH_FXP_DATA - Data response
    Data = 103,
    /// SSH_FXP_NAME - Name-list response
    Name = 104,
    /// SSH_FXP_ATTRS - Attributes response
    Attrs = 105,

    /// SSH_FXP_EXTENDED - Extension request
    Extended = 200,
    /// SSH_FXP_EXTENDED_REPLY - Extension response
    ExtendedReply = 201,
}

impl MessageType {
    /// Convert from the wire type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Init),
            2 => Some(Self::Version),
            3 => Some(Self::Open),
            4 => Some(Self::Close),
            5 => Some(Self::Read),
            6 => Some(Self::Write),
            7 => Some(Self::LStat),
            8 => Some(Self::FStat),
            9 => Some(Self::SetStat),
            10 => Some(Self::FSetStat),
            11 => Some(Self::OpenDir),
            12 => Some(Self::ReadDir),
            13 => Some(Self::Remove),
            14 => Some(Self::MkDir),
            15 => Some(Self::RmDir),
            16 => Some(Self::RealPath),
            17 => Some(Self::Stat),
            18 => Some(Self::Rename),
            19 => Some(Self::ReadLink),
            20 => Some(Self::Symlink),
            101 => Some(Self::Status),
            102 => Some(Self::Handle),
            103 => Some(Self::Data),
            104 => Some(Self::Name),
            105 => Some(Self::Attrs),
            200 => Some(Self::Extended),
            201 => Some(Self::ExtendedReply),
            _ => None,
        }
    }
}

/// A decoded SFTP message.
///
/// Request kinds travel client to server, response kinds the other way; the
/// codec handles both directions so test servers can reuse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Version handshake request.
    Init {
        /// Protocol version the client wants
        version: u32,
        /// Client extension announcements
        extensions: Vec<Extension>,
    },
    /// Version handshake response.
    Version {
        /// Protocol version the server settled on
        version: u32,
        /// Server extension announcements
        extensions: Vec<Extension>,
    },
    /// Open a file.
    Open {
        /// Request id
        id: u32,
        /// Path of the file to open, as opaque bytes
        filename: Vec<u8>,
        /// Bitwise-OR of [`crate::sftp::types::OpenFlags`] values
        pflags: u32,
        /// Initial attributes for created files
        attrs: FileAttributes,
    },
    /// Close a handle.
    Close {
        /// Request id
        id: u32,
        /// Handle to close
        handle: Vec<u8>,
    },
    /// Read a byte range from an open file.
    Read {
        /// Request id
        id: u32,
        /// Open file handle
        handle: Vec<u8>,
        /// Absolute file offset
        offset: u64,
        /// Maximum number of bytes to return
        length: u32,
    },
    /// Write bytes at an offset in an open file.
    Write {
        /// Request id
        id: u32,
        /// Open file handle
        handle: Vec<u8>,
        /// Absolute file offset
        offset: u64,
        /// Bytes to write
        data: Vec<u8>,
    },
    /// Stat a path without following symlinks.
    LStat {
        /// Request id
        id: u32,
        /// Path to stat
        path: Vec<u8>,
    },
    /// Stat an open handle.
    FStat {
        /// Request id
        id: u32,
        /// Open handle
        handle: Vec<u8>,
    },
    /// Set attributes on a path.
    SetStat {
        /// Request id
        id: u32,
        /// Path to modify
        path: Vec<u8>,
        /// Attributes to apply
        attrs: FileAttributes,
    },
    /// Set attributes on an open handle.
    FSetStat {
        /// Request id
        id: u32,
        /// Open handle
        handle: Vec<u8>,
        /// Attributes to apply
        attrs: FileAttributes,
    },
    /// Open a directory for listing.
    OpenDir {
        /// Request id
        id: u32,
        /// Directory path
        path: Vec<u8>,
    },
    /// Fetch the next batch of directory entries.
    ReadDir {
        /// Request id
        id: u32,
        /// Open directory handle
        handle: Vec<u8>,
    },
    /// Remove a file.
    Remove {
        /// Request id
        id: u32,
        /// Path to remove
        path: Vec<u8>,
    },
    /// Create a directory.
    MkDir {
        /// Request id
        id: u32,
        /// Path to create
        path: Vec<u8>,
        /// Attributes for the new directory
        attrs: FileAttributes,
    },
    /// Remove a directory.
    RmDir {
        /// Request id
        id: u32,
        /// Path to remove
        path: Vec<u8>,
    },
    /// Canonicalize a path server-side.
    RealPath {
        /// Request id
        id: u32,
        /// Path to canonicalize
        path: Vec<u8>,
    },
    /// Stat a path following symlinks.
    Stat {
        /// Request id
        id: u32,
        /// Path to stat
        path: Vec<u8>,
    },
    /// Rename a file or directory.
    Rename {
        /// Request id
        id: u32,
        /// Current path
        old_path: Vec<u8>,
        /// New path
        new_path: Vec<u8>,
    },
    /// Read a symlink's target.
    ReadLink {
        /// Request id
        id: u32,
        /// Symlink path
        path: Vec<u8>,
    },
    /// Create a symlink.
    Symlink {
        /// Request id
        id: u32,
        /// Path of the link to create
        link_path: Vec<u8>,
        /// Path the link points at
        target_path: Vec<u8>,
    },
    /// Operation outcome, also used for remote errors.
    Status {
        /// Request id
        id: u32,
        /// SSH_FX_* status code
        code: u32,
        /// Human-readable message, as opaque bytes
        message: Vec<u8>,
        /// Language tag for the message
        language: Vec<u8>,
    },
    /// Handle issued by Open or OpenDir.
    Handle {
        /// Request id
        id: u32,
        /// Opaque handle bytes
        handle: Vec<u8>,
    },
    /// File data returned by Read.
    Data {
        /// Request id
        id: u32,
        /// Bytes read; may be shorter than requested
        data: Vec<u8>,
    },
    /// Directory entries returned by ReadDir, RealPath and ReadLink.
    Name {
        /// Request id
        id: u32,
        /// Entries in server order
        entries: Vec<DirEntry>,
    },
    /// Attributes returned by Stat, LStat and FStat.
    Attrs {
        /// Request id
        id: u32,
        /// Attributes of the target
        attrs: FileAttributes,
    },
}

impl Message {
    /// Returns the wire type for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Init { .. } => MessageType::Init,
            Message::Version { .. } => MessageType::Version,
            Message::Open { .. } => MessageType::Open,
            Message::Close { .. } => MessageType::Close,
            Message::Read { .. } => MessageType::Read,
            Message::Write { .. } => MessageType::Write,
            Message::LStat { .. } => MessageType::LStat,
            Message::FStat { .. } => MessageType::FStat,
            Message::SetStat { .. } => MessageType::SetStat,
            Message::FSetStat { .. } => MessageType::FSetStat,
            Message::OpenDir { .. } => MessageType::OpenDir,
            Message::ReadDir { .. } => MessageType::ReadDir,
            Message::Remove { .. } => MessageType::Remove,
            Message::MkDir { .. } => MessageType::MkDir,
            Message::RmDir { .. } => MessageType::RmDir,
            Message::RealPath { .. } => MessageType::RealPath,
            Message::Stat { .. } => MessageType::Stat,
            Message::Rename { .. } => MessageType::Rename,
            Message::ReadLink { .. } => MessageType::ReadLink,
            Message::Symlink { .. } => MessageType::Symlink,
            Message::Status { .. } => MessageType::Status,
            Message::Handle { .. } => MessageType::Handle,
            Message::Data { .. } => MessageType::Data,
            Message::Name { .. } => MessageType::Name,
            Message::Attrs { .. } => MessageType::Attrs,
        }
    }

    /// Returns the request id, or `None` for the handshake messages.
    pub fn request_id(&self) -> Option<u32> {
        match self {
            Message::Init { .. } | Message::Version { .. } => None,
            Message::Open { id, .. }
            | Message::Close { id, .. }
            | Message::Read { id, .. }
            | Message::Write { id, .. }
            | Message::LStat { id, .. }
            | Message::FStat { id, .. }
            | Message::SetStat { id, .. }
            | Message::FSetStat { id, .. }
            | Message::OpenDir { id, .. }
            | Message::ReadDir { id, .. }
            | Message::Remove { id, .. }
            | Message::MkDir { id, .. }
            | Message::RmDir { id, .. }
            | Message::RealPath { id, .. }
            | Message::Stat { id, .. }
            | Message::Rename { id, .. }
            | Message::ReadLink { id, .. }
            | Message::Symlink { id, .. }
            | Message::Status { id, .. }
            | Message::Handle { id, .. }
            | Message::Data { id, .. }
            | Message::Name { id, .. }
            | Message::Attrs { id, .. } => Some(*id),
        }
    }

    /// Serializes the message into a framed packet payload.
    pub fn encode(&self) -> Packet {
        let mut w = WireWriter::new();

        if let Some(id) = self.request_id() {
            w.u32(id);
        }

        match self {
            Message::Init {
                version,
                extensions,
            }
            | Message::Version {
                version,
                extensions,
            } => {
                w.u32(*version);
                for ext in extensions {
                    w.bytes(&ext.name);
                    w.bytes(&ext.data);
                }
            }
            Message::Open {
                filename,
                pflags,
                attrs,
                ..
            } => {
                w.bytes(filename);
                w.u32(*pflags);
                attrs.write_wire(&mut w);
            }
            Message::Close { handle, .. }
            | Message::FStat { handle, .. }
            | Message::ReadDir { handle, .. } => {
                w.bytes(handle);
            }
            Message::Read {
                handle,
                offset,
                length,
                ..
            } => {
                w.bytes(handle);
                w.u64(*offset);
                w.u32(*length);
            }
            Message::Write {
                handle,
                offset,
                data,
                ..
            } => {
                w.bytes(handle);
                w.u64(*offset);
                w.bytes(data);
            }
            Message::LStat { path, .. }
            | Message::OpenDir { path, .. }
            | Message::Remove { path, .. }
            | Message::RmDir { path, .. }
            | Message::RealPath { path, .. }
            | Message::Stat { path, .. }
            | Message::ReadLink { path, .. } => {
                w.bytes(path);
            }
            Message::SetStat { path, attrs, .. } | Message::MkDir { path, attrs, .. } => {
                w.bytes(path);
                attrs.write_wire(&mut w);
            }
            Message::FSetStat { handle, attrs, .. } => {
                w.bytes(handle);
                attrs.write_wire(&mut w);
            }
            Message::Rename {
                old_path, new_path, ..
            } => {
                w.bytes(old_path);
                w.bytes(new_path);
            }
            Message::Symlink {
                link_path,
                target_path,
                ..
            } => {
                w.bytes(link_path);
                w.bytes(target_path);
            }
            Message::Status {
                code,
                message,
                language,
                ..
            } => {
                w.u32(*code);
                w.bytes(message);
                w.bytes(language);
            }
            Message::Handle { handle, .. } => {
                w.bytes(handle);
            }
            Message::Data { data, .. } => {
                w.bytes(data);
            }
            Message::Name { entries, .. } => {
                w.u32(entries.len() as u32);
                for entry in entries {
                    w.bytes(&entry.filename);
                    w.bytes(&entry.longname);
                    entry.attrs.write_wire(&mut w);
                }
            }
            Message::Attrs { attrs, .. } => {
                attrs.write_wire(&mut w);
            }
        }

        Packet::new(self.message_type() as u8, w.into_bytes())
    }

    /// Parses a framed packet payload into a typed message.
    ///
    /// Trailing bytes after the final field are tolerated; every field read
    /// is bounds-checked against the payload.
    pub fn decode(packet: &Packet) -> FxpResult<Message> {
        let ty = match MessageType::from_u8(packet.ty) {
            Some(ty) => ty,
            None => {
                return Err(FxpError::Protocol(format!(
                    "unknown message type {}",
                    packet.ty
                )))
            }
        };

        let mut r = WireReader::new(&packet.payload);

        let msg = match ty {
            MessageType::Init | MessageType::Version => {
                let version = r.u32("handshake version")?;
                let mut extensions = Vec::new();
                while !r.is_empty() {
                    extensions.push(Extension {
                        name: r.bytes("extension name")?,
                        data: r.bytes("extension data")?,
                    });
                }
                if ty == MessageType::Init {
                    Message::Init {
                        version,
                        extensions,
                    }
                } else {
                    Message::Version {
                        version,
                        extensions,
                    }
                }
            }
            MessageType::Extended | MessageType::ExtendedReply => {
                return Err(FxpError::Protocol(format!(
                    "unsupported extension message (type {})",
                    packet.ty
                )));
            }
            _ => {
                let id = r.u32("request id")?;
                match ty {
                    MessageType::Open => Message::Open {
                        id,
                        filename: r.bytes("filename")?,
                        pflags: r.u32("pflags")?,
                        attrs: FileAttributes::read_wire(&mut r)?,
                    },
                    MessageType::Close => Message::Close {
                        id,
                        handle: r.bytes("handle")?,
                    },
                    MessageType::Read => Message::Read {
                        id,
                        handle: r.bytes("handle")?,
                        offset: r.u64("offset")?,
                        length: r.u32("length")?,
                    },
                    MessageType::Write => Message::Write {
                        id,
                        handle: r.bytes("handle")?,
                        offset: r.u64("offset")?,
                        data: r.bytes("data")?,
                    },
                    MessageType::LStat => Message::LStat {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::FStat => Message::FStat {
                        id,
                        handle: r.bytes("handle")?,
                    },
                    MessageType::SetStat => Message::SetStat {
                        id,
                        path: r.bytes("path")?,
                        attrs: FileAttributes::read_wire(&mut r)?,
                    },
                    MessageType::FSetStat => Message::FSetStat {
                        id,
                        handle: r.bytes("handle")?,
                        attrs: FileAttributes::read_wire(&mut r)?,
                    },
                    MessageType::OpenDir => Message::OpenDir {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::ReadDir => Message::ReadDir {
                        id,
                        handle: r.bytes("handle")?,
                    },
                    MessageType::Remove => Message::Remove {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::MkDir => Message::MkDir {
                        id,
                        path: r.bytes("path")?,
                        attrs: FileAttributes::read_wire(&mut r)?,
                    },
                    MessageType::RmDir => Message::RmDir {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::RealPath => Message::RealPath {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::Stat => Message::Stat {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::Rename => Message::Rename {
                        id,
                        old_path: r.bytes("old path")?,
                        new_path: r.bytes("new path")?,
                    },
                    MessageType::ReadLink => Message::ReadLink {
                        id,
                        path: r.bytes("path")?,
                    },
                    MessageType::Symlink => Message::Symlink {
                        id,
                        link_path: r.bytes("link path")?,
                        target_path: r.bytes("target path")?,
                    },
                    MessageType::Status => Message::Status {
                        id,
                        code: r.u32("status code")?,
                        message: r.bytes("status message")?,
                        language: r.bytes("status language")?,
                    },
                    MessageType::Handle => Message::Handle {
                        id,
                        handle: r.bytes("handle")?,
                    },
                    MessageType::Data => Message::Data {
                        id,
                        data: r.bytes("data")?,
                    },
                    MessageType::Name => {
                        let count = r.u32("name count")?;
                        let mut entries = Vec::with_capacity(count.min(1024) as usize);
                        for _ in 0..count {
                            entries.push(DirEntry {
                                filename: r.bytes("entry filename")?,
                                longname: r.bytes("entry longname")?,
                                attrs: FileAttributes::read_wire(&mut r)?,
                            });
                        }
                        Message::Name { id, entries }
                    }
                    MessageType::Attrs => Message::Attrs {
                        id,
                        attrs: FileAttributes::read_wire(&mut r)?,
                    },
                    // Handshake and extension types are handled above.
                    MessageType::Init
                    | MessageType::Version
                    | MessageType::Extended
                    | MessageType::ExtendedReply => unreachable!(),
                }
            }
        };

        Ok(msg)
    }
}
