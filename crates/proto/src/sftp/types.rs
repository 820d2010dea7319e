//! SFTP data types and structures.

use crate::sftp::wire::{WireReader, WireWriter};
use fxp_platform::{FxpError, FxpResult};

/// SFTP status codes (SSH_FX_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusCode {
    /// SSH_FX_OK - Success
    Ok = 0,
    /// SSH_FX_EOF - End of file
    Eof = 1,
    /// SSH_FX_NO_SUCH_FILE - No such file
    NoSuchFile = 2,
    /// SSH_FX_PERMISSION_DENIED - Permission denied
    PermissionDenied = 3,
    /// SSH_FX_FAILURE - General failure
    Failure = 4,
    /// SSH_FX_BAD_MESSAGE - Bad message
    BadMessage = 5,
    /// SSH_FX_NO_CONNECTION - No connection
    NoConnection = 6,
    /// SSH_FX_CONNECTION_LOST - Connection lost
    ConnectionLost = 7,
    /// SSH_FX_OP_UNSUPPORTED - Operation not supported
    OpUnsupported = 8,
}

impl StatusCode {
    /// Convert from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Eof),
            2 => Some(Self::NoSuchFile),
            3 => Some(Self::PermissionDenied),
            4 => Some(Self::Failure),
            5 => Some(Self::BadMessage),
            6 => Some(Self::NoConnection),
            7 => Some(Self::ConnectionLost),
            8 => Some(Self::OpUnsupported),
            _ => None,
        }
    }

    /// Canonical description for the status code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ok => "Success",
            Self::Eof => "End of file",
            Self::NoSuchFile => "No such file or directory",
            Self::PermissionDenied => "Permission denied",
            Self::Failure => "Failure",
            Self::BadMessage => "Bad message",
            Self::NoConnection => "No connection",
            Self::ConnectionLost => "Connection lost",
            Self::OpUnsupported => "Operation not supported",
        }
    }
}

/// File open flags (SSH_FXF_*), bitwise-ORed together.
#[derive(Debug, Clone, Copy)]
pub struct OpenFlags;

impl OpenFlags {
    /// SSH_FXF_READ - Open for reading
    pub const READ: u32 = 0x00000001;
    /// SSH_FXF_WRITE - Open for writing
    pub const WRITE: u32 = 0x00000002;
    /// SSH_FXF_APPEND - Force writes to append
    pub const APPEND: u32 = 0x00000004;
    /// SSH_FXF_CREAT - Create if the file doesn't exist
    pub const CREATE: u32 = 0x00000008;
    /// SSH_FXF_TRUNC - Truncate to zero length
    pub const TRUNCATE: u32 = 0x00000010;
    /// SSH_FXF_EXCL - Fail if the file already exists
    pub const EXCL: u32 = 0x00000020;
}

/// File attribute validity flags (SSH_FILEXFER_ATTR_*).
#[derive(Debug, Clone, Copy)]
pub struct AttrFlags;

impl AttrFlags {
    /// SSH_FILEXFER_ATTR_SIZE
    pub const SIZE: u32 = 0x00000001;
    /// SSH_FILEXFER_ATTR_UIDGID
    pub const UIDGID: u32 = 0x00000002;
    /// SSH_FILEXFER_ATTR_PERMISSIONS
    pub const PERMISSIONS: u32 = 0x00000004;
    /// SSH_FILEXFER_ATTR_ACMODTIME
    pub const ACMODTIME: u32 = 0x00000008;
    /// SSH_FILEXFER_ATTR_EXTENDED
    pub const EXTENDED: u32 = 0x80000000;
}

/// Common permission values.
#[derive(Debug, Clone, Copy)]
pub struct FileMode;

impl FileMode {
    /// Default file permissions (0644 = rw-r--r--)
    pub const DEFAULT_FILE: u32 = 0o644;
    /// Default directory permissions (0755 = rwxr-xr-x)
    pub const DEFAULT_DIR: u32 = 0o755;
}

/// An extension pair carried by Init and Version messages.
///
/// The engine parses these but attaches no meaning to them; they are exposed
/// verbatim so callers can probe for server capabilities. Like every string
/// on the wire the fields are opaque bytes, though extension names are ASCII
/// identifiers in practice (e.g. "posix-rename@openssh.com").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extension {
    /// Extension name
    pub name: Vec<u8>,
    /// Extension data, usually a version string
    pub data: Vec<u8>,
}

/// File attributes embedded in Open, MkDir, SetStat, Name and Attrs messages.
///
/// The `flags` word declares which fields carry meaningful values. On the
/// wire every field is emitted unconditionally, with `flags` indicating
/// validity; peers in the wild accept this layout and the engine keeps it
/// for compatibility, including the trailing extension count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    /// Bitmask of [`AttrFlags`] values declaring valid fields
    pub flags: u32,
    /// File size in bytes
    pub size: u64,
    /// Owner user ID
    pub uid: u32,
    /// Owner group ID
    pub gid: u32,
    /// POSIX permission bits, including the file-type nibble
    pub permissions: u32,
    /// Access time (Unix timestamp)
    pub atime: u32,
    /// Modification time (Unix timestamp)
    pub mtime: u32,
    /// Extension pairs (rarely used)
    pub extended: Vec<Extension>,
}

impl FileAttributes {
    /// Creates empty attributes with no valid fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates attributes declaring only a permission value.
    pub fn with_permissions(mode: u32) -> Self {
        Self {
            flags: AttrFlags::PERMISSIONS,
            permissions: mode,
            ..Self::default()
        }
    }

    pub(crate) fn write_wire(&self, w: &mut WireWriter) {
        w.u32(self.flags);
        w.u64(self.size);
        w.u32(self.uid);
        w.u32(self.gid);
        w.u32(self.permissions);
        w.u32(self.atime);
        w.u32(self.mtime);
        w.u32(self.extended.len() as u32);
        for ext in &self.extended {
            w.bytes(&ext.name);
            w.bytes(&ext.data);
        }
    }

    pub(crate) fn read_wire(r: &mut WireReader<'_>) -> FxpResult<Self> {
        let mut attrs = Self {
            flags: r.u32("attr flags")?,
            size: r.u64("attr size")?,
            uid: r.u32("attr uid")?,
            gid: r.u32("attr gid")?,
            permissions: r.u32("attr permissions")?,
            atime: r.u32("attr atime")?,
            mtime: r.u32("attr mtime")?,
            extended: Vec::new(),
        };

        let count = r.u32("attr extension count")?;
        for _ in 0..count {
            attrs.extended.push(Extension {
                name: r.bytes("attr extension name")?,
                data: r.bytes("attr extension data")?,
            });
        }

        Ok(attrs)
    }
}

/// A single directory entry from a Name reply.
///
/// `filename` and `longname` are opaque bytes: the protocol does not
/// guarantee UTF-8 and Linux filenames routinely are not. Feeding
/// `filename` back into `open`/`remove`/`rename` reproduces the exact
/// remote name; the `*_lossy` helpers are for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Bare file name, no path components
    pub filename: Vec<u8>,
    /// Server-formatted long listing line (ls -l style)
    pub longname: Vec<u8>,
    /// Attributes reported for the entry
    pub attrs: FileAttributes,
}

impl DirEntry {
    /// File name decoded for display; non-UTF-8 bytes are replaced.
    pub fn filename_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.filename)
    }

    /// Long listing line decoded for display; non-UTF-8 bytes are replaced.
    pub fn longname_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.longname)
    }

    /// Returns whether the entry describes a directory.
    ///
    /// Only meaningful when the server declared permission bits.
    pub fn is_dir(&self) -> bool {
        self.attrs.flags & AttrFlags::PERMISSIONS != 0
            && self.attrs.permissions & 0o170000 == 0o040000
    }

    /// File size in bytes, if the server declared one.
    pub fn size(&self) -> Option<u64> {
        (self.attrs.flags & AttrFlags::SIZE != 0).then_some(self.attrs.size)
    }
}

/// Opaque server-issued identifier for an open file or directory.
///
/// Valid from a successful Open/OpenDir until the matching Close; the client
/// attaches no meaning to the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle(Vec<u8>);

impl FileHandle {
    pub(crate) fn new(raw: Vec<u8>) -> Self {
        Self(raw)
    }

    /// Raw handle bytes as issued by the server.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Builds a structured error from a Status reply's fields.
///
/// The wire carries the message as opaque bytes; this is the display
/// boundary, so a lossy conversion is acceptable here.
pub(crate) fn status_error(code: u32, message: Vec<u8>) -> FxpError {
    let message = if message.is_empty() {
        StatusCode::from_u32(code)
            .map(|c| c.message().to_string())
            .unwrap_or_else(|| format!("status {}", code))
    } else {
        String::from_utf8_lossy(&message).into_owned()
    };

    FxpError::Remote { code, message }
}
