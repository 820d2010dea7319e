//! SFTP (SSH File Transfer Protocol) version 3 client engine.
//!
//! This module implements the client side of SFTP v3
//! (draft-ietf-secsh-filexfer-02) over any pair of raw byte streams. The SSH
//! transport itself is out of scope: callers hand over the payload side of
//! an established "sftp" subsystem channel, or the stdio pipes of a spawned
//! `sftp-server` process.
//!
//! # Architecture
//!
//! Requests from any number of tasks are multiplexed over the single link:
//!
//! ```text
//! caller ──▶ router.reserve() ──▶ codec ──▶ outbound channel ──▶ writer pump ──▶ wire
//!   ▲                                                                             │
//!   └── reply slot ◀── router ◀── dispatch loop ◀── codec ◀── reader pump ◀───────┘
//! ```
//!
//! Replies may arrive in any order; the [`router::Router`] matches each one
//! to its caller by request id.
//!
//! # Protocol Flow
//!
//! ```text
//! Client                          Server
//!   |                               |
//!   |-- SSH_FXP_INIT -------------->|
//!   |<- SSH_FXP_VERSION ------------|
//!   |                               |
//!   |-- SSH_FXP_OPENDIR ----------->|
//!   |<- SSH_FXP_HANDLE -------------|
//!   |                               |
//!   |-- SSH_FXP_READDIR ----------->|
//!   |<- SSH_FXP_NAME ---------------|
//!   |<- SSH_FXP_STATUS (EOF) -------|
//!   |                               |
//!   |-- SSH_FXP_CLOSE ------------->|
//!   |<- SSH_FXP_STATUS -------------|
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use fxp_proto::sftp::SftpClient;
//!
//! # async fn example(reader: tokio::io::DuplexStream, writer: tokio::io::DuplexStream)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let client = SftpClient::new(reader, writer).await?;
//!
//! for entry in client.list("/var/log").await? {
//!     println!("{}", entry.longname_lossy());
//! }
//!
//! client.close_connection().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - [SFTP Draft v3](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-02)

pub mod client;
pub mod file;
pub mod message;
pub mod packet;
pub mod router;
pub mod state;
pub mod types;

mod wire;

pub use client::{new_client, ClientConfig, SftpClient};
pub use file::{FileReader, FileWriter};
pub use message::{Message, MessageType, SFTP_VERSION};
pub use packet::{Packet, MAX_PAYLOAD};
pub use router::{ResolveError, Router};
pub use state::ConnectionState;
pub use types::{
    AttrFlags, DirEntry, Extension, FileAttributes, FileHandle, FileMode, OpenFlags, StatusCode,
};
