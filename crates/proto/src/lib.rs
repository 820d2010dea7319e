//! Protocol implementations for the fxp file-transfer ecosystem.
//!
//! This crate currently provides one protocol engine:
//!
//! - **SFTP v3** ([`sftp`]) - client side of the SSH File Transfer Protocol,
//!   draft-ietf-secsh-filexfer-02, over caller-supplied byte streams
//!
//! # Example
//!
//! ```rust,no_run
//! use fxp_proto::sftp::SftpClient;
//!
//! # async fn example(reader: tokio::io::DuplexStream, writer: tokio::io::DuplexStream)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let client = SftpClient::new(reader, writer).await?;
//! println!("negotiated SFTP version {}", client.version());
//! client.close_connection().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod sftp;
