//! Directory listing over a local `sftp-server` binary.
//!
//! This example demonstrates the byte-stream interface: instead of an SSH
//! connection, the client talks to an `sftp-server` process over its stdio
//! pipes. OpenSSH installs the binary at /usr/lib/openssh/sftp-server on
//! most Linux distributions.
//!
//! Usage:
//!   cargo run --example list_dir [path] [sftp-server-binary]
//!
//! Example:
//!   cargo run --example list_dir /tmp

use fxp_proto::sftp::SftpClient;
use std::process::Stdio;
use tokio::process::Command;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/".to_string());
    let server_bin = args
        .next()
        .unwrap_or_else(|| "/usr/lib/openssh/sftp-server".to_string());

    println!("Spawning {}...", server_bin);

    let mut child = Command::new(&server_bin)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;

    let writer = child.stdin.take().ok_or("child stdin not captured")?;
    let reader = child.stdout.take().ok_or("child stdout not captured")?;

    // Handshake runs here; the returned client multiplexes requests from
    // any number of tasks over the single pipe pair.
    let client = SftpClient::new(reader, writer).await?;

    println!("Connected, SFTP version {}", client.version());
    for ext in client.extensions() {
        println!(
            "  server extension: {} ({})",
            String::from_utf8_lossy(&ext.name),
            String::from_utf8_lossy(&ext.data)
        );
    }

    println!();
    println!("Listing {}:", path);
    for entry in client.list(&path).await? {
        println!("{}", entry.longname_lossy());
    }

    client.close_connection().await?;
    child.wait().await?;

    Ok(())
}
