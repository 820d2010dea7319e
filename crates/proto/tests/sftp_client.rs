//! Integration tests for the SFTP client engine.
//!
//! Each test drives the client against a scripted server speaking the raw
//! wire protocol over an in-memory duplex stream, validating:
//! - the version handshake (success and rejection)
//! - request/reply multiplexing with out-of-order replies
//! - directory listing and error propagation
//! - the streaming file adapters
//! - connection teardown releasing pending callers

use fxp_platform::FxpError;
use fxp_proto::sftp::packet::{read_packet, write_packet};
use fxp_proto::sftp::{
    AttrFlags, DirEntry, FileAttributes, Message, MessageType, OpenFlags, SftpClient, StatusCode,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::{timeout, Duration};

const TICK: Duration = Duration::from_secs(5);

/// Connects a client to an in-memory peer stream.
async fn connect_pair() -> (tokio::task::JoinHandle<DuplexStream>, SftpClient) {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move {
        let mut stream = server_side;
        serve_handshake(&mut stream).await;
        stream
    });

    let (reader, writer) = tokio::io::split(client_side);
    let client = timeout(TICK, SftpClient::new(reader, writer))
        .await
        .expect("handshake timed out")
        .expect("handshake failed");

    (server, client)
}

async fn recv_msg(stream: &mut DuplexStream) -> Message {
    let packet = timeout(TICK, read_packet(stream))
        .await
        .expect("server read timed out")
        .expect("server read failed");
    Message::decode(&packet).expect("server failed to decode request")
}

async fn send_msg(stream: &mut DuplexStream, message: Message) {
    timeout(TICK, write_packet(stream, &message.encode()))
        .await
        .expect("server write timed out")
        .expect("server write failed");
}

async fn serve_handshake(stream: &mut DuplexStream) {
    match recv_msg(stream).await {
        Message::Init { version, .. } => assert_eq!(version, 3),
        other => panic!("expected Init, got {:?}", other.message_type()),
    }
    send_msg(
        stream,
        Message::Version {
            version: 3,
            extensions: vec![],
        },
    )
    .await;
}

fn ok_status(id: u32) -> Message {
    Message::Status {
        id,
        code: StatusCode::Ok as u32,
        message: Vec::new(),
        language: Vec::new(),
    }
}

fn status(id: u32, code: StatusCode, message: &str) -> Message {
    Message::Status {
        id,
        code: code as u32,
        message: message.as_bytes().to_vec(),
        language: Vec::new(),
    }
}

#[tokio::test]
async fn handshake_ok() {
    let (server, client) = connect_pair().await;

    assert_eq!(client.version(), 3);
    assert!(client.extensions().is_empty());

    client.close_connection().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn handshake_exposes_server_extensions() {
    let (client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        match recv_msg(&mut server_side).await {
            Message::Init { version, .. } => assert_eq!(version, 3),
            other => panic!("expected Init, got {:?}", other.message_type()),
        }
        send_msg(
            &mut server_side,
            Message::Version {
                version: 3,
                extensions: vec![fxp_proto::sftp::Extension {
                    name: b"posix-rename@openssh.com".to_vec(),
                    data: b"1".to_vec(),
                }],
            },
        )
        .await;
        server_side
    });

    let (reader, writer) = tokio::io::split(client_side);
    let client = SftpClient::new(reader, writer).await.unwrap();

    assert_eq!(client.extensions().len(), 1);
    assert_eq!(client.extensions()[0].name, b"posix-rename@openssh.com");

    client.close_connection().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn handshake_wrong_version_is_rejected() {
    let (client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let _init = recv_msg(&mut server_side).await;
        send_msg(
            &mut server_side,
            Message::Version {
                version: 4,
                extensions: vec![],
            },
        )
        .await;
        server_side
    });

    let (reader, writer) = tokio::io::split(client_side);
    let err = timeout(TICK, SftpClient::new(reader, writer))
        .await
        .expect("construction should fail promptly")
        .unwrap_err();

    assert!(matches!(err, FxpError::Handshake(_)));
    assert!(err.to_string().contains("unsupported version 4"));

    // both pumps have exited and closed their streams
    let mut server_side = server.await.unwrap();
    let eof = timeout(TICK, read_packet(&mut server_side))
        .await
        .expect("stream should be closed promptly")
        .unwrap_err();
    assert!(matches!(eof, FxpError::Closed(_)));
}

#[tokio::test]
async fn handshake_rejects_non_version_reply() {
    let (client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let _init = recv_msg(&mut server_side).await;
        send_msg(&mut server_side, ok_status(0)).await;
        server_side
    });

    let (reader, writer) = tokio::io::split(client_side);
    let err = SftpClient::new(reader, writer).await.unwrap_err();
    assert!(matches!(err, FxpError::Handshake(_)));

    server.await.unwrap();
}

#[tokio::test]
async fn list_empty_directory() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    let script = tokio::spawn(async move {
        let open_id = match recv_msg(&mut stream).await {
            Message::OpenDir { id, path } => {
                assert_eq!(path, b"/empty");
                id
            }
            other => panic!("expected OpenDir, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Handle {
                id: open_id,
                handle: b"h1".to_vec(),
            },
        )
        .await;

        let readdir_id = match recv_msg(&mut stream).await {
            Message::ReadDir { id, handle } => {
                assert_eq!(handle, b"h1");
                id
            }
            other => panic!("expected ReadDir, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, status(readdir_id, StatusCode::Eof, "")).await;

        let close_id = match recv_msg(&mut stream).await {
            Message::Close { id, handle } => {
                assert_eq!(handle, b"h1");
                id
            }
            other => panic!("expected Close, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, ok_status(close_id)).await;
        stream
    });

    let entries = timeout(TICK, client.list("/empty"))
        .await
        .expect("list timed out")
        .unwrap();
    assert!(entries.is_empty());

    // keep the server stream alive so the orderly close is not raced by EOF
    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn list_aggregates_batches() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    fn entry(name: &str) -> DirEntry {
        DirEntry {
            filename: name.as_bytes().to_vec(),
            longname: format!("-rw-r--r--    1 u g 1 Jan  1 00:00 {}", name).into_bytes(),
            attrs: FileAttributes {
                flags: AttrFlags::SIZE,
                size: 1,
                ..FileAttributes::default()
            },
        }
    }

    let script = tokio::spawn(async move {
        let open_id = match recv_msg(&mut stream).await {
            Message::OpenDir { id, .. } => id,
            other => panic!("expected OpenDir, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Handle {
                id: open_id,
                handle: b"d".to_vec(),
            },
        )
        .await;

        for batch in [vec![entry("a"), entry("b")], vec![entry("c")]] {
            let id = match recv_msg(&mut stream).await {
                Message::ReadDir { id, .. } => id,
                other => panic!("expected ReadDir, got {:?}", other.message_type()),
            };
            send_msg(&mut stream, Message::Name { id, entries: batch }).await;
        }

        let id = match recv_msg(&mut stream).await {
            Message::ReadDir { id, .. } => id,
            other => panic!("expected ReadDir, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, status(id, StatusCode::Eof, "")).await;

        let close_id = match recv_msg(&mut stream).await {
            Message::Close { id, .. } => id,
            other => panic!("expected Close, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, ok_status(close_id)).await;
        stream
    });

    let entries = client.list("/three").await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.filename_lossy()).collect();
    assert_eq!(names, ["a", "b", "c"]);

    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn non_utf8_filenames_survive_list_then_remove() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    // a legal Linux filename that is not valid UTF-8
    let weird: Vec<u8> = vec![b'd', 0xff, 0xfe, b't', 0x80];
    let weird_clone = weird.clone();

    let script = tokio::spawn(async move {
        let open_id = match recv_msg(&mut stream).await {
            Message::OpenDir { id, .. } => id,
            other => panic!("expected OpenDir, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Handle {
                id: open_id,
                handle: b"d".to_vec(),
            },
        )
        .await;

        let id = match recv_msg(&mut stream).await {
            Message::ReadDir { id, .. } => id,
            other => panic!("expected ReadDir, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Name {
                id,
                entries: vec![DirEntry {
                    filename: weird_clone.clone(),
                    longname: weird_clone.clone(),
                    attrs: FileAttributes::default(),
                }],
            },
        )
        .await;

        let id = match recv_msg(&mut stream).await {
            Message::ReadDir { id, .. } => id,
            other => panic!("expected ReadDir, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, status(id, StatusCode::Eof, "")).await;

        let id = match recv_msg(&mut stream).await {
            Message::Close { id, .. } => id,
            other => panic!("expected Close, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, ok_status(id)).await;

        // the remove built from the listed entry must carry the exact
        // bytes the listing reported
        let id = match recv_msg(&mut stream).await {
            Message::Remove { id, path } => {
                assert_eq!(path, weird_clone);
                id
            }
            other => panic!("expected Remove, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, ok_status(id)).await;

        stream
    });

    let entries = client.list("/dir").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, weird);

    client.remove(&entries[0].filename).await.unwrap();

    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn concurrent_replies_resolve_out_of_order() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    let script = tokio::spawn(async move {
        // two Open requests, in whatever order the callers raced to send
        let mut ids = std::collections::HashMap::new();
        for _ in 0..2 {
            match recv_msg(&mut stream).await {
                Message::Open { id, filename, .. } => {
                    ids.insert(filename, id);
                }
                other => panic!("expected Open, got {:?}", other.message_type()),
            }
        }

        // reply to /b first, then /a
        send_msg(
            &mut stream,
            Message::Handle {
                id: ids[b"/b".as_slice()],
                handle: b"hb".to_vec(),
            },
        )
        .await;
        send_msg(
            &mut stream,
            Message::Handle {
                id: ids[b"/a".as_slice()],
                handle: b"ha".to_vec(),
            },
        )
        .await;
        stream
    });

    let client_a = client.clone();
    let client_b = client.clone();
    let (got_a, got_b) = tokio::join!(
        tokio::spawn(async move { client_a.open("/a", OpenFlags::READ, None).await }),
        tokio::spawn(async move { client_b.open("/b", OpenFlags::READ, None).await }),
    );

    assert_eq!(got_a.unwrap().unwrap().as_bytes(), b"ha");
    assert_eq!(got_b.unwrap().unwrap().as_bytes(), b"hb");

    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn remote_failure_leaves_connection_usable() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    let script = tokio::spawn(async move {
        let id = match recv_msg(&mut stream).await {
            Message::Open { id, filename, .. } => {
                assert_eq!(filename, b"/nope");
                id
            }
            other => panic!("expected Open, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            status(id, StatusCode::NoSuchFile, "No such file"),
        )
        .await;

        // the connection stays up for the next request
        let id = match recv_msg(&mut stream).await {
            Message::Stat { id, path } => {
                assert_eq!(path, b"/etc");
                id
            }
            other => panic!("expected Stat, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Attrs {
                id,
                attrs: FileAttributes {
                    flags: AttrFlags::SIZE,
                    size: 512,
                    ..FileAttributes::default()
                },
            },
        )
        .await;
        stream
    });

    let err = client.open("/nope", OpenFlags::READ, None).await.unwrap_err();
    match &err {
        FxpError::Remote { code, message } => {
            assert_eq!(*code, StatusCode::NoSuchFile as u32);
            assert_eq!(message, "No such file");
        }
        other => panic!("expected remote error, got {}", other),
    }

    let attrs = client.stat("/etc").await.unwrap();
    assert_eq!(attrs.size, 512);

    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn streaming_read_to_eof() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    let script = tokio::spawn(async move {
        let id = match recv_msg(&mut stream).await {
            Message::Open {
                id,
                filename,
                pflags,
                ..
            } => {
                assert_eq!(filename, b"/f");
                assert_eq!(pflags, OpenFlags::READ);
                id
            }
            other => panic!("expected Open, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Handle {
                id,
                handle: b"fh".to_vec(),
            },
        )
        .await;

        // serve three chunks, asserting the offset advances by actual bytes
        let mut expected_offset = 0u64;
        for size in [1024usize, 1024, 300] {
            let id = match recv_msg(&mut stream).await {
                Message::Read {
                    id, handle, offset, ..
                } => {
                    assert_eq!(handle, b"fh");
                    assert_eq!(offset, expected_offset);
                    id
                }
                other => panic!("expected Read, got {:?}", other.message_type()),
            };
            send_msg(
                &mut stream,
                Message::Data {
                    id,
                    data: vec![0x5a; size],
                },
            )
            .await;
            expected_offset += size as u64;
        }

        let id = match recv_msg(&mut stream).await {
            Message::Read { id, .. } => id,
            other => panic!("expected Read, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, status(id, StatusCode::Eof, "")).await;

        // the producer must close the handle on its way out
        let id = match recv_msg(&mut stream).await {
            Message::Close { id, handle } => {
                assert_eq!(handle, b"fh");
                id
            }
            other => panic!("expected Close, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, ok_status(id)).await;
        stream
    });

    let mut reader = client.file_reader("/f").await.unwrap();
    let mut contents = Vec::new();
    timeout(TICK, reader.read_to_end(&mut contents))
        .await
        .expect("read timed out")
        .unwrap();

    assert_eq!(contents.len(), 2348);
    assert!(contents.iter().all(|&b| b == 0x5a));

    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn streaming_read_propagates_remote_error() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    let script = tokio::spawn(async move {
        let id = match recv_msg(&mut stream).await {
            Message::Open { id, .. } => id,
            other => panic!("expected Open, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Handle {
                id,
                handle: b"fh".to_vec(),
            },
        )
        .await;

        let id = match recv_msg(&mut stream).await {
            Message::Read { id, .. } => id,
            other => panic!("expected Read, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            status(id, StatusCode::PermissionDenied, "denied"),
        )
        .await;

        let id = match recv_msg(&mut stream).await {
            Message::Close { id, .. } => id,
            other => panic!("expected Close, got {:?}", other.message_type()),
        };
        send_msg(&mut stream, ok_status(id)).await;
        stream
    });

    let mut reader = client.file_reader("/secret").await.unwrap();
    let mut contents = Vec::new();
    let err = reader.read_to_end(&mut contents).await.unwrap_err();
    assert!(err.to_string().contains("denied"));

    let stream = script.await.unwrap();
    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn streaming_write_chunks_sequentially() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    const TOTAL: usize = 100_000;

    let script = tokio::spawn(async move {
        let id = match recv_msg(&mut stream).await {
            Message::Open {
                id,
                filename,
                pflags,
                ..
            } => {
                assert_eq!(filename, b"/up");
                assert_eq!(
                    pflags,
                    OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE
                );
                id
            }
            other => panic!("expected Open, got {:?}", other.message_type()),
        };
        send_msg(
            &mut stream,
            Message::Handle {
                id,
                handle: b"wh".to_vec(),
            },
        )
        .await;

        let mut received = Vec::new();
        loop {
            match recv_msg(&mut stream).await {
                Message::Write {
                    id,
                    handle,
                    offset,
                    data,
                } => {
                    assert_eq!(handle, b"wh");
                    assert_eq!(offset, received.len() as u64);
                    received.extend_from_slice(&data);
                    send_msg(&mut stream, ok_status(id)).await;
                }
                Message::Close { id, handle } => {
                    assert_eq!(handle, b"wh");
                    send_msg(&mut stream, ok_status(id)).await;
                    break;
                }
                other => panic!("unexpected request: {:?}", other.message_type()),
            }
        }
        (received, stream)
    });

    let payload: Vec<u8> = (0..TOTAL).map(|i| (i % 251) as u8).collect();

    let mut writer = client.file_writer("/up").await.unwrap();
    writer.write_all(&payload).await.unwrap();
    let written = timeout(TICK, writer.finish())
        .await
        .expect("finish timed out")
        .unwrap();
    assert_eq!(written, TOTAL as u64);

    let (received, stream) = script.await.unwrap();
    assert_eq!(received, payload);

    client.close_connection().await.unwrap();
    drop(stream);
}

#[tokio::test]
async fn close_connection_releases_pending_callers() {
    let (server, client) = connect_pair().await;
    let stream = server.await.unwrap();

    // a request the server will never answer
    let hung = {
        let client = client.clone();
        tokio::spawn(async move { client.stat("/hang").await })
    };

    // wait for the request to be registered before tearing down
    while client.pending_requests().await == 0 {
        tokio::task::yield_now().await;
    }

    client.close_connection().await.unwrap();

    let outcome = timeout(TICK, hung)
        .await
        .expect("pending caller was not released")
        .unwrap();
    assert!(matches!(outcome, Err(FxpError::Closed(_))));
    assert_eq!(client.pending_requests().await, 0);

    // operations after shutdown fail immediately
    let err = client.stat("/late").await.unwrap_err();
    assert!(matches!(err, FxpError::Closed(_)));

    drop(stream);
}

#[tokio::test]
async fn transport_eof_fails_pending_and_wait() {
    let (server, client) = connect_pair().await;
    let stream = server.await.unwrap();

    let hung = {
        let client = client.clone();
        tokio::spawn(async move { client.stat("/hang").await })
    };

    while client.pending_requests().await == 0 {
        tokio::task::yield_now().await;
    }

    // remote goes away
    drop(stream);

    let outcome = timeout(TICK, hung)
        .await
        .expect("pending caller was not released")
        .unwrap();
    assert!(matches!(outcome, Err(FxpError::Closed(_))));

    let err = timeout(TICK, client.wait())
        .await
        .expect("wait did not complete")
        .unwrap_err();
    assert!(matches!(err, FxpError::Closed(_)));
}

#[tokio::test]
async fn requests_preserve_send_order_on_the_wire() {
    let (server, client) = connect_pair().await;
    let mut stream = server.await.unwrap();

    // issue requests strictly one enqueue after another
    let c = client.clone();
    let sender = tokio::spawn(async move {
        let first = c.remove("/first");
        let second = c.rename("/second", "/second2");
        let third = c.rmdir("/third");
        tokio::join!(first, second, third)
    });

    // requests must arrive in enqueue order even though the callers all
    // suspend; reply in arrival order
    let mut seen = Vec::new();
    for _ in 0..3 {
        let msg = recv_msg(&mut stream).await;
        let id = msg.request_id().unwrap();
        seen.push(msg.message_type());
        send_msg(&mut stream, ok_status(id)).await;
    }

    // join! polls in order, so the Remove is enqueued first
    assert_eq!(
        seen,
        [MessageType::Remove, MessageType::Rename, MessageType::RmDir]
    );

    let (a, b, c) = sender.await.unwrap();
    a.unwrap();
    b.unwrap();
    c.unwrap();

    client.close_connection().await.unwrap();
}
