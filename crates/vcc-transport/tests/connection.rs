//! Integration tests for the TCP connection.
//!
//! Each test binds a loopback listener on port 0, connects a real
//! `Connection` to it, and plays the server side by hand with raw bytes.
//! That way the framing is checked against what actually crosses the
//! socket, including short writes and early EOF.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use vcc_protocol::{
    decode_request, encode_relay_as, encode_request, Frame, MessageType,
    MESSAGE_SIZE, ProtocolError, REQUEST_MAGIC, REQUEST_SIZE,
};
use vcc_transport::{Connection, TransportError, WaitOutcome};

/// Helper: a connected client plus the server's end of the socket.
async fn pair() -> (Connection, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
    let conn = Connection::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        .await
        .expect("should connect");
    let server = accept.await.unwrap();

    (conn.with_poll_interval(Duration::from_millis(10)), server)
}

fn login_reply(uid: i32) -> Vec<u8> {
    encode_request(MessageType::Login, uid, 0, 0, "alice", "").unwrap()
}

#[tokio::test]
async fn test_send_writes_one_request_frame() {
    let (conn, mut server) = pair().await;

    conn.send(MessageType::ChatSend, 0, 3, 0, "alice", "hi")
        .await
        .unwrap();

    let mut buf = [0u8; REQUEST_SIZE];
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf[..4], &REQUEST_MAGIC.to_be_bytes());

    let request = decode_request(&buf);
    assert_eq!(request.kind, MessageType::ChatSend);
    assert_eq!(request.session, 3);
    assert_eq!(request.username, "alice");
    assert_eq!(request.message, "hi");
}

#[tokio::test]
async fn test_send_rejects_oversized_username_before_writing() {
    let (conn, mut server) = pair().await;

    let err = conn
        .send(MessageType::Login, 0, 0, 0, &"x".repeat(40), "pw")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransportError::Protocol(ProtocolError::FieldTooLong { .. })
    ));

    // Nothing reached the wire: closing now gives the server a clean EOF.
    conn.close().await.unwrap();
    let mut rest = Vec::new();
    server.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_request_split_across_writes_is_one_frame() {
    let (conn, mut server) = pair().await;
    let frame = login_reply(7);

    // Deliver the frame in three pieces with pauses in between.
    tokio::spawn(async move {
        for chunk in [&frame[..2], &frame[2..300], &frame[300..]] {
            server.write_all(chunk).await.unwrap();
            server.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Keep the socket open until the client is done reading.
        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    let (raw, frame) = conn.receive().await.unwrap();
    assert_eq!(raw.message_field().len(), MESSAGE_SIZE);
    match frame {
        Frame::Request(request) => {
            assert_eq!(request.kind, MessageType::Login);
            assert_eq!(request.uid, 7);
        }
        other => panic!("expected a request, got {other:?}"),
    }
}

#[tokio::test]
async fn test_receive_relay_frame() {
    let (conn, mut server) = pair().await;
    let (header, body) = encode_relay_as(
        MessageType::RelayMessage,
        0,
        5,
        "bob",
        "",
        "a longer message than fits in a request",
    )
    .unwrap();

    server.write_all(&header).await.unwrap();
    server.write_all(&body).await.unwrap();

    let (_, frame) = conn.receive().await.unwrap();
    match frame {
        Frame::Relay(relay) => {
            assert_eq!(relay.session, 5);
            assert_eq!(relay.username, "bob");
            assert_eq!(relay.message, "a longer message than fits in a request");
        }
        other => panic!("expected a relay, got {other:?}"),
    }
}

#[tokio::test]
async fn test_two_back_to_back_frames() {
    let (conn, mut server) = pair().await;

    let mut both = login_reply(1);
    both.extend(login_reply(2));
    server.write_all(&both).await.unwrap();

    let uids: Vec<i32> = [conn.receive().await, conn.receive().await]
        .into_iter()
        .map(|r| match r.unwrap().1 {
            Frame::Request(request) => request.uid,
            Frame::Relay(_) => panic!("unexpected relay"),
        })
        .collect();
    assert_eq!(uids, vec![1, 2]);
}

#[tokio::test]
async fn test_invalid_magic_is_protocol_error() {
    let (conn, mut server) = pair().await;

    server.write_all(&[0xde, 0xad, 0xbe, 0xef]).await.unwrap();

    let err = conn.receive().await.unwrap_err();
    assert!(err.is_protocol_violation());
    assert!(matches!(
        err,
        TransportError::Protocol(ProtocolError::InvalidMagic(0xdead_beef))
    ));
}

#[tokio::test]
async fn test_eof_mid_frame_is_truncated() {
    let (conn, mut server) = pair().await;

    let frame = login_reply(1);
    server.write_all(&frame[..100]).await.unwrap();
    drop(server);

    let err = conn.receive().await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::Protocol(ProtocolError::Truncated {
            expected: REQUEST_SIZE,
            actual: 100,
        })
    ));
}

#[tokio::test]
async fn test_eof_between_frames_is_connection_closed() {
    let (conn, server) = pair().await;
    drop(server);

    let err = conn.receive().await.unwrap_err();
    assert!(matches!(err, TransportError::ConnectionClosed(_)));
    assert!(!err.is_protocol_violation());
}

#[tokio::test]
async fn test_receive_ends_reply_wait() {
    let (conn, mut server) = pair().await;
    let conn = Arc::new(conn);

    let waiter = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { conn.wait_until_reply().await })
    };

    // Let the waiter raise the flag before the reply lands.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(conn.is_reply_pending());

    server.write_all(&login_reply(1)).await.unwrap();
    conn.receive().await.unwrap();

    assert_eq!(waiter.await.unwrap(), WaitOutcome::Replied);
    assert!(!conn.is_reply_pending());
}

#[tokio::test]
async fn test_cancel_unblocks_wait_promptly() {
    let (conn, _server) = pair().await;
    let conn = Arc::new(conn.with_poll_interval(Duration::from_secs(10)));

    let waiter = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { conn.wait_until_reply().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    conn.cancel();
    let outcome = waiter.await.unwrap();

    assert_eq!(outcome, WaitOutcome::Cancelled);
    // Far sooner than the 10 second poll interval.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_wait_after_cancel_returns_immediately() {
    let (conn, _server) = pair().await;
    conn.cancel();
    assert!(conn.is_cancelled());
    assert_eq!(conn.wait_until_reply().await, WaitOutcome::Cancelled);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (conn, mut server) = pair().await;

    conn.close().await.unwrap();
    conn.close().await.unwrap();
    assert!(conn.is_closed());
    assert!(conn.is_cancelled());

    // The server sees a clean EOF.
    let mut rest = Vec::new();
    server.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    let err = conn
        .send(MessageType::ChatSend, 0, 0, 0, "alice", "late")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Closed));
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind then drop to get a port that nothing listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = Connection::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port).await;
    assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
}

#[tokio::test]
async fn test_connect_over_ipv6() {
    // Hosts without IPv6 loopback skip this test.
    let Ok(listener) = TcpListener::bind("[::1]:0").await else {
        return;
    };
    let port = listener.local_addr().unwrap().port();
    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

    let conn = Connection::connect(IpAddr::V6(Ipv6Addr::LOCALHOST), port)
        .await
        .unwrap();
    let mut server = accept.await.unwrap();
    assert!(conn.peer_addr().is_ipv6());

    conn.send(MessageType::ListSessions, 0, 0, 0, "alice", "")
        .await
        .unwrap();
    let mut buf = [0u8; REQUEST_SIZE];
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(decode_request(&buf).kind, MessageType::ListSessions);
}
