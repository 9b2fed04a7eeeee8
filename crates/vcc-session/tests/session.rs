//! Integration tests for sessions and login.
//!
//! A loopback listener plays the server. Each test reads the client's
//! request off the socket and, where needed, writes back a canned reply.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use vcc_protocol::{
    decode_relay, decode_request, encode_relay_as, encode_request,
    relay_body_len, MessageType, Request, RELAY_HEADER_SIZE, REQUEST_SIZE,
};
use vcc_session::{login, SendRequest, Session, SessionError};
use vcc_transport::Connection;

/// Helper: a session for "alice" plus the server's end of the socket.
async fn session_pair() -> (Session, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
    let conn = Connection::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        .await
        .unwrap();
    let server = accept.await.unwrap();

    (Session::new(Arc::new(conn), "alice"), server)
}

async fn read_request(server: &mut TcpStream) -> Request {
    let mut buf = [0u8; REQUEST_SIZE];
    server.read_exact(&mut buf).await.unwrap();
    decode_request(&buf)
}

#[tokio::test]
async fn test_send_fills_in_current_session_and_username() {
    let (session, mut server) = session_pair().await;
    session.set_session_id(4);

    session
        .send(SendRequest::new(MessageType::ChatSend).message("hi"))
        .await
        .unwrap();

    let request = read_request(&mut server).await;
    assert_eq!(request.kind, MessageType::ChatSend);
    assert_eq!(request.session, 4);
    assert_eq!(request.username, "alice");
    assert_eq!(request.message, "hi");
}

#[tokio::test]
async fn test_send_explicit_fields_win() {
    let (session, mut server) = session_pair().await;
    session.set_session_id(4);

    session
        .send(
            SendRequest::new(MessageType::IncrementScore)
                .username("bob")
                .session(10),
        )
        .await
        .unwrap();

    let request = read_request(&mut server).await;
    assert_eq!(request.username, "bob");
    assert_eq!(request.session, 10);
}

#[tokio::test]
async fn test_send_relay_uses_session_identity() {
    let (session, mut server) = session_pair().await;
    session.set_session_id(2);

    session.send_relay("ghost", "boo").await.unwrap();

    let mut header = [0u8; RELAY_HEADER_SIZE];
    server.read_exact(&mut header).await.unwrap();
    let mut body = vec![0u8; relay_body_len(&header).unwrap()];
    server.read_exact(&mut body).await.unwrap();

    let relay = decode_relay(&header, &body);
    assert_eq!(relay.kind, MessageType::RelayMessage);
    assert_eq!(relay.session, 2);
    assert_eq!(relay.username, "alice");
    assert_eq!(relay.display_name(), "ghost");
    assert_eq!(relay.message, "boo");
}

#[tokio::test]
async fn test_login_success_records_uid() {
    let (session, mut server) = session_pair().await;

    let server_task = tokio::spawn(async move {
        let request = read_request(&mut server).await;
        assert_eq!(request.kind, MessageType::Login);
        assert_eq!(request.username, "alice");
        assert_eq!(request.message, "secret");

        let reply =
            encode_request(MessageType::Login, 42, 0, 0, "alice", "").unwrap();
        server.write_all(&reply).await.unwrap();
        server
    });

    let uid = login(&session, "secret").await.unwrap();
    assert_eq!(uid, 42);
    assert_eq!(session.uid(), 42);
    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_login_uid_zero_fails() {
    let (session, mut server) = session_pair().await;

    tokio::spawn(async move {
        read_request(&mut server).await;
        let reply =
            encode_request(MessageType::Login, 0, 0, 0, "alice", "").unwrap();
        server.write_all(&reply).await.unwrap();
        server
    });

    let err = login(&session, "wrong").await.unwrap_err();
    assert!(matches!(err, SessionError::LoginFailed(ref name) if name == "alice"));
    assert_eq!(session.uid(), 0);
}

#[tokio::test]
async fn test_login_wrong_reply_type() {
    let (session, mut server) = session_pair().await;

    tokio::spawn(async move {
        read_request(&mut server).await;
        let reply =
            encode_request(MessageType::ChatBroadcast, 7, 0, 0, "bob", "hey")
                .unwrap();
        server.write_all(&reply).await.unwrap();
        server
    });

    let err = login(&session, "secret").await.unwrap_err();
    assert!(matches!(err, SessionError::UnexpectedReply(ref t) if t == "MSG_NEW"));
}

#[tokio::test]
async fn test_login_relay_reply_is_unexpected() {
    let (session, mut server) = session_pair().await;

    tokio::spawn(async move {
        read_request(&mut server).await;
        let (header, body) =
            encode_relay_as(MessageType::RelayBroadcast, 0, 0, "bob", "", "x")
                .unwrap();
        server.write_all(&header).await.unwrap();
        server.write_all(&body).await.unwrap();
        server
    });

    let err = login(&session, "secret").await.unwrap_err();
    assert!(matches!(err, SessionError::UnexpectedReply(_)));
}

#[tokio::test]
async fn test_login_rejects_long_password_without_sending() {
    let (session, mut server) = session_pair().await;

    let err = login(&session, &"p".repeat(64)).await.unwrap_err();
    assert!(matches!(err, SessionError::Protocol(_)));

    // Nothing was written.
    session.connection().close().await.unwrap();
    let mut rest = Vec::new();
    server.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_login_server_hangs_up() {
    let (session, mut server) = session_pair().await;

    tokio::spawn(async move {
        read_request(&mut server).await;
        drop(server);
    });

    let err = login(&session, "secret").await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
}
