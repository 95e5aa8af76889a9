//! Integration tests for the line-framed TCP transport.

use std::time::Duration;

use termgate_transport::{
    Connection, Incoming, TcpLineTransport, Transport, TransportError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_tcp_accept_and_exchange_lines() {
    let mut transport = TcpLineTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("should have addr");

    let server_handle = tokio::spawn(async move {
        let incoming = transport.accept().await.expect("should accept");
        assert!(incoming.peer_addr().ip().is_loopback());
        incoming.establish().await.expect("should establish")
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    let server_conn = server_handle.await.unwrap();

    client.write_all(b"LOGIN\r\n\r\nbob\n").await.unwrap();
    assert_eq!(server_conn.recv().await.unwrap(), Some(b"LOGIN".to_vec()));
    assert_eq!(server_conn.recv().await.unwrap(), Some(Vec::new()));
    assert_eq!(server_conn.recv().await.unwrap(), Some(b"bob".to_vec()));

    server_conn.send(b"Welcome\r\n").await.unwrap();
    let mut buf = [0u8; 9];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"Welcome\r\n");

    drop(client);
    assert_eq!(server_conn.recv().await.unwrap(), None);
}

#[tokio::test]
async fn test_tcp_oversized_line_does_not_kill_connection() {
    let mut transport = TcpLineTransport::bind_with_limit("127.0.0.1:0", 32)
        .await
        .unwrap();
    let addr = transport.local_addr().unwrap();

    let server_handle = tokio::spawn(async move {
        transport.accept().await.unwrap().establish().await.unwrap()
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    let server_conn = server_handle.await.unwrap();

    let mut flood = vec![b'A'; 10_000];
    flood.push(b'\n');
    client.write_all(&flood).await.unwrap();
    client.write_all(b"after\n").await.unwrap();

    let err = server_conn.recv().await.unwrap_err();
    assert!(matches!(err, TransportError::FrameTooLong { max: 32 }));
    assert_eq!(server_conn.recv().await.unwrap(), Some(b"after".to_vec()));
}

#[tokio::test]
async fn test_tcp_refuse_sends_notice_then_closes() {
    let mut transport = TcpLineTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let server_handle = tokio::spawn(async move {
        transport.accept().await.unwrap().refuse(b"busy\r\n").await;
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    server_handle.await.unwrap();

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut received))
        .await
        .expect("peer should close")
        .unwrap();
    assert_eq!(received, b"busy\r\n");
}

#[tokio::test]
async fn test_tcp_refuse_with_empty_notice_is_silent() {
    let mut transport = TcpLineTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let server_handle = tokio::spawn(async move {
        transport.accept().await.unwrap().refuse(b"").await;
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    server_handle.await.unwrap();

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut received))
        .await
        .expect("peer should close")
        .unwrap();
    assert!(received.is_empty());
}
