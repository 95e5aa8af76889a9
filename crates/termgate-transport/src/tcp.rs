//! Raw TCP transport: newline-delimited frames over a plain byte stream.
//!
//! This is what a `telnet` or `nc` client talks to. Each client frame is one
//! line terminated by `\n` (an optional trailing `\r` is dropped). Frames
//! longer than the configured bound are discarded up to the next delimiter
//! and reported as [`TransportError::FrameTooLong`].

use std::net::SocketAddr;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{
    Connection, ConnectionId, DEFAULT_MAX_FRAME_LEN, Incoming, Transport,
    TransportError,
};

/// A line-framed TCP [`Transport`].
pub struct TcpLineTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpLineTransport {
    /// Binds to `addr` with the default frame bound.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_limit(addr, DEFAULT_MAX_FRAME_LEN).await
    }

    /// Binds to `addr`, accepting client lines of at most `max_frame_len`
    /// bytes (delimiter excluded).
    pub async fn bind_with_limit(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP line transport listening");
        Ok(Self {
            listener,
            max_frame_len,
        })
    }
}

impl Transport for TcpLineTransport {
    type Incoming = TcpIncoming;
    type Connection = TcpLineConnection;

    async fn accept(&mut self) -> Result<TcpIncoming, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(TcpIncoming {
            stream,
            peer,
            max_frame_len: self.max_frame_len,
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// An accepted TCP peer that has not been given a session yet.
pub struct TcpIncoming {
    stream: TcpStream,
    peer: SocketAddr,
    max_frame_len: usize,
}

impl Incoming for TcpIncoming {
    type Connection = TcpLineConnection;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn establish(self) -> Result<TcpLineConnection, TransportError> {
        // Interactive traffic: small frames should not wait for Nagle.
        let _ = self.stream.set_nodelay(true);
        let (read, write) = self.stream.into_split();
        let id = ConnectionId::next();
        tracing::debug!(%id, peer = %self.peer, "accepted TCP connection");

        Ok(TcpLineConnection {
            id,
            peer: self.peer,
            max_frame_len: self.max_frame_len,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
        })
    }

    async fn refuse(self, notice: &[u8]) {
        let mut stream = self.stream;
        if !notice.is_empty() {
            let _ = stream.write_all(notice).await;
        }
        let _ = stream.shutdown().await;
    }
}

/// A single line-framed TCP connection.
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: SocketAddr,
    max_frame_len: usize,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection for TcpLineConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        read_line_frame(&mut *reader, self.max_frame_len).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Reads one `\n`-terminated frame of at most `max` bytes.
async fn read_line_frame<R>(
    reader: &mut R,
    max: usize,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    // Room for the payload plus "\r\n".
    let limit = max as u64 + 2;
    let read = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut buf)
        .await
        .map_err(TransportError::ReceiveFailed)?;

    if read == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.len() > max {
            return Err(TransportError::FrameTooLong { max });
        }
        return Ok(Some(buf));
    }

    if buf.len() as u64 >= limit {
        discard_until_newline(reader).await?;
        return Err(TransportError::FrameTooLong { max });
    }

    // EOF in the middle of a line: hand over what arrived, the next read
    // reports the close.
    Ok(Some(buf))
}

/// Drops buffered input up to and including the next `\n`.
async fn discard_until_newline<R>(reader: &mut R) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (found, used) = {
            let available = reader
                .fill_buf()
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}
