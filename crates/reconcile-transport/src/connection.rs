//! A framed TCP connection with running sent/received byte counters,
//! matching the original's `genSync.Connection` surface (`Connect`/`Listen`,
//! `Send`/`Receive`, `GetSentBytes`/`GetReceivedBytes`, `Close`).
//!
//! `connect` dials out (client role); `listen` binds and accepts exactly one
//! peer (server role) — a reconciliation session is always one connection,
//! not a long-lived listener accepting many.

use crate::control::ControlByte;
use crate::frame::{read_frame, write_frame, FrameError};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("peer sent an unrecognized control byte: {0:#x}")]
    UnknownControl(u8),
}

impl From<ConnectionError> for reconcile_core::error::ReconcileError {
    fn from(e: ConnectionError) -> Self {
        reconcile_core::error::ReconcileError::Transport(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))
    }
}

pub struct Connection {
    stream: TcpStream,
    sent_bytes: u64,
    received_bytes: u64,
}

impl Connection {
    /// Dial out to `addr` (client role in a reconciliation session).
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr).await?;
        tracing::debug!(peer = ?stream.peer_addr().ok(), "connected");
        Ok(Self {
            stream,
            sent_bytes: 0,
            received_bytes: 0,
        })
    }

    /// Bind to `addr` and accept exactly one incoming connection (server
    /// role in a reconciliation session).
    pub async fn listen<A: ToSocketAddrs>(addr: A) -> Result<Self, ConnectionError> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        tracing::info!(%local, "listening for a reconciliation peer");
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted a reconciliation peer");
        Ok(Self {
            stream,
            sent_bytes: 0,
            received_bytes: 0,
        })
    }

    pub async fn send(&mut self, data: &[u8]) -> Result<usize, ConnectionError> {
        let n = write_frame(&mut self.stream, data).await?;
        self.sent_bytes += n as u64;
        Ok(n)
    }

    pub async fn receive(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let (payload, n) = read_frame(&mut self.stream).await?;
        self.received_bytes += n as u64;
        Ok(payload)
    }

    pub async fn send_control(&mut self, control: ControlByte) -> Result<(), ConnectionError> {
        self.send(&[control.as_byte()]).await?;
        Ok(())
    }

    pub async fn recv_control(&mut self) -> Result<ControlByte, ConnectionError> {
        let payload = self.receive().await?;
        match payload.first() {
            Some(&b) => ControlByte::from_byte(b).ok_or(ConnectionError::UnknownControl(b)),
            None => Err(ConnectionError::UnknownControl(0)),
        }
    }

    /// `sendSkip` (§4.4): sends `SKIP` if `cond` else `CONTINUE`, logging
    /// `info` at INFO when sending `SKIP`.
    pub async fn send_skip(&mut self, cond: bool, info: &str) -> Result<(), ConnectionError> {
        if cond {
            tracing::info!(info, "sending SKIP");
            self.send_control(ControlByte::Skip).await
        } else {
            self.send_control(ControlByte::Continue).await
        }
    }

    /// `recvSkip` (§4.4): returns true iff the received control byte is
    /// `SKIP`, logging `info` at INFO in that case.
    pub async fn recv_skip(&mut self, info: &str) -> Result<bool, ConnectionError> {
        let status = self.recv_control().await?;
        if status.is_skip() {
            tracing::info!(info, "received SKIP");
        }
        Ok(status.is_skip())
    }

    pub async fn send_u64(&mut self, value: u64) -> Result<(), ConnectionError> {
        self.send(&value.to_le_bytes()).await?;
        Ok(())
    }

    pub async fn recv_u64(&mut self) -> Result<u64, ConnectionError> {
        let bytes = self.receive().await?;
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(u64::from_le_bytes(buf))
    }

    /// `sendBytesSlice` (§4.4): a leading `u32` count frame followed by
    /// `count` length-prefixed payload frames.
    pub async fn send_payload_vec(&mut self, payloads: &[Vec<u8>]) -> Result<(), ConnectionError> {
        self.send(&(payloads.len() as u32).to_le_bytes()).await?;
        for payload in payloads {
            self.send(payload).await?;
        }
        Ok(())
    }

    /// `recvBytesSlice` (§4.4), the inverse of [`Connection::send_payload_vec`].
    pub async fn recv_payload_vec(&mut self) -> Result<Vec<Vec<u8>>, ConnectionError> {
        let count_bytes = self.receive().await?;
        let mut buf = [0u8; 4];
        let n = count_bytes.len().min(4);
        buf[..n].copy_from_slice(&count_bytes[..n]);
        let count = u32::from_le_bytes(buf);

        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(self.receive().await?);
        }
        Ok(out)
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    /// Shut down the write half cleanly; dropping the `Connection` closes
    /// the rest.
    pub async fn close(mut self) -> Result<(), ConnectionError> {
        use tokio::io::AsyncWriteExt;
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_server_round_trip_tracks_byte_counters() {
        let addr = "127.0.0.1:18733";
        let server_fut = tokio::spawn(async move { Connection::listen(addr).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut client = Connection::connect(addr).await.unwrap();
        let mut server = server_fut.await.unwrap().unwrap();

        client.send(b"ping").await.unwrap();
        let received = server.receive().await.unwrap();
        assert_eq!(received, b"ping");
        assert!(server.received_bytes() > 0);
        assert!(client.sent_bytes() > 0);

        server.send(b"pong").await.unwrap();
        let received = client.receive().await.unwrap();
        assert_eq!(received, b"pong");
    }

    #[tokio::test]
    async fn control_bytes_round_trip() {
        let addr = "127.0.0.1:18734";
        let server_fut = tokio::spawn(async move { Connection::listen(addr).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut client = Connection::connect(addr).await.unwrap();
        let mut server = server_fut.await.unwrap().unwrap();

        client.send_control(ControlByte::Skip).await.unwrap();
        let got = server.recv_control().await.unwrap();
        assert_eq!(got, ControlByte::Skip);
    }

    #[tokio::test]
    async fn u64_and_payload_vec_round_trip() {
        let addr = "127.0.0.1:18735";
        let server_fut = tokio::spawn(async move { Connection::listen(addr).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut client = Connection::connect(addr).await.unwrap();
        let mut server = server_fut.await.unwrap().unwrap();

        client.send_u64(0xdead_beef).await.unwrap();
        assert_eq!(server.recv_u64().await.unwrap(), 0xdead_beef);

        let payloads = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];
        client.send_payload_vec(&payloads).await.unwrap();
        assert_eq!(server.recv_payload_vec().await.unwrap(), payloads);
    }

    #[tokio::test]
    async fn send_skip_logs_and_recv_skip_reports_control() {
        let addr = "127.0.0.1:18736";
        let server_fut = tokio::spawn(async move { Connection::listen(addr).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut client = Connection::connect(addr).await.unwrap();
        let mut server = server_fut.await.unwrap().unwrap();

        client.send_skip(true, "freeze-local").await.unwrap();
        assert!(server.recv_skip("freeze-local").await.unwrap());
    }
}
