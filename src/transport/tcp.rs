//! TCP transport on tokio.
//!
//! `connect()` spawns one connection task that:
//!
//! 1. connects to the gateway and reports `Established`
//! 2. hands the write half to the writer task
//! 3. reads into 64KB chunks, reporting each as `Data`
//! 4. reports `End` on EOF, or `Error` + `Close` on failure
//!
//! Events are delivered on an unbounded channel; the owner of the event loop
//! feeds them to the socket in arrival order.
//!
//! # Example
//!
//! ```ignore
//! use tws_wire::transport::{TcpTransport, Transport};
//!
//! let (mut transport, mut events) = TcpTransport::channel();
//! transport.connect("127.0.0.1", 7497)?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

use std::io;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use super::{Transport, TransportEvent};
use crate::error::{Result, WireError};
use crate::writer::writer_loop;

/// Read buffer size.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Tokio TCP implementation of [`Transport`].
pub struct TcpTransport {
    /// Where transport events are reported.
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Outbound queue of the current connection; `None` once closed.
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
    /// Connection task of the current connection.
    task: Option<JoinHandle<()>>,
}

impl TcpTransport {
    /// Create a transport reporting to `events`.
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            outbound: None,
            task: None,
        }
    }

    /// Create a transport together with its event receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Check if a connection task is running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn abort(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        // A stale task would report events for the old connection.
        self.abort();

        let (tx, rx) = mpsc::unbounded_channel();
        let addr = format!("{}:{}", host, port);
        let events = self.events.clone();

        tracing::debug!(%addr, "connecting");
        self.outbound = Some(tx);
        self.task = Some(tokio::spawn(connection_task(addr, rx, events)));
        Ok(())
    }

    fn write(&mut self, data: Bytes) -> Result<()> {
        let outbound = self.outbound.as_ref().ok_or(WireError::NotConnected)?;
        outbound
            .send(data)
            .map_err(|_| WireError::ConnectionClosed)
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the sender lets the writer flush and send FIN.
        if self.outbound.take().is_none() {
            return Err(WireError::NotConnected);
        }
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Lifetime of one TCP connection.
///
/// Every event of the connection is sent from this task, so nothing can be
/// reported after the closing `End` / `Close`.
async fn connection_task(
    addr: String,
    outbound: mpsc::UnboundedReceiver<Bytes>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(%addr, "connect failed: {}", e);
            let _ = events.send(TransportEvent::Error(e));
            let _ = events.send(TransportEvent::Close);
            return;
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("set_nodelay failed: {}", e);
    }

    let _ = events.send(TransportEvent::Established);

    let (mut reader, write_half) = stream.into_split();
    let mut writer = tokio::spawn(writer_loop(outbound, write_half));
    let mut writer_done = false;

    let closing = tokio::select! {
        closing = read_loop(&mut reader, &events) => closing,
        joined = &mut writer => {
            writer_done = true;
            match writer_failure(joined) {
                // Our side finished sending; wait for the peer to close.
                None => read_loop(&mut reader, &events).await,
                Some(e) => {
                    tracing::error!("Writer error: {}", e);
                    let _ = events.send(TransportEvent::Error(e));
                    TransportEvent::Close
                }
            }
        }
    };

    if !writer_done {
        writer.abort();
    }
    let _ = events.send(closing);
}

/// Turn the writer task's outcome into the error to report, if any.
fn writer_failure(joined: std::result::Result<Result<()>, JoinError>) -> Option<io::Error> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(WireError::Io(e))) => Some(e),
        Ok(Err(other)) => Some(io::Error::other(other.to_string())),
        Err(e) => Some(io::Error::other(e.to_string())),
    }
}

/// Forward reads as `Data` events. Returns the closure event to report.
async fn read_loop(
    reader: &mut OwnedReadHalf,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> TransportEvent {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => return TransportEvent::End,
            Ok(n) => {
                tracing::trace!(bytes = n, "read");
                if events
                    .send(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    // Nobody is listening any more.
                    return TransportEvent::Close;
                }
            }
            Err(e) => {
                tracing::warn!("Read error: {}", e);
                let _ = events.send(TransportEvent::Error(e));
                return TransportEvent::Close;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn next(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("transport event")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_write_before_connect_fails() {
        let (mut transport, _rx) = TcpTransport::channel();
        assert!(matches!(
            transport.write(Bytes::from_static(b"x")),
            Err(WireError::NotConnected)
        ));
        assert!(matches!(transport.close(), Err(WireError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_refused_reports_error_then_close() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (mut transport, mut rx) = TcpTransport::channel();
        transport.connect("127.0.0.1", port).unwrap();

        assert!(matches!(next(&mut rx).await, TransportEvent::Error(_)));
        assert!(matches!(next(&mut rx).await, TransportEvent::Close));
    }

    #[tokio::test]
    async fn test_round_trip_and_graceful_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            socket.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"76\0");
            socket.write_all(b"176\0").await.unwrap();
            // Wait for the client's FIN, then close.
            let mut rest = Vec::new();
            socket.read_to_end(&mut rest).await.unwrap();
        });

        let (mut transport, mut rx) = TcpTransport::channel();
        transport.connect("127.0.0.1", port).unwrap();

        assert!(matches!(next(&mut rx).await, TransportEvent::Established));
        transport.write(Bytes::from_static(b"76\0")).unwrap();

        match next(&mut rx).await {
            TransportEvent::Data(data) => assert_eq!(&data[..], b"176\0"),
            other => panic!("unexpected event {:?}", other),
        }

        transport.close().unwrap();
        assert!(matches!(next(&mut rx).await, TransportEvent::End));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_nothing_reported_after_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let (mut transport, mut rx) = TcpTransport::channel();
        transport.connect("127.0.0.1", port).unwrap();

        assert!(matches!(next(&mut rx).await, TransportEvent::Established));
        assert!(matches!(next(&mut rx).await, TransportEvent::End));
        server.await.unwrap();

        // The writer is gone with the connection.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(
            transport.write(Bytes::from_static(b"1\0")),
            Err(WireError::ConnectionClosed)
        ));
        assert!(tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err());
    }
}
