//! Dedicated writer task for the TCP write half.
//!
//! Outbound wire bytes are queued on an unbounded mpsc channel and written
//! by one task, so the socket never awaits a write.
//!
//! # Architecture
//!
//! ```text
//! Socket::send ─► mpsc::UnboundedSender<Bytes> ─► Writer Task ─► TCP write half
//! ```
//!
//! Dropping every sender ends the loop and shuts the write half down, which
//! sends FIN to the gateway.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::Result;

/// Maximum messages coalesced into a single write.
pub const MAX_BATCH_SIZE: usize = 64;

/// Receive queued messages and write them until the channel closes.
pub async fn writer_loop<W>(mut rx: mpsc::UnboundedReceiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(data) => data,
            None => {
                // All senders gone: graceful close.
                writer.shutdown().await?;
                return Ok(());
            }
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);

        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(data) => batch.push(data),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
    }
}

/// Write a batch, coalescing multiple messages into one buffer.
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match batch {
        [] => return Ok(()),
        [single] => writer.write_all(single).await?,
        many => {
            let total = many.iter().map(Bytes::len).sum();
            let mut buf = BytesMut::with_capacity(total);
            for data in many {
                buf.put_slice(data);
            }
            writer.write_all(&buf).await?;
        }
    }

    writer.flush().await?;
    tracing::trace!(messages = batch.len(), "wrote batch");
    Ok(())
}
