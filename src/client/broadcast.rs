//! Broadcast engine
//!
//! Fans one payload out to every registered client except the sender. The
//! registry lock is held for the whole fan-out, so a member cannot be removed
//! and closed while another task is mid-write to it. The cost is that one
//! slow peer delays delivery to everyone for that message.

use log::{debug, warn};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::registry::ClientRegistry;
use crate::client::state::ClientId;

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

async fn deliver<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    writer.write_all(payload).await?;
    writer.flush().await
}

impl<W> ClientRegistry<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Writes `payload` verbatim to every member except `exclude`.
    ///
    /// A failed write is logged and counted; the target stays registered
    /// until its own handler notices the broken connection.
    pub async fn broadcast(&self, payload: &[u8], exclude: ClientId) -> BroadcastReport {
        let mut members = self.lock().await;
        let mut report = BroadcastReport::default();

        for (id, member) in members.iter_mut() {
            if *id == exclude {
                continue;
            }

            match deliver(&mut member.writer, payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Write to client {} failed: {}", member.client(), e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Broadcast of {} bytes from {}: {} delivered, {} failed",
            payload.len(),
            exclude,
            report.delivered,
            report.failed
        );
        report
    }
}
