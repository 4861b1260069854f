//! The perpetual background receive task.
//!
//! Runs for the whole process lifetime regardless of open/close transitions:
//! idle-polls while the connection is closed, otherwise drains the port and
//! renders under the shared connection lock.

use crate::core::connection::{Connection, IDLE_POLL};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Receive buffer capacity per read.
const RECV_BUFFER: usize = 4096;

/// Drain the port until the running flag clears.
///
/// Reads happen on an independent clone of the handle, outside the lock; only
/// the render step takes it. Read errors are swallowed for the iteration so
/// device removal never kills the loop.
pub async fn run(conn: Arc<Connection>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; RECV_BUFFER];

    while running.load(Ordering::SeqCst) {
        let Some(mut reader) = conn.clone_reader().await else {
            tokio::time::sleep(IDLE_POLL).await;
            continue;
        };

        match reader.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                conn.render_received(&buf[..n]).await;
            }
            Err(ref e) if e.kind() == ErrorKind::TimedOut => {
                // Normal zero-byte timeout; nothing to render this cycle.
                tokio::task::yield_now().await;
            }
            Err(e) => {
                warn!("read failed: {}", e);
                tokio::time::sleep(IDLE_POLL).await;
            }
        }
    }
}
