//! Connection: owner of the serial port handle and the single lock that
//! serializes every touch of the current profile, the handle, and the output
//! surface.
//!
//! The lock is a stable guard owned by the Connection itself; the profile
//! instances inside it can be replaced freely without affecting locking.

use crate::cli::output::OutputSink;
use crate::core::codec;
use crate::domain::error::{ComTermError, ComTermResult};
use crate::domain::profile::{PortProfile, ProfileStore};
use crate::infrastructure::ports::{PortHandle, PortOpener};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Fixed read/write timeout applied to the platform handle at open.
pub const IO_TIMEOUT: Duration = Duration::from_millis(1000);

/// Backoff between receive-loop polls while the connection is closed.
pub const IDLE_POLL: Duration = Duration::from_millis(50);

/// File streaming chunk size for the `.send` command.
pub const SEND_CHUNK: usize = 1024;

/// State guarded by the connection lock.
struct Shared {
    profiles: ProfileStore,
    current: Option<String>,
    handle: Option<Box<dyn PortHandle>>,
    sink: Box<dyn OutputSink>,
}

impl Shared {
    fn current_profile(&self) -> Option<&PortProfile> {
        self.current.as_deref().and_then(|name| self.profiles.get(name))
    }
}

pub struct Connection {
    shared: Mutex<Shared>,
    opener: Box<dyn PortOpener>,
}

impl Connection {
    pub fn new(
        opener: Box<dyn PortOpener>,
        sink: Box<dyn OutputSink>,
        profiles: ProfileStore,
    ) -> Self {
        Self {
            shared: Mutex::new(Shared {
                profiles,
                current: None,
                handle: None,
                sink,
            }),
            opener,
        }
    }

    /// Fresh enumeration of available port names.
    pub fn enumerate(&self) -> ComTermResult<Vec<String>> {
        self.opener.enumerate()
    }

    pub async fn is_open(&self) -> bool {
        self.shared.lock().await.handle.is_some()
    }

    pub async fn current_name(&self) -> Option<String> {
        self.shared.lock().await.current.clone()
    }

    pub async fn current_profile(&self) -> Option<PortProfile> {
        self.shared.lock().await.current_profile().cloned()
    }

    /// Bind a port name as the current profile, creating the profile on
    /// first observation. A different port being open is closed first.
    pub async fn set_current(&self, name: &str) {
        let mut shared = self.shared.lock().await;
        let switching = shared.current.as_deref() != Some(name);
        if switching && shared.handle.take().is_some() {
            info!(port = ?shared.current, "closed port before rebinding");
            let _ = shared.sink.set_title("Closed");
        }
        shared.profiles.ensure(name);
        shared.current = Some(name.to_string());
    }

    /// Mutate the current profile under the lock. Returns false when no
    /// profile is bound. The sink's foreground color is re-applied afterwards
    /// so a color change takes effect immediately.
    pub async fn update_current<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut PortProfile),
    {
        let mut shared = self.shared.lock().await;
        let Some(name) = shared.current.clone() else {
            return false;
        };
        let profile = shared.profiles.ensure(&name);
        f(profile);
        let send_color = profile.send_color;
        let _ = shared.sink.set_color(send_color);
        let _ = shared.sink.flush();
        true
    }

    /// Name-sorted snapshot of all profiles, for persistence.
    pub async fn profiles_snapshot(&self) -> Vec<PortProfile> {
        self.shared.lock().await.profiles.to_vec()
    }

    /// Copy of the profile for `name` without rebinding the current port.
    pub async fn peek_profile(&self, name: &str) -> Option<PortProfile> {
        self.shared.lock().await.profiles.get(name).cloned()
    }

    /// Open the current profile's port. Valid only while closed; the staged
    /// line parameters and the fixed timeout are applied by the opener.
    pub async fn open(&self) -> ComTermResult<()> {
        let mut shared = self.shared.lock().await;
        if shared.handle.is_some() {
            return Err(ComTermError::device("port is already open"));
        }
        let profile = shared
            .current_profile()
            .cloned()
            .ok_or_else(|| ComTermError::device("no port selected"))?;

        let handle = self.opener.open(&profile, IO_TIMEOUT)?;
        shared.handle = Some(handle);
        info!(port = %profile.name, baud = profile.baud_rate, "port opened");

        shared.sink.set_title(&profile.summary())?;
        shared.sink.set_color(profile.send_color)?;
        shared
            .sink
            .write_text(&format!("Connected: {}\n", profile.summary()))?;
        shared.sink.flush()?;
        Ok(())
    }

    /// Release the handle if open. Idempotent; never fails.
    pub async fn close(&self) {
        let mut shared = self.shared.lock().await;
        if shared.handle.take().is_some() {
            info!(port = ?shared.current, "port closed");
        }
        let _ = shared.sink.set_title("Closed");
        let _ = shared.sink.flush();
    }

    /// Write raw bytes to the open port. A closed port swallows the write
    /// silently; the operator may type ahead before opening.
    pub async fn write(&self, bytes: &[u8]) -> ComTermResult<()> {
        let mut shared = self.shared.lock().await;
        if let Some(handle) = shared.handle.as_mut() {
            handle
                .write_all(bytes)
                .map_err(|e| ComTermError::device(format!("write failed: {}", e)))?;
            debug!(len = bytes.len(), "sent bytes");
        }
        Ok(())
    }

    /// Encode a payload line with the current mode and write it. Returns the
    /// number of bytes written (zero when closed). Encoding failures surface
    /// before anything is transmitted.
    pub async fn send_payload(&self, line: &str) -> ComTermResult<usize> {
        let mut shared = self.shared.lock().await;
        let text_mode = shared.current_profile().map(|p| p.text_mode).unwrap_or(true);
        let bytes = codec::encode_for_send(line, text_mode)?;
        match shared.handle.as_mut() {
            Some(handle) => {
                handle
                    .write_all(&bytes)
                    .map_err(|e| ComTermError::device(format!("write failed: {}", e)))?;
                debug!(len = bytes.len(), "sent payload");
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }

    /// Stream a file's raw bytes to the open port in fixed-size chunks,
    /// regardless of text/hex mode. Holds the lock for the whole transfer so
    /// no render interleaves mid-dump.
    pub async fn send_file(&self, path: &Path) -> ComTermResult<()> {
        let mut shared = self.shared.lock().await;
        if shared.handle.is_none() {
            shared
                .sink
                .write_text("Port is closed; nothing sent.\n")?;
            shared.sink.flush()?;
            return Ok(());
        }

        let mut file = File::open(path)?;
        let mut buf = [0u8; SEND_CHUNK];
        let mut total = 0usize;
        let handle = shared
            .handle
            .as_mut()
            .ok_or_else(|| ComTermError::device("port closed mid-transfer"))?;
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            handle
                .write_all(&buf[..n])
                .map_err(|e| ComTermError::device(format!("write failed: {}", e)))?;
            total += n;
        }

        info!(path = %path.display(), total, "file streamed");
        shared
            .sink
            .write_text(&format!("Sent {} bytes from {}\n", total, path.display()))?;
        shared.sink.flush()?;
        Ok(())
    }

    /// Independent handle for the receive loop, or None while closed.
    pub async fn clone_reader(&self) -> Option<Box<dyn PortHandle>> {
        let shared = self.shared.lock().await;
        let handle = shared.handle.as_ref()?;
        match handle.try_clone() {
            Ok(clone) => Some(clone),
            Err(e) => {
                warn!("failed to clone port handle for reader: {}", e);
                None
            }
        }
    }

    /// Render received bytes: receive color, decoded text, back to send
    /// color, all under the lock. Sink failures are logged, never fatal.
    pub async fn render_received(&self, bytes: &[u8]) {
        let mut shared = self.shared.lock().await;
        let (recv_color, send_color, text_mode) = match shared.current_profile() {
            Some(p) => (p.receive_color, p.send_color, p.text_mode),
            None => return,
        };
        let text = codec::decode_for_display(bytes, text_mode);

        fn render(
            sink: &mut dyn OutputSink,
            recv: crate::domain::profile::DisplayColor,
            send: crate::domain::profile::DisplayColor,
            text: &str,
        ) -> std::io::Result<()> {
            sink.set_color(recv)?;
            sink.write_text(text)?;
            sink.set_color(send)?;
            sink.flush()
        }

        if let Err(e) = render(shared.sink.as_mut(), recv_color, send_color, &text) {
            warn!("render failed: {}", e);
        }
    }

    /// Write a session message to the output surface.
    pub async fn print(&self, text: &str) {
        let mut shared = self.shared.lock().await;
        let _ = shared.sink.write_text(text);
        let _ = shared.sink.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::recording::RecordingSink;
    use crate::domain::profile::{DisplayColor, Handshake, Parity, StopBits};
    use crate::infrastructure::ports::mock::MockPorts;
    use std::io::Write;
    use std::sync::Arc;

    fn test_connection(opener: MockPorts) -> (Arc<Connection>, RecordingSink) {
        let sink = RecordingSink::new();
        let conn = Arc::new(Connection::new(
            Box::new(opener),
            Box::new(sink.clone()),
            ProfileStore::new(),
        ));
        (conn, sink)
    }

    #[tokio::test]
    async fn test_open_stages_exact_profile_values() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, _sink) = test_connection(opener.clone());

        conn.set_current("COM1").await;
        conn.update_current(|p| {
            p.baud_rate = 57600;
            p.data_bits = 7;
            p.parity = Parity::Odd;
            p.stop_bits = StopBits::Two;
            p.handshake = Handshake::XOnXOff;
        })
        .await;
        conn.open().await.unwrap();

        let staged = opener.staged();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].name, "COM1");
        assert_eq!(staged[0].baud_rate, 57600);
        assert_eq!(staged[0].data_bits, 7);
        assert_eq!(staged[0].parity, Parity::Odd);
        assert_eq!(staged[0].stop_bits, StopBits::Two);
        assert_eq!(staged[0].handshake, Handshake::XOnXOff);
        assert_eq!(opener.timeouts(), vec![IO_TIMEOUT]);
        assert!(conn.is_open().await);
    }

    #[tokio::test]
    async fn test_open_failure_stays_closed() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, _sink) = test_connection(opener.clone());

        conn.set_current("COM1").await;
        opener.fail_next_open();
        assert!(conn.open().await.is_err());
        assert!(!conn.is_open().await);

        // A later attempt succeeds
        conn.open().await.unwrap();
        assert!(conn.is_open().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, _sink) = test_connection(opener);

        conn.close().await;
        conn.close().await;
        assert!(!conn.is_open().await);
    }

    #[tokio::test]
    async fn test_write_when_closed_is_silent_noop() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, _sink) = test_connection(opener.clone());

        conn.set_current("COM1").await;
        conn.write(b"ahead of open").await.unwrap();
        assert!(opener.writes().is_empty());
    }

    #[tokio::test]
    async fn test_switching_port_closes_old_handle() {
        let opener = MockPorts::new(vec!["COM1", "COM2"]);
        let (conn, _sink) = test_connection(opener);

        conn.set_current("COM1").await;
        conn.open().await.unwrap();
        assert!(conn.is_open().await);

        conn.set_current("COM2").await;
        assert!(!conn.is_open().await);
        assert_eq!(conn.current_name().await.as_deref(), Some("COM2"));
    }

    #[tokio::test]
    async fn test_payload_encoding_error_sends_nothing() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, _sink) = test_connection(opener.clone());

        conn.set_current("COM1").await;
        conn.update_current(|p| p.text_mode = false).await;
        conn.open().await.unwrap();

        assert!(matches!(
            conn.send_payload("41 4").await,
            Err(ComTermError::Decode { index: 3 })
        ));
        assert!(opener.writes().is_empty());

        assert_eq!(conn.send_payload("4142").await.unwrap(), 2);
        assert_eq!(opener.writes(), vec![b"AB".to_vec()]);
    }

    #[tokio::test]
    async fn test_send_file_chunks() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, sink) = test_connection(opener.clone());

        conn.set_current("COM1").await;
        conn.open().await.unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0xA5u8; 2500]).unwrap();
        file.flush().unwrap();

        conn.send_file(file.path()).await.unwrap();

        let chunks: Vec<usize> = opener.writes().iter().map(|w| w.len()).collect();
        assert_eq!(chunks, vec![1024, 1024, 452]);
        assert!(sink.rendered_text().contains("Sent 2500 bytes"));
    }

    #[tokio::test]
    async fn test_send_file_closed_port_is_noop_with_message() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, sink) = test_connection(opener.clone());

        conn.set_current("COM1").await;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"data").unwrap();

        conn.send_file(file.path()).await.unwrap();
        assert!(opener.writes().is_empty());
        assert!(sink.rendered_text().contains("closed"));
    }

    #[tokio::test]
    async fn test_color_change_waits_for_in_flight_render() {
        let opener = MockPorts::new(vec!["COM1"]);
        let (conn, _sink) = test_connection(opener);
        conn.set_current("COM1").await;

        // Simulate a render holding the lock
        let guard = conn.shared.lock().await;

        let conn2 = Arc::clone(&conn);
        let color_task = tokio::spawn(async move {
            conn2
                .update_current(|p| p.receive_color = DisplayColor::Red)
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!color_task.is_finished());

        drop(guard);
        assert!(color_task.await.unwrap());
        assert_eq!(
            conn.current_profile().await.unwrap().receive_color,
            DisplayColor::Red
        );
    }
}
