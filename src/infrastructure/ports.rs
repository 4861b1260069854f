//! Platform serial port access behind a trait seam.
//!
//! `Connection` and the receive loop only ever see `PortOpener`/`PortHandle`,
//! so tests can substitute recording mocks for real hardware.

use crate::domain::error::{ComTermError, ComTermResult};
use crate::domain::profile::{Handshake, Parity, PortProfile, StopBits};
use serialport::SerialPort;
use std::time::Duration;
use tracing::warn;

/// An open platform port: read, write, and an independent clone for the
/// receive loop.
pub trait PortHandle: Send {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
    fn try_clone(&self) -> ComTermResult<Box<dyn PortHandle>>;
}

/// Port enumeration and opening.
pub trait PortOpener: Send + Sync {
    /// Current list of available port names, polled fresh on every call.
    fn enumerate(&self) -> ComTermResult<Vec<String>>;

    /// Open `profile.name` with the profile's line parameters and the given
    /// read/write timeout.
    fn open(&self, profile: &PortProfile, timeout: Duration) -> ComTermResult<Box<dyn PortHandle>>;
}

/// Production opener backed by the serialport crate.
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn enumerate(&self) -> ComTermResult<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, profile: &PortProfile, timeout: Duration) -> ComTermResult<Box<dyn PortHandle>> {
        let data_bits = match profile.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => {
                return Err(ComTermError::device(format!("invalid data bits: {}", other)));
            }
        };

        let parity = match profile.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
            // The platform layer has no mark/space parity
            Parity::Mark | Parity::Space => {
                return Err(ComTermError::device(format!(
                    "{} parity is not supported on this platform",
                    profile.parity
                )));
            }
        };

        let stop_bits = match profile.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
            StopBits::None | StopBits::OnePointFive => {
                return Err(ComTermError::device(format!(
                    "{} stop bits are not supported on this platform",
                    profile.stop_bits
                )));
            }
        };

        let flow_control = match profile.handshake {
            Handshake::None => serialport::FlowControl::None,
            Handshake::XOnXOff => serialport::FlowControl::Software,
            Handshake::RequestToSend => serialport::FlowControl::Hardware,
            Handshake::RequestToSendXOnXOff => {
                warn!("combined RTS+XOn/XOff handshake unavailable, using hardware flow control");
                serialport::FlowControl::Hardware
            }
        };

        let port = serialport::new(&profile.name, profile.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control)
            .timeout(timeout)
            .open()?;

        Ok(Box::new(SystemPort { port }))
    }
}

struct SystemPort {
    port: Box<dyn SerialPort>,
}

impl PortHandle for SystemPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        use std::io::Write;
        self.port.write_all(buf)
    }

    fn try_clone(&self) -> ComTermResult<Box<dyn PortHandle>> {
        let clone = self.port.try_clone()?;
        Ok(Box::new(SystemPort { port: clone }))
    }
}

/// In-memory port implementation for tests: records the profile staged at
/// open, every written chunk, and serves scripted reads.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::io::ErrorKind;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct MockState {
        /// Profiles passed to `open`, in order
        pub staged: Vec<PortProfile>,
        /// Timeouts passed to `open`, in order
        pub timeouts: Vec<Duration>,
        /// Every chunk handed to `write_all`
        pub writes: Vec<Vec<u8>>,
        /// Scripted data returned from `read`, one entry per call
        pub reads: VecDeque<Vec<u8>>,
        /// When set, `open` fails with a device error
        pub fail_open: bool,
    }

    #[derive(Clone)]
    pub struct MockPorts {
        pub state: Arc<Mutex<MockState>>,
        pub ports: Vec<String>,
    }

    impl MockPorts {
        pub fn new(ports: Vec<&str>) -> Self {
            Self {
                state: Arc::new(Mutex::new(MockState::default())),
                ports: ports.into_iter().map(String::from).collect(),
            }
        }

        pub fn push_read(&self, data: &[u8]) {
            self.state.lock().unwrap().reads.push_back(data.to_vec());
        }

        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.state.lock().unwrap().writes.clone()
        }

        pub fn staged(&self) -> Vec<PortProfile> {
            self.state.lock().unwrap().staged.clone()
        }

        pub fn timeouts(&self) -> Vec<Duration> {
            self.state.lock().unwrap().timeouts.clone()
        }

        pub fn fail_next_open(&self) {
            self.state.lock().unwrap().fail_open = true;
        }
    }

    impl PortOpener for MockPorts {
        fn enumerate(&self) -> ComTermResult<Vec<String>> {
            Ok(self.ports.clone())
        }

        fn open(
            &self,
            profile: &PortProfile,
            timeout: Duration,
        ) -> ComTermResult<Box<dyn PortHandle>> {
            let mut state = self.state.lock().unwrap();
            if state.fail_open {
                state.fail_open = false;
                return Err(ComTermError::device("mock open failure"));
            }
            state.staged.push(profile.clone());
            state.timeouts.push(timeout);
            Ok(Box::new(MockHandle {
                state: Arc::clone(&self.state),
            }))
        }
    }

    pub struct MockHandle {
        state: Arc<Mutex<MockState>>,
    }

    impl PortHandle for MockHandle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut state = self.state.lock().unwrap();
            match state.reads.pop_front() {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                None => Err(std::io::Error::new(ErrorKind::TimedOut, "mock timeout")),
            }
        }

        fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
            self.state.lock().unwrap().writes.push(buf.to_vec());
            Ok(())
        }

        fn try_clone(&self) -> ComTermResult<Box<dyn PortHandle>> {
            Ok(Box::new(MockHandle {
                state: Arc::clone(&self.state),
            }))
        }
    }
}
