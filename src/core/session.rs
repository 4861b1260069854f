//! SessionController: interprets interactive input, binding the profile
//! store, connection, codec and settings persistence together.
//!
//! Lines starting with `.` are commands; everything else is payload encoded
//! with the current mode and written to the port.

use crate::cli::help::HELP_TEXT;
use crate::core::connection::Connection;
use crate::domain::error::ComTermResult;
use crate::domain::profile::{
    parse_baud, parse_data_bits, DisplayColor, Handshake, Parity, PortProfile, StopBits,
    BAUD_RATES, DATA_BITS,
};
use crate::infrastructure::settings::SettingsStore;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::warn;

pub struct SessionController {
    conn: Arc<Connection>,
    settings: Box<dyn SettingsStore>,
    running: Arc<AtomicBool>,
}

impl SessionController {
    pub fn new(
        conn: Arc<Connection>,
        settings: Box<dyn SettingsStore>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            conn,
            settings,
            running,
        }
    }

    /// Interactive dispatch loop. Returns on `.exit` or end of input; both
    /// persist settings on the way out.
    pub async fn run<R>(&self, input: R) -> ComTermResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while self.running.load(Ordering::SeqCst) {
            let Some(line) = lines.next_line().await? else {
                break;
            };
            self.dispatch(&line, &mut lines).await;
        }
        self.running.store(false, Ordering::SeqCst);
        self.persist().await;
        Ok(())
    }

    /// Open a port from pre-parsed positional tokens (CLI auto-open).
    pub async fn auto_open(&self, tokens: &[String]) {
        let borrowed: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.open_positional(&borrowed).await;
    }

    async fn dispatch<R>(&self, line: &str, lines: &mut Lines<R>)
    where
        R: AsyncBufRead + Unpin,
    {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('.') else {
            self.send_line(line).await;
            return;
        };

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        match tokens.first().copied() {
            Some("open") if tokens.len() == 1 => self.open_wizard(lines).await,
            Some("open") => self.open_positional(&tokens[1..]).await,
            Some("close") => self.conn.close().await,
            Some("send") => match tokens.get(1) {
                Some(path) => self.send_file(Path::new(path)).await,
                None => self.conn.print("Usage: .send <path>\n").await,
            },
            Some("hex") | Some("bin") => self.set_mode(false).await,
            Some("asc") | Some("text") => self.set_mode(true).await,
            Some("color") => self.set_colors(tokens.get(1).copied(), tokens.get(2).copied()).await,
            Some("ports") => self.list_ports().await,
            Some("status") => self.show_status().await,
            Some("help") => self.conn.print(HELP_TEXT).await,
            Some("exit") => {
                self.running.store(false, Ordering::SeqCst);
                self.persist().await;
            }
            // Unrecognized dot-sequences fall through to the payload path
            _ => self.send_line(line).await,
        }
    }

    async fn send_line(&self, line: &str) {
        match self.conn.send_payload(line).await {
            Ok(_) => {}
            Err(e) => self.conn.print(&format!("Error: {}\n", e)).await,
        }
    }

    async fn send_file(&self, path: &Path) {
        if let Err(e) = self.conn.send_file(path).await {
            self.conn.print(&format!("Error: {}\n", e)).await;
        }
    }

    async fn set_mode(&self, text_mode: bool) {
        if self.conn.update_current(|p| p.text_mode = text_mode).await {
            let label = if text_mode { "text" } else { "hex" };
            self.conn.print(&format!("Mode: {}\n", label)).await;
            self.persist().await;
        } else {
            self.conn.print("No port selected.\n").await;
        }
    }

    async fn set_colors(&self, recv: Option<&str>, send: Option<&str>) {
        // Unrecognized names leave that side unchanged
        let recv_color = recv.and_then(DisplayColor::lookup);
        let send_color = send.and_then(DisplayColor::lookup);
        if let Some(name) = recv.filter(|_| recv_color.is_none()) {
            self.conn
                .print(&format!("Unknown color '{}' ignored.\n", name))
                .await;
        }
        if let Some(name) = send.filter(|_| send_color.is_none()) {
            self.conn
                .print(&format!("Unknown color '{}' ignored.\n", name))
                .await;
        }

        let changed = self
            .conn
            .update_current(|p| {
                if let Some(c) = recv_color {
                    p.receive_color = c;
                }
                if let Some(c) = send_color {
                    p.send_color = c;
                }
            })
            .await;
        if changed {
            self.persist().await;
        } else {
            self.conn.print("No port selected.\n").await;
        }
    }

    async fn list_ports(&self) {
        match self.conn.enumerate() {
            Ok(ports) if ports.is_empty() => {
                self.conn.print("No serial ports found.\n").await;
            }
            Ok(ports) => {
                let mut text = String::from("Available ports:\n");
                for (i, name) in ports.iter().enumerate() {
                    text.push_str(&format!("  {}) {}\n", i + 1, name));
                }
                self.conn.print(&text).await;
            }
            Err(e) => self.conn.print(&format!("Error: {}\n", e)).await,
        }
    }

    async fn show_status(&self) {
        match self.conn.current_profile().await {
            Some(profile) => {
                let state = if self.conn.is_open().await { "open" } else { "closed" };
                let mode = if profile.text_mode { "text" } else { "hex" };
                self.conn
                    .print(&format!(
                        "{} ({}), {} mode, handshake {}, colors {}/{}\n",
                        profile.summary(),
                        state,
                        mode,
                        profile.handshake,
                        profile.receive_color,
                        profile.send_color
                    ))
                    .await;
            }
            None => self.conn.print("No port selected.\n").await,
        }
    }

    /// Non-interactive open: `.open <port> [baud] [bits] [parity] [stop]
    /// [handshake]`. Omitted trailing arguments keep the profile's values;
    /// any invalid argument aborts the whole command before any mutation.
    async fn open_positional(&self, tokens: &[&str]) {
        let Some(port) = tokens.first().copied() else {
            self.conn.print("Usage: .open <port> [baud] [bits] [parity] [stop] [handshake]\n").await;
            return;
        };

        let mut candidate = self
            .conn
            .peek_profile(port)
            .await
            .unwrap_or_else(|| PortProfile::new(port));

        let parsed: ComTermResult<()> = (|| {
            if let Some(t) = tokens.get(1) {
                candidate.baud_rate = parse_baud(t)?;
            }
            if let Some(t) = tokens.get(2) {
                candidate.data_bits = parse_data_bits(t)?;
            }
            if let Some(t) = tokens.get(3) {
                candidate.parity = t.parse::<Parity>()?;
            }
            if let Some(t) = tokens.get(4) {
                candidate.stop_bits = t.parse::<StopBits>()?;
            }
            if let Some(t) = tokens.get(5) {
                candidate.handshake = t.parse::<Handshake>()?;
            }
            Ok(())
        })();

        if let Err(e) = parsed {
            self.conn.print(&format!("Error: {}\n", e)).await;
            return;
        }

        self.configure_and_open(candidate).await;
    }

    /// Interactive wizard: Port -> Baud -> DataBits -> Parity -> StopBits ->
    /// Handshake. Empty keeps the current value, a 1-based index picks from
    /// the listed choices, anything else is parsed as a literal; invalid
    /// entries re-prompt the same field.
    async fn open_wizard<R>(&self, lines: &mut Lines<R>)
    where
        R: AsyncBufRead + Unpin,
    {
        let ports = match self.conn.enumerate() {
            Ok(ports) => ports,
            Err(e) => {
                self.conn.print(&format!("Error: {}\n", e)).await;
                return;
            }
        };

        let baseline = match self.conn.current_profile().await {
            Some(p) => p,
            None => PortProfile::new(ports.first().map(String::as_str).unwrap_or("")),
        };

        let Some(port) = self.prompt_port(lines, &ports, &baseline.name).await else {
            return;
        };

        let mut candidate = self
            .conn
            .peek_profile(&port)
            .await
            .unwrap_or_else(|| PortProfile::new(port.as_str()));

        let baud_choices: Vec<String> = BAUD_RATES.iter().map(u32::to_string).collect();
        let Some(baud) = self
            .prompt_field(lines, "Baud rate", &baud_choices, &candidate.baud_rate.to_string(), |t| {
                parse_baud(t)
            })
            .await
        else {
            return;
        };
        candidate.baud_rate = baud;

        let bit_choices: Vec<String> = DATA_BITS.iter().map(u8::to_string).collect();
        let Some(bits) = self
            .prompt_field(lines, "Data bits", &bit_choices, &candidate.data_bits.to_string(), |t| {
                parse_data_bits(t)
            })
            .await
        else {
            return;
        };
        candidate.data_bits = bits;

        let parity_choices: Vec<String> = Parity::ALL.iter().map(Parity::to_string).collect();
        let Some(parity) = self
            .prompt_field(lines, "Parity", &parity_choices, &candidate.parity.to_string(), |t| {
                t.parse::<Parity>()
            })
            .await
        else {
            return;
        };
        candidate.parity = parity;

        let stop_choices: Vec<String> = StopBits::ALL.iter().map(StopBits::to_string).collect();
        let Some(stop) = self
            .prompt_field(lines, "Stop bits", &stop_choices, &candidate.stop_bits.to_string(), |t| {
                t.parse::<StopBits>()
            })
            .await
        else {
            return;
        };
        candidate.stop_bits = stop;

        let hs_choices: Vec<String> = Handshake::ALL.iter().map(Handshake::to_string).collect();
        let Some(handshake) = self
            .prompt_field(lines, "Handshake", &hs_choices, &candidate.handshake.to_string(), |t| {
                t.parse::<Handshake>()
            })
            .await
        else {
            return;
        };
        candidate.handshake = handshake;

        self.configure_and_open(candidate).await;
    }

    /// Apply a validated candidate profile and open it. The old port is
    /// closed first; success persists the profile collection.
    async fn configure_and_open(&self, candidate: PortProfile) {
        self.conn.close().await;
        self.conn.set_current(&candidate.name).await;
        let fields = candidate.clone();
        self.conn
            .update_current(move |p| {
                p.baud_rate = fields.baud_rate;
                p.data_bits = fields.data_bits;
                p.parity = fields.parity;
                p.stop_bits = fields.stop_bits;
                p.handshake = fields.handshake;
            })
            .await;

        match self.conn.open().await {
            Ok(()) => self.persist().await,
            Err(e) => self.conn.print(&format!("Error: {}\n", e)).await,
        }
    }

    async fn prompt_port<R>(
        &self,
        lines: &mut Lines<R>,
        ports: &[String],
        current: &str,
    ) -> Option<String>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let mut text = String::from("Port");
            if !current.is_empty() {
                text.push_str(&format!(" (current: {})", current));
            }
            text.push_str(":\n");
            for (i, name) in ports.iter().enumerate() {
                text.push_str(&format!("  {}) {}\n", i + 1, name));
            }
            text.push_str("> ");
            self.conn.print(&text).await;

            let line = self.read_line(lines).await?;
            let token = line.trim();
            if token.is_empty() {
                if current.is_empty() {
                    continue;
                }
                return Some(current.to_string());
            }
            if let Ok(index) = token.parse::<usize>() {
                if (1..=ports.len()).contains(&index) {
                    return Some(ports[index - 1].clone());
                }
                self.conn.print("No such port index.\n").await;
                continue;
            }
            return Some(token.to_string());
        }
    }

    async fn prompt_field<R, T, F>(
        &self,
        lines: &mut Lines<R>,
        label: &str,
        choices: &[String],
        current: &str,
        parse: F,
    ) -> Option<T>
    where
        R: AsyncBufRead + Unpin,
        F: Fn(&str) -> ComTermResult<T>,
    {
        loop {
            let mut text = format!("{} (current: {}):\n", label, current);
            for (i, choice) in choices.iter().enumerate() {
                text.push_str(&format!("  {}) {}\n", i + 1, choice));
            }
            text.push_str("> ");
            self.conn.print(&text).await;

            let line = self.read_line(lines).await?;
            let token = line.trim();
            if token.is_empty() {
                match parse(current) {
                    Ok(value) => return Some(value),
                    Err(_) => continue,
                }
            }
            // A 1-based index selects from the list, last entry included;
            // anything out of range is retried as a literal value.
            if let Ok(index) = token.parse::<usize>() {
                if (1..=choices.len()).contains(&index) {
                    if let Ok(value) = parse(&choices[index - 1]) {
                        return Some(value);
                    }
                }
            }
            match parse(token) {
                Ok(value) => return Some(value),
                Err(e) => self.conn.print(&format!("{}\n", e)).await,
            }
        }
    }

    async fn read_line<R>(&self, lines: &mut Lines<R>) -> Option<String>
    where
        R: AsyncBufRead + Unpin,
    {
        match lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("input error: {}", e);
                None
            }
        }
    }

    async fn persist(&self) {
        let profiles = self.conn.profiles_snapshot().await;
        if let Err(e) = self.settings.save(&profiles) {
            warn!("failed to save settings: {}", e);
            self.conn
                .print(&format!("Warning: settings not saved: {}\n", e))
                .await;
        }
    }
}
