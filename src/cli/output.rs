//! Display surface for device traffic and session messages.

use crate::domain::profile::DisplayColor;
use crossterm::style::{Color, SetForegroundColor};
use crossterm::terminal::SetTitle;
use crossterm::QueueableCommand;
use std::io::{self, Write};

/// Everything the session renders through: colored text plus the terminal
/// title summarizing the active connection.
pub trait OutputSink: Send {
    fn set_color(&mut self, color: DisplayColor) -> io::Result<()>;
    fn write_text(&mut self, text: &str) -> io::Result<()>;
    fn set_title(&mut self, title: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Console sink writing to stdout via crossterm.
pub struct ConsoleSink {
    out: io::Stdout,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ConsoleSink {
    fn set_color(&mut self, color: DisplayColor) -> io::Result<()> {
        self.out.queue(SetForegroundColor(to_crossterm(color)))?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        self.out.queue(SetTitle(title))?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn to_crossterm(color: DisplayColor) -> Color {
    match color {
        DisplayColor::Black => Color::Black,
        DisplayColor::DarkBlue => Color::DarkBlue,
        DisplayColor::DarkGreen => Color::DarkGreen,
        DisplayColor::DarkCyan => Color::DarkCyan,
        DisplayColor::DarkRed => Color::DarkRed,
        DisplayColor::DarkMagenta => Color::DarkMagenta,
        DisplayColor::DarkYellow => Color::DarkYellow,
        DisplayColor::Gray => Color::Grey,
        DisplayColor::DarkGray => Color::DarkGrey,
        DisplayColor::Blue => Color::Blue,
        DisplayColor::Green => Color::Green,
        DisplayColor::Cyan => Color::Cyan,
        DisplayColor::Red => Color::Red,
        DisplayColor::Magenta => Color::Magenta,
        DisplayColor::Yellow => Color::Yellow,
        DisplayColor::White => Color::White,
    }
}

/// Recording sink for tests: captures every color change, text write and
/// title update in order.
pub mod recording {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum SinkEvent {
        Color(DisplayColor),
        Text(String),
        Title(String),
    }

    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub events: Arc<Mutex<Vec<SinkEvent>>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn rendered_text(&self) -> String {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    SinkEvent::Text(t) => Some(t),
                    _ => None,
                })
                .collect()
        }
    }

    impl OutputSink for RecordingSink {
        fn set_color(&mut self, color: DisplayColor) -> io::Result<()> {
            self.events.lock().unwrap().push(SinkEvent::Color(color));
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> io::Result<()> {
            self.events.lock().unwrap().push(SinkEvent::Text(text.to_string()));
            Ok(())
        }

        fn set_title(&mut self, title: &str) -> io::Result<()> {
            self.events.lock().unwrap().push(SinkEvent::Title(title.to_string()));
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
