use crate::domain::error::{ComTermError, ComTermResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Baud rates accepted for a port profile
pub const BAUD_RATES: [u32; 11] = [
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200,
];

/// Data bit counts accepted for a port profile
pub const DATA_BITS: [u8; 4] = [5, 6, 7, 8];

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    pub const ALL: [Parity; 5] = [
        Parity::None,
        Parity::Odd,
        Parity::Even,
        Parity::Mark,
        Parity::Space,
    ];
}

impl FromStr for Parity {
    type Err = ComTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            _ => Err(ComTermError::validation(format!(
                "'{}' is not a parity (none, odd, even, mark, space)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => write!(f, "None"),
            Parity::Odd => write!(f, "Odd"),
            Parity::Even => write!(f, "Even"),
            Parity::Mark => write!(f, "Mark"),
            Parity::Space => write!(f, "Space"),
        }
    }
}

/// Stop bit setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    None,
    #[default]
    One,
    Two,
    #[serde(rename = "onepointfive")]
    OnePointFive,
}

impl StopBits {
    pub const ALL: [StopBits; 4] = [
        StopBits::None,
        StopBits::One,
        StopBits::Two,
        StopBits::OnePointFive,
    ];
}

impl FromStr for StopBits {
    type Err = ComTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(StopBits::None),
            "one" | "1" => Ok(StopBits::One),
            "two" | "2" => Ok(StopBits::Two),
            "onepointfive" | "1.5" => Ok(StopBits::OnePointFive),
            _ => Err(ComTermError::validation(format!(
                "'{}' is not a stop bit count (none, one, two, onepointfive)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StopBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopBits::None => write!(f, "None"),
            StopBits::One => write!(f, "One"),
            StopBits::Two => write!(f, "Two"),
            StopBits::OnePointFive => write!(f, "OnePointFive"),
        }
    }
}

/// Handshake (flow control) setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Handshake {
    #[default]
    None,
    #[serde(rename = "xonxoff")]
    XOnXOff,
    #[serde(rename = "requesttosend")]
    RequestToSend,
    #[serde(rename = "requesttosendxonxoff")]
    RequestToSendXOnXOff,
}

impl Handshake {
    pub const ALL: [Handshake; 4] = [
        Handshake::None,
        Handshake::XOnXOff,
        Handshake::RequestToSend,
        Handshake::RequestToSendXOnXOff,
    ];
}

impl FromStr for Handshake {
    type Err = ComTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Handshake::None),
            "xonxoff" => Ok(Handshake::XOnXOff),
            "requesttosend" | "rts" => Ok(Handshake::RequestToSend),
            "requesttosendxonxoff" | "rtsxonxoff" => Ok(Handshake::RequestToSendXOnXOff),
            _ => Err(ComTermError::validation(format!(
                "'{}' is not a handshake (none, xonxoff, requesttosend, requesttosendxonxoff)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handshake::None => write!(f, "None"),
            Handshake::XOnXOff => write!(f, "XOnXOff"),
            Handshake::RequestToSend => write!(f, "RequestToSend"),
            Handshake::RequestToSendXOnXOff => write!(f, "RequestToSendXOnXOff"),
        }
    }
}

/// Console display color, the classic 16-entry console set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

impl DisplayColor {
    pub const ALL: [DisplayColor; 16] = [
        DisplayColor::Black,
        DisplayColor::DarkBlue,
        DisplayColor::DarkGreen,
        DisplayColor::DarkCyan,
        DisplayColor::DarkRed,
        DisplayColor::DarkMagenta,
        DisplayColor::DarkYellow,
        DisplayColor::Gray,
        DisplayColor::DarkGray,
        DisplayColor::Blue,
        DisplayColor::Green,
        DisplayColor::Cyan,
        DisplayColor::Red,
        DisplayColor::Magenta,
        DisplayColor::Yellow,
        DisplayColor::White,
    ];

    /// Case-insensitive name lookup; `None` when the name is not in the set.
    pub fn lookup(name: &str) -> Option<DisplayColor> {
        let lowered = name.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.to_string().to_ascii_lowercase() == lowered)
    }
}

impl std::fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DisplayColor::Black => "Black",
            DisplayColor::DarkBlue => "DarkBlue",
            DisplayColor::DarkGreen => "DarkGreen",
            DisplayColor::DarkCyan => "DarkCyan",
            DisplayColor::DarkRed => "DarkRed",
            DisplayColor::DarkMagenta => "DarkMagenta",
            DisplayColor::DarkYellow => "DarkYellow",
            DisplayColor::Gray => "Gray",
            DisplayColor::DarkGray => "DarkGray",
            DisplayColor::Blue => "Blue",
            DisplayColor::Green => "Green",
            DisplayColor::Cyan => "Cyan",
            DisplayColor::Red => "Red",
            DisplayColor::Magenta => "Magenta",
            DisplayColor::Yellow => "Yellow",
            DisplayColor::White => "White",
        };
        write!(f, "{}", name)
    }
}

/// Per-port configuration bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortProfile {
    /// Platform port identifier, e.g. "COM3" or "/dev/ttyUSB0"
    pub name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
    #[serde(default)]
    pub handshake: Handshake,
    /// true = text mode, false = hex mode
    #[serde(default = "default_text_mode")]
    pub text_mode: bool,
    #[serde(default = "default_receive_color")]
    pub receive_color: DisplayColor,
    #[serde(default = "default_send_color")]
    pub send_color: DisplayColor,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_text_mode() -> bool {
    true
}

fn default_receive_color() -> DisplayColor {
    DisplayColor::White
}

fn default_send_color() -> DisplayColor {
    DisplayColor::Gray
}

impl PortProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            handshake: Handshake::default(),
            text_mode: default_text_mode(),
            receive_color: default_receive_color(),
            send_color: default_send_color(),
        }
    }

    /// One-line summary used for the terminal title, e.g. "COM3 9600,8,None,One"
    pub fn summary(&self) -> String {
        format!(
            "{} {},{},{},{}",
            self.name, self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}

/// Parse and validate a baud rate token against the accepted set.
pub fn parse_baud(token: &str) -> ComTermResult<u32> {
    let value: u32 = token
        .parse()
        .map_err(|_| ComTermError::validation(format!("'{}' is not a baud rate", token)))?;
    if BAUD_RATES.contains(&value) {
        Ok(value)
    } else {
        Err(ComTermError::validation(format!(
            "baud rate {} is not supported",
            value
        )))
    }
}

/// Parse and validate a data bits token.
pub fn parse_data_bits(token: &str) -> ComTermResult<u8> {
    let value: u8 = token
        .parse()
        .map_err(|_| ComTermError::validation(format!("'{}' is not a data bit count", token)))?;
    if DATA_BITS.contains(&value) {
        Ok(value)
    } else {
        Err(ComTermError::validation(format!(
            "data bits must be 5-8, got {}",
            value
        )))
    }
}

/// Collection of known port profiles, keyed by port name.
///
/// A profile is created with defaults the first time a port name is seen and
/// is never removed, only updated in place.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: HashMap<String, PortProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: Vec<PortProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    /// Look up a profile, creating it with defaults on first observation.
    pub fn ensure(&mut self, name: &str) -> &mut PortProfile {
        self.profiles
            .entry(name.to_string())
            .or_insert_with(|| PortProfile::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&PortProfile> {
        self.profiles.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PortProfile> {
        self.profiles.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Name-sorted snapshot for persistence.
    pub fn to_vec(&self) -> Vec<PortProfile> {
        let mut list: Vec<PortProfile> = self.profiles.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Any profile name, preferring lexicographic order; used to pick an
    /// initial current profile at startup.
    pub fn first_name(&self) -> Option<String> {
        self.profiles.keys().min().cloned()
    }
}
