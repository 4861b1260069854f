use clap::Parser;

/// Command line arguments for ComTerm
#[derive(Parser, Debug)]
#[command(
    name = "comterm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive serial port terminal",
    long_about = "An interactive terminal for serial (COM) ports with per-port profiles, \
text and hex modes, and colored receive/send output. Positional arguments open a port \
immediately; without them the session starts closed and '.open' connects interactively."
)]
pub struct Args {
    /// Port name to open on startup (e.g. COM3 or /dev/ttyUSB0)
    pub port: Option<String>,

    /// Baud rate (300..115200 from the fixed set)
    pub baud: Option<String>,

    /// Data bits (5-8)
    pub data_bits: Option<String>,

    /// Parity (none, odd, even, mark, space)
    pub parity: Option<String>,

    /// Stop bits (none, one, two, onepointfive)
    pub stop_bits: Option<String>,

    /// Handshake (none, xonxoff, requesttosend, requesttosendxonxoff)
    pub handshake: Option<String>,

    /// List available serial ports and exit
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
