//! Static usage text for the `.help` command.

pub const HELP_TEXT: &str = "\
Commands (everything else is sent to the port):
  .open                       interactive port setup wizard
  .open <port> [baud] [bits] [parity] [stop] [handshake]
                              open a port non-interactively; omitted
                              arguments keep the current profile's values
  .close                      close the port (no error if already closed)
  .send <path>                stream a file's raw bytes in 1024-byte chunks
  .hex | .bin                 switch to hex mode (two hex digits per byte)
  .asc | .text                switch to text mode (backslash escapes on send)
  .color [recv] [send]        set receive/send display colors by name
  .ports                      list available serial ports
  .status                     show the current profile and connection state
  .help                       show this text
  .exit                       save settings and quit
";
