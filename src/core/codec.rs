//! Mode-dependent conversion between operator input, wire bytes, and display
//! text.
//!
//! Text mode unescapes `\n`-style sequences on send and passes received bytes
//! through as-is. Hex mode consumes two hex digits per byte on send and
//! renders received bytes as uppercase space-separated pairs.

use crate::domain::error::{ComTermError, ComTermResult};

/// Convert a line of operator input into bytes for transmission.
pub fn encode_for_send(line: &str, text_mode: bool) -> ComTermResult<Vec<u8>> {
    if text_mode {
        Ok(unescape(line))
    } else {
        encode_hex(line)
    }
}

/// Convert received bytes into display text.
pub fn decode_for_display(bytes: &[u8], text_mode: bool) -> String {
    if text_mode {
        // Control characters pass through untouched; hex mode is the escape
        // hatch for anything unprintable.
        bytes.iter().map(|&b| b as char).collect()
    } else {
        let mut out = String::with_capacity(bytes.len() * 3);
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{:02X}", byte));
        }
        out
    }
}

/// Interpret backslash escape sequences in a text-mode line.
///
/// Unknown escapes and a trailing lone backslash are kept literally.
fn unescape(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_ascii(&mut out, c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                push_ascii(&mut out, other);
            }
            None => out.push(b'\\'),
        }
    }
    out
}

fn push_ascii(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Parse a hex-mode line into bytes, two hex digits per byte.
///
/// ASCII whitespace between pairs is skipped. A non-hex character or an odd
/// trailing digit fails with the offending character index and no bytes are
/// produced.
fn encode_hex(line: &str) -> ComTermResult<Vec<u8>> {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 2);
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let hi = hex_value(bytes[i]).ok_or(ComTermError::Decode { index: i })?;
        if i + 1 >= bytes.len() {
            return Err(ComTermError::Decode { index: i });
        }
        let lo = hex_value(bytes[i + 1]).ok_or(ComTermError::Decode { index: i + 1 })?;
        out.push((hi << 4) | lo);
        i += 2;
    }
    Ok(out)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_encode_unescapes() {
        assert_eq!(encode_for_send("A\\nB", true).unwrap(), vec![0x41, 0x0A, 0x42]);
        assert_eq!(
            encode_for_send("a\\tb\\r\\0", true).unwrap(),
            vec![b'a', b'\t', b'b', b'\r', 0]
        );
    }

    #[test]
    fn test_text_encode_keeps_unknown_escapes() {
        assert_eq!(encode_for_send("\\x41", true).unwrap(), b"\\x41".to_vec());
        assert_eq!(encode_for_send("tail\\", true).unwrap(), b"tail\\".to_vec());
        assert_eq!(encode_for_send("\\\\n", true).unwrap(), b"\\n".to_vec());
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(encode_for_send("414243", false).unwrap(), b"ABC".to_vec());
        assert_eq!(encode_for_send("DE ad be EF", false).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(encode_for_send("", false).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_hex_encode_odd_trailing_digit() {
        // "41 4": pair, skipped space, then a lone digit at index 3
        match encode_for_send("41 4", false) {
            Err(ComTermError::Decode { index }) => assert_eq!(index, 3),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_hex_encode_invalid_character() {
        match encode_for_send("41zz", false) {
            Err(ComTermError::Decode { index }) => assert_eq!(index, 2),
            other => panic!("expected decode error, got {:?}", other),
        }
        // Second digit of a pair invalid
        match encode_for_send("4g", false) {
            Err(ComTermError::Decode { index }) => assert_eq!(index, 1),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(decode_for_display(&[0x0A, 0xFF, 0x00], false), "0A FF 00");
        assert_eq!(decode_for_display(&[], false), "");
    }

    #[test]
    fn test_text_display_passes_control_bytes() {
        assert_eq!(decode_for_display(b"ok\r\n", true), "ok\r\n");
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = encode_for_send("00FF10a5", false).unwrap();
        assert_eq!(decode_for_display(&bytes, false), "00 FF 10 A5");
    }
}
