use comterm::core::codec::{decode_for_display, encode_for_send};
use comterm::ComTermError;
use proptest::prelude::*;

#[test]
fn text_mode_escape_sequences() {
    assert_eq!(
        encode_for_send("A\\nB", true).unwrap(),
        vec![0x41, 0x0A, 0x42]
    );
    assert_eq!(
        encode_for_send("AT\\r", true).unwrap(),
        vec![b'A', b'T', b'\r']
    );
}

#[test]
fn hex_mode_rejects_odd_trailing_digit_with_position() {
    match encode_for_send("41 4", false) {
        Err(ComTermError::Decode { index }) => assert_eq!(index, 3),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn hex_mode_sends_nothing_on_error() {
    assert!(encode_for_send("zz", false).is_err());
    assert!(encode_for_send("4", false).is_err());
}

#[test]
fn display_modes() {
    assert_eq!(decode_for_display(b"\x01OK\r\n", true), "\u{1}OK\r\n");
    assert_eq!(decode_for_display(&[0x00, 0x7F, 0xAB], false), "00 7F AB");
}

proptest! {
    /// Encoding an even-length hex string and decoding the bytes back
    /// reproduces the same values.
    #[test]
    fn hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let hex_line: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        let encoded = encode_for_send(&hex_line, false).unwrap();
        prop_assert_eq!(&encoded, &bytes);

        let displayed = decode_for_display(&encoded, false);
        let expected: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        prop_assert_eq!(displayed, expected.join(" "));
    }

    /// Lowercase input and interior whitespace do not change the decoded
    /// byte values.
    #[test]
    fn hex_whitespace_and_case_insensitive(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
        let spaced: String = bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(encode_for_send(&spaced, false).unwrap(), bytes);
    }

    /// Text mode without backslashes is a plain ASCII pass-through.
    #[test]
    fn text_plain_ascii_pass_through(line in "[ -~&&[^\\\\]]{0,64}") {
        prop_assert_eq!(encode_for_send(&line, true).unwrap(), line.as_bytes().to_vec());
    }
}
