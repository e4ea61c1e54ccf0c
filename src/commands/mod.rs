//! CLI command implementations
//!
//! Commands are generic over the backend so they can be exercised against
//! the dummy backend in tests; the binary always passes a `BoxedSpiDevice`.

mod list;
pub mod transfer;

pub use list::list_backends;

/// Parse user-supplied bytes
///
/// Accepts whitespace- or comma-separated tokens, each either a hex byte
/// with optional `0x` prefix (`9f`, `0x9F`) or a run of hex digit pairs
/// (`9f0000`).
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();

    for token in s.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);

        if digits.is_empty() || !digits.is_ascii() {
            return Err(format!("Invalid hex byte: '{}'", token));
        }

        // A lone digit is one byte; longer runs must be whole pairs
        if digits.len() == 1 {
            let byte = u8::from_str_radix(digits, 16)
                .map_err(|_| format!("Invalid hex byte: '{}'", token))?;
            out.push(byte);
            continue;
        }
        if digits.len() % 2 != 0 {
            return Err(format!("Odd number of hex digits in '{}'", token));
        }
        for i in (0..digits.len()).step_by(2) {
            let byte = u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("Invalid hex byte: '{}'", token))?;
            out.push(byte);
        }
    }

    Ok(out)
}

/// Format bytes as a hex dump, 16 bytes per line with offsets
pub fn format_hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        out.push_str(&format!("{:04X}: {}\n", line * 16, bytes.join(" ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("9f 00 00").unwrap(), vec![0x9F, 0, 0]);
        assert_eq!(parse_hex_bytes("0x06,0xAB").unwrap(), vec![0x06, 0xAB]);
        assert_eq!(parse_hex_bytes("deadbeef").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(parse_hex_bytes("0xA").unwrap(), vec![0x0A]);
        assert_eq!(parse_hex_bytes("  ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_parse_hex_bytes_errors() {
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
        assert!(parse_hex_bytes("0x").is_err());
    }

    #[test]
    fn test_hex_dump() {
        let data: Vec<u8> = (0u8..18).collect();
        let dump = format_hex_dump(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: 00 01 02"));
        assert_eq!(lines[1], "0010: 10 11");
        assert_eq!(format_hex_dump(&[]), "");
    }
}
