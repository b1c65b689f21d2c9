//! Hex formatting utilities.
//!
//! Helpers for formatting byte offsets and header fields, and producing
//! traditional hex dump output with offset columns and ASCII sidebars.

use std::fmt::Write;

/// Format a byte offset as "decimal (0xHEX)".
pub fn format_offset(offset: u64) -> String {
    format!("{} (0x{:X})", offset, offset)
}

/// Format a u32 value as hex with 0x prefix.
pub fn format_hex32(value: u32) -> String {
    format!("0x{:08x}", value)
}

/// Hex dump `data` as 16-byte rows labelled from `base_offset`.
///
/// ```text
/// 00000200  31 18 10 06 06 00 00 00  18 00 00 00 00 00 00 00  |1...............|
/// ```
///
/// Short final rows are padded so the ASCII column stays aligned.
pub fn hex_dump(data: &[u8], base_offset: u64) -> String {
    let mut out = String::new();

    for (row, chunk) in data.chunks(16).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:08x}  ", base_offset + (row * 16) as u64);

        for col in 0..16 {
            if col == 8 {
                out.push(' ');
            }
            match chunk.get(col) {
                Some(byte) => {
                    let _ = write!(out, "{:02x} ", byte);
                }
                None => out.push_str("   "),
            }
        }

        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        let _ = write!(out, " |{:<16}|", ascii);
    }

    out
}
