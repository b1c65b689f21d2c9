use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{open_image, wprintln};
use crate::format::constants::{NODE_HEADER_SIZE, UBIFS_NODE_MAGIC};
use crate::format::header::{HeaderLayout, NodeHeader};
use crate::util::hex::{format_hex32, format_offset, hex_dump};
use crate::UbifsError;

/// Options for the dump command.
pub struct DumpOptions {
    pub file: String,
    pub offset: u64,
    pub length: Option<usize>,
    pub layout: HeaderLayout,
    pub json: bool,
    pub mmap: bool,
}

#[derive(Serialize)]
struct DumpJson {
    offset: u64,
    magic_valid: bool,
    type_label: &'static str,
    type_description: &'static str,
    degenerate: bool,
    header: NodeHeader,
}

/// Decode the node header at an exact offset and hex dump the node bytes.
///
/// Unlike the scan, no resynchronization happens: the 24 bytes at
/// `--offset` are decoded as a header whether or not the magic matches, and
/// every field is printed along with the magic check. The hex dump covers
/// `--length` bytes, or by default the declared node length when the magic
/// matches (never less than the header) and just the header otherwise. The
/// dump is clamped to the end of the image.
pub fn execute(opts: &DumpOptions, writer: &mut dyn Write) -> Result<(), UbifsError> {
    let mut image = open_image(&opts.file, opts.mmap)?;
    let (header, raw) = image.header_at(opts.offset, opts.layout)?;
    let magic_valid = header.has_magic();

    if opts.json {
        let doc = DumpJson {
            offset: opts.offset,
            magic_valid,
            type_label: header.kind().name(),
            type_description: header.kind().description(),
            degenerate: header.is_degenerate(),
            header,
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| UbifsError::Parse(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    let dump_len = match opts.length {
        Some(n) => n,
        None if magic_valid => (header.len as usize).max(NODE_HEADER_SIZE),
        None => NODE_HEADER_SIZE,
    };
    let bytes = if dump_len <= raw.len() {
        raw[..dump_len].to_vec()
    } else {
        image.read_at(opts.offset, dump_len)?
    };

    let magic_status = if magic_valid {
        "valid".green()
    } else {
        format!("expected {}", format_hex32(UBIFS_NODE_MAGIC)).red()
    };

    wprintln!(
        writer,
        "Node header at offset {} ({} layout):",
        format_offset(opts.offset),
        header.layout
    )?;
    wprintln!(
        writer,
        "  Magic:      {} ({})",
        format_hex32(header.magic),
        magic_status
    )?;
    if let Some(crc) = header.crc {
        wprintln!(writer, "  CRC:        {} (not verified)", format_hex32(crc))?;
    }
    wprintln!(
        writer,
        "  Node type:  {} ({}), {}",
        header.kind(),
        header.node_type,
        header.kind().description()
    )?;
    wprintln!(writer, "  Group type: {}", header.group_type)?;
    wprintln!(writer, "  Padding:    0x{:04x}", header.padding)?;
    if header.is_degenerate() {
        wprintln!(
            writer,
            "  Length:     {} {}",
            header.len,
            "(smaller than the 24-byte header)".yellow()
        )?;
    } else {
        wprintln!(writer, "  Length:     {}", header.len)?;
    }
    wprintln!(writer, "  Sqnum:      {}", header.sqnum)?;
    wprintln!(writer)?;

    wprintln!(
        writer,
        "Hex dump of {} bytes at {}:",
        bytes.len(),
        format_offset(opts.offset)
    )?;
    wprintln!(writer)?;
    wprintln!(writer, "{}", hex_dump(&bytes, opts.offset))?;

    Ok(())
}
