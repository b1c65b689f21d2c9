//! UBIFS image node scanner.
//!
//! The `ubifs-utils` crate (library name `ubifs`) locates and labels UBIFS
//! node headers inside raw byte streams: flash dumps, partial images, or
//! any blob that may contain UBIFS nodes at arbitrary, unaligned offsets.
//!
//! # CLI Reference
//!
//! ```text
//! ubiscan [OPTIONS] <IMAGE>                      # scan an image and list every node
//! ubiscan dump <IMAGE> --offset <OFFSET>         # decode the header at one offset
//! ubiscan completions <SHELL>                    # print a shell completion script
//! ```
//!
//! ## Global options
//!
//! All commands accept `--color <auto|always|never>`, `--output <file>` and
//! `--mmap`. The scan accepts `--json` for machine-readable output,
//! `--layout` to pick the header layout and `--degenerate` to choose how
//! undersized node lengths are handled.
//!
//! See the [`cli`] module for full details.
//!
//! # Library API
//!
//! ## Quick example
//!
//! ```no_run
//! use ubifs::format::image::UbifsImage;
//! use ubifs::format::scanner::ScanConfig;
//!
//! let mut image = UbifsImage::open("rootfs.ubifs").unwrap();
//! for node in image.scan(ScanConfig::default()) {
//!     let node = node.unwrap();
//!     println!("0x{:X} {} len={} sqnum={}", node.offset, node.type_label, node.len, node.sqnum);
//! }
//! ```
//!
//! ## Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`UbifsImage`](format::image::UbifsImage) | Open a file, mmap, or in-memory buffer for scanning |
//! | [`NodeScanner`](format::scanner::NodeScanner) | Lazy, byte-resynchronizing node iterator over any `Read + Seek` |
//! | [`NodeHeader`](format::header::NodeHeader) | Explicit decode of the 24-byte common node header |
//! | [`NodeType`](format::node_types::NodeType) | Map node type codes to labels |
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`format::constants`] | Magic number, header size, field offsets |
//! | [`format::node_types`] | Node type enum with labels and descriptions |
//! | [`format::header`] | Header layouts and field-by-field decoding |
//! | [`format::scanner`] | The scan loop, length policy, and statistics |
//! | [`format::image`] | File, mmap, and buffer sources |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Builds the `ubiscan` binary and the [`cli`] module. |

#[cfg(feature = "cli")]
pub mod cli;
pub mod format;
pub mod util;

use thiserror::Error;

/// Errors returned by `ubifs` operations.
#[derive(Error, Debug)]
pub enum UbifsError {
    /// The input could not be opened, inspected, or mapped.
    #[error("{0}")]
    Open(String),

    /// An I/O error occurred after the input was opened (read, seek, or write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed binary data at a position where a header was required,
    /// or an output serialization failure.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid argument was supplied (offset past end of file, unknown type, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),
}
