//! CLI implementation for the `ubiscan` binary.
//!
//! Argument parsing uses clap derive macros. The top-level [`app::Cli`]
//! struct and [`app::Commands`] enum live in [`app`] and are shared between
//! `main.rs` and `build.rs` (for man page and completion generation) via
//! `include!()`.
//!
//! Each command module follows the same pattern: an `Options` struct holding
//! the resolved arguments and a `pub fn execute(opts, writer) -> Result<(), UbifsError>`
//! entry point. The `writer: &mut dyn Write` parameter allows output to be
//! captured in tests or redirected to a file via the global `--output` flag.
//!
//! # Commands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `ubiscan <IMAGE>` | [`scan`] | Scan the whole image, list every node, print a type summary |
//! | `ubiscan dump` | [`dump`] | Decode one header at an exact offset and hex dump the node |
//! | `ubiscan completions` | (main) | Print a shell completion script |
//!
//! # Common patterns
//!
//! - **`--json`**: structured output via `#[derive(Serialize)]` structs and
//!   `serde_json`.
//! - **`--layout`**: `compact` (default) or `kernel` header field order.
//! - **`--color`** (global): `auto`, `always`, `never`.
//! - **`--output` / `-o`** (global): write to a file instead of stdout.
//! - **`--mmap`** (global): read the image through a memory mapping.
//!
//! A progress bar (via [`indicatif`]) tracks the scan position on stderr.
//! The `wprintln!` macro wraps `writeln!` to convert `io::Error` into
//! `UbifsError`.

pub mod app;
pub mod dump;
pub mod scan;

/// Write a line to the given writer, converting io::Error to UbifsError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::UbifsError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::UbifsError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;

use crate::cli::app::{DegenerateMode, LayoutMode};
use crate::format::header::HeaderLayout;
use crate::format::image::UbifsImage;
use crate::format::scanner::LengthPolicy;
use crate::UbifsError;
use indicatif::{ProgressBar, ProgressStyle};

impl From<LayoutMode> for HeaderLayout {
    fn from(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Compact => HeaderLayout::Compact,
            LayoutMode::Kernel => HeaderLayout::Kernel,
        }
    }
}

impl From<DegenerateMode> for LengthPolicy {
    fn from(mode: DegenerateMode) -> Self {
        match mode {
            DegenerateMode::SkipHeader => LengthPolicy::SkipHeader,
            DegenerateMode::Resync => LengthPolicy::Resync,
        }
    }
}

/// Open an image, selecting mmap or buffered I/O based on the flag.
pub(crate) fn open_image(path: &str, use_mmap: bool) -> Result<UbifsImage, UbifsError> {
    if use_mmap {
        UbifsImage::open_mmap(path)
    } else {
        UbifsImage::open(path)
    }
}

/// Create a styled progress bar over a byte range of the image.
pub(crate) fn create_progress_bar(total_bytes: u64, start: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_position(start.min(total_bytes));
    pb
}
