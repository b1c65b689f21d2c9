use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ubiscan")]
#[command(about = "Locate and label UBIFS nodes in raw images")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Use memory-mapped I/O for reading the image
    #[arg(long, global = true)]
    pub mmap: bool,

    #[command(flatten)]
    pub scan: ScanArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Arguments of the default scan.
#[derive(Args)]
pub struct ScanArgs {
    /// Path to the UBIFS image or raw flash dump (use ./dump for a file named like a subcommand)
    #[arg(required = true)]
    pub image: Option<String>,

    /// Only report nodes of this type (e.g. Master, Data, Unknown)
    #[arg(short = 't', long = "type")]
    pub filter_type: Option<String>,

    /// Stop after this many reported nodes
    #[arg(long)]
    pub limit: Option<u64>,

    /// Byte offset to start scanning from (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_offset, default_value = "0")]
    pub start: u64,

    /// Header field layout
    #[arg(long, value_enum, default_value = "compact")]
    pub layout: LayoutMode,

    /// Handling of nodes whose length is smaller than the header
    #[arg(long, value_enum, default_value = "skip-header")]
    pub degenerate: DegenerateMode,

    /// Hex dump every header and log scanner diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Omit the node type summary and scan statistics
    #[arg(long = "no-summary")]
    pub no_summary: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Header field layout selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutMode {
    /// magic, type, group, padding, len, sqnum (types 1-8)
    Compact,
    /// Linux ubifs_ch: magic, crc, sqnum, len, type, group (types 0-11)
    Kernel,
}

/// Policy for node lengths below the 24-byte header size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DegenerateMode {
    /// Report the node and continue right after its header
    SkipHeader,
    /// Ignore the match and resynchronize one byte further
    Resync,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode the node header at an exact offset and hex dump the node
    Dump {
        /// Path to the UBIFS image or raw flash dump
        image: String,

        /// Byte offset of the header (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_offset)]
        offset: u64,

        /// Number of bytes to hex dump (default: the node length, or 24 without a valid magic)
        #[arg(short, long)]
        length: Option<usize>,

        /// Header field layout
        #[arg(long, value_enum, default_value = "compact")]
        layout: LayoutMode,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Parse a byte offset written in decimal or as `0x`-prefixed hex.
///
/// Underscores are accepted as digit separators (`0x1_0000`).
pub fn parse_offset(s: &str) -> Result<u64, String> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
    let parsed = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", s, e))
}
