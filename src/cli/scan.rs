use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{create_progress_bar, open_image, wprintln};
use crate::format::header::HeaderLayout;
use crate::format::node_types::NodeType;
use crate::format::scanner::{FoundNode, LengthPolicy, ScanConfig, ScanStats};
use crate::util::hex::{format_hex32, hex_dump};
use crate::UbifsError;

/// Options for the scan command.
pub struct ScanOptions {
    pub file: String,
    pub layout: HeaderLayout,
    pub length_policy: LengthPolicy,
    pub start: u64,
    pub limit: Option<u64>,
    pub filter_type: Option<String>,
    pub verbose: bool,
    pub json: bool,
    pub summary: bool,
    pub mmap: bool,
    /// Set by the Ctrl-C handler; the scan stops before the next position.
    pub interrupt: Option<Arc<AtomicBool>>,
}

#[derive(Serialize)]
struct ScanJson<'a> {
    file: &'a str,
    layout: HeaderLayout,
    length_policy: LengthPolicy,
    start: u64,
    size: u64,
    nodes: Vec<FoundNode>,
    summary: BTreeMap<&'static str, u64>,
    stats: ScanStats,
    interrupted: bool,
}

/// Why the report loop ended before the scanner was exhausted.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Exhausted,
    Limit,
    Interrupted,
}

/// Scan an image for UBIFS node headers and list every node found.
///
/// The scan starts at `--start` (offset 0 by default) and walks the image to
/// its end. Every position whose next 24 bytes carry the node magic produces
/// one line:
///
/// ```text
/// Found node at offset 0x1F40: type=Data (2), len=4144, sqnum=8812
/// ```
///
/// and the scan jumps ahead by the node length; any other position is skipped
/// one byte at a time. Nodes whose length is smaller than the header are
/// flagged and handled by `--degenerate`.
///
/// `--type` keeps only one node type (matched case-insensitively against
/// the labels) and `--limit` stops after that many reported nodes. With
/// `--verbose` each line is followed by a hex dump of the 24 header bytes.
/// Text output ends with a per-type summary and scan statistics unless
/// `--no-summary` is given; `--json` emits a single document with the same
/// information.
pub fn execute(opts: &ScanOptions, writer: &mut dyn Write) -> Result<(), UbifsError> {
    let filter = match &opts.filter_type {
        Some(name) => Some(NodeType::from_name(name).ok_or_else(|| {
            UbifsError::Argument(format!("Unknown node type '{}'", name))
        })?),
        None => None,
    };

    let mut image = open_image(&opts.file, opts.mmap)?;
    let size = image.size();
    if opts.start > size {
        return Err(UbifsError::Argument(format!(
            "Start offset {} is beyond image size {}",
            opts.start, size
        )));
    }

    let config = ScanConfig {
        layout: opts.layout,
        length_policy: opts.length_policy,
        start: opts.start,
        ..ScanConfig::default()
    };

    if !opts.json {
        wprintln!(
            writer,
            "Scanning {} ({} bytes, {} layout, from offset 0x{:X}):",
            opts.file,
            size,
            opts.layout,
            opts.start
        )?;
        wprintln!(writer, "{}", "-".repeat(50))?;
    }

    let mut scanner = image.scan(config);
    if let Some(flag) = &opts.interrupt {
        scanner = scanner.with_interrupt(Arc::clone(flag));
    }
    let pb = create_progress_bar(size, opts.start);

    let mut type_counts: HashMap<NodeType, u64> = HashMap::new();
    let mut json_nodes = Vec::new();
    let mut reported = 0u64;
    let mut stop = StopReason::Exhausted;

    loop {
        // Checked before pulling so a reached limit never reads another node
        if opts.limit.is_some_and(|limit| reported >= limit) {
            stop = StopReason::Limit;
            break;
        }

        let node = match scanner.next() {
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                pb.finish_and_clear();
                return Err(e);
            }
            None => break,
        };
        pb.set_position(scanner.position().min(size));

        if filter.is_some_and(|f| node.kind != f) {
            continue;
        }

        *type_counts.entry(node.kind).or_insert(0) += 1;
        reported += 1;

        if opts.json {
            json_nodes.push(node);
        } else {
            print_node(writer, &node, opts.verbose)?;
        }
    }

    if scanner.interrupted() {
        stop = StopReason::Interrupted;
    }
    pb.finish_and_clear();
    let stats = scanner.stats();

    if opts.json {
        let doc = ScanJson {
            file: &opts.file,
            layout: opts.layout,
            length_policy: opts.length_policy,
            start: opts.start,
            size,
            nodes: json_nodes,
            summary: type_counts.iter().map(|(t, c)| (t.name(), *c)).collect(),
            stats,
            interrupted: stop == StopReason::Interrupted,
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| UbifsError::Parse(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    if reported == 0 {
        wprintln!(writer, "No UBIFS nodes found.")?;
    }

    match stop {
        StopReason::Limit => {
            wprintln!(writer, "Stopped after {} nodes (--limit).", reported)?;
        }
        StopReason::Interrupted => {
            wprintln!(
                writer,
                "{} at offset 0x{:X}.",
                "Scan interrupted".yellow(),
                stats.position
            )?;
        }
        StopReason::Exhausted => {}
    }

    if opts.summary {
        print_summary(writer, &type_counts, &stats)?;
    }

    Ok(())
}

/// Print one report line, plus a header hex dump in verbose mode.
fn print_node(writer: &mut dyn Write, node: &FoundNode, verbose: bool) -> Result<(), UbifsError> {
    let flag = if node.is_degenerate() {
        format!(" {}", "[len < header]".yellow())
    } else {
        String::new()
    };

    wprintln!(
        writer,
        "Found node at offset 0x{:X}: type={} ({}), len={}, sqnum={}{}",
        node.offset,
        node.type_label,
        node.type_code,
        node.len,
        node.sqnum,
        flag
    )?;

    if verbose {
        if let Some(crc) = node.crc {
            wprintln!(writer, "  crc={} group={}", format_hex32(crc), node.group_type)?;
        }
        wprintln!(writer, "{}", hex_dump(&node.raw, node.offset))?;
        wprintln!(writer)?;
    }
    Ok(())
}

fn print_summary(
    writer: &mut dyn Write,
    type_counts: &HashMap<NodeType, u64>,
    stats: &ScanStats,
) -> Result<(), UbifsError> {
    if !type_counts.is_empty() {
        wprintln!(writer)?;
        wprintln!(writer, "{}", "Node Type Summary".bold())?;
        let mut sorted: Vec<_> = type_counts.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.name().cmp(b.0.name())));
        for (t, count) in sorted {
            let label = if *count == 1 { "node" } else { "nodes" };
            wprintln!(writer, "  {:14} {:>8} {}", t.name(), count, label)?;
        }
    }

    wprintln!(writer)?;
    wprintln!(writer, "{}", "Scan Statistics".bold())?;
    wprintln!(writer, "  Headers matched:    {}", stats.nodes)?;
    wprintln!(writer, "  Resync steps:       {}", stats.resync_bytes)?;
    let degenerate = if stats.degenerate > 0 {
        format!("{}", stats.degenerate).yellow().to_string()
    } else {
        "0".to_string()
    };
    wprintln!(writer, "  Undersized lengths: {}", degenerate)?;
    wprintln!(writer, "  End position:       0x{:X}", stats.position)?;
    Ok(())
}
