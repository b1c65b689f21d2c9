#![cfg(feature = "cli")]
//! Integration tests for the default `ubiscan <IMAGE>` scan.

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::NamedTempFile;

use ubifs::cli::scan::{execute, ScanOptions};
use ubifs::format::header::{HeaderLayout, NodeHeader};
use ubifs::format::scanner::LengthPolicy;
use ubifs::UbifsError;

/// Header plus zeroed payload up to `len` (never shorter than the header).
fn node(layout: HeaderLayout, node_type: u8, len: u32, sqnum: u64) -> Vec<u8> {
    let mut buf = NodeHeader::new(layout, node_type, len, sqnum).to_bytes().to_vec();
    buf.resize((len as usize).max(24), 0);
    buf
}

/// 3 garbage bytes, Master@3, Inode@43, Data@67, type 9 @167, 10 trailing bytes.
fn sample_image() -> Vec<u8> {
    let mut data = vec![0xFFu8; 3];
    data.extend(node(HeaderLayout::Compact, 6, 40, 42));
    data.extend(node(HeaderLayout::Compact, 1, 24, 43));
    data.extend(node(HeaderLayout::Compact, 2, 100, 44));
    data.extend(node(HeaderLayout::Compact, 9, 24, 45));
    data.extend(vec![0xFFu8; 10]);
    data
}

fn write_image(data: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("create temp file");
    tmp.write_all(data).expect("write image");
    tmp.flush().expect("flush image");
    tmp
}

fn opts(path: &str) -> ScanOptions {
    ScanOptions {
        file: path.to_string(),
        layout: HeaderLayout::Compact,
        length_policy: LengthPolicy::SkipHeader,
        start: 0,
        limit: None,
        filter_type: None,
        verbose: false,
        json: false,
        summary: true,
        mmap: false,
        interrupt: None,
    }
}

fn run(opts: &ScanOptions) -> Result<String, UbifsError> {
    colored::control::set_override(false);
    let mut out = Vec::new();
    execute(opts, &mut out)?;
    Ok(String::from_utf8(out).expect("output should be UTF-8"))
}

fn found_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|l| l.starts_with("Found node at offset"))
        .collect()
}

#[test]
fn test_scan_reports_every_node_in_order() {
    let tmp = write_image(&sample_image());
    let out = run(&opts(tmp.path().to_str().unwrap())).unwrap();

    assert_eq!(
        found_lines(&out),
        vec![
            "Found node at offset 0x3: type=Master (6), len=40, sqnum=42",
            "Found node at offset 0x2B: type=Inode (1), len=24, sqnum=43",
            "Found node at offset 0x43: type=Data (2), len=100, sqnum=44",
            "Found node at offset 0xA7: type=Unknown (9), len=24, sqnum=45",
        ]
    );
    assert!(out.contains("Node Type Summary"));
    assert!(out.contains("Headers matched:    4"));
    assert!(out.contains("Resync steps:       3"));
    assert!(out.contains("End position:       0xBF"));
}

#[test]
fn test_scan_no_summary() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.summary = false;
    let out = run(&o).unwrap();

    assert_eq!(found_lines(&out).len(), 4);
    assert!(!out.contains("Node Type Summary"));
    assert!(!out.contains("Scan Statistics"));
}

#[test]
fn test_scan_single_master_node() {
    let tmp = write_image(&node(HeaderLayout::Compact, 6, 24, 42));
    let out = run(&opts(tmp.path().to_str().unwrap())).unwrap();
    assert_eq!(
        found_lines(&out),
        vec!["Found node at offset 0x0: type=Master (6), len=24, sqnum=42"]
    );
}

#[test]
fn test_scan_empty_and_garbage_images() {
    let empty = write_image(&[]);
    let out = run(&opts(empty.path().to_str().unwrap())).unwrap();
    assert!(found_lines(&out).is_empty());
    assert!(out.contains("No UBIFS nodes found."));

    let garbage = write_image(&[0xA5u8; 4096]);
    let out = run(&opts(garbage.path().to_str().unwrap())).unwrap();
    assert!(out.contains("No UBIFS nodes found."));
    assert!(out.contains("Resync steps:       4073"));
}

#[test]
fn test_scan_header_in_last_partial_window_is_ignored() {
    // Magic present but only 20 bytes of the header fit in the image
    let mut data = vec![0u8; 8];
    data.extend_from_slice(&node(HeaderLayout::Compact, 6, 24, 1)[..20]);
    let tmp = write_image(&data);
    let out = run(&opts(tmp.path().to_str().unwrap())).unwrap();
    assert!(found_lines(&out).is_empty());
}

#[test]
fn test_scan_filter_by_type() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.filter_type = Some("data".to_string());
    let out = run(&o).unwrap();
    assert_eq!(
        found_lines(&out),
        vec!["Found node at offset 0x43: type=Data (2), len=100, sqnum=44"]
    );

    o.filter_type = Some("Unknown".to_string());
    let out = run(&o).unwrap();
    assert_eq!(found_lines(&out).len(), 1);
    assert!(found_lines(&out)[0].contains("type=Unknown (9)"));
}

#[test]
fn test_scan_unknown_filter_type_is_rejected() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.filter_type = Some("Superblok".to_string());
    let err = run(&o).unwrap_err();
    assert!(matches!(err, UbifsError::Argument(_)));
    assert!(err.to_string().contains("Superblok"));
}

#[test]
fn test_scan_limit() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.limit = Some(2);
    let out = run(&o).unwrap();
    assert_eq!(found_lines(&out).len(), 2);
    assert!(out.contains("Stopped after 2 nodes (--limit)."));
}

#[test]
fn test_scan_limit_zero() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.limit = Some(0);

    let out = run(&o).unwrap();
    assert!(found_lines(&out).is_empty());
    assert!(out.contains("Stopped after 0 nodes (--limit)."));
    assert!(out.contains("Headers matched:    0"));

    o.json = true;
    let out = run(&o).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 0);
    assert_eq!(doc["stats"]["nodes"], 0);
}

#[test]
fn test_scan_limit_with_filter_counts_reported_nodes() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.filter_type = Some("Unknown".to_string());
    o.limit = Some(1);
    let out = run(&o).unwrap();
    let lines = found_lines(&out);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Found node at offset 0xA7:"));
}

#[test]
fn test_scan_start_offset() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.start = 43;
    let out = run(&o).unwrap();
    let lines = found_lines(&out);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Found node at offset 0x2B:"));

    // Starting inside the Master node resyncs up to the Inode node
    o.start = 10;
    let out = run(&o).unwrap();
    assert_eq!(found_lines(&out).len(), 3);
    assert!(out.contains("Resync steps:       33"));
}

#[test]
fn test_scan_start_past_end_is_rejected() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.start = 10_000;
    let err = run(&o).unwrap_err();
    assert!(matches!(err, UbifsError::Argument(_)));
}

#[test]
fn test_scan_degenerate_len_policies() {
    let mut data = node(HeaderLayout::Compact, 1, 10, 7);
    data.extend(vec![0u8; 30]);
    let tmp = write_image(&data);
    let mut o = opts(tmp.path().to_str().unwrap());

    let out = run(&o).unwrap();
    let lines = found_lines(&out);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Found node at offset 0x0: type=Inode (1), len=10, sqnum=7"));
    assert!(lines[0].ends_with("[len < header]"));
    assert!(out.contains("Undersized lengths: 1"));

    o.length_policy = LengthPolicy::Resync;
    let out = run(&o).unwrap();
    assert!(found_lines(&out).is_empty());
    assert!(out.contains("No UBIFS nodes found."));
    assert!(out.contains("Undersized lengths: 1"));
}

#[test]
fn test_scan_kernel_layout() {
    let mut data = vec![0u8; 5];
    data.extend(node(HeaderLayout::Kernel, 7, 48, 9));
    data.extend(node(HeaderLayout::Kernel, 1, 24, 10));
    let tmp = write_image(&data);
    let mut o = opts(tmp.path().to_str().unwrap());
    o.layout = HeaderLayout::Kernel;
    let out = run(&o).unwrap();

    assert!(out.contains("kernel layout"));
    assert_eq!(
        found_lines(&out),
        vec![
            "Found node at offset 0x5: type=Master (7), len=48, sqnum=9",
            "Found node at offset 0x35: type=Data (1), len=24, sqnum=10",
        ]
    );
}

#[test]
fn test_scan_verbose_dumps_header() {
    let tmp = write_image(&node(HeaderLayout::Compact, 6, 24, 42));
    let mut o = opts(tmp.path().to_str().unwrap());
    o.verbose = true;
    let out = run(&o).unwrap();
    // magic 0x06101831 stored little-endian
    assert!(out.contains("00000000  31 18 10 06 06 00 00 00"));
}

#[test]
fn test_scan_json_output() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.json = true;
    let out = run(&o).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(doc["layout"], "compact");
    assert_eq!(doc["length_policy"], "skip-header");
    assert_eq!(doc["size"], 201);
    assert_eq!(doc["interrupted"], false);

    let nodes = doc["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[0]["offset"], 3);
    assert_eq!(nodes[0]["type_label"], "Master");
    assert_eq!(nodes[0]["type_code"], 6);
    assert_eq!(nodes[0]["len"], 40);
    assert_eq!(nodes[0]["sqnum"], 42);
    assert!(nodes[0].get("crc").is_none());
    assert_eq!(nodes[3]["type_label"], "Unknown");

    assert_eq!(doc["summary"]["Data"], 1);
    assert_eq!(doc["summary"]["Unknown"], 1);
    assert_eq!(doc["stats"]["nodes"], 4);
    assert_eq!(doc["stats"]["resync_bytes"], 3);
}

#[test]
fn test_scan_interrupt_reports_consistent_stats() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.interrupt = Some(Arc::new(AtomicBool::new(true)));

    let out = run(&o).unwrap();
    assert!(found_lines(&out).is_empty());
    assert!(out.contains("Scan interrupted at offset 0x0."));
    assert!(out.contains("Headers matched:    0"));
    assert!(out.contains("Resync steps:       0"));

    o.json = true;
    let out = run(&o).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(doc["interrupted"], true);
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 0);
    assert_eq!(doc["stats"]["nodes"], 0);
    assert_eq!(doc["stats"]["position"], 0);
}

#[test]
fn test_scan_unset_interrupt_flag_scans_everything() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    o.interrupt = Some(Arc::new(AtomicBool::new(false)));
    let out = run(&o).unwrap();
    assert_eq!(found_lines(&out).len(), 4);
    assert!(!out.contains("Scan interrupted"));
}

#[test]
fn test_scan_mmap_matches_buffered() {
    let tmp = write_image(&sample_image());
    let mut o = opts(tmp.path().to_str().unwrap());
    let buffered = run(&o).unwrap();
    o.mmap = true;
    let mapped = run(&o).unwrap();
    assert_eq!(buffered, mapped);
}

#[test]
fn test_scan_missing_file() {
    let err = run(&opts("/nonexistent/path/rootfs.ubifs")).unwrap_err();
    assert!(matches!(err, UbifsError::Open(_)));
    assert!(err.to_string().starts_with("Cannot open"));
}
