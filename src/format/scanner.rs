//! Byte-resynchronizing node scanner.
//!
//! [`NodeScanner`] walks any `Read + Seek` source from a start offset to
//! end-of-stream. At each position it decodes the next 24 bytes as a common
//! node header:
//!
//! - **magic matches**: a [`FoundNode`] is yielded and the position advances
//!   by the node's declared `len`;
//! - **magic does not match**: the position advances by exactly one byte and
//!   the next 24 bytes are tried (resynchronization);
//! - **fewer than 24 bytes left**: the scan ends normally.
//!
//! A matched header whose `len` is smaller than the header itself is handled
//! by the configured [`LengthPolicy`], so that every step makes net progress
//! and the scan terminates on any finite input.
//!
//! Reads go through an internal window buffer; one-byte steps are served
//! from memory, and a jump past the window (a long node) seeks directly to
//! the next position.

use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::format::constants::{DEFAULT_WINDOW_SIZE, NODE_HEADER_SIZE};
use crate::format::header::{starts_with_magic, HeaderLayout, NodeHeader};
use crate::format::node_types::NodeType;
use crate::UbifsError;

const HEADER_SIZE_U64: u64 = NODE_HEADER_SIZE as u64;

/// What to do with a matched header whose `len` is below [`NODE_HEADER_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthPolicy {
    /// Report the node with its raw `len` and advance by the header size.
    #[default]
    SkipHeader,
    /// Treat the position as malformed: no report, advance by one byte.
    Resync,
}

/// Scanner settings.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Header field order and node type numbering.
    pub layout: HeaderLayout,
    /// Handling of undersized `len` values.
    pub length_policy: LengthPolicy,
    /// Stream offset where the scan starts.
    pub start: u64,
    /// Size of the read window in bytes (raised to the header size if smaller).
    pub window_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            layout: HeaderLayout::Compact,
            length_policy: LengthPolicy::SkipHeader,
            start: 0,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// A node header found in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundNode {
    /// Stream offset of the first header byte.
    pub offset: u64,
    /// Raw node type code.
    pub type_code: u8,
    /// Label from the node type table ("Unknown" for unlisted codes).
    pub type_label: &'static str,
    /// Declared node length, header included, exactly as stored.
    pub len: u32,
    /// Sequence number, exactly as stored.
    pub sqnum: u64,
    /// Raw group type code.
    pub group_type: u8,
    /// Stored CRC-32 (kernel layout only, never verified).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc: Option<u32>,
    /// Classified node type.
    #[serde(skip)]
    pub kind: NodeType,
    /// The 24 header bytes as read.
    #[serde(skip)]
    pub raw: [u8; NODE_HEADER_SIZE],
}

impl FoundNode {
    fn new(offset: u64, header: &NodeHeader, raw: [u8; NODE_HEADER_SIZE]) -> Self {
        let kind = header.kind();
        FoundNode {
            offset,
            type_code: header.node_type,
            type_label: kind.name(),
            len: header.len,
            sqnum: header.sqnum,
            group_type: header.group_type,
            crc: header.crc,
            kind,
            raw,
        }
    }

    /// Returns true if `len` is smaller than the header size.
    pub fn is_degenerate(&self) -> bool {
        (self.len as usize) < NODE_HEADER_SIZE
    }
}

/// Running counters for a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Nodes reported so far.
    pub nodes: u64,
    /// One-byte resynchronization steps taken.
    pub resync_bytes: u64,
    /// Matched headers with `len` below the header size.
    pub degenerate: u64,
    /// Current scan position (the end position once the scan has finished).
    pub position: u64,
}

/// Lazy iterator over the nodes in a byte stream.
///
/// Yields `Ok(FoundNode)` in strictly increasing offset order. A read or
/// seek failure is yielded once as `Err` and ends the iteration; reaching
/// end-of-stream simply ends it. Dropping the scanner (or stopping early
/// with `take`, `break`, etc.) releases the reader.
pub struct NodeScanner<R> {
    reader: R,
    config: ScanConfig,
    offset: u64,
    buf: Vec<u8>,
    buf_start: u64,
    at_eof: bool,
    done: bool,
    interrupt: Option<Arc<AtomicBool>>,
    interrupted: bool,
    stats: ScanStats,
}

impl<R: Read + Seek> NodeScanner<R> {
    /// Create a scanner over `reader`. Nothing is read until the first call
    /// to `next`.
    pub fn new(reader: R, config: ScanConfig) -> Self {
        let offset = config.start;
        debug!(
            start = offset,
            layout = %config.layout,
            policy = ?config.length_policy,
            "starting node scan"
        );
        NodeScanner {
            reader,
            offset,
            buf: Vec::new(),
            buf_start: offset,
            at_eof: false,
            done: false,
            interrupt: None,
            interrupted: false,
            stats: ScanStats {
                position: offset,
                ..ScanStats::default()
            },
            config,
        }
    }

    /// Current scan position.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            position: self.offset,
            ..self.stats.clone()
        }
    }

    /// Stop the scan once `flag` is set.
    ///
    /// The flag is checked before every candidate position, including the
    /// one-byte steps through regions without a header, so a set flag ends
    /// the iteration without pulling another node.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Returns true if the scan ended because the interrupt flag was set.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Find the next node at or after the current position.
    fn next_node(&mut self) -> Result<Option<FoundNode>, UbifsError> {
        loop {
            if self
                .interrupt
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                self.interrupted = true;
                debug!(position = self.offset, "node scan interrupted");
                return Ok(None);
            }

            let raw = match self.window()? {
                Some(w) => w,
                None => return Ok(None),
            };

            if !starts_with_magic(&raw) {
                self.step_one();
                continue;
            }

            let header = match NodeHeader::parse(&raw, self.config.layout) {
                Some(h) => h,
                None => return Ok(None),
            };

            if header.is_degenerate() {
                self.stats.degenerate += 1;
                warn!(
                    offset = self.offset,
                    len = header.len,
                    policy = ?self.config.length_policy,
                    "node length is smaller than the header"
                );
                if self.config.length_policy == LengthPolicy::Resync {
                    self.step_one();
                    continue;
                }
            }

            let node = FoundNode::new(self.offset, &header, raw);
            let advance = u64::from(header.len).max(HEADER_SIZE_U64);
            self.offset = self.offset.saturating_add(advance);
            self.stats.nodes += 1;
            return Ok(Some(node));
        }
    }

    fn step_one(&mut self) {
        self.offset += 1;
        self.stats.resync_bytes += 1;
    }

    /// Copy of the 24 bytes at the current position, or `None` when fewer
    /// than 24 bytes remain.
    fn window(&mut self) -> Result<Option<[u8; NODE_HEADER_SIZE]>, UbifsError> {
        let end = match self.offset.checked_add(HEADER_SIZE_U64) {
            Some(e) => e,
            None => return Ok(None),
        };
        let buf_end = self.buf_start + self.buf.len() as u64;

        if self.offset < self.buf_start || end > buf_end {
            // The buffer already runs up to end-of-stream
            if self.at_eof && self.offset >= self.buf_start {
                return Ok(None);
            }
            self.refill()?;
            if self.buf.len() < NODE_HEADER_SIZE {
                return Ok(None);
            }
        }

        let rel = (self.offset - self.buf_start) as usize;
        let mut w = [0u8; NODE_HEADER_SIZE];
        w.copy_from_slice(&self.buf[rel..rel + NODE_HEADER_SIZE]);
        Ok(Some(w))
    }

    /// Refill the window starting at the current position.
    fn refill(&mut self) -> Result<(), UbifsError> {
        let offset = self.offset;
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| UbifsError::Io(format!("Cannot seek to offset {}: {}", offset, e)))?;

        self.buf.resize(self.config.window_size.max(NODE_HEADER_SIZE), 0);
        self.at_eof = false;
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    self.at_eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.clear();
                    return Err(UbifsError::Io(format!(
                        "Cannot read at offset {}: {}",
                        offset + filled as u64,
                        e
                    )));
                }
            }
        }
        self.buf.truncate(filled);
        self.buf_start = offset;
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for NodeScanner<R> {
    type Item = Result<FoundNode, UbifsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_node() {
            Ok(Some(node)) => Some(Ok(node)),
            Ok(None) => {
                self.done = true;
                debug!(
                    nodes = self.stats.nodes,
                    resync_bytes = self.stats.resync_bytes,
                    degenerate = self.stats.degenerate,
                    position = self.offset,
                    "node scan finished"
                );
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read + Seek> FusedIterator for NodeScanner<R> {}

/// Scan `reader` from offset 0 with the default configuration.
pub fn scan<R: Read + Seek>(reader: R) -> NodeScanner<R> {
    NodeScanner::new(reader, ScanConfig::default())
}

/// Scan an in-memory buffer.
pub fn scan_bytes(data: &[u8], config: ScanConfig) -> NodeScanner<Cursor<&[u8]>> {
    NodeScanner::new(Cursor::new(data), config)
}
