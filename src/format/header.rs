//! UBIFS common node header decoding.
//!
//! Every UBIFS node starts with a 24-byte common header carrying the magic
//! number, the node type, the full node length, and a sequence number. The
//! header is decoded field by field from a byte slice at fixed offsets in
//! little-endian order; nothing depends on in-memory struct layout.
//!
//! Two layouts are supported, see [`HeaderLayout`]. Both place the magic at
//! byte 0 and both are exactly [`NODE_HEADER_SIZE`] bytes long, so the
//! scanner's stride and magic test do not depend on the layout.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::fmt;

use crate::format::constants::*;
use crate::format::node_types::NodeType;

/// Field order of the 24-byte common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLayout {
    /// `magic@0 type@4 group@5 padding@6 len@8 reserved@12 sqnum@16`,
    /// node types numbered 1-8.
    #[default]
    Compact,
    /// Linux `struct ubifs_ch`: `magic@0 crc@4 sqnum@8 len@16 type@20
    /// group@21 padding@22`, node types numbered 0-11.
    Kernel,
}

impl fmt::Display for HeaderLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderLayout::Compact => write!(f, "compact"),
            HeaderLayout::Kernel => write!(f, "kernel"),
        }
    }
}

/// Decoded common node header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHeader {
    /// Layout the fields were decoded with.
    pub layout: HeaderLayout,
    /// Magic number. Bytes 0-3 in both layouts.
    pub magic: u32,
    /// Stored CRC-32 (kernel layout only, never verified).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc: Option<u32>,
    /// Raw node type code.
    pub node_type: u8,
    /// Raw group type code. Not interpreted.
    pub group_type: u8,
    /// Padding bytes as a little-endian u16. Not interpreted.
    pub padding: u16,
    /// Full node length in bytes, header included.
    pub len: u32,
    /// Sequence number.
    pub sqnum: u64,
}

impl NodeHeader {
    /// Decode a header from the first [`NODE_HEADER_SIZE`] bytes of `data`.
    ///
    /// Returns `None` when fewer than 24 bytes are available. The magic is
    /// not checked here; see [`NodeHeader::has_magic`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ubifs::format::header::{HeaderLayout, NodeHeader};
    ///
    /// let bytes = NodeHeader::new(HeaderLayout::Compact, 6, 24, 42).to_bytes();
    /// let hdr = NodeHeader::parse(&bytes, HeaderLayout::Compact).unwrap();
    /// assert!(hdr.has_magic());
    /// assert_eq!(hdr.node_type, 6);
    /// assert_eq!(hdr.sqnum, 42);
    /// ```
    pub fn parse(data: &[u8], layout: HeaderLayout) -> Option<Self> {
        if data.len() < NODE_HEADER_SIZE {
            return None;
        }

        let hdr = match layout {
            HeaderLayout::Compact => NodeHeader {
                layout,
                magic: LittleEndian::read_u32(&data[CH_MAGIC..]),
                crc: None,
                node_type: data[CH_NODE_TYPE],
                group_type: data[CH_GROUP_TYPE],
                padding: LittleEndian::read_u16(&data[CH_PADDING..]),
                len: LittleEndian::read_u32(&data[CH_LEN..]),
                sqnum: LittleEndian::read_u64(&data[CH_SQNUM..]),
            },
            HeaderLayout::Kernel => NodeHeader {
                layout,
                magic: LittleEndian::read_u32(&data[KCH_MAGIC..]),
                crc: Some(LittleEndian::read_u32(&data[KCH_CRC..])),
                node_type: data[KCH_NODE_TYPE],
                group_type: data[KCH_GROUP_TYPE],
                padding: LittleEndian::read_u16(&data[KCH_PADDING..]),
                len: LittleEndian::read_u32(&data[KCH_LEN..]),
                sqnum: LittleEndian::read_u64(&data[KCH_SQNUM..]),
            },
        };
        Some(hdr)
    }

    /// Build a header with a valid magic and zeroed group/padding/crc.
    pub fn new(layout: HeaderLayout, node_type: u8, len: u32, sqnum: u64) -> Self {
        NodeHeader {
            layout,
            magic: UBIFS_NODE_MAGIC,
            crc: match layout {
                HeaderLayout::Compact => None,
                HeaderLayout::Kernel => Some(0),
            },
            node_type,
            group_type: 0,
            padding: 0,
            len,
            sqnum,
        }
    }

    /// Encode the header into its 24-byte on-disk form.
    ///
    /// The reserved gap of the compact layout is written as zeros.
    pub fn to_bytes(&self) -> [u8; NODE_HEADER_SIZE] {
        let mut buf = [0u8; NODE_HEADER_SIZE];
        match self.layout {
            HeaderLayout::Compact => {
                LittleEndian::write_u32(&mut buf[CH_MAGIC..], self.magic);
                buf[CH_NODE_TYPE] = self.node_type;
                buf[CH_GROUP_TYPE] = self.group_type;
                LittleEndian::write_u16(&mut buf[CH_PADDING..], self.padding);
                LittleEndian::write_u32(&mut buf[CH_LEN..], self.len);
                LittleEndian::write_u64(&mut buf[CH_SQNUM..], self.sqnum);
            }
            HeaderLayout::Kernel => {
                LittleEndian::write_u32(&mut buf[KCH_MAGIC..], self.magic);
                LittleEndian::write_u32(&mut buf[KCH_CRC..], self.crc.unwrap_or(0));
                LittleEndian::write_u64(&mut buf[KCH_SQNUM..], self.sqnum);
                LittleEndian::write_u32(&mut buf[KCH_LEN..], self.len);
                buf[KCH_NODE_TYPE] = self.node_type;
                buf[KCH_GROUP_TYPE] = self.group_type;
                LittleEndian::write_u16(&mut buf[KCH_PADDING..], self.padding);
            }
        }
        buf
    }

    /// Returns true if the magic field equals [`UBIFS_NODE_MAGIC`].
    pub fn has_magic(&self) -> bool {
        self.magic == UBIFS_NODE_MAGIC
    }

    /// Classified node type.
    pub fn kind(&self) -> NodeType {
        NodeType::from_u8_with_layout(self.node_type, self.layout)
    }

    /// Returns true if `len` is too small to cover the header itself.
    pub fn is_degenerate(&self) -> bool {
        (self.len as usize) < NODE_HEADER_SIZE
    }
}

/// Returns true if `data` starts with the UBIFS node magic.
///
/// Cheaper than a full [`NodeHeader::parse`]; the magic sits at byte 0 in
/// every layout.
pub fn starts_with_magic(data: &[u8]) -> bool {
    data.len() >= 4 && LittleEndian::read_u32(&data[..4]) == UBIFS_NODE_MAGIC
}
