//! UBIFS node header constants.
//!
//! Field offsets are relative to the first byte of the header. All
//! multi-byte fields are little-endian.

/// Magic number at the start of every UBIFS node.
pub const UBIFS_NODE_MAGIC: u32 = 0x0610_1831;

/// Size of the common node header in bytes. Also the number of bytes the
/// scanner reads at each candidate offset.
pub const NODE_HEADER_SIZE: usize = 24;

// Compact layout (magic, type, group, padding, len, reserved, sqnum)

/// Magic number (4 bytes)
pub const CH_MAGIC: usize = 0;
/// Node type (1 byte)
pub const CH_NODE_TYPE: usize = 4;
/// Group type (1 byte)
pub const CH_GROUP_TYPE: usize = 5;
/// Padding (2 bytes)
pub const CH_PADDING: usize = 6;
/// Full node length including the header (4 bytes)
pub const CH_LEN: usize = 8;
/// Reserved alignment gap (4 bytes)
pub const CH_RESERVED: usize = 12;
/// Sequence number (8 bytes)
pub const CH_SQNUM: usize = 16;

// Kernel `ubifs_ch` layout (magic, crc, sqnum, len, type, group, padding)

/// Magic number (4 bytes)
pub const KCH_MAGIC: usize = 0;
/// CRC-32 of the node, header fields after this one included (4 bytes)
pub const KCH_CRC: usize = 4;
/// Sequence number (8 bytes)
pub const KCH_SQNUM: usize = 8;
/// Full node length including the header (4 bytes)
pub const KCH_LEN: usize = 16;
/// Node type (1 byte)
pub const KCH_NODE_TYPE: usize = 20;
/// Group type (1 byte)
pub const KCH_GROUP_TYPE: usize = 21;
/// Padding (2 bytes)
pub const KCH_PADDING: usize = 22;

/// Default size of the scanner's read window.
pub const DEFAULT_WINDOW_SIZE: usize = 64 * 1024;
