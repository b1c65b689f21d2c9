//! UBIFS node type definitions.
//!
//! Maps the 1-byte node type field of the common header to a [`NodeType`].
//! Two numbering schemes exist, one per [`HeaderLayout`]:
//!
//! - **Compact** numbers the eight journal/index kinds from 1 (Inode) to
//!   8 (Index); code 0 and everything above 8 are unknown.
//! - **Kernel** follows `UBIFS_*_NODE` in the Linux `ubifs-media.h`, from
//!   0 (`UBIFS_INO_NODE`) to 11 (`UBIFS_ORPH_NODE`).
//!
//! Unrecognized codes never fail; they map to [`NodeType::Unknown`] and the
//! raw code travels alongside in the scan report.

use serde::Serialize;
use std::fmt;

use crate::format::header::HeaderLayout;

/// Every node kind known to either numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    /// File or directory metadata (compact 1, kernel 0)
    Inode,
    /// File content block (compact 2, kernel 1)
    Data,
    /// Directory entry (compact 3, kernel 2)
    Direntry,
    /// Extended attribute entry (compact 4, kernel 3)
    Xattr,
    /// Truncation record (compact 5, kernel 4)
    Trun,
    /// Padding node filling the tail of an eraseblock (kernel 5)
    Pad,
    /// Superblock (kernel 6)
    Superblock,
    /// Master node (compact 6, kernel 7)
    Master,
    /// Journal reference to a bud (kernel 8)
    Ref,
    /// Node grouping marker (compact 7)
    Group,
    /// B-tree index node (compact 8, kernel 9)
    Index,
    /// Commit start (kernel 10)
    CommitStart,
    /// Orphan list (kernel 11)
    Orphan,
    /// Any code not in the table
    Unknown,
}

impl NodeType {
    /// Classify a node type code using the compact numbering.
    ///
    /// # Examples
    ///
    /// ```
    /// use ubifs::format::node_types::NodeType;
    ///
    /// assert_eq!(NodeType::from_u8(6), NodeType::Master);
    /// assert_eq!(NodeType::from_u8(6).name(), "Master");
    /// assert_eq!(NodeType::from_u8(0), NodeType::Unknown);
    /// ```
    pub fn from_u8(code: u8) -> Self {
        match code {
            1 => NodeType::Inode,
            2 => NodeType::Data,
            3 => NodeType::Direntry,
            4 => NodeType::Xattr,
            5 => NodeType::Trun,
            6 => NodeType::Master,
            7 => NodeType::Group,
            8 => NodeType::Index,
            _ => NodeType::Unknown,
        }
    }

    /// Classify a node type code using the kernel numbering.
    pub fn from_kernel_u8(code: u8) -> Self {
        match code {
            0 => NodeType::Inode,
            1 => NodeType::Data,
            2 => NodeType::Direntry,
            3 => NodeType::Xattr,
            4 => NodeType::Trun,
            5 => NodeType::Pad,
            6 => NodeType::Superblock,
            7 => NodeType::Master,
            8 => NodeType::Ref,
            9 => NodeType::Index,
            10 => NodeType::CommitStart,
            11 => NodeType::Orphan,
            _ => NodeType::Unknown,
        }
    }

    /// Classify a node type code with the numbering that belongs to `layout`.
    pub fn from_u8_with_layout(code: u8, layout: HeaderLayout) -> Self {
        match layout {
            HeaderLayout::Compact => Self::from_u8(code),
            HeaderLayout::Kernel => Self::from_kernel_u8(code),
        }
    }

    /// Returns (name, description) for this node type.
    fn metadata(self) -> (&'static str, &'static str) {
        match self {
            NodeType::Inode => ("Inode", "File or directory metadata"),
            NodeType::Data => ("Data", "File content block"),
            NodeType::Direntry => ("Direntry", "Directory entry"),
            NodeType::Xattr => ("Xattr", "Extended attribute entry"),
            NodeType::Trun => ("Trun", "Truncation record"),
            NodeType::Pad => ("Pad", "Eraseblock padding"),
            NodeType::Superblock => ("Superblock", "Filesystem superblock"),
            NodeType::Master => ("Master", "Filesystem master record"),
            NodeType::Ref => ("Ref", "Journal bud reference"),
            NodeType::Group => ("Group", "Node grouping marker"),
            NodeType::Index => ("Index", "B-tree index node"),
            NodeType::CommitStart => ("CommitStart", "Commit start marker"),
            NodeType::Orphan => ("Orphan", "Orphaned inode list"),
            NodeType::Unknown => ("Unknown", "Unrecognized node type code"),
        }
    }

    /// Returns the display label, e.g. `"Direntry"`.
    pub fn name(self) -> &'static str {
        self.metadata().0
    }

    /// Returns a short human-readable description.
    pub fn description(self) -> &'static str {
        self.metadata().1
    }

    /// Look up a node type by label, ignoring ASCII case.
    ///
    /// Used for user-supplied type filters. Returns `None` for labels that
    /// are not in the table; `"unknown"` resolves to [`NodeType::Unknown`].
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_NODE_TYPES
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every variant, in declaration order.
pub const ALL_NODE_TYPES: [NodeType; 14] = [
    NodeType::Inode,
    NodeType::Data,
    NodeType::Direntry,
    NodeType::Xattr,
    NodeType::Trun,
    NodeType::Pad,
    NodeType::Superblock,
    NodeType::Master,
    NodeType::Ref,
    NodeType::Group,
    NodeType::Index,
    NodeType::CommitStart,
    NodeType::Orphan,
    NodeType::Unknown,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_labels() {
        let expected = [
            (1, "Inode"),
            (2, "Data"),
            (3, "Direntry"),
            (4, "Xattr"),
            (5, "Trun"),
            (6, "Master"),
            (7, "Group"),
            (8, "Index"),
        ];
        for (code, label) in expected {
            assert_eq!(NodeType::from_u8(code).name(), label, "code {}", code);
        }
    }

    #[test]
    fn test_compact_unknown_codes() {
        for code in [0u8, 9, 10, 42, 127, 255] {
            assert_eq!(NodeType::from_u8(code), NodeType::Unknown);
            assert_eq!(NodeType::from_u8(code).name(), "Unknown");
        }
    }

    #[test]
    fn test_kernel_numbering() {
        assert_eq!(NodeType::from_kernel_u8(0), NodeType::Inode);
        assert_eq!(NodeType::from_kernel_u8(5), NodeType::Pad);
        assert_eq!(NodeType::from_kernel_u8(6), NodeType::Superblock);
        assert_eq!(NodeType::from_kernel_u8(7), NodeType::Master);
        assert_eq!(NodeType::from_kernel_u8(9), NodeType::Index);
        assert_eq!(NodeType::from_kernel_u8(11), NodeType::Orphan);
        assert_eq!(NodeType::from_kernel_u8(12), NodeType::Unknown);
    }

    #[test]
    fn test_layout_dispatch() {
        // Code 6 means Master in the compact table but Superblock in the kernel one
        assert_eq!(
            NodeType::from_u8_with_layout(6, HeaderLayout::Compact),
            NodeType::Master
        );
        assert_eq!(
            NodeType::from_u8_with_layout(6, HeaderLayout::Kernel),
            NodeType::Superblock
        );
    }

    #[test]
    fn test_from_name_case_insensitive() {
        assert_eq!(NodeType::from_name("master"), Some(NodeType::Master));
        assert_eq!(NodeType::from_name("DIRENTRY"), Some(NodeType::Direntry));
        assert_eq!(NodeType::from_name("unknown"), Some(NodeType::Unknown));
        assert_eq!(NodeType::from_name("inode_node"), None);
    }

    #[test]
    fn test_display_matches_name() {
        for t in ALL_NODE_TYPES {
            assert_eq!(format!("{}", t), t.name());
        }
    }
}
