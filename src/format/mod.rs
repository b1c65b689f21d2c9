//! UBIFS on-flash format parsing.
//!
//! This module contains the pieces needed to find UBIFS nodes in a raw byte
//! stream: the common node header, the node type table, and the scanner that
//! walks a stream and resynchronizes byte by byte through regions that do
//! not hold a valid header.
//!
//! Start with [`image::UbifsImage`] to open a file, then iterate over
//! [`image::UbifsImage::scan`]. Any other `Read + Seek` source can be scanned
//! directly with [`scanner::NodeScanner::new`].

pub mod constants;
pub mod header;
pub mod image;
pub mod node_types;
pub mod scanner;
