//! Image sources for scanning.
//!
//! [`UbifsImage`] wraps a type-erased `Read + Seek` source (a buffered file,
//! a memory-mapped file, or an in-memory buffer) together with its size, and
//! hands it to a [`NodeScanner`]. It also serves raw reads at arbitrary
//! offsets for header dumps.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::format::constants::NODE_HEADER_SIZE;
use crate::format::header::{HeaderLayout, NodeHeader};
use crate::format::scanner::{NodeScanner, ScanConfig};
use crate::UbifsError;

/// Supertrait combining `Read + Seek` for type-erased readers.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// A memory-mapped file reader implementing `Read` and `Seek`.
///
/// The mapping is not copied; pages are faulted in as the scanner touches
/// them.
#[cfg(feature = "cli")]
struct MmapReader {
    mmap: memmap2::Mmap,
    position: u64,
}

#[cfg(feature = "cli")]
impl MmapReader {
    fn new(mmap: memmap2::Mmap) -> Self {
        Self { mmap, position: 0 }
    }
}

#[cfg(feature = "cli")]
impl Read for MmapReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = self.mmap.len() as u64;
        if self.position >= len {
            return Ok(0);
        }
        let available = (len - self.position) as usize;
        let to_read = buf.len().min(available);
        let start = self.position as usize;
        buf[..to_read].copy_from_slice(&self.mmap[start..start + to_read]);
        self.position += to_read as u64;
        Ok(to_read)
    }
}

#[cfg(feature = "cli")]
impl Seek for MmapReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let len = self.mmap.len() as i64;
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.position = new_pos as u64;
        Ok(self.position)
    }
}

/// An opened image (file, mapping, or buffer) ready to be scanned.
pub struct UbifsImage {
    reader: Box<dyn ReadSeek>,
    size: u64,
}

impl UbifsImage {
    /// Open an image file for plain `File` reads.
    ///
    /// The file handle itself is unbuffered; [`NodeScanner`] reads it
    /// through its own window buffer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UbifsError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| UbifsError::Open(format!("Cannot open {}: {}", path.display(), e)))?;

        let size = file
            .metadata()
            .map_err(|e| UbifsError::Open(format!("Cannot stat {}: {}", path.display(), e)))?
            .len();

        Ok(UbifsImage {
            reader: Box::new(file),
            size,
        })
    }

    /// Open an image file using memory-mapped I/O.
    ///
    /// # Safety
    ///
    /// The underlying `mmap` call is `unsafe` because the file must not be
    /// truncated by another process while the mapping is alive. Images are
    /// only ever read here.
    #[cfg(feature = "cli")]
    pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<Self, UbifsError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| UbifsError::Open(format!("Cannot open {}: {}", path.display(), e)))?;

        let size = file
            .metadata()
            .map_err(|e| UbifsError::Open(format!("Cannot stat {}: {}", path.display(), e)))?
            .len();

        // Mapping an empty file fails on some platforms
        if size == 0 {
            return Ok(Self::from_bytes(Vec::new()));
        }

        let mmap = unsafe {
            memmap2::Mmap::map(&file)
                .map_err(|e| UbifsError::Open(format!("Cannot mmap {}: {}", path.display(), e)))?
        };

        Ok(UbifsImage {
            reader: Box::new(MmapReader::new(mmap)),
            size,
        })
    }

    /// Wrap an in-memory buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use ubifs::format::header::{HeaderLayout, NodeHeader};
    /// use ubifs::format::image::UbifsImage;
    /// use ubifs::format::scanner::ScanConfig;
    ///
    /// let mut data = vec![0xffu8; 7];
    /// data.extend_from_slice(&NodeHeader::new(HeaderLayout::Compact, 2, 24, 5).to_bytes());
    ///
    /// let mut image = UbifsImage::from_bytes(data);
    /// let nodes: Vec<_> = image.scan(ScanConfig::default()).collect::<Result<_, _>>().unwrap();
    /// assert_eq!(nodes.len(), 1);
    /// assert_eq!(nodes[0].offset, 7);
    /// assert_eq!(nodes[0].type_label, "Data");
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        UbifsImage {
            reader: Box::new(Cursor::new(data)),
            size,
        }
    }

    /// Size of the image in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Start a lazy node scan over this image.
    pub fn scan(&mut self, config: ScanConfig) -> NodeScanner<&mut Box<dyn ReadSeek>> {
        NodeScanner::new(&mut self.reader, config)
    }

    /// Read up to `len` bytes at `offset`, clamped to the end of the image.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, UbifsError> {
        if offset >= self.size {
            return Err(UbifsError::Argument(format!(
                "Offset {} is beyond image size {}",
                offset, self.size
            )));
        }
        let available = (self.size - offset).min(len as u64) as usize;

        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| UbifsError::Io(format!("Cannot seek to offset {}: {}", offset, e)))?;

        let mut buf = vec![0u8; available];
        self.reader.read_exact(&mut buf).map_err(|e| {
            UbifsError::Io(format!(
                "Cannot read {} bytes at offset {}: {}",
                available, offset, e
            ))
        })?;
        Ok(buf)
    }

    /// Decode the header at exactly `offset`, without resynchronization.
    ///
    /// Returns the header and its raw bytes. The magic is not required to
    /// match; callers check [`NodeHeader::has_magic`].
    pub fn header_at(
        &mut self,
        offset: u64,
        layout: HeaderLayout,
    ) -> Result<(NodeHeader, Vec<u8>), UbifsError> {
        let raw = self.read_at(offset, NODE_HEADER_SIZE)?;
        let header = NodeHeader::parse(&raw, layout).ok_or_else(|| {
            UbifsError::Parse(format!(
                "Only {} bytes at offset {}, a node header needs {}",
                raw.len(),
                offset,
                NODE_HEADER_SIZE
            ))
        })?;
        Ok((header, raw))
    }
}
