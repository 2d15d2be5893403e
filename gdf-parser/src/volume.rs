//! GDF volume access: disc-variant detection, the on-disk directory tree,
//! and file lookup.

use crate::ioutils::ReadInt;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// Bytes per GDF sector.
pub const SECTOR_SIZE: u64 = 2048;

/// Sector holding the volume descriptor, relative to the root offset.
const DESCRIPTOR_SECTOR: u64 = 32;

/// Magic string opening the volume descriptor.
const MEDIA_MAGIC: &[u8; 20] = b"MICROSOFT*XBOX*MEDIA";

/// Attribute bit marking a directory entry as a subdirectory.
const ATTR_DIRECTORY: u8 = 0x10;

/// Fixed-size portion of a directory record: subtree indices, first
/// sector, size, attributes and name length.
const DIRENT_FIXED_LEN: usize = 14;

/// Subtree index value terminating a directory table.
const DIRENT_TERMINATOR: u16 = 0xFFFF;

/// Directory nesting bound; anything deeper is treated as malformed.
const MAX_DIRECTORY_DEPTH: usize = 64;

/// Disc layout variants, distinguished by the base offset the GDF
/// partition starts at inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscVariant {
    /// Redump-style images with the game partition at the start.
    Xsf,
    Xgd1,
    Xgd2,
    Xgd3,
}

impl DiscVariant {
    /// Probe order. XGD3 is last so the cheaper offsets win first.
    pub const ALL: [DiscVariant; 4] = [
        DiscVariant::Xsf,
        DiscVariant::Xgd1,
        DiscVariant::Xgd2,
        DiscVariant::Xgd3,
    ];

    /// Byte offset of the game partition inside the image. Added to every
    /// sector address when translating to a file offset.
    pub const fn root_offset(self) -> u64 {
        match self {
            DiscVariant::Xsf => 0,
            DiscVariant::Xgd1 => 0x0002_0000,
            DiscVariant::Xgd2 => 0x00FD_A000,
            DiscVariant::Xgd3 => 0x0208_0000,
        }
    }
}

impl fmt::Display for DiscVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscVariant::Xsf => f.write_str("XSF"),
            DiscVariant::Xgd1 => f.write_str("XGD1"),
            DiscVariant::Xgd2 => f.write_str("XGD2"),
            DiscVariant::Xgd3 => f.write_str("XGD3"),
        }
    }
}

/// One entry of the GDF directory tree, in encounter order.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    /// First sector of the entry's data, relative to the root offset.
    pub sector: u32,
    /// Size in bytes.
    pub size: u32,
    pub attributes: u8,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }
}

/// A GDF volume over a seekable image reader.
#[derive(Debug)]
pub struct Volume<R> {
    reader: R,
    variant: DiscVariant,
    root_sector: u32,
    root_size: u32,
    entries: Vec<DirEntry>,
}

impl Volume<BufReader<File>> {
    /// Open a disc image from the filesystem.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> Volume<R> {
    /// Detect the disc variant and parse the volume descriptor.
    ///
    /// The magic is verified at every candidate offset, XGD3 included; a
    /// reader matching none of them is rejected.
    pub fn new(mut reader: R) -> Result<Self> {
        let variant = detect_variant(&mut reader)?;

        let descriptor =
            variant.root_offset() + DESCRIPTOR_SECTOR * SECTOR_SIZE + MEDIA_MAGIC.len() as u64;
        reader.seek(SeekFrom::Start(descriptor))?;
        let root_sector = reader.read_u32le()?;
        let root_size = reader.read_u32le()?;
        debug!(
            "GDF volume: variant {}, root directory at sector {} ({} bytes)",
            variant, root_sector, root_size
        );

        Ok(Self {
            reader,
            variant,
            root_sector,
            root_size,
            entries: Vec::new(),
        })
    }

    pub fn variant(&self) -> DiscVariant {
        self.variant
    }

    /// Walk the directory tree into a flat, encounter-ordered listing.
    ///
    /// Subsequent calls return the cached listing.
    pub fn parse_root(&mut self) -> Result<&[DirEntry]> {
        if self.entries.is_empty() {
            let mut entries = Vec::new();
            let mut visited = HashSet::new();
            walk_directory(
                &mut self.reader,
                self.variant.root_offset(),
                self.root_sector,
                self.root_size,
                0,
                &mut visited,
                &mut entries,
            )?;
            debug!("GDF directory walk found {} entries", entries.len());
            self.entries = entries;
        }
        Ok(&self.entries)
    }

    /// All entries found by [`parse_root`](Self::parse_root).
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Exact-name lookup of a file (never a directory) in the listing.
    pub fn find(&self, name: &str) -> Option<&DirEntry> {
        self.entries
            .iter()
            .find(|e| !e.is_directory() && e.name == name)
    }

    /// Byte offset of an entry's data inside the image.
    pub fn file_offset(&self, entry: &DirEntry) -> u64 {
        self.variant.root_offset() + u64::from(entry.sector) * SECTOR_SIZE
    }

    /// Read an entry's contents into an owned buffer.
    pub fn read_file(&mut self, entry: &DirEntry) -> Result<Vec<u8>> {
        let offset = self.file_offset(entry);
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; entry.size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }
}

/// Probe the media magic at each candidate root offset.
fn detect_variant<R: Read + Seek>(reader: &mut R) -> Result<DiscVariant> {
    let mut magic = [0u8; MEDIA_MAGIC.len()];
    for variant in DiscVariant::ALL {
        let offset = variant.root_offset() + DESCRIPTOR_SECTOR * SECTOR_SIZE;
        reader.seek(SeekFrom::Start(offset))?;
        match reader.read_exact(&mut magic) {
            Ok(()) if magic == *MEDIA_MAGIC => {
                debug!("media magic found at {:#x}, variant {}", offset, variant);
                return Ok(variant);
            }
            Ok(()) => trace!("no media magic at {:#x}", offset),
            // Image smaller than this variant's descriptor position.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::NoVolumeDescriptor)
}

/// Read one directory table and recurse into its subdirectories.
///
/// The subtree indices form an on-disk binary search tree, but lookups
/// only need the flat listing, so records are consumed in storage order
/// until the terminator.
fn walk_directory<R: Read + Seek>(
    reader: &mut R,
    base: u64,
    sector: u32,
    size: u32,
    depth: usize,
    visited: &mut HashSet<u32>,
    out: &mut Vec<DirEntry>,
) -> Result<()> {
    if depth > MAX_DIRECTORY_DEPTH {
        return Err(Error::DirectoryTooDeep(MAX_DIRECTORY_DEPTH));
    }
    if !visited.insert(sector) {
        return Err(Error::DirectoryLoop(sector));
    }

    reader.seek(SeekFrom::Start(base + u64::from(sector) * SECTOR_SIZE))?;
    let mut table = vec![0u8; size as usize];
    reader.read_exact(&mut table).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::DirectoryOutOfBounds(sector)
        } else {
            Error::IOError(e)
        }
    })?;

    let mut cursor = Cursor::new(table.as_slice());
    loop {
        let pos = cursor.position() as usize;
        // A record whose fixed portion crosses the end terminates the walk.
        if pos + DIRENT_FIXED_LEN > table.len() {
            break;
        }
        let left = cursor.read_u16le()?;
        let right = cursor.read_u16le()?;
        if left == DIRENT_TERMINATOR && right == DIRENT_TERMINATOR {
            break;
        }

        let entry_sector = cursor.read_u32le()?;
        let entry_size = cursor.read_u32le()?;
        let attributes = cursor.read_u8()?;
        let name_len = cursor.read_u8()? as usize;

        let name_at = cursor.position() as usize;
        if name_at + name_len > table.len() {
            break;
        }
        let name_bytes = &table[name_at..name_at + name_len];
        if !name_bytes.is_ascii() {
            return Err(Error::BadEntryName);
        }
        let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| Error::BadEntryName)?;

        // Records are aligned to the next 4-byte boundary.
        cursor.set_position(align_up(name_at + name_len, 4) as u64);

        let entry = DirEntry {
            name,
            sector: entry_sector,
            size: entry_size,
            attributes,
        };
        trace!(
            "entry {:?}: sector {}, {} bytes, dir: {}",
            entry.name,
            entry.sector,
            entry.size,
            entry.is_directory()
        );
        let recurse = entry.is_directory();
        out.push(entry);

        if recurse {
            walk_directory(reader, base, entry_sector, entry_size, depth + 1, visited, out)?;
        }
    }

    Ok(())
}

const fn align_up(val: usize, alignment: usize) -> usize {
    val.div_ceil(alignment) * alignment
}
