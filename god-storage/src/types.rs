//! Layout constants and shared types of the GOD container format.

use gdf_parser::DiscVariant;
use std::path::PathBuf;

/// Payload granularity of hashing and part accounting.
pub const BLOCK_SIZE: usize = 4096;

/// Bytes per SHA-1 digest.
pub const HASH_SIZE: usize = 20;

/// Payload blocks covered by one sub-hash-table.
pub const BLOCKS_PER_SHT: usize = 204;

/// Sub-hash-table slots in the master table.
pub const SHT_PER_MHT: usize = 203;

/// Payload blocks per Data part.
pub const BLOCK_PER_PART: u64 = 41412;

/// Byte size of a sub-hash-table.
pub const SHT_SIZE: usize = BLOCKS_PER_SHT * HASH_SIZE;

/// Byte size of the master hash table.
pub const MHT_SIZE: usize = SHT_PER_MHT * HASH_SIZE;

/// Reserved hash-table region at the head of `Data0000`: the master
/// table followed by every sub-table slot.
pub const HASH_PREFIX_SIZE: usize = MHT_SIZE + SHT_PER_MHT * SHT_SIZE;

/// Payload bytes a full Data part holds.
pub const PART_PAYLOAD_SIZE: u64 = BLOCK_PER_PART * BLOCK_SIZE as u64;

/// Directory under `Content/` that sideloaded packages live in.
pub const CONTENT_SUBDIR: &str = "0000000000000000";

/// Upper bound on the embedded executable; anything larger is rejected
/// rather than read into memory.
pub const MAX_XEX_SIZE: u64 = 100 * 1024 * 1024;

/// Upper bound on the input image, the capacity of a dual-layer disc.
pub const MAX_ISO_SIZE: u64 = 15 * 1024 * 1024 * 1024;

/// Identity of a disc image, extracted without converting it.
#[derive(Debug, Clone)]
pub struct IsoInfo {
    /// Name of the executable the identity was read from.
    pub executable: String,
    /// Title id as 8 uppercase hex digits.
    pub title_id: String,
    /// Media id as 8 uppercase hex digits.
    pub media_id: String,
    pub platform: String,
    pub variant: DiscVariant,
    pub size_bytes: u64,
}

/// What a finished conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub title_id: String,
    pub media_id: String,
    pub variant: DiscVariant,
    /// Size of the source image in bytes.
    pub iso_bytes: u64,
    /// Payload blocks written.
    pub blocks: u64,
    /// Data parts created.
    pub parts: u32,
    /// Directory the Data parts were written into.
    pub content_dir: PathBuf,
}
