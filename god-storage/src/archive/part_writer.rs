//! Writer for the `Data0000`, `Data0001`, … payload part files.

use crate::error::{GodError, Result};
use crate::types::{BLOCK_SIZE, HASH_PREFIX_SIZE, PART_PAYLOAD_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of part `index` inside the content directory.
pub fn part_name(index: u32) -> String {
    format!("Data{index:04}")
}

/// Streams payload blocks across the part sequence.
///
/// Part 0 opens with a reserved, zeroed hash-table region that
/// [`finish`](DataPartWriter::finish) overwrites once the tree is known.
/// A part rolls over after 41412 payload blocks when more payload
/// follows, so every part except the last is full.
pub struct DataPartWriter {
    dir: PathBuf,
    writer: BufWriter<File>,
    part_index: u32,
    part_payload: u64,
}

impl DataPartWriter {
    /// Create `Data0000` and reserve the hash-table prefix.
    pub fn create(dir: &Path) -> Result<Self> {
        let mut writer = open_part(dir, 0)?;
        writer
            .write_all(&vec![0u8; HASH_PREFIX_SIZE])
            .map_err(GodError::Write)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            writer,
            part_index: 0,
            part_payload: 0,
        })
    }

    /// Append one payload block to the current part.
    ///
    /// `more_payload` tells the writer whether anything follows; a full
    /// part only rolls over when it does.
    pub fn write_block(&mut self, block: &[u8; BLOCK_SIZE], more_payload: bool) -> Result<()> {
        self.writer.write_all(block).map_err(GodError::Write)?;
        self.part_payload += BLOCK_SIZE as u64;

        if self.part_payload >= PART_PAYLOAD_SIZE && more_payload {
            self.writer.flush().map_err(GodError::Write)?;
            self.part_index += 1;
            self.part_payload = 0;
            debug!("part full, rolling over to part {}", self.part_index);
            self.writer = open_part(&self.dir, self.part_index)?;
        }
        Ok(())
    }

    /// Parts created so far.
    pub fn part_count(&self) -> u32 {
        self.part_index + 1
    }

    /// Flush the final part, then overwrite the reserved region of part 0
    /// with the finalized hash tables. Returns the part count.
    pub fn finish(mut self, hash_prefix: &[u8]) -> Result<u32> {
        self.writer.flush().map_err(GodError::Write)?;
        let Self {
            dir, part_index, ..
        } = self;

        let path = dir.join(part_name(0));
        let mut part0 = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| GodError::Open {
                path: path.clone(),
                source,
            })?;
        part0.seek(SeekFrom::Start(0)).map_err(GodError::Seek)?;
        part0.write_all(hash_prefix).map_err(GodError::Write)?;
        debug!(
            "hash tables written to {:?} ({} bytes)",
            path,
            hash_prefix.len()
        );

        Ok(part_index + 1)
    }
}

fn open_part(dir: &Path, index: u32) -> Result<BufWriter<File>> {
    let path = dir.join(part_name(index));
    debug!("creating part file {:?}", path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .map_err(|source| GodError::Open {
            path: path.clone(),
            source,
        })?;
    Ok(BufWriter::new(file))
}
