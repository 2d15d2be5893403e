//! Per-block SHA-1 digests and the two-level hash tree the console uses
//! to verify payload integrity.
//!
//! Digests of consecutive payload blocks accumulate into 204-entry
//! sub-hash-tables; the master table holds one digest per sub-table.
//! Both levels are zero-padded to their fixed sizes.

use crate::types::{BLOCKS_PER_SHT, HASH_PREFIX_SIZE, HASH_SIZE, MHT_SIZE, SHT_PER_MHT, SHT_SIZE};
use sha1::{Digest, Sha1};
use tracing::debug;

/// SHA-1 of one payload block.
///
/// Blocks are always hashed at full block size; the caller zero-pads the
/// tail block before submitting it.
pub fn block_digest(block: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(block);
    hasher.finalize().into()
}

/// Accumulator for block digests, sealing a sub-hash-table every 204
/// blocks.
#[derive(Debug, Default)]
pub struct HashTree {
    shts: Vec<Vec<u8>>,
    current: Vec<u8>,
    blocks_in_current: usize,
}

impl HashTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks submitted so far.
    pub fn block_count(&self) -> u64 {
        (self.shts.len() * BLOCKS_PER_SHT + self.blocks_in_current) as u64
    }

    /// Append one block digest, in payload order.
    pub fn add_block(&mut self, digest: &[u8; HASH_SIZE]) {
        self.current.extend_from_slice(digest);
        self.blocks_in_current += 1;
        if self.blocks_in_current == BLOCKS_PER_SHT {
            self.seal_current();
        }
    }

    /// Zero-pad the open sub-table to its full size and move it onto the
    /// finished list.
    fn seal_current(&mut self) {
        self.current.resize(SHT_SIZE, 0);
        let sht = std::mem::replace(&mut self.current, Vec::with_capacity(SHT_SIZE));
        debug!("sub-hash-table #{} sealed", self.shts.len());
        self.shts.push(sht);
        self.blocks_in_current = 0;
    }

    /// Seal the trailing partial sub-table and derive the master table.
    pub fn finalize(mut self) -> FinalizedHashTree {
        if self.blocks_in_current > 0 {
            self.seal_current();
        }

        let mut master = Vec::with_capacity(MHT_SIZE);
        for sht in &self.shts {
            master.extend_from_slice(&block_digest(sht));
        }
        if master.len() < MHT_SIZE {
            master.resize(MHT_SIZE, 0);
        }
        debug!(
            "hash tree finalized: {} sub-tables, {} byte master",
            self.shts.len(),
            master.len()
        );

        FinalizedHashTree {
            shts: self.shts,
            master,
        }
    }
}

/// The sealed tree. Constructed only through [`HashTree::finalize`], so
/// reads of an unfinished tree cannot be expressed.
#[derive(Debug)]
pub struct FinalizedHashTree {
    shts: Vec<Vec<u8>>,
    master: Vec<u8>,
}

impl FinalizedHashTree {
    pub fn sht_count(&self) -> usize {
        self.shts.len()
    }

    /// The 4080-byte image of sub-hash-table `index`.
    pub fn sht(&self, index: usize) -> Option<&[u8]> {
        self.shts.get(index).map(Vec::as_slice)
    }

    /// The master table: one digest per sub-table, zero-padded to the
    /// fixed 203-slot size.
    pub fn master(&self) -> &[u8] {
        &self.master
    }

    /// Byte image of the reserved `Data0000` prefix: the master table,
    /// then every sub-table slot, zero-filled where no table exists.
    ///
    /// Images larger than one part produce more sub-tables than the
    /// prefix has slots; the excess is not representable and is dropped.
    pub fn prefix(&self) -> Vec<u8> {
        let mut prefix = vec![0u8; HASH_PREFIX_SIZE];
        prefix[..MHT_SIZE].copy_from_slice(&self.master[..MHT_SIZE]);
        for (i, sht) in self.shts.iter().take(SHT_PER_MHT).enumerate() {
            let at = MHT_SIZE + i * SHT_SIZE;
            prefix[at..at + SHT_SIZE].copy_from_slice(sht);
        }
        prefix
    }
}
