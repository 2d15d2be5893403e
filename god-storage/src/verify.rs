//! Post-conversion integrity check of an emitted container.
//!
//! Rebuilds the hash tree from the payload blocks on disk and compares
//! it against the tables stored at the head of `Data0000` — the same
//! check the console performs, run host-side.

use crate::archive::part_name;
use crate::error::{GodError, Result};
use crate::hashtree::{block_digest, HashTree};
use crate::types::{BLOCKS_PER_SHT, BLOCK_SIZE, HASH_PREFIX_SIZE, MHT_SIZE, SHT_PER_MHT, SHT_SIZE};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of re-hashing a container against its embedded tables.
#[derive(Debug)]
pub struct VerifyReport {
    /// Payload blocks found across all parts.
    pub blocks: u64,
    /// Sub-hash-tables the payload produced.
    pub sht_count: usize,
    /// Slots whose stored sub-table disagrees with the payload.
    pub bad_shts: Vec<usize>,
    pub master_ok: bool,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.master_ok && self.bad_shts.is_empty()
    }
}

/// Re-read every payload block of the container at `content_dir` and
/// compare the rebuilt hash tree against the stored one.
pub fn verify_container(content_dir: &Path) -> Result<VerifyReport> {
    info!("verifying GOD container at {:?}", content_dir);

    let part0_path = content_dir.join(part_name(0));
    let part0 = File::open(&part0_path).map_err(|source| GodError::Open {
        path: part0_path.clone(),
        source,
    })?;
    let mut part0 = BufReader::new(part0);

    let mut stored = vec![0u8; HASH_PREFIX_SIZE];
    part0.read_exact(&mut stored).map_err(GodError::Read)?;

    // Payload order: the rest of part 0, then every following part.
    let mut tree = HashTree::new();
    let mut blocks = 0u64;
    hash_payload(&mut part0, &mut tree, &mut blocks)?;
    for index in 1u32.. {
        let path = content_dir.join(part_name(index));
        let part = match File::open(&path) {
            Ok(part) => part,
            Err(e) if e.kind() == ErrorKind::NotFound => break,
            Err(source) => return Err(GodError::Open { path, source }),
        };
        debug!("hashing payload of {:?}", path);
        hash_payload(&mut BufReader::new(part), &mut tree, &mut blocks)?;
    }

    let sht_count = (tree.block_count() as usize).div_ceil(BLOCKS_PER_SHT);
    let rebuilt = tree.finalize().prefix();

    let master_ok = rebuilt[..MHT_SIZE] == stored[..MHT_SIZE];
    let mut bad_shts = Vec::new();
    for slot in 0..SHT_PER_MHT {
        let at = MHT_SIZE + slot * SHT_SIZE;
        if rebuilt[at..at + SHT_SIZE] != stored[at..at + SHT_SIZE] {
            warn!("sub-hash-table {slot} does not match the payload");
            bad_shts.push(slot);
        }
    }

    let report = VerifyReport {
        blocks,
        sht_count,
        bad_shts,
        master_ok,
    };
    if report.is_ok() {
        info!("verification complete: {blocks} blocks OK");
    } else {
        warn!(
            "verification found {} damaged sub-hash-tables (master ok: {})",
            report.bad_shts.len(),
            report.master_ok
        );
    }
    Ok(report)
}

/// Hash whole blocks until the reader ends. A trailing fragment (a
/// truncated container) is hashed zero-padded so the damage surfaces as
/// a mismatch instead of being skipped.
fn hash_payload<R: Read>(reader: &mut R, tree: &mut HashTree, blocks: &mut u64) -> Result<()> {
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        block.fill(0);
        let n = read_until_eof(reader, &mut block)?;
        if n == 0 {
            return Ok(());
        }
        tree.add_block(&block_digest(&block));
        *blocks += 1;
        if n < BLOCK_SIZE {
            return Ok(());
        }
    }
}

fn read_until_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(GodError::Read(e)),
        }
    }
    Ok(filled)
}
