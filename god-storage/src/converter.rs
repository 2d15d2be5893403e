//! The ISO → GOD conversion pipeline.
//!
//! A conversion is a single synchronous pass: identify the GDF volume
//! and its `default.xex`, create the output skeleton, then stream the
//! image block-by-block into the Data parts while feeding the hash
//! tree, and finally write the tree back over the reserved prefix of
//! part 0. Cancellation is cooperative, checked at stage boundaries and
//! every 1000 blocks.

use crate::archive::DataPartWriter;
use crate::error::{GodError, Result};
use crate::hashtree::{block_digest, HashTree};
use crate::types::{
    ConversionSummary, IsoInfo, BLOCK_SIZE, CONTENT_SUBDIR, MAX_ISO_SIZE, MAX_XEX_SIZE,
};
use gdf_parser::Volume;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use xex_parser::ExecutionInfo;

/// Executable holding the title identity on every game disc.
const DEFAULT_XEX: &str = "default.xex";

/// Progress and cancellation cadence, in blocks.
const PROGRESS_INTERVAL: u64 = 1000;

/// Zero-length reads tolerated mid-stream before giving up.
const MAX_CONSECUTIVE_SHORT_READS: u32 = 10;

/// Observer of a running conversion.
///
/// Reports arrive on the conversion thread. `cancelled` may be polled
/// from the same thread right after a report, so implementations must
/// tolerate re-entrancy between the two.
pub trait Progress {
    /// `fraction` is in `[0, 1]`; `status` is a short human-readable
    /// description of the current stage.
    fn report(&self, fraction: f32, status: &str);

    fn cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that ignores every report.
pub struct NullProgress;

impl Progress for NullProgress {
    fn report(&self, _fraction: f32, _status: &str) {}
}

/// Drives one ISO → GOD conversion.
pub struct Converter {
    iso_path: PathBuf,
    out_dir: PathBuf,
    cancelled: AtomicBool,
}

impl Converter {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(iso_path: P, out_dir: Q) -> Self {
        Self {
            iso_path: iso_path.into(),
            out_dir: out_dir.into(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cancellation. Safe from any thread; the conversion stops
    /// within at most 1000 further blocks.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self, progress: &dyn Progress) -> bool {
        self.cancelled.load(Ordering::Relaxed) || progress.cancelled()
    }

    /// Run the conversion. On success the container is complete,
    /// hash tables included; on failure or cancellation partial output
    /// is left on disk for the caller to dispose of.
    pub fn convert(&self, progress: &dyn Progress) -> Result<ConversionSummary> {
        info!("converting {:?} into {:?}", self.iso_path, self.out_dir);
        self.cancelled.store(false, Ordering::Relaxed);

        progress.report(0.05, "analyzing ISO");
        let mut volume = Volume::open(&self.iso_path)?;
        let exec = identify(&mut volume)?;
        let title_id = exec.title_id_hex();
        let media_id = exec.media_id_hex();
        let variant = volume.variant();
        info!("title {title_id}, media {media_id}, {variant} layout");
        drop(volume);

        if self.is_cancelled(progress) {
            return Err(GodError::Cancelled);
        }

        progress.report(0.1, "creating structure");
        let content_dir = self
            .out_dir
            .join(&title_id)
            .join("Content")
            .join(CONTENT_SUBDIR);
        std::fs::create_dir_all(&content_dir).map_err(|source| GodError::CreateDir {
            path: content_dir.clone(),
            source,
        })?;

        if self.is_cancelled(progress) {
            return Err(GodError::Cancelled);
        }

        let total_bytes = std::fs::metadata(&self.iso_path)
            .map_err(|source| GodError::Open {
                path: self.iso_path.clone(),
                source,
            })?
            .len();
        if total_bytes > MAX_ISO_SIZE {
            return Err(GodError::IsoTooLarge {
                size: total_bytes,
                max: MAX_ISO_SIZE,
            });
        }
        let expected_blocks = total_bytes.div_ceil(BLOCK_SIZE as u64);
        debug!("{total_bytes} bytes, {expected_blocks} blocks expected");

        let iso = File::open(&self.iso_path).map_err(|source| GodError::Open {
            path: self.iso_path.clone(),
            source,
        })?;
        let mut iso = BufReader::new(iso);

        let mut writer = DataPartWriter::create(&content_dir)?;
        progress.report(0.15, "converting");

        let mut tree = HashTree::new();
        let mut block = [0u8; BLOCK_SIZE];
        let mut consumed: u64 = 0;
        let mut blocks: u64 = 0;

        while consumed < total_bytes && !self.cancelled.load(Ordering::Relaxed) {
            // Loop guard against an image growing under us.
            if blocks > expected_blocks + 100 {
                return Err(GodError::Unexpected(format!(
                    "block count exceeded expected ({blocks} > {expected_blocks})"
                )));
            }

            let want = BLOCK_SIZE.min((total_bytes - consumed) as usize);
            block.fill(0);
            read_full_block(&mut iso, &mut block[..want])?;

            tree.add_block(&block_digest(&block));
            consumed += want as u64;
            writer.write_block(&block, consumed < total_bytes)?;
            blocks += 1;

            if blocks % PROGRESS_INTERVAL == 0 || consumed >= total_bytes {
                let fraction = 0.15 + 0.75 * (consumed as f32 / total_bytes as f32);
                progress.report(fraction, &format!("block {blocks} of {expected_blocks}"));
                if self.is_cancelled(progress) {
                    break;
                }
            }
        }

        if self.is_cancelled(progress) {
            info!("conversion cancelled after {blocks} blocks");
            return Err(GodError::Cancelled);
        }

        progress.report(0.9, "finalizing hashes");
        let tree = tree.finalize();
        debug!("{} sub-hash-tables over {blocks} blocks", tree.sht_count());

        progress.report(0.95, "writing hashes");
        let parts = writer.finish(&tree.prefix())?;

        progress.report(1.0, "done");
        info!("conversion complete: {blocks} blocks in {parts} part(s)");

        Ok(ConversionSummary {
            title_id,
            media_id,
            variant,
            iso_bytes: total_bytes,
            blocks,
            parts,
            content_dir,
        })
    }
}

/// Read the identity of a disc image without converting it.
pub fn inspect<P: AsRef<Path>>(iso_path: P) -> Result<IsoInfo> {
    let iso_path = iso_path.as_ref();
    debug!("reading image identity from {:?}", iso_path);

    let mut volume = Volume::open(iso_path)?;
    let exec = identify(&mut volume)?;
    let size_bytes = std::fs::metadata(iso_path)
        .map_err(|source| GodError::Open {
            path: iso_path.to_path_buf(),
            source,
        })?
        .len();

    Ok(IsoInfo {
        executable: DEFAULT_XEX.to_string(),
        title_id: exec.title_id_hex(),
        media_id: exec.media_id_hex(),
        platform: "Xbox 360".to_string(),
        variant: volume.variant(),
        size_bytes,
    })
}

/// Locate `default.xex` in the volume and parse its execution info.
fn identify<R: Read + Seek>(volume: &mut Volume<R>) -> Result<ExecutionInfo> {
    volume.parse_root()?;
    let entry = volume
        .find(DEFAULT_XEX)
        .cloned()
        .ok_or(GodError::ExecutableMissing)?;
    debug!(
        "{DEFAULT_XEX} at sector {}, {} bytes",
        entry.sector, entry.size
    );

    if u64::from(entry.size) > MAX_XEX_SIZE {
        return Err(GodError::ExecutableTooLarge {
            size: entry.size.into(),
            max: MAX_XEX_SIZE,
        });
    }

    let xex = volume.read_file(&entry)?;
    Ok(ExecutionInfo::parse(&xex)?)
}

/// Fill `buf` from the reader.
///
/// The caller sizes `buf` so the image never legitimately ends inside
/// it; a zero-length read here is therefore retried a bounded number of
/// times and then reported as a failure.
fn read_full_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    let mut short_reads = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                short_reads += 1;
                if short_reads >= MAX_CONSECUTIVE_SHORT_READS {
                    return Err(GodError::Read(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "image ended before its declared size",
                    )));
                }
            }
            Ok(n) => {
                filled += n;
                short_reads = 0;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(GodError::Read(e)),
        }
    }
    Ok(())
}
