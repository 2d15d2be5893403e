//! End-to-end conversions of synthetic disc images.

mod common;

use common::*;
use god_storage::types::{BLOCK_SIZE, HASH_PREFIX_SIZE, MHT_SIZE, PART_PAYLOAD_SIZE};
use god_storage::{
    block_digest, inspect, verify_container, Converter, DiscVariant, GodError, NullProgress,
    Progress,
};
use std::fs;
use std::io::Read;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BLOCK: u64 = BLOCK_SIZE as u64;

fn convert_image(
    root_offset: u64,
    total_size: Option<u64>,
) -> (TempDir, TempDir, u64, god_storage::ConversionSummary) {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    let total = write_iso(&iso, root_offset, "default.xex", total_size);

    let converter = Converter::new(&iso, out_dir.path());
    let summary = converter.convert(&NullProgress).unwrap();
    (iso_dir, out_dir, total, summary)
}

#[test]
fn converts_xgd2_image_end_to_end() {
    let (iso_dir, out_dir, total, summary) = convert_image(XGD2_OFFSET, None);

    assert_eq!(summary.title_id, "AABBCCDD");
    assert_eq!(summary.media_id, "11223344");
    assert_eq!(summary.variant, DiscVariant::Xgd2);
    assert_eq!(summary.iso_bytes, total);

    let expected_blocks = total.div_ceil(BLOCK);
    assert_eq!(summary.blocks, expected_blocks);
    assert_eq!(summary.parts, 1);

    let content = out_dir
        .path()
        .join("AABBCCDD")
        .join("Content")
        .join("0000000000000000");
    assert_eq!(summary.content_dir, content);

    let data0 = fs::metadata(content.join("Data0000")).unwrap().len();
    assert_eq!(data0, HASH_PREFIX_SIZE as u64 + expected_blocks * BLOCK);

    // The first stored sub-table entry is the digest of the image's
    // first block.
    let mut first_block = vec![0u8; BLOCK_SIZE];
    let mut iso_file = fs::File::open(iso_dir.path().join("game.iso")).unwrap();
    iso_file.read_exact(&mut first_block).unwrap();
    let stored = fs::read(content.join("Data0000")).unwrap();
    assert_eq!(
        &stored[MHT_SIZE..MHT_SIZE + 20],
        block_digest(&first_block).as_slice()
    );

    let report = verify_container(&content).unwrap();
    assert!(report.is_ok());
    assert_eq!(report.blocks, expected_blocks);
}

#[test]
fn unaligned_tail_block_is_zero_padded() {
    // A total size 1000 bytes past a block boundary.
    let ragged = 1234 * BLOCK + 1000;
    let (_iso, _out, total, summary) = convert_image(XSF_OFFSET, Some(ragged));

    assert_eq!(total, ragged);
    assert_eq!(summary.blocks, total.div_ceil(BLOCK));

    let data0 = summary.content_dir.join("Data0000");
    let stored = fs::read(&data0).unwrap();
    assert_eq!(
        stored.len() as u64,
        HASH_PREFIX_SIZE as u64 + summary.blocks * BLOCK
    );

    // The written tail block carries the 1000 payload bytes and zeros.
    let tail = &stored[stored.len() - BLOCK_SIZE..];
    assert!(tail[1000..].iter().all(|&b| b == 0));

    assert!(verify_container(&summary.content_dir).unwrap().is_ok());
}

#[test]
fn exact_part_capacity_stays_in_one_part() {
    let (_iso, _out, _total, summary) = convert_image(XSF_OFFSET, Some(PART_PAYLOAD_SIZE));

    assert_eq!(summary.blocks, PART_PAYLOAD_SIZE / BLOCK);
    assert_eq!(summary.parts, 1);
    assert!(!summary.content_dir.join("Data0001").exists());
    assert_eq!(
        fs::metadata(summary.content_dir.join("Data0000")).unwrap().len(),
        HASH_PREFIX_SIZE as u64 + PART_PAYLOAD_SIZE
    );
}

#[test]
fn one_block_past_capacity_rolls_over() {
    let (_iso, _out, _total, summary) =
        convert_image(XSF_OFFSET, Some(PART_PAYLOAD_SIZE + BLOCK));

    assert_eq!(summary.parts, 2);
    assert_eq!(
        fs::metadata(summary.content_dir.join("Data0000")).unwrap().len(),
        HASH_PREFIX_SIZE as u64 + PART_PAYLOAD_SIZE
    );
    assert_eq!(
        fs::metadata(summary.content_dir.join("Data0001")).unwrap().len(),
        BLOCK
    );

    let report = verify_container(&summary.content_dir).unwrap();
    assert!(report.is_ok());
    assert_eq!(report.blocks, summary.blocks);
    assert_eq!(report.sht_count, (summary.blocks as usize).div_ceil(204));
}

#[test]
fn xgd3_offset_is_verified_and_accepted() {
    let (_iso, _out, _total, summary) = convert_image(XGD3_OFFSET, None);
    assert_eq!(summary.variant, DiscVariant::Xgd3);
    assert!(verify_container(&summary.content_dir).unwrap().is_ok());
}

/// Captures every report so milestone ordering can be asserted.
#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<(f32, String)>>,
}

impl Progress for RecordingProgress {
    fn report(&self, fraction: f32, status: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((fraction, status.to_string()));
    }
}

#[test]
fn progress_milestones_are_ordered() {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    write_iso(&iso, XSF_OFFSET, "default.xex", Some(4500 * BLOCK));

    let progress = RecordingProgress::default();
    Converter::new(&iso, out_dir.path())
        .convert(&progress)
        .unwrap();

    let reports = progress.reports.into_inner().unwrap();
    let fractions: Vec<f32> = reports.iter().map(|(f, _)| *f).collect();
    assert_eq!(fractions.first(), Some(&0.05));
    assert_eq!(fractions.last(), Some(&1.0));
    // Nondecreasing, modulo f32 rounding of the block fractions.
    assert!(fractions.windows(2).all(|w| w[1] >= w[0] - 1e-4));

    let statuses: Vec<&str> = reports.iter().map(|(_, s)| s.as_str()).collect();
    for milestone in [
        "analyzing ISO",
        "creating structure",
        "converting",
        "finalizing hashes",
        "writing hashes",
        "done",
    ] {
        assert!(statuses.contains(&milestone), "missing {milestone:?}");
    }
    // Block reports come at the 1000-block cadence plus the tail.
    assert!(statuses.contains(&"block 1000 of 4500"));
    assert!(statuses.contains(&"block 4500 of 4500"));
}

/// Requests cancellation once a number of block reports went by.
struct CancelAfter {
    block_reports: AtomicU32,
    threshold: u32,
}

impl Progress for CancelAfter {
    fn report(&self, _fraction: f32, status: &str) {
        if status.starts_with("block ") {
            self.block_reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn cancelled(&self) -> bool {
        self.block_reports.load(Ordering::SeqCst) >= self.threshold
    }
}

#[test]
fn cancellation_stops_the_stream_and_skips_the_hash_tables() {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    write_iso(&iso, XSF_OFFSET, "default.xex", Some(10_000 * BLOCK));

    let progress = CancelAfter {
        block_reports: AtomicU32::new(0),
        threshold: 5,
    };
    let err = Converter::new(&iso, out_dir.path())
        .convert(&progress)
        .unwrap_err();
    assert!(matches!(err, GodError::Cancelled));
    assert_eq!(err.code(), -4);

    // The stream stopped at the checkpoint following the request, and
    // the reserved prefix was never filled in.
    let data0 = out_dir
        .path()
        .join("AABBCCDD")
        .join("Content")
        .join("0000000000000000")
        .join("Data0000");
    let stored = fs::read(&data0).unwrap();
    assert_eq!(stored.len() as u64, HASH_PREFIX_SIZE as u64 + 5000 * BLOCK);
    assert!(stored[..MHT_SIZE].iter().all(|&b| b == 0));
}

#[test]
fn cancel_handle_stops_a_running_conversion() {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    write_iso(&iso, XSF_OFFSET, "default.xex", Some(8_000 * BLOCK));

    // The progress callback reaches back into the converter, the same
    // re-entrancy a UI cancel button has.
    struct CancelViaHandle {
        converter: Arc<Converter>,
        after_reports: u32,
        seen: AtomicU32,
    }
    impl Progress for CancelViaHandle {
        fn report(&self, _fraction: f32, status: &str) {
            if status.starts_with("block ")
                && self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after_reports
            {
                self.converter.cancel();
            }
        }
    }

    let converter = Arc::new(Converter::new(&iso, out_dir.path()));
    let progress = CancelViaHandle {
        converter: Arc::clone(&converter),
        after_reports: 3,
        seen: AtomicU32::new(0),
    };
    let err = converter.convert(&progress).unwrap_err();
    assert_eq!(err.code(), -4);
}

#[test]
fn output_is_deterministic() {
    let iso_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    write_iso(&iso, XSF_OFFSET, "default.xex", Some(700 * BLOCK));

    let out_a = TempDir::new().unwrap();
    let out_b = TempDir::new().unwrap();
    let a = Converter::new(&iso, out_a.path())
        .convert(&NullProgress)
        .unwrap();
    let b = Converter::new(&iso, out_b.path())
        .convert(&NullProgress)
        .unwrap();

    assert_eq!(a.blocks, b.blocks);
    assert_eq!(
        fs::read(a.content_dir.join("Data0000")).unwrap(),
        fs::read(b.content_dir.join("Data0000")).unwrap()
    );
}

#[test]
fn rejects_input_without_gdf_volume() {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("random.bin");
    fs::write(&iso, vec![0u8; 1024 * 1024]).unwrap();

    let err = Converter::new(&iso, out_dir.path())
        .convert(&NullProgress)
        .unwrap_err();
    assert!(matches!(
        err,
        GodError::Gdf(gdf_parser::Error::NoVolumeDescriptor)
    ));
    assert_eq!(err.code(), -1);
}

#[test]
fn rejects_image_without_default_xex() {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    write_iso(&iso, XSF_OFFSET, "other.bin", None);

    let err = Converter::new(&iso, out_dir.path())
        .convert(&NullProgress)
        .unwrap_err();
    assert!(matches!(err, GodError::ExecutableMissing));
    assert_eq!(err.code(), -1);
}

#[test]
fn rejects_oversized_image() {
    let iso_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    write_iso(&iso, XSF_OFFSET, "default.xex", None);
    // Extend (sparsely) past the dual-layer capacity bound.
    let file = fs::OpenOptions::new().write(true).open(&iso).unwrap();
    file.set_len(15 * 1024 * 1024 * 1024 + BLOCK).unwrap();

    let err = Converter::new(&iso, out_dir.path())
        .convert(&NullProgress)
        .unwrap_err();
    assert!(matches!(err, GodError::IsoTooLarge { .. }));
    assert_eq!(err.code(), -3);
}

#[test]
fn inspect_reads_identity_without_converting() {
    let iso_dir = TempDir::new().unwrap();
    let iso = iso_dir.path().join("game.iso");
    let total = write_iso(&iso, XGD2_OFFSET, "default.xex", None);

    let info = inspect(&iso).unwrap();
    assert_eq!(info.executable, "default.xex");
    assert_eq!(info.title_id, "AABBCCDD");
    assert_eq!(info.media_id, "11223344");
    assert_eq!(info.platform, "Xbox 360");
    assert_eq!(info.variant, DiscVariant::Xgd2);
    assert_eq!(info.size_bytes, total);
}
