//! Shared helpers building synthetic GDF disc images.
#![allow(dead_code)]

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

pub const SECTOR_SIZE: u64 = 2048;
pub const DESCRIPTOR_SECTOR: u64 = 32;
pub const ROOT_DIR_SECTOR: u32 = 33;
pub const XEX_SECTOR: u32 = 34;

pub const XSF_OFFSET: u64 = 0;
pub const XGD2_OFFSET: u64 = 0x00FD_A000;
pub const XGD3_OFFSET: u64 = 0x0208_0000;

pub const TITLE_ID: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xDD];
pub const MEDIA_ID: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

/// Minimal XEX2 image: one optional header pointing at an
/// execution-info blob right behind the table.
pub fn minimal_xex(title_id: [u8; 4], media_id: [u8; 4]) -> Vec<u8> {
    let mut data = vec![0u8; 24];
    data[..4].copy_from_slice(b"XEX2");
    data[20..24].copy_from_slice(&1u32.to_be_bytes());

    let blob_at = 32u32;
    data.extend_from_slice(&0x0004_0006u32.to_be_bytes());
    data.extend_from_slice(&blob_at.to_be_bytes());
    data.resize(blob_at as usize, 0);

    let mut blob = [0u8; 20];
    blob[0..4].copy_from_slice(&media_id);
    blob[4..8].copy_from_slice(&0x0001_0002u32.to_be_bytes());
    blob[8..12].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    blob[12..16].copy_from_slice(&title_id);
    blob[16] = 2;
    blob[17] = 1;
    blob[18] = 1;
    blob[19] = 1;
    data.extend_from_slice(&blob);
    data
}

/// One GDF directory record plus alignment padding.
fn dir_entry(sector: u32, size: u32, attributes: u8, name: &str) -> Vec<u8> {
    let mut record = Vec::new();
    record.extend_from_slice(&0u16.to_le_bytes());
    record.extend_from_slice(&0u16.to_le_bytes());
    record.extend_from_slice(&sector.to_le_bytes());
    record.extend_from_slice(&size.to_le_bytes());
    record.push(attributes);
    record.push(name.len() as u8);
    record.extend_from_slice(name.as_bytes());
    while record.len() % 4 != 0 {
        record.push(0);
    }
    record
}

/// Write a synthetic GDF image: volume descriptor at sector 32, a
/// one-entry root directory, and the executable at sector 34. The file
/// is extended (sparsely) to `total_size` when given.
///
/// Returns the final image size.
pub fn write_iso(
    path: &Path,
    root_offset: u64,
    exe_name: &str,
    total_size: Option<u64>,
) -> u64 {
    let xex = minimal_xex(TITLE_ID, MEDIA_ID);
    let mut dir = dir_entry(XEX_SECTOR, xex.len() as u32, 0, exe_name);
    dir.extend_from_slice(&0xFFFFu16.to_le_bytes());
    dir.extend_from_slice(&0xFFFFu16.to_le_bytes());

    let mut file = File::create(path).unwrap();
    file.seek(SeekFrom::Start(root_offset + DESCRIPTOR_SECTOR * SECTOR_SIZE))
        .unwrap();
    file.write_all(b"MICROSOFT*XBOX*MEDIA").unwrap();
    file.write_all(&ROOT_DIR_SECTOR.to_le_bytes()).unwrap();
    file.write_all(&(dir.len() as u32).to_le_bytes()).unwrap();

    file.seek(SeekFrom::Start(
        root_offset + u64::from(ROOT_DIR_SECTOR) * SECTOR_SIZE,
    ))
    .unwrap();
    file.write_all(&dir).unwrap();

    file.seek(SeekFrom::Start(
        root_offset + u64::from(XEX_SECTOR) * SECTOR_SIZE,
    ))
    .unwrap();
    file.write_all(&xex).unwrap();

    let min_size = root_offset + u64::from(XEX_SECTOR) * SECTOR_SIZE + xex.len() as u64;
    let total = total_size.unwrap_or(min_size).max(min_size);
    file.set_len(total).unwrap();
    total
}
