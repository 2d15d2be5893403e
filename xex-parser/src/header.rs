//! XEX2 header walk and the execution-info record.

use crate::{Error, Result};
use tracing::{debug, trace};

const MAGIC: &[u8; 4] = b"XEX2";

/// Optional-header id of the execution-info record.
const EXECUTION_INFO_ID: u32 = 0x0004_0006;

/// File offset of the certificate-offset field.
const CERT_OFFSET_AT: usize = 16;

/// File offset of the optional-header count.
const HEADER_COUNT_AT: usize = 20;

/// File offset of the first optional-header record.
const HEADER_TABLE_AT: usize = 24;

/// The 20-byte execution-info blob, all fields big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionInfo {
    pub media_id: [u8; 4],
    pub version: u32,
    pub base_version: u32,
    pub title_id: [u8; 4],
    pub platform: u8,
    pub executable_type: u8,
    pub disc_number: u8,
    pub disc_count: u8,
}

impl ExecutionInfo {
    pub const SIZE: usize = 20;

    /// Walk the optional-header table of a XEX2 image and extract the
    /// execution-info record.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_TABLE_AT {
            return Err(Error::Truncated);
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidMagic);
        }

        // Read but not consumed; kept for parity with the header layout.
        let cert_offset = read_u32be(data, CERT_OFFSET_AT)?;
        let header_count = read_u32be(data, HEADER_COUNT_AT)?;
        debug!(
            "XEX2 header: certificate at {:#x}, {} optional headers",
            cert_offset, header_count
        );

        let mut pos = HEADER_TABLE_AT;
        for _ in 0..header_count {
            if pos + 8 > data.len() {
                break;
            }
            let id = read_u32be(data, pos)?;
            let data_offset = read_u32be(data, pos + 4)? as usize;
            trace!("optional header {:#010x} -> {:#x}", id, data_offset);

            if id == EXECUTION_INFO_ID {
                let blob = data
                    .get(data_offset..data_offset + Self::SIZE)
                    .ok_or(Error::Truncated)?;
                return Ok(Self::from_record(blob));
            }
            pos += 8;
        }

        Err(Error::ExecInfoMissing)
    }

    fn from_record(blob: &[u8]) -> Self {
        Self {
            media_id: blob[0..4].try_into().unwrap(),
            version: u32::from_be_bytes(blob[4..8].try_into().unwrap()),
            base_version: u32::from_be_bytes(blob[8..12].try_into().unwrap()),
            title_id: blob[12..16].try_into().unwrap(),
            platform: blob[16],
            executable_type: blob[17],
            disc_number: blob[18],
            disc_count: blob[19],
        }
    }

    /// Title id as 8 uppercase hex digits, as used for the on-device
    /// content directory name.
    pub fn title_id_hex(&self) -> String {
        hex::encode_upper(self.title_id)
    }

    /// Media id as 8 uppercase hex digits.
    pub fn media_id_hex(&self) -> String {
        hex::encode_upper(self.media_id)
    }
}

fn read_u32be(data: &[u8], at: usize) -> Result<u32> {
    let bytes = data.get(at..at + 4).ok_or(Error::Truncated)?;
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}
