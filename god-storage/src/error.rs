//! Error types for GOD container operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GodError {
    #[error("Failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Read error: {0}")]
    Read(#[source] io::Error),

    #[error("Write error: {0}")]
    Write(#[source] io::Error),

    #[error("Seek error: {0}")]
    Seek(#[source] io::Error),

    #[error("Failed to create {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("GDF error: {0}")]
    Gdf(#[from] gdf_parser::Error),

    #[error("XEX error: {0}")]
    Xex(#[from] xex_parser::Error),

    #[error("No default.xex in the disc image")]
    ExecutableMissing,

    #[error("Executable too large: {size} bytes (max {max})")]
    ExecutableTooLarge { size: u64, max: u64 },

    #[error("Disc image too large: {size} bytes (max {max})")]
    IsoTooLarge { size: u64, max: u64 },

    #[error("Conversion cancelled")]
    Cancelled,

    #[error(
        "Container failed verification: {damaged} damaged sub-hash-tables, master table ok: {master_ok}"
    )]
    VerificationFailed { damaged: usize, master_ok: bool },

    #[error("Unexpected state: {0}")]
    Unexpected(String),
}

impl GodError {
    /// Result code of a conversion, for hosts that consume an integer:
    /// 0 is success, -1 a header/GDF failure, -2 a structure-create
    /// failure, -3 a conversion failure, -4 cancellation.
    pub fn code(&self) -> i32 {
        match self {
            Self::Gdf(_)
            | Self::Xex(_)
            | Self::ExecutableMissing
            | Self::ExecutableTooLarge { .. } => -1,
            Self::CreateDir { .. } => -2,
            Self::Cancelled => -4,
            _ => -3,
        }
    }
}

pub type Result<T> = std::result::Result<T, GodError>;
