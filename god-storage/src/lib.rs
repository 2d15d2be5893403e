//! GOD ("Games on Demand") container production for Xbox 360 disc images.
//!
//! The pipeline reads a GDF disc image, identifies the title through the
//! execution info of its `default.xex`, and repackages the raw image into
//! the on-console multi-part Data layout, including the two-level SHA-1
//! integrity tree the console checks at launch time.

pub mod archive;
pub mod converter;
pub mod error;
pub mod hashtree;
pub mod types;
pub mod verify;

pub use error::{GodError, Result};
pub use converter::{inspect, Converter, NullProgress, Progress};
pub use types::{ConversionSummary, IsoInfo};

// Re-export commonly used types
pub use archive::DataPartWriter;
pub use gdf_parser::DiscVariant;
pub use hashtree::{block_digest, FinalizedHashTree, HashTree};
pub use verify::{verify_container, VerifyReport};
