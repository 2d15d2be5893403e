//! Parsing the Xbox 360 [Game Disc Format][1] filesystem out of raw disc
//! images.
//!
//! [1]: https://xboxdevwiki.net/Xbox_Game_Disc

mod error;
mod ioutils;
pub mod volume;

pub use error::Error;
pub use volume::{DirEntry, DiscVariant, Volume, SECTOR_SIZE};
pub type Result<T> = std::result::Result<T, Error>;
