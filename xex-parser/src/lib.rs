//! Reading the tagged optional-header table of [XEX2][1] executables.
//!
//! Only the pieces needed to identify a title are implemented: the magic
//! check and the execution-info record carrying the title and media ids.
//!
//! [1]: https://free60.org/System-Software/Formats/XEX/

mod error;
mod header;

pub use error::Error;
pub use header::ExecutionInfo;
pub type Result<T> = std::result::Result<T, Error>;
