use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("No GDF volume descriptor at any known root offset")]
    NoVolumeDescriptor,

    #[error("Directory tree deeper than {0} levels")]
    DirectoryTooDeep(usize),

    #[error("Directory at sector {0} is referenced more than once")]
    DirectoryLoop(u32),

    #[error("Directory at sector {0} extends past the end of the image")]
    DirectoryOutOfBounds(u32),

    #[error("Directory entry name is not ASCII")]
    BadEntryName,
}
