use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("File has incorrect magic - not a XEX2 executable")]
    InvalidMagic,

    #[error("No execution info record in the optional-header table")]
    ExecInfoMissing,

    #[error("Header table or record extends past the end of the file")]
    Truncated,
}
