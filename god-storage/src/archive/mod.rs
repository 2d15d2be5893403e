//! Data part files of the output container.

mod part_writer;

pub use part_writer::{part_name, DataPartWriter};
