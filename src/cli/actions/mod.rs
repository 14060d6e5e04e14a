use std::path::PathBuf;

pub mod upload;
pub use self::upload::handle;

#[derive(Debug)]
pub enum Action {
    Upload {
        file: PathBuf,
        name: String,
        chunk_size: u64,
        concurrency: usize,
        quiet: bool,
    },
}
