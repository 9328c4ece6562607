//! Durable snapshot storage
//!
//! Every collected asset ends up here. Writes go to `<path>.tmp` first and are
//! renamed into place, so a reader of `<path>` sees the old file or the new
//! one and never a torn mixture.
//!
//! - [`atomic_file`] - temp-then-rename writes rooted at the output directory
//! - [`tree_maker`] - memoized directory creation
//! - [`canonical`] - key-sorted JSON encoding
//! - [`fs`] - the filesystem calls the writer depends on

pub mod atomic_file;
pub mod canonical;
pub mod fs;
pub mod tree_maker;

pub use atomic_file::AtomicFile;
pub use fs::{FileSystem, TokioFs};
pub use tree_maker::TreeMaker;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename {from:?} to {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode JSON for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
