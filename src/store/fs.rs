//! Filesystem seam for the durable writer

use futures::future::BoxFuture;
use futures::FutureExt;
use std::io;
use std::path::Path;

/// The four calls an atomic write needs
pub trait FileSystem: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> BoxFuture<'static, io::Result<()>>;
    fn write(&self, path: &Path, contents: Vec<u8>) -> BoxFuture<'static, io::Result<()>>;
    fn rename(&self, from: &Path, to: &Path) -> BoxFuture<'static, io::Result<()>>;
    fn remove_file(&self, path: &Path) -> BoxFuture<'static, io::Result<()>>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

impl FileSystem for TokioFs {
    fn create_dir_all(&self, path: &Path) -> BoxFuture<'static, io::Result<()>> {
        tokio::fs::create_dir_all(path.to_path_buf()).boxed()
    }

    fn write(&self, path: &Path, contents: Vec<u8>) -> BoxFuture<'static, io::Result<()>> {
        tokio::fs::write(path.to_path_buf(), contents).boxed()
    }

    fn rename(&self, from: &Path, to: &Path) -> BoxFuture<'static, io::Result<()>> {
        tokio::fs::rename(from.to_path_buf(), to.to_path_buf()).boxed()
    }

    fn remove_file(&self, path: &Path) -> BoxFuture<'static, io::Result<()>> {
        tokio::fs::remove_file(path.to_path_buf()).boxed()
    }
}
