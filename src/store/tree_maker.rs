//! Directory tree creation, at most once per directory

use super::fs::FileSystem;
use super::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

pub struct TreeMaker {
    fs: Arc<dyn FileSystem>,
    made: Mutex<HashMap<PathBuf, Arc<OnceCell<()>>>>,
}

impl TreeMaker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            made: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure `dir` and its ancestors exist
    ///
    /// Concurrent callers for the same directory share one creation. A failed
    /// creation is not remembered, so a later call tries again.
    pub async fn mkpath(&self, dir: &Path) -> Result<(), StoreError> {
        if dir.as_os_str().is_empty() {
            return Ok(());
        }

        let cell = {
            let mut made = self.made.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            made.entry(dir.to_path_buf()).or_default().clone()
        };

        cell.get_or_try_init(|| async {
            self.fs
                .create_dir_all(dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })
        })
        .await?;

        Ok(())
    }
}
