//! Atomic file writes
//!
//! Content is written in full to `<path>.tmp`, then renamed onto `<path>`.
//! If either step fails the temp file is removed (ignoring errors from the
//! removal itself) and the original error is returned.

use super::canonical::to_canonical_string;
use super::fs::{FileSystem, TokioFs};
use super::tree_maker::TreeMaker;
use super::StoreError;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writer for one output tree
pub struct AtomicFile {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    tree: TreeMaker,
}

impl AtomicFile {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fs(root, Arc::new(TokioFs))
    }

    pub fn with_fs(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            tree: TreeMaker::new(fs.clone()),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `relative` under the output root
    pub fn expand(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `body` to `path` atomically and hand it back
    pub async fn write_string(&self, body: String, path: &Path) -> Result<String, StoreError> {
        if let Some(parent) = path.parent() {
            self.tree.mkpath(parent).await?;
        }

        let tmp = tmp_path(path);

        if let Err(source) = self.fs.write(&tmp, body.clone().into_bytes()).await {
            let _ = self.fs.remove_file(&tmp).await;
            return Err(StoreError::Write {
                path: tmp,
                source,
            });
        }

        if let Err(source) = self.fs.rename(&tmp, path).await {
            let _ = self.fs.remove_file(&tmp).await;
            return Err(StoreError::Rename {
                from: tmp,
                to: path.to_path_buf(),
                source,
            });
        }

        tracing::info!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(body)
    }

    /// Write `data` as canonical JSON and hand it back
    pub async fn write_json(&self, data: Value, path: &Path) -> Result<Value, StoreError> {
        let body = to_canonical_string(&data).map_err(|source| StoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_string(body, path).await?;
        Ok(data)
    }

    /// [`write_string`](Self::write_string) relative to the output root
    pub async fn save_content(&self, relative: &str, body: String) -> Result<String, StoreError> {
        self.write_string(body, &self.expand(relative)).await
    }

    /// [`write_json`](Self::write_json) relative to the output root
    pub async fn save_json(&self, relative: &str, data: Value) -> Result<Value, StoreError> {
        self.write_json(data, &self.expand(relative)).await
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Writes half the bytes, then fails
    #[derive(Default)]
    struct TornWriteFs {
        removals: AtomicUsize,
    }

    impl FileSystem for TornWriteFs {
        fn create_dir_all(&self, path: &Path) -> BoxFuture<'static, io::Result<()>> {
            TokioFs.create_dir_all(path)
        }

        fn write(&self, path: &Path, contents: Vec<u8>) -> BoxFuture<'static, io::Result<()>> {
            let path = path.to_path_buf();
            async move {
                tokio::fs::write(&path, &contents[..contents.len() / 2]).await?;
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            .boxed()
        }

        fn rename(&self, from: &Path, to: &Path) -> BoxFuture<'static, io::Result<()>> {
            TokioFs.rename(from, to)
        }

        fn remove_file(&self, path: &Path) -> BoxFuture<'static, io::Result<()>> {
            self.removals.fetch_add(1, Ordering::SeqCst);
            TokioFs.remove_file(path)
        }
    }

    #[tokio::test]
    async fn test_writes_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = AtomicFile::new(dir.path());
        let path = dir.path().join("x/y/foo.txt");

        let body = store.write_string("some content".to_string(), &path).await.unwrap();

        assert_eq!(body, "some content");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "some content");
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = AtomicFile::new(dir.path());

        store.save_content("foo.txt", "old".to_string()).await.unwrap();
        store.save_content("foo.txt", "new".to_string()).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.expand("foo.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_write_failure_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x/foo.txt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "previous").unwrap();

        let fs = Arc::new(TornWriteFs::default());
        let store = AtomicFile::with_fs(dir.path(), fs.clone());

        let err = store
            .write_string("replacement content".to_string(), &path)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
        assert!(!tmp_path(&path).exists());
        assert_eq!(fs.removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_failure_with_no_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AtomicFile::with_fs(dir.path(), Arc::new(TornWriteFs::default()));

        assert!(store.save_content("a/b.txt", "content".to_string()).await.is_err());
        assert!(!store.expand("a/b.txt").exists());
        assert!(!store.expand("a/b.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_rename_failure_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AtomicFile::new(dir.path());

        // a non-empty directory cannot be replaced by a file
        let target = store.expand("occupied");
        std::fs::create_dir_all(target.join("inside")).unwrap();

        let err = store
            .write_string("content".to_string(), &target)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Rename { .. }));
        assert!(target.join("inside").is_dir());
        assert!(!tmp_path(&target).exists());
    }

    #[tokio::test]
    async fn test_write_json_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let store = AtomicFile::new(dir.path());

        let data = json!({"b": [2, 1], "a": "x"});
        let returned = store.save_json("service/s3/list-buckets.json", data.clone()).await.unwrap();

        assert_eq!(returned, data);
        assert_eq!(
            std::fs::read_to_string(store.expand("service/s3/list-buckets.json")).unwrap(),
            "{\n  \"a\": \"x\",\n  \"b\": [\n    2,\n    1\n  ]\n}\n"
        );
    }
}
