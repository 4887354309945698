// JSON-lines journal, rotated to <stem>_<n>.<ext> once it reaches max_bytes

use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::JournalError;

pub struct Journal<T> {
    path: PathBuf,
    max_bytes: u64,
    // serializes appends and rotation
    write_lock: Mutex<()>,
    _record: PhantomData<fn(T) -> T>,
}

impl<T> Journal<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &T) -> Result<(), JournalError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        self.rotate_if_full().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn rotate_if_full(&self) -> Result<(), JournalError> {
        let size = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if size < self.max_bytes {
            return Ok(());
        }

        let mut n = 1;
        let archive = loop {
            let candidate = self.archive_path(n);
            if !fs::try_exists(&candidate).await? {
                break candidate;
            }
            n += 1;
        };

        fs::rename(&self.path, &archive).await?;
        info!(
            journal = %self.path.display(),
            archive = %archive.display(),
            bytes = size,
            "Journal rotated"
        );
        Ok(())
    }

    fn archive_path(&self, n: u32) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "journal".to_string());
        let name = match self.path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
            None => format!("{}_{}", stem, n),
        };
        self.path.with_file_name(name)
    }

    // active file only; unreadable lines are skipped
    pub async fn read_all(&self) -> Result<Vec<T>, JournalError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    journal = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "Skipping unreadable journal line"
                ),
            }
        }
        Ok(records)
    }
}
