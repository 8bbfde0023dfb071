use crate::document::DocumentRecord;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Writes one file per record into the corpus directory
///
/// Files are named `<record id>.warc` and are durable (flushed and synced)
/// once [`DocumentWriter::write`] returns. The writer holds no shared state,
/// so any number of workers can write through clones of it.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    dir: PathBuf,
}

impl DocumentWriter {
    /// Uses an existing directory as-is
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Clears and recreates `dir`, then returns a writer for it
    ///
    /// Anything left from a previous run is removed.
    pub async fn prepare(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();

        match fs::remove_dir_all(&dir).await {
            Ok(()) => tracing::debug!("Cleared corpus directory {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir_all(&dir).await?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, record: &DocumentRecord) -> PathBuf {
        self.dir.join(record.file_name())
    }

    /// Writes `record` to its own file and returns the path
    pub async fn write(&self, record: &DocumentRecord) -> io::Result<PathBuf> {
        let path = self.path_for(record);

        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&record.to_bytes()).await?;
        writer.flush().await?;
        writer.get_ref().sync_all().await?;

        tracing::trace!("Wrote {} to {}", record.url(), path.display());
        Ok(path)
    }
}
