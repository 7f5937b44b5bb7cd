use crate::{RecommendError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Lines queued for the writer before new ones are dropped.
const QUEUE_CAPACITY: usize = 1024;

enum Entry {
    Line(String),
    Sync(oneshot::Sender<()>),
}

/// Append-only log of every request line the server receives.
///
/// Sessions only queue lines; a single writer task owns the file, so lines from
/// concurrent sessions never interleave and no session waits on the disk. When
/// the queue is full, lines are dropped with a warning.
#[derive(Clone, Debug)]
pub struct RequestLog {
    path: PathBuf,
    tx: mpsc::Sender<Entry>,
}

impl RequestLog {
    /// Open `path` for appending, creating it if needed, and start the writer task.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        log::info!("Logging requests to {}", path.display());

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(write_entries(file, path.clone(), rx));

        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue `line` for writing. Never waits.
    pub fn append(&self, line: &str) -> Result<()> {
        self.tx
            .try_send(Entry::Line(line.to_string()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => RecommendError::Io(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "request log queue is full",
                )),
                mpsc::error::TrySendError::Closed(_) => writer_gone(),
            })
    }

    /// Wait until every line queued so far has been written and flushed.
    pub async fn sync(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Entry::Sync(done_tx))
            .await
            .map_err(|_| writer_gone())?;
        done_rx.await.map_err(|_| writer_gone())
    }
}

fn writer_gone() -> RecommendError {
    RecommendError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "request log writer stopped",
    ))
}

async fn write_entries(mut file: File, path: PathBuf, mut rx: mpsc::Receiver<Entry>) {
    while let Some(entry) = rx.recv().await {
        match entry {
            Entry::Line(mut line) => {
                line.push('\n');
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    log::warn!("Failed to write request log {}: {e}", path.display());
                    continue;
                }
                // Flush once the queue drains rather than after every line.
                if rx.is_empty() {
                    if let Err(e) = file.flush().await {
                        log::warn!("Failed to flush request log {}: {e}", path.display());
                    }
                }
            }
            Entry::Sync(done) => {
                if let Err(e) = file.flush().await {
                    log::warn!("Failed to flush request log {}: {e}", path.display());
                }
                let _ = done.send(());
            }
        }
    }
    log::debug!("Request log writer for {} stopped", path.display());
}
