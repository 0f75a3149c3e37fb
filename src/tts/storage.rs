use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// URL prefix the audio directory is served under
pub const AUDIO_ROUTE: &str = "/audio";

/// Upper bound on `_<n>` suffixes tried for one timestamp
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Flat directory of generated audio files.
///
/// Files are written under a hidden `.part` name and only renamed to their
/// final `response_<YYYYMMDD_HHMMSS>.mp3` name once every byte is on disk,
/// so a final name always refers to a complete file. Nothing here deletes
/// finished files.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    /// Open the store, creating the directory if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("Audio directory ready: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Relative URL a stored file is served at
    pub fn url_for(file_name: &str) -> String {
        format!("{}/{}", AUDIO_ROUTE, file_name)
    }

    /// Reserve a file name for the current local time and open its
    /// temporary file.
    pub async fn reserve(&self) -> io::Result<AudioWriter> {
        self.reserve_at(Local::now().naive_local()).await
    }

    async fn reserve_at(&self, at: NaiveDateTime) -> io::Result<AudioWriter> {
        let stamp = at.format("%Y%m%d_%H%M%S").to_string();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("response_{}.mp3", stamp)
            } else {
                format!("response_{}_{}.mp3", stamp, attempt)
            };
            let final_path = self.dir.join(&file_name);
            if fs::try_exists(&final_path).await? {
                continue;
            }

            // Exclusive create on the temp name is the reservation; a second
            // request racing for the same name gets AlreadyExists.
            let temp_path = self.dir.join(format!(".{}.part", file_name));
            let file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            // A writer may have renamed into this name between the checks
            if fs::try_exists(&final_path).await? {
                drop(file);
                let _ = fs::remove_file(&temp_path).await;
                continue;
            }

            return Ok(AudioWriter {
                file: Some(file),
                temp_path,
                final_path,
                file_name,
                bytes_written: 0,
                settled: false,
            });
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free audio file name for timestamp {}", stamp),
        ))
    }
}

/// An in-progress audio file.
///
/// Dropping a writer without calling [`AudioWriter::finish`] removes the
/// temporary file.
#[derive(Debug)]
pub struct AudioWriter {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    file_name: String,
    bytes_written: u64,
    settled: bool,
}

impl AudioWriter {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "audio writer already closed"))?;
        file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush to disk and move the file to its final name. Returns the
    /// final file name.
    pub async fn finish(mut self) -> io::Result<String> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "audio writer already closed"))?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.temp_path, &self.final_path).await?;
        self.settled = true;

        debug!(
            "Stored audio file {} ({} bytes)",
            self.final_path.display(),
            self.bytes_written
        );
        Ok(std::mem::take(&mut self.file_name))
    }

    /// Discard the partial file.
    pub async fn abort(mut self) {
        self.file.take();
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            warn!("Failed to remove partial audio file {}: {}", self.temp_path.display(), e);
        }
        self.settled = true;
    }
}

impl Drop for AudioWriter {
    fn drop(&mut self) {
        if !self.settled {
            self.file.take();
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}
