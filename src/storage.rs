use crate::capture::ImagePersistence;
use crate::config::StorageConfig;
use crate::error::{PersistenceError, RecordingError};
use crate::recording::RecordingOutputs;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Collision suffixes tried before giving up on a timestamp
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Sidecar written next to an image when metadata is enabled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub capture_id: String,
    pub captured_at: DateTime<Local>,
    pub file_name: String,
    pub size_bytes: usize,
}

/// `<prefix>_<yyyyMMdd_HHmmss>.<extension>`, then `_1`, `_2`, ... on collision
fn candidate_path(
    directory: &Path,
    prefix: &str,
    timestamp: &DateTime<Local>,
    extension: &str,
    attempt: u32,
) -> PathBuf {
    let stem = format!("{}_{}", prefix, timestamp.format("%Y%m%d_%H%M%S"));
    match attempt {
        0 => directory.join(format!("{}.{}", stem, extension)),
        n => directory.join(format!("{}_{}.{}", stem, n, extension)),
    }
}

fn names_exhausted(directory: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name left in {}", directory.display()),
    )
}

/// Writes stills as `<prefix>_<yyyyMMdd_HHmmss>.jpg` into the storage directory
pub struct FileImageWriter {
    directory: PathBuf,
    prefix: String,
    save_metadata: bool,
}

impl FileImageWriter {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.path),
            prefix: config.image_prefix.clone(),
            save_metadata: config.save_metadata,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Atomically claim the first free file name for a capture taken at `timestamp`
    async fn create_unique(
        &self,
        timestamp: &DateTime<Local>,
    ) -> Result<(fs::File, PathBuf), PersistenceError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate =
                candidate_path(&self.directory, &self.prefix, timestamp, "jpg", attempt);
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await;

            match opened {
                Ok(file) => return Ok((file, candidate)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(PersistenceError::Write {
                        path: candidate.display().to_string(),
                        source,
                    })
                }
            }
        }

        Err(PersistenceError::Write {
            path: self.directory.display().to_string(),
            source: names_exhausted(&self.directory),
        })
    }

    async fn write_metadata(&self, image_path: &Path, metadata: &ImageMetadata) {
        let json = match serde_json::to_string_pretty(metadata) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize metadata for {}: {}", metadata.capture_id, e);
                return;
            }
        };

        let metadata_path = image_path.with_extension("json");
        if let Err(e) = fs::write(&metadata_path, json).await {
            warn!("Failed to write metadata {}: {}", metadata_path.display(), e);
        } else {
            debug!("Saved metadata to {}", metadata_path.display());
        }
    }
}

#[async_trait]
impl ImagePersistence for FileImageWriter {
    async fn persist(&self, capture_id: &str, image: Bytes) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| PersistenceError::Directory {
                path: self.directory.display().to_string(),
                source,
            })?;

        let captured_at = Local::now();
        let (mut file, path) = self.create_unique(&captured_at).await?;

        let written = match file.write_all(&image).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            drop(file);
            if let Err(e) = fs::remove_file(&path).await {
                warn!("Failed to remove partial image {}: {}", path.display(), e);
            }
            return Err(PersistenceError::Write {
                path: path.display().to_string(),
                source,
            });
        }

        if self.save_metadata {
            let metadata = ImageMetadata {
                capture_id: capture_id.to_string(),
                captured_at,
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default(),
                size_bytes: image.len(),
            };
            self.write_metadata(&path, &metadata).await;
        }

        Ok(path)
    }
}

/// Reserves recording files as `<prefix>_<yyyyMMdd_HHmmss>.mp4` in the storage directory.
///
/// The file is created empty so concurrent reservations never share a name; the
/// encoder writes over it.
pub struct VideoFileAllocator {
    directory: PathBuf,
    prefix: String,
}

impl VideoFileAllocator {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.path),
            prefix: config.video_prefix.clone(),
        }
    }

    fn output_error(&self, path: &Path, e: io::Error) -> RecordingError {
        RecordingError::Output {
            details: format!("{}: {}", path.display(), e),
        }
    }
}

impl RecordingOutputs for VideoFileAllocator {
    fn reserve(&self) -> Result<PathBuf, RecordingError> {
        std::fs::create_dir_all(&self.directory)
            .map_err(|e| self.output_error(&self.directory, e))?;

        let started_at = Local::now();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate =
                candidate_path(&self.directory, &self.prefix, &started_at, "mp4", attempt);
            let created = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate);

            match created {
                Ok(_) => {
                    debug!("Reserved recording file {}", candidate.display());
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(self.output_error(&candidate, e)),
            }
        }

        Err(self.output_error(&self.directory, names_exhausted(&self.directory)))
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove unused recording file {}: {}", path.display(), e);
        }
    }
}
