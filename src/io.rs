//! I/O managers for different storage backends

use crate::error::{Result, RssError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Local directory tree
    FileSystem,
    /// Read-only HTTP(S) object store
    Http,
    /// AWS S3
    S3,
    /// Azure Blob Storage
    Azure,
    /// Google Cloud Storage
    GCS,
}

impl StorageBackend {
    /// Parse storage backend from URL scheme
    pub fn from_url(url: &str) -> Result<Self> {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end];
            match scheme {
                "file" => Ok(StorageBackend::FileSystem),
                "http" | "https" => Ok(StorageBackend::Http),
                "s3" => Ok(StorageBackend::S3),
                "azure" | "azureSAS" => Ok(StorageBackend::Azure),
                "gs" => Ok(StorageBackend::GCS),
                _ => Err(RssError::InvalidUrl(format!("Unknown scheme: {}", scheme))),
            }
        } else {
            // Assume file system if no scheme
            Ok(StorageBackend::FileSystem)
        }
    }
}

/// Trait for I/O operations with object stores or file systems
#[async_trait]
pub trait IOManager: Send + Sync {
    /// Read data from a path
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Write data to a path
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Check if a path exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Delete data at a path
    async fn delete(&self, path: &str) -> Result<()>;

    /// Get the backend type
    fn backend(&self) -> StorageBackend;
}

/// File system I/O manager
pub struct FileSystemIOManager {
    base_path: PathBuf,
}

impl FileSystemIOManager {
    /// Create a new file system I/O manager
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the full path for a relative path
    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

fn not_found_or_io(path: &str, err: std::io::Error) -> RssError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RssError::NotFound(path.to_string())
    } else {
        RssError::Io(err)
    }
}

#[async_trait]
impl IOManager for FileSystemIOManager {
    async fn read(&self, path: &str) -> Result<Bytes> {
        let full_path = self.full_path(path);
        let data = fs::read(&full_path)
            .await
            .map_err(|e| not_found_or_io(path, e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        // Create parent directories if they don't exist
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path)).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        fs::remove_file(self.full_path(path))
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::FileSystem
    }
}

/// Read-only object store reached over HTTP(S)
///
/// Keys are appended to the base URL, so any bucket exposed through plain
/// GET requests (public S3, GCS or Azure containers) can back a client.
#[cfg(feature = "http-client")]
pub struct HttpIOManager {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "http-client")]
impl HttpIOManager {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[cfg(feature = "http-client")]
#[async_trait]
impl IOManager for HttpIOManager {
    async fn read(&self, path: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| RssError::Network(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RssError::NotFound(path.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| RssError::Network(e.to_string()))?;
        response
            .bytes()
            .await
            .map_err(|e| RssError::Network(e.to_string()))
    }

    async fn write(&self, path: &str, _data: &[u8]) -> Result<()> {
        Err(RssError::StorageBackend(format!(
            "HTTP store is read-only, cannot write {}",
            path
        )))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let response = self
            .client
            .head(self.url(path))
            .send()
            .await
            .map_err(|e| RssError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Err(RssError::StorageBackend(format!(
            "HTTP store is read-only, cannot delete {}",
            path
        )))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Http
    }
}

/// Parse URL and create appropriate I/O manager
///
/// Native S3/Azure/GCS clients are not bundled; implement [`IOManager`] for
/// them, or reach a public bucket through its HTTPS endpoint.
pub async fn create_io_manager(url: &str) -> Result<Arc<dyn IOManager>> {
    let backend = StorageBackend::from_url(url)?;

    match backend {
        StorageBackend::FileSystem => {
            // Extract path from file:// URL or use as-is
            let path = url.strip_prefix("file://").unwrap_or(url);
            Ok(Arc::new(FileSystemIOManager::new(path)))
        }
        #[cfg(feature = "http-client")]
        StorageBackend::Http => Ok(Arc::new(HttpIOManager::new(url))),
        #[cfg(not(feature = "http-client"))]
        StorageBackend::Http => Err(RssError::Configuration(
            "HTTP stores require the `http-client` feature".to_string(),
        )),
        StorageBackend::S3 | StorageBackend::Azure | StorageBackend::GCS => {
            Err(RssError::Configuration(format!(
                "Cloud backend {:?} has no native client. Implement the IOManager trait \
                 or use the bucket's HTTPS endpoint with the `http-client` feature.",
                backend
            )))
        }
    }
}
