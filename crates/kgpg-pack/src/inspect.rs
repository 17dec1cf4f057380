//! Size, SHA-256 and container version of a finished archive

use crate::errors::PackagingError;
use crate::header::HEADER_MAGIC;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub size_bytes: u64,
    /// Lowercase hex digest
    pub sha256: String,
    /// 2 when the archive carries the KGPG header, else 1
    pub package_version: u16,
}

impl ArchiveInfo {
    /// First 8 hex digits, for console output
    pub fn short_sha(&self) -> &str {
        self.sha256.get(..8).unwrap_or(&self.sha256)
    }
}

/// Stream the archive through SHA-256 in 64 KiB chunks
pub async fn inspect(archive_path: &Path) -> Result<ArchiveInfo, PackagingError> {
    let read_err = |source: std::io::Error| PackagingError::ArchiveRead {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(archive_path).await.map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut prefix = Vec::with_capacity(HEADER_MAGIC.len());
    let mut size_bytes = 0u64;

    loop {
        let read = file.read(&mut buffer).await.map_err(read_err)?;
        if read == 0 {
            break;
        }
        let chunk = &buffer[..read];
        if prefix.len() < HEADER_MAGIC.len() {
            let wanted = (HEADER_MAGIC.len() - prefix.len()).min(read);
            prefix.extend_from_slice(&chunk[..wanted]);
        }
        hasher.update(chunk);
        size_bytes += read as u64;
    }

    let package_version = if prefix.as_slice() == HEADER_MAGIC {
        2
    } else {
        1
    };

    Ok(ArchiveInfo {
        size_bytes,
        sha256: hex::encode(hasher.finalize()),
        package_version,
    })
}
