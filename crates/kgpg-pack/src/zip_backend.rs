//! In-process ZIP container backend

use crate::archive::{
    header_excerpt, header_icon, write_atomically, ArchiveBackend, ArchiveRequest, ArchiveResult,
};
use crate::errors::PackagingError;
use crate::header::{encode_header, PackageFormat};
use std::fs;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const ENTRY_PERMISSIONS: u32 = 0o644;

/// Deflate-compressed ZIP written with fixed entry metadata.
///
/// Entries are added in the file set's sorted order with the ZIP epoch as
/// timestamp, so the same inputs always give the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBackend;

impl ZipBackend {
    pub fn new() -> Self {
        Self
    }

    fn entry_options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
            .last_modified_time(DateTime::default())
            .unix_permissions(ENTRY_PERMISSIONS)
    }

    /// Compress the file set into an in-memory ZIP, returning bytes and entry count
    pub fn zip_bytes(request: &ArchiveRequest<'_>) -> Result<(Vec<u8>, usize), PackagingError> {
        let output = request.output_path;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entries = 0usize;

        for (relative, absolute) in request.files.iter() {
            let contents = match fs::read(absolute) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(
                        "{} disappeared before it was archived, skipping",
                        absolute.display()
                    );
                    continue;
                }
                Err(e) => return Err(PackagingError::write(output, e)),
            };
            writer
                .start_file(relative, Self::entry_options())
                .map_err(|e| PackagingError::write(output, e))?;
            writer
                .write_all(&contents)
                .map_err(|e| PackagingError::write(output, e))?;
            entries += 1;
        }

        let cursor = writer
            .finish()
            .map_err(|e| PackagingError::write(output, e))?;
        Ok((cursor.into_inner(), entries))
    }
}

impl ArchiveBackend for ZipBackend {
    fn name(&self) -> &str {
        "zip"
    }

    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveResult, PackagingError> {
        let mut bytes = match request.format {
            PackageFormat::V1 => Vec::new(),
            PackageFormat::V2 => {
                let excerpt = header_excerpt(request.plugin_id, request.files)?;
                let icon = header_icon(request.files);
                encode_header(&excerpt, icon.as_deref())?
            }
        };

        let (payload, entry_count) = Self::zip_bytes(request)?;
        bytes.extend_from_slice(&payload);

        let size_bytes = write_atomically(request.output_path, &bytes)?;
        tracing::info!(
            "Wrote {} ({} entries, {} bytes)",
            request.output_path.display(),
            entry_count,
            size_bytes
        );

        Ok(ArchiveResult {
            output_path: request.output_path.to_path_buf(),
            size_bytes,
            entry_count,
        })
    }
}
