//! Out-of-process archive backend
//!
//! The packer is invoked as `<packer> --output <path> --format <v1|v2>` and
//! receives the entry list on stdin as `[{"name": ..., "path": ...}]`.

use crate::archive::{spool_path, ArchiveBackend, ArchiveRequest, ArchiveResult};
use crate::errors::PackagingError;
use serde::Serialize;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

#[derive(Debug, Serialize)]
struct PackerEntry<'a> {
    name: &'a str,
    path: &'a Path,
}

/// Delegates container production to an external executable
#[derive(Debug, Clone)]
pub struct ExternalPacker {
    program: PathBuf,
}

impl ExternalPacker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate `program` on `PATH` unless it already names a file
    pub fn locate(program: &str) -> Result<Self, PackagingError> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 || candidate.is_file() {
            return Ok(Self::new(candidate));
        }
        which::which(program)
            .map(Self::new)
            .map_err(|e| PackagingError::ArchiveWrite {
                path: candidate.to_path_buf(),
                message: format!("packer '{}' not found: {}", program, e),
            })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn entries_json(request: &ArchiveRequest<'_>) -> Result<Vec<u8>, PackagingError> {
        let entries: Vec<PackerEntry<'_>> = request
            .files
            .iter()
            .map(|(name, path)| PackerEntry { name, path })
            .collect();
        serde_json::to_vec(&entries).map_err(|e| PackagingError::write(request.output_path, e))
    }
}

impl ArchiveBackend for ExternalPacker {
    fn name(&self) -> &str {
        "external"
    }

    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveResult, PackagingError> {
        let output = request.output_path;
        let temp_path = spool_path(output);
        let stdin_payload = Self::entries_json(request)?;

        let mut child = Command::new(&self.program)
            .arg("--output")
            .arg(&temp_path)
            .arg("--format")
            .arg(request.format.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PackagingError::write(
                    output,
                    format!("failed to start {}: {}", self.program.display(), e),
                )
            })?;

        // The packer may exit without reading all of stdin
        let feeder = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(&stdin_payload) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let waited = child.wait_with_output();
        let fed = feeder.map_or(Ok(()), |handle| {
            handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")))
        });

        let result = match waited {
            Ok(result) => result,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(PackagingError::write(output, e));
            }
        };

        if !result.status.success() {
            let _ = fs::remove_file(&temp_path);
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PackagingError::write(
                output,
                format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    result.status,
                    stderr.trim()
                ),
            ));
        }

        if let Err(e) = fed {
            let _ = fs::remove_file(&temp_path);
            return Err(PackagingError::write(
                output,
                format!("failed to send entries to {}: {}", self.program.display(), e),
            ));
        }

        fs::rename(&temp_path, output).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            PackagingError::write(output, e)
        })?;
        let size_bytes = fs::metadata(output)
            .map_err(|e| PackagingError::write(output, e))?
            .len();

        Ok(ArchiveResult {
            output_path: output.to_path_buf(),
            size_bytes,
            entry_count: request.files.len(),
        })
    }
}
