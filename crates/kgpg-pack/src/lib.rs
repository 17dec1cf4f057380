//! Packaging of plugin directories into `.kgpg` archives
//!
//! A plugin's files are selected by the glob pattern spec ([`patterns`]),
//! collected into a [`ResolvedFileSet`], and written by an [`ArchiveBackend`]
//! either in-process ([`ZipBackend`]) or by an external packer executable
//! ([`ExternalPacker`]). Finished archives are measured and hashed by
//! [`inspect`].

pub mod archive;
pub mod doc_images;
pub mod errors;
pub mod external;
pub mod file_set;
pub mod header;
pub mod inspect;
pub mod patterns;
pub mod zip_backend;

pub use archive::{ArchiveBackend, ArchiveBuilder, ArchiveRequest, ArchiveResult, REQUIRED_FILES};
pub use errors::PackagingError;
pub use external::ExternalPacker;
pub use file_set::ResolvedFileSet;
pub use header::{HeaderExcerpt, PackageFormat};
pub use inspect::{inspect, ArchiveInfo};
pub use zip_backend::ZipBackend;
