//! KGPG v2 container header
//!
//! A v2 archive starts with a fixed 64 KiB block so a client can fetch the
//! manifest excerpt and icon with a single `bytes=0-65535` range request:
//!
//! ```text
//! 0      4  magic "KGPG"
//! 4      2  format version (u16 LE, 2)
//! 6      2  flags (u16 LE, reserved)
//! 8      4  manifest excerpt length m (u32 LE)
//! 12     4  icon length i (u32 LE)
//! 16     m  manifest excerpt, compact JSON
//! 16+m   i  icon bytes
//! ...       zero padding up to 65536
//! ```
//!
//! The ZIP payload follows the block with offsets relative to its own start.

use crate::errors::PackagingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const HEADER_MAGIC: &[u8; 4] = b"KGPG";
pub const HEADER_SIZE: usize = 64 * 1024;
pub const HEADER_VERSION: u16 = 2;
const FIXED_FIELDS: usize = 16;

/// Container layout of a `.kgpg` file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackageFormat {
    /// Bare ZIP container
    V1,
    /// Fixed-size header followed by the ZIP container
    #[default]
    V2,
}

impl PackageFormat {
    pub fn package_version(self) -> u16 {
        match self {
            PackageFormat::V1 => 1,
            PackageFormat::V2 => 2,
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageFormat::V1 => write!(f, "v1"),
            PackageFormat::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for PackageFormat {
    type Err = PackagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(PackageFormat::V1),
            "v2" | "2" => Ok(PackageFormat::V2),
            other => Err(PackagingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Manifest fields embedded in the header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderExcerpt {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// Contents recovered from a header block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    pub version: u16,
    pub excerpt: HeaderExcerpt,
    pub icon: Option<Vec<u8>>,
}

/// Encode the 64 KiB header block.
///
/// An icon that does not fit next to the excerpt is left out.
pub fn encode_header(
    excerpt: &HeaderExcerpt,
    icon: Option<&[u8]>,
) -> Result<Vec<u8>, PackagingError> {
    let excerpt_bytes =
        serde_json::to_vec(excerpt).map_err(|e| PackagingError::InvalidHeader(e.to_string()))?;

    let available = HEADER_SIZE - FIXED_FIELDS;
    if excerpt_bytes.len() > available {
        return Err(PackagingError::HeaderOverflow {
            needed: FIXED_FIELDS + excerpt_bytes.len(),
            available: HEADER_SIZE,
        });
    }

    let icon: &[u8] = match icon {
        Some(bytes) if excerpt_bytes.len() + bytes.len() <= available => bytes,
        Some(bytes) => {
            tracing::warn!(
                "Icon for '{}' is {} bytes and does not fit the package header; omitting it",
                excerpt.id,
                bytes.len()
            );
            &[]
        }
        None => &[],
    };

    let mut block = Vec::with_capacity(HEADER_SIZE);
    block.extend_from_slice(HEADER_MAGIC);
    block.extend_from_slice(&HEADER_VERSION.to_le_bytes());
    block.extend_from_slice(&0u16.to_le_bytes());
    block.extend_from_slice(&(excerpt_bytes.len() as u32).to_le_bytes());
    block.extend_from_slice(&(icon.len() as u32).to_le_bytes());
    block.extend_from_slice(&excerpt_bytes);
    block.extend_from_slice(icon);
    block.resize(HEADER_SIZE, 0);
    Ok(block)
}

/// True when `bytes` starts with the v2 magic
pub fn has_header(bytes: &[u8]) -> bool {
    bytes.starts_with(HEADER_MAGIC)
}

/// Decode a header block from the start of an archive
pub fn decode_header(bytes: &[u8]) -> Result<DecodedHeader, PackagingError> {
    if !has_header(bytes) {
        return Err(PackagingError::InvalidHeader("missing KGPG magic".to_string()));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(PackagingError::InvalidHeader(format!(
            "truncated header: {} of {} bytes",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let excerpt_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let icon_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

    let excerpt_end = FIXED_FIELDS + excerpt_len;
    let icon_end = excerpt_end + icon_len;
    if icon_end > HEADER_SIZE {
        return Err(PackagingError::InvalidHeader(format!(
            "declared lengths exceed the header ({} bytes)",
            icon_end
        )));
    }

    let excerpt = serde_json::from_slice(&bytes[FIXED_FIELDS..excerpt_end])
        .map_err(|e| PackagingError::InvalidHeader(e.to_string()))?;
    let icon = (icon_len > 0).then(|| bytes[excerpt_end..icon_end].to_vec());

    Ok(DecodedHeader {
        version,
        excerpt,
        icon,
    })
}

/// Split an archive into its optional header block and the ZIP payload
pub fn split_container(bytes: &[u8]) -> (Option<&[u8]>, &[u8]) {
    if has_header(bytes) && bytes.len() >= HEADER_SIZE {
        let (header, payload) = bytes.split_at(HEADER_SIZE);
        (Some(header), payload)
    } else {
        (None, bytes)
    }
}
