//! Archive naming convention
//!
//! Every archive produced or consumed by the pipeline is named
//! `<prefix>.tar.<compression>`, and contains exactly one top-level
//! directory called `<prefix>`. Inside build containers the same
//! directory lives under [`INSTALL_BASE_DIR`].

use crate::error::{ToolsmithError, ToolsmithResult};
use std::path::Path;

/// Base directory for toolchain installs inside build containers
pub const INSTALL_BASE_DIR: &str = "/var/buildlibs";

/// Supported archive compressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// LZMA2 (`.tar.xz`)
    Xz,
}

impl Compression {
    /// Determine the compression from an archive path
    pub fn from_archive_path(path: &Path) -> ToolsmithResult<Self> {
        let (_, suffix) = split_archive_name(path)?;
        match suffix {
            "xz" => Ok(Self::Xz),
            other => Err(ToolsmithError::UnsupportedCompression(other.to_string())),
        }
    }

    /// MIME type used when uploading archives of this kind
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xz => "application/x-xz-compressed-tar",
        }
    }
}

/// Name of the single top-level directory inside the archive.
///
/// `gcc-13.2.0-x86_64-linux-gnu.tar.xz` → `gcc-13.2.0-x86_64-linux-gnu`
pub fn canonical_prefix(path: impl AsRef<Path>) -> ToolsmithResult<String> {
    let (prefix, _) = split_archive_name(path.as_ref())?;
    Ok(prefix.to_string())
}

/// Absolute install directory used for the archive's contents inside a build container.
///
/// Container paths are always POSIX, regardless of the host.
pub fn install_dir(path: impl AsRef<Path>) -> ToolsmithResult<String> {
    let prefix = canonical_prefix(path)?;
    Ok(format!("{}/{}", INSTALL_BASE_DIR, prefix))
}

/// Split `<prefix>.tar.<compression>` into its prefix and compression suffix
fn split_archive_name(path: &Path) -> ToolsmithResult<(&str, &str)> {
    let malformed = |reason: &str| ToolsmithError::ArchiveName {
        name: path.display().to_string(),
        reason: reason.to_string(),
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| malformed("file name is missing or not UTF-8"))?;

    let (tar_name, compression) = name
        .rsplit_once('.')
        .ok_or_else(|| malformed("expected a .tar.<compression> suffix"))?;
    let (prefix, tar) = tar_name
        .rsplit_once('.')
        .ok_or_else(|| malformed("expected a .tar.<compression> suffix"))?;

    if tar != "tar" {
        return Err(malformed("inner suffix must be .tar"));
    }
    if compression.is_empty() {
        return Err(malformed("compression suffix is empty"));
    }
    if prefix.is_empty() {
        return Err(malformed("archive prefix is empty"));
    }

    Ok((prefix, compression))
}
