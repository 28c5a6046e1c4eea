//! Local unpack stage
//!
//! Decompresses and extracts dependency archives into fixed directories
//! inside a build context. Entries that would land outside the destination
//! are rejected.

use crate::archive::naming::{canonical_prefix, Compression};
use crate::error::{ToolsmithError, ToolsmithResult};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use xz2::read::XzDecoder;

/// Extract `archive` into `destination`, overwriting existing files in place.
///
/// Returns the number of entries written.
pub fn unpack(archive: &Path, destination: &Path) -> ToolsmithResult<usize> {
    let compression = Compression::from_archive_path(archive)?;

    fs::create_dir_all(destination).map_err(|e| {
        ToolsmithError::io(format!("creating {}", destination.display()), e)
    })?;

    let file = File::open(archive)
        .map_err(|e| ToolsmithError::io(format!("opening {}", archive.display()), e))?;
    let reader: Box<dyn Read> = match compression {
        Compression::Xz => Box::new(XzDecoder::new_multi_decoder(BufReader::new(file))),
    };

    let root = destination.canonicalize().map_err(|e| {
        ToolsmithError::io(format!("resolving {}", destination.display()), e)
    })?;

    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);

    let read_err = |e: std::io::Error| ToolsmithError::io(format!("reading {}", archive.display()), e);

    let mut count = 0;
    for entry in tar.entries().map_err(read_err)? {
        let mut entry = entry.map_err(read_err)?;
        let entry_path = entry.path().map_err(read_err)?.into_owned();
        validate_entry_path(&entry_path)?;
        ensure_parent_inside(&root, &entry_path)?;

        let written = entry.unpack_in(&root).map_err(|e| {
            // tar refuses entries whose parent resolves outside the root
            if e.to_string().contains("outside of destination") {
                ToolsmithError::PathTraversal {
                    entry: entry_path.clone(),
                }
            } else {
                ToolsmithError::io(format!("extracting {}", entry_path.display()), e)
            }
        })?;
        if !written {
            return Err(ToolsmithError::PathTraversal { entry: entry_path });
        }
        count += 1;
    }

    debug!("Extracted {} entries from {}", count, archive.display());
    Ok(count)
}

/// Unpack an archive and return the directory holding its contents.
///
/// The archive's top-level directory must match its canonical prefix;
/// a mismatch is reported instead of silently yielding a wrong path.
pub async fn unpack_archive(archive: &Path, destination: &Path) -> ToolsmithResult<PathBuf> {
    let prefix = canonical_prefix(archive)?;
    let display_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());

    info!("Unpacking {}...", display_name);

    let archive_owned = archive.to_path_buf();
    let destination_owned = destination.to_path_buf();
    tokio::task::spawn_blocking(move || unpack(&archive_owned, &destination_owned))
        .await
        .map_err(|e| ToolsmithError::Internal(format!("unpack task failed: {}", e)))??;

    let root = verify_layout(archive, destination, &prefix)?;
    info!("Successfully unpacked {}!", display_name);
    Ok(root)
}

/// Check that `destination/<prefix>` exists as a directory
pub fn verify_layout(archive: &Path, destination: &Path, prefix: &str) -> ToolsmithResult<PathBuf> {
    let root = destination.join(prefix);
    if root.is_dir() {
        Ok(root)
    } else {
        Err(ToolsmithError::ArchiveLayout {
            archive: archive.to_path_buf(),
            prefix: prefix.to_string(),
        })
    }
}

/// Only plain relative components are allowed in archive entries
fn validate_entry_path(path: &Path) -> ToolsmithResult<()> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(ToolsmithError::PathTraversal {
                    entry: path.to_path_buf(),
                })
            }
        }
    }
    Ok(())
}

/// Reject entries whose existing parent directory resolves outside `root`,
/// e.g. through a symlink unpacked by an earlier entry.
fn ensure_parent_inside(root: &Path, entry: &Path) -> ToolsmithResult<()> {
    let Some(parent) = entry.parent() else {
        return Ok(());
    };
    let target = root.join(parent);
    for ancestor in target.ancestors() {
        if let Ok(resolved) = ancestor.canonicalize() {
            if resolved.starts_with(root) {
                return Ok(());
            }
            return Err(ToolsmithError::PathTraversal {
                entry: entry.to_path_buf(),
            });
        }
    }
    Ok(())
}
