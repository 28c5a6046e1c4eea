//! Re-packing of extracted install directories
//!
//! The container engine hands back an uncompressed tar stream of the
//! install directory. Before it is published it is checked against the
//! naming convention and compressed.

use crate::error::{ToolsmithError, ToolsmithResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};
use xz2::write::XzEncoder;

/// Ensure every entry of an uncompressed tar lives under `prefix/`
pub fn check_top_level(raw_tar: &Path, prefix: &str) -> ToolsmithResult<()> {
    let file = File::open(raw_tar)
        .map_err(|e| ToolsmithError::io(format!("opening {}", raw_tar.display()), e))?;
    let mut archive = tar::Archive::new(BufReader::new(file));
    let read_err =
        |e: io::Error| ToolsmithError::io(format!("reading {}", raw_tar.display()), e);

    let mut seen = false;
    for entry in archive.entries().map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path().map_err(read_err)?;
        let top = path.components().find(|c| !matches!(c, Component::CurDir));
        match top {
            Some(Component::Normal(name)) if name == prefix => seen = true,
            _ => {
                return Err(ToolsmithError::ArchiveLayout {
                    archive: raw_tar.to_path_buf(),
                    prefix: prefix.to_string(),
                })
            }
        }
    }

    if seen {
        Ok(())
    } else {
        Err(ToolsmithError::ArchiveLayout {
            archive: raw_tar.to_path_buf(),
            prefix: prefix.to_string(),
        })
    }
}

/// Compress an uncompressed tar into an xz archive. Returns the compressed size.
pub fn compress_xz(raw_tar: &Path, output: &Path, level: u32) -> ToolsmithResult<u64> {
    let input = File::open(raw_tar)
        .map_err(|e| ToolsmithError::io(format!("opening {}", raw_tar.display()), e))?;
    let out = File::create(output)
        .map_err(|e| ToolsmithError::io(format!("creating {}", output.display()), e))?;

    let write_err =
        |e: io::Error| ToolsmithError::io(format!("compressing into {}", output.display()), e);

    let mut encoder = XzEncoder::new(BufWriter::new(out), level.min(9));
    io::copy(&mut BufReader::new(input), &mut encoder).map_err(write_err)?;
    let mut writer = encoder.finish().map_err(write_err)?;
    writer.flush().map_err(write_err)?;

    let size = std::fs::metadata(output)
        .map_err(|e| ToolsmithError::io(format!("reading {}", output.display()), e))?
        .len();
    Ok(size)
}

/// Hex-encoded SHA-256 of a file
pub fn sha256_file(path: &Path) -> ToolsmithResult<String> {
    let mut file = File::open(path)
        .map_err(|e| ToolsmithError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| ToolsmithError::io(format!("hashing {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
