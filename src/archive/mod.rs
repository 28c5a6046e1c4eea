//! Toolchain archives: naming, unpacking and re-packing

pub mod naming;
pub mod pack;
pub mod unpack;

pub use naming::{canonical_prefix, install_dir, Compression, INSTALL_BASE_DIR};
pub use pack::{check_top_level, compress_xz, sha256_file};
pub use unpack::{unpack, unpack_archive};
