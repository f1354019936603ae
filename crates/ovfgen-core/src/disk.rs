//! Disk image introspection through `qemu-img`.
//!
//! oVirt imports the system disk as an uncompressed qcow2 volume, so the
//! envelope has to announce the size that volume will occupy. The only
//! reliable way to learn it is to perform the conversion once and look at
//! the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Default converter executable, resolved through `PATH`.
pub const DEFAULT_QEMU_IMG: &str = "qemu-img";

/// Suffix of the scratch copy written next to the source image.
const SCRATCH_SUFFIX: &str = ".uncompressed";

/// Sizes of a source image as seen by the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskMeasurement {
    /// Size of the source image file in bytes.
    pub file_size: u64,
    /// Size in bytes of the image once converted to uncompressed qcow2.
    pub populated_size: u64,
}

/// Measure a source image: its size on disk and its uncompressed qcow2 size.
///
/// # Arguments
///
/// * `image` - Path to the source image.
/// * `qemu_img` - Converter executable.
///
/// # Errors
///
/// Returns an error if the image cannot be read or the conversion fails.
pub fn measure(image: &Path, qemu_img: &Path) -> Result<DiskMeasurement> {
    let file_size = file_size(image)?;
    let populated_size = measure_populated_size(image, qemu_img)?;
    Ok(DiskMeasurement {
        file_size,
        populated_size,
    })
}

/// Size of a file in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| Error::io(e, path))
}

/// Convert `image` to an uncompressed qcow2 scratch file and return its size.
///
/// The scratch file lives in the image's directory and is removed on every
/// exit path, including converter failure.
pub fn measure_populated_size(image: &Path, qemu_img: &Path) -> Result<u64> {
    let dir = scratch_dir(image);
    let scratch = tempfile::Builder::new()
        .prefix(".ovfgen-")
        .suffix(SCRATCH_SUFFIX)
        .tempfile_in(&dir)
        .map_err(|e| Error::io(e, &dir))?;

    debug!(
        tool = %qemu_img.display(),
        src = %image.display(),
        dst = %scratch.path().display(),
        "Converting image to uncompressed qcow2"
    );

    let output = Command::new(qemu_img)
        .args(["convert", "-O", "qcow2"])
        .arg(image)
        .arg(scratch.path())
        .output()
        .map_err(|e| Error::disk_tool(qemu_img, format!("failed to run: {}", e)))?;

    if !output.status.success() {
        return Err(Error::disk_tool(
            qemu_img,
            format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let size = file_size(scratch.path())?;
    debug!(size, "Measured uncompressed image size");

    let scratch_path = scratch.path().to_path_buf();
    scratch.close().map_err(|e| Error::io(e, scratch_path))?;
    Ok(size)
}

fn scratch_dir(image: &Path) -> PathBuf {
    match image.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
