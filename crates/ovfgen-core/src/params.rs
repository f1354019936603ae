//! Build parameters for the envelope generators.
//!
//! Parameters are validated once, up front, so that an invalid request is
//! rejected before any disk is measured or any element is built.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Bytes in one gigabyte as used for disk capacities (`1024^3`).
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Largest disk size in gigabytes whose capacity in bytes fits a `u64`.
pub const MAX_SIZE_GB: u64 = u64::MAX / GIB;

/// Default number of virtual CPUs.
pub const DEFAULT_CPU: u32 = 1;

/// Default memory size in megabytes.
pub const DEFAULT_MEMORY_MB: u32 = 1024;

/// A disk image file together with the virtual size it is exposed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    /// Path to the image file.
    pub path: PathBuf,
    /// Virtual disk size in gigabytes.
    pub size_gb: u64,
}

impl DiskImage {
    /// Create a disk image description.
    pub fn new(path: impl Into<PathBuf>, size_gb: u64) -> Self {
        Self {
            path: path.into(),
            size_gb,
        }
    }

    /// Virtual capacity in bytes, or `None` if it does not fit a `u64`.
    pub fn checked_capacity_bytes(&self) -> Option<u64> {
        self.size_gb.checked_mul(GIB)
    }

    /// Virtual capacity in bytes. Sizes above [`MAX_SIZE_GB`] are rejected
    /// by validation; unvalidated ones saturate at `u64::MAX`.
    pub fn capacity_bytes(&self) -> u64 {
        self.checked_capacity_bytes().unwrap_or(u64::MAX)
    }

    /// Final path component, used as the file href inside an OVA.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Parameters for an OLVM (oVirt) envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlvmParams {
    /// Release, e.g. `OL8`.
    pub release: String,
    /// Update number, e.g. `7`.
    pub update: String,
    /// Build version, e.g. `2`.
    pub build_version: String,
    /// Number of virtual CPUs.
    pub cpu: u32,
    /// Memory size in megabytes.
    pub memory_mb: u32,
    /// The system disk.
    pub image: DiskImage,
    /// Generate a template rather than a VM.
    pub template: bool,
    /// Cloud-init custom script.
    pub script: Option<String>,
}

impl OlvmParams {
    /// Full build name, e.g. `OL8U7_x86_64-olvm-b2`.
    pub fn build_name(&self) -> String {
        format!(
            "{}U{}_x86_64-olvm-b{}",
            self.release, self.update, self.build_version
        )
    }

    /// Check that the parameters describe a buildable envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if the image does not exist or a
    /// count is zero.
    pub fn validate(&self) -> Result<()> {
        require_positive("CPU count", u64::from(self.cpu))?;
        require_positive("memory size", u64::from(self.memory_mb))?;
        require_size("image size", &self.image)?;
        require_file(&self.image.path, "Image file does not exist.")
    }
}

/// Parameters for a VirtualBox envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VboxParams {
    /// Image (and virtual machine) name.
    pub name: String,
    /// Number of virtual CPUs.
    pub cpu: u32,
    /// Memory size in megabytes.
    pub memory_mb: u32,
    /// The boot disk.
    pub image: DiskImage,
    /// Optional second disk.
    pub extra: Option<DiskImage>,
    /// UEFI firmware instead of BIOS.
    pub uefi: bool,
    /// aarch64 guest (Apple Silicon hosts).
    pub aarch64: bool,
}

impl VboxParams {
    /// Build and validate VirtualBox parameters from raw options.
    ///
    /// The extra image and its size must be given together. `aarch64`
    /// implies `uefi`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if an image does not exist, a
    /// count is zero, or only one of `extra_image` / `extra_size` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        cpu: u32,
        memory_mb: u32,
        image: DiskImage,
        extra_image: Option<PathBuf>,
        extra_size: Option<u64>,
        uefi: bool,
        aarch64: bool,
    ) -> Result<Self> {
        let extra = match (extra_image, extra_size) {
            (Some(path), Some(size_gb)) => Some(DiskImage::new(path, size_gb)),
            (None, None) => None,
            _ => {
                return Err(Error::invalid_parameters(
                    "Extra image and extra size must both be specified or omitted.",
                ))
            }
        };

        let params = Self {
            name: name.into(),
            cpu,
            memory_mb,
            image,
            extra,
            uefi: uefi || aarch64,
            aarch64,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters describe a buildable envelope.
    pub fn validate(&self) -> Result<()> {
        require_positive("CPU count", u64::from(self.cpu))?;
        require_positive("memory size", u64::from(self.memory_mb))?;
        require_size("image size", &self.image)?;
        require_file(&self.image.path, "Image file does not exist.")?;
        if let Some(extra) = &self.extra {
            require_size("extra image size", extra)?;
            require_file(&extra.path, "Extra image file does not exist.")?;
        }
        Ok(())
    }

    /// All disks in attachment order.
    pub fn disks(&self) -> impl Iterator<Item = &DiskImage> {
        std::iter::once(&self.image).chain(self.extra.as_ref())
    }
}

fn require_file(path: &Path, message: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::invalid_parameters(format!(
            "{} ({})",
            message,
            path.display()
        )))
    }
}

fn require_size(what: &str, disk: &DiskImage) -> Result<()> {
    require_positive(what, disk.size_gb)?;
    if disk.checked_capacity_bytes().is_none() {
        return Err(Error::invalid_parameters(format!(
            "{} must be at most {} GB",
            what, MAX_SIZE_GB
        )));
    }
    Ok(())
}

fn require_positive(what: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid_parameters(format!(
            "{} must be a positive integer",
            what
        )));
    }
    Ok(())
}
