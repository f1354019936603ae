//! Envelope generation pipeline.
//!
//! Each generator runs straight through:
//! 1. Validate the build parameters
//! 2. (OLVM only) Measure the system disk with `qemu-img`
//! 3. Assemble the envelope tree
//! 4. Serialize it to XML
//!
//! Nothing is returned until the whole document has been serialized, so a
//! failure at any step never yields a partial document.
//!
//! # Example
//!
//! ```no_run
//! use ovfgen_core::generate::{generate_vbox, VboxParams};
//! use ovfgen_core::ids::RandomIds;
//! use ovfgen_core::params::DiskImage;
//!
//! let params = VboxParams::new(
//!     "OL9U5_x86_64-vagrant-virtualbox",
//!     2,
//!     2048,
//!     DiskImage::new("box-disk001.vmdk", 37),
//!     None,
//!     None,
//!     false,
//!     false,
//! )
//! .unwrap();
//! let xml = generate_vbox(&params, &mut RandomIds, None).unwrap();
//! print!("{}", xml);
//! ```

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::disk::{self, DEFAULT_QEMU_IMG};
use crate::error::Result;
use crate::ids::IdSource;
use crate::ovf::{olvm, vbox, GuestOs};
use crate::xml::to_xml_string;

pub use crate::params::{OlvmParams, VboxParams};

/// Phase of envelope generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratePhase {
    /// Checking build parameters.
    Validating,
    /// Converting the disk image to learn its uncompressed size.
    MeasuringDisk,
    /// Building the element tree.
    Assembling,
    /// Writing XML.
    Serializing,
    /// Generation complete.
    Complete,
}

impl fmt::Display for GeneratePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratePhase::Validating => write!(f, "Validating"),
            GeneratePhase::MeasuringDisk => write!(f, "Measuring disk"),
            GeneratePhase::Assembling => write!(f, "Assembling"),
            GeneratePhase::Serializing => write!(f, "Serializing"),
            GeneratePhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Type alias for the progress callback function.
pub type ProgressCallback = Box<dyn Fn(GeneratePhase) + Send>;

/// Options for OLVM generation.
#[derive(Debug, Clone)]
pub struct OlvmOptions {
    /// Disk image converter executable.
    pub qemu_img: PathBuf,
}

impl Default for OlvmOptions {
    fn default() -> Self {
        Self {
            qemu_img: PathBuf::from(DEFAULT_QEMU_IMG),
        }
    }
}

impl OlvmOptions {
    /// Create options using the given converter executable.
    pub fn new(qemu_img: impl Into<PathBuf>) -> Self {
        Self {
            qemu_img: qemu_img.into(),
        }
    }
}

/// A serialized OLVM envelope.
#[derive(Debug, Clone)]
pub struct OlvmDocument {
    /// The XML document.
    pub xml: String,
    /// Guest OS the envelope was tagged with. [`GuestOs::Unknown`] means the
    /// release had no mapping and the unknown OS id was used.
    pub guest_os: GuestOs,
}

/// Generate an OLVM envelope.
///
/// # Arguments
///
/// * `params` - Build parameters.
/// * `options` - Converter settings.
/// * `ids` - Source of UUIDs and timestamps.
/// * `progress_callback` - Optional callback for phase changes.
///
/// # Errors
///
/// Returns an error if the parameters are invalid, the disk cannot be
/// measured, or serialization fails.
pub fn generate_olvm(
    params: &OlvmParams,
    options: &OlvmOptions,
    ids: &mut impl IdSource,
    progress_callback: Option<ProgressCallback>,
) -> Result<OlvmDocument> {
    let report = |phase: GeneratePhase| {
        if let Some(ref callback) = progress_callback {
            callback(phase);
        }
    };

    report(GeneratePhase::Validating);
    params.validate()?;

    report(GeneratePhase::MeasuringDisk);
    let measurement = disk::measure(&params.image.path, &options.qemu_img)?;
    debug!(
        file_size = measurement.file_size,
        populated_size = measurement.populated_size,
        "Measured system disk"
    );

    report(GeneratePhase::Assembling);
    let ovf = olvm::build_envelope(params, &measurement, ids);

    report(GeneratePhase::Serializing);
    let xml = ovf.to_xml()?;

    report(GeneratePhase::Complete);
    Ok(OlvmDocument {
        xml,
        guest_os: ovf.guest_os,
    })
}

/// Generate a VirtualBox envelope.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or serialization fails.
pub fn generate_vbox(
    params: &VboxParams,
    ids: &mut impl IdSource,
    progress_callback: Option<ProgressCallback>,
) -> Result<String> {
    let report = |phase: GeneratePhase| {
        if let Some(ref callback) = progress_callback {
            callback(phase);
        }
    };

    report(GeneratePhase::Validating);
    params.validate()?;

    report(GeneratePhase::Assembling);
    let envelope = vbox::build_envelope(params, ids);

    report(GeneratePhase::Serializing);
    let xml = to_xml_string(&envelope)?;

    report(GeneratePhase::Complete);
    Ok(xml)
}
