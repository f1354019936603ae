//! ovfgen Core Library
//!
//! This crate generates OVF envelope descriptors for importing Oracle Linux
//! images into Oracle Linux Virtualization Manager (oVirt) and VirtualBox.
//!
//! # Overview
//!
//! An envelope is assembled as an owned element tree from a set of build
//! parameters, then serialized once. The OLVM flavour also measures the
//! system disk with `qemu-img` so it can announce the imported volume size.
//! The main entry points are [`generate_olvm`] and [`generate_vbox`].
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`xml`] - Element tree and XML serialization
//! - [`ids`] - UUIDs, timestamps and MAC addresses
//! - [`disk`] - Disk image measurement through `qemu-img`
//! - [`params`] - Build parameters and validation
//! - [`ovf`] - OLVM and VirtualBox envelope assemblers
//! - [`generate`] - Generation pipeline
//!
//! # Quick Start
//!
//! ```no_run
//! use ovfgen_core::{generate_olvm, DiskImage, OlvmOptions, OlvmParams, RandomIds};
//!
//! let params = OlvmParams {
//!     release: "OL8".to_string(),
//!     update: "10".to_string(),
//!     build_version: "1".to_string(),
//!     cpu: 2,
//!     memory_mb: 4096,
//!     image: DiskImage::new("System.qcow", 37),
//!     template: false,
//!     script: None,
//! };
//!
//! let document = generate_olvm(&params, &OlvmOptions::default(), &mut RandomIds, None).unwrap();
//! print!("{}", document.xml);
//! ```

pub mod disk;
pub mod error;
pub mod generate;
pub mod ids;
pub mod ovf;
pub mod params;
pub mod xml;

pub use error::{Error, Result};

// Re-export the generation pipeline for convenience
pub use generate::{
    generate_olvm, generate_vbox, GeneratePhase, OlvmDocument, OlvmOptions, ProgressCallback,
};

pub use ids::{IdSource, RandomIds};
pub use ovf::GuestOs;
pub use params::{DiskImage, OlvmParams, VboxParams};
