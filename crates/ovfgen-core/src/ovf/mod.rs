//! OVF envelope assembly.
//!
//! Two targets share the DMTF envelope layout but differ in vendor namespace,
//! identifier scheme and hardware description:
//!
//! - [`olvm`] - Oracle Linux Virtualization Manager (oVirt) import
//! - [`vbox`] - VirtualBox appliance import

pub mod olvm;
pub mod vbox;

use std::fmt;

pub use olvm::{GuestOs, OlvmOvf};

/// DMTF OVF envelope namespace.
pub const OVF_NS: &str = "http://schemas.dmtf.org/ovf/envelope/1";
/// CIM resource allocation setting data namespace.
pub const RASD_NS: &str =
    "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ResourceAllocationSettingData";
/// CIM virtual system setting data namespace.
pub const VSSD_NS: &str =
    "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_VirtualSystemSettingData";
/// XML schema instance namespace.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// oVirt vendor extension namespace.
pub const OVIRT_NS: &str = "http://www.ovirt.org/ovf";
/// VirtualBox vendor extension namespace.
pub const VBOX_NS: &str = "http://www.virtualbox.org/ovf/machine";

/// Placeholder UUID oVirt uses for "no object".
pub const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Hardware item kinds from `CIM_ResourceAllocationSettingData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// Virtual CPUs.
    Processor,
    /// Memory.
    Memory,
    /// IDE controller.
    IdeController,
    /// Ethernet adapter.
    EthernetAdapter,
    /// Disk drive.
    DiskDrive,
    /// SATA or virtio-SCSI controller. oVirt also files its video device
    /// under this code.
    OtherStorageDevice,
    /// USB controller.
    UsbController,
}

impl ResourceType {
    /// Numeric resource type code.
    pub fn code(self) -> u32 {
        match self {
            ResourceType::Processor => 3,
            ResourceType::Memory => 4,
            ResourceType::IdeController => 5,
            ResourceType::EthernetAdapter => 10,
            ResourceType::DiskDrive => 17,
            ResourceType::OtherStorageDevice => 20,
            ResourceType::UsbController => 23,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Namespace declarations shared by both envelopes, followed by the vendor one.
fn envelope_namespaces(vendor_prefix: &str, vendor_ns: &str) -> Vec<(String, String)> {
    vec![
        ("xmlns".to_string(), OVF_NS.to_string()),
        ("xmlns:ovf".to_string(), OVF_NS.to_string()),
        ("xmlns:rasd".to_string(), RASD_NS.to_string()),
        ("xmlns:vssd".to_string(), VSSD_NS.to_string()),
        ("xmlns:xsi".to_string(), XSI_NS.to_string()),
        (format!("xmlns:{}", vendor_prefix), vendor_ns.to_string()),
    ]
}
