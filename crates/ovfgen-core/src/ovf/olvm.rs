//! OLVM (oVirt) envelope.
//!
//! Produces the OVF flavour accepted by the oVirt engine's OVA import: a
//! single qcow2 system disk, the oVirt vendor namespace, engine-specific
//! VirtualSystem properties and an optional cloud-init `VmInit` block.

use tracing::warn;

use crate::disk::DiskMeasurement;
use crate::error::Result;
use crate::ids::{olvm_timestamp, IdSource};
use crate::params::OlvmParams;
use crate::xml::{to_xml_string, Element};

use super::{envelope_namespaces, ResourceType, NIL_UUID, OVIRT_NS};

/// oVirt operating system id used when the release is not recognized.
pub const UNKNOWN_OS_ID: u32 = 0;

/// Logical network every NIC is attached to.
pub const NETWORK_NAME: &str = "ovirtvm";

/// Disk format URL oVirt expects for qcow2 volumes.
pub const QCOW_FORMAT_URL: &str = "http://www.gnome.org/~markmc/qcow-image-format.html";

/// Guest operating system, as known to the oVirt engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestOs {
    /// Oracle Linux 5, x86_64.
    Ol5,
    /// Oracle Linux 6, x86_64.
    Ol6,
    /// Oracle Linux 7, x86_64.
    Ol7,
    /// Oracle Linux 8, x86_64.
    Ol8,
    /// A release with no oVirt id mapping.
    Unknown(String),
}

impl GuestOs {
    /// Map a release string such as `OL8` to a guest OS.
    pub fn from_release(release: &str) -> Self {
        match release {
            "OL5" => GuestOs::Ol5,
            "OL6" => GuestOs::Ol6,
            "OL7" => GuestOs::Ol7,
            "OL8" => GuestOs::Ol8,
            other => GuestOs::Unknown(other.to_string()),
        }
    }

    /// oVirt engine operating system id.
    pub fn ovirt_id(&self) -> u32 {
        match self {
            GuestOs::Ol5 => 5001,
            GuestOs::Ol6 => 5002,
            GuestOs::Ol7 => 5003,
            GuestOs::Ol8 => 5006,
            GuestOs::Unknown(_) => UNKNOWN_OS_ID,
        }
    }

    /// Whether the release has an oVirt id mapping.
    pub fn is_known(&self) -> bool {
        !matches!(self, GuestOs::Unknown(_))
    }
}

/// An assembled OLVM envelope.
#[derive(Debug, Clone)]
pub struct OlvmOvf {
    /// Root `ovf:Envelope` element.
    pub document: Element,
    /// Guest OS the envelope was tagged with.
    pub guest_os: GuestOs,
}

impl OlvmOvf {
    /// Serialize the envelope.
    pub fn to_xml(&self) -> Result<String> {
        to_xml_string(&self.document)
    }
}

/// Assemble the OLVM envelope.
///
/// # Arguments
///
/// * `params` - Validated build parameters.
/// * `disk` - Measured sizes of the system disk image.
/// * `ids` - Source of UUIDs and the creation time.
pub fn build_envelope(
    params: &OlvmParams,
    disk: &DiskMeasurement,
    ids: &mut impl IdSource,
) -> OlvmOvf {
    let build = params.build_name();
    let file_uuid = ids.uuid();
    let disk_uuid = ids.uuid();
    let ovf_uuid = ids.uuid();
    let time = olvm_timestamp(ids.now());

    let guest_os = GuestOs::from_release(&params.release);
    if !guest_os.is_known() {
        warn!("unknown OS release {}", params.release);
    }

    let mut envelope =
        Element::new("ovf:Envelope").attrs(envelope_namespaces("ovirt", OVIRT_NS));

    // oVirt expects the href to equal the file id.
    envelope.append_child(
        Element::new("References").child(Element::new("File").attrs([
            ("ovf:href", file_uuid.clone()),
            ("ovf:id", file_uuid.clone()),
            ("ovf:size", disk.file_size.to_string()),
        ])),
    );

    envelope.append_child(
        Element::new("NetworkSection")
            .child(Element::new("Info").text("List of networks"))
            .child(Element::new("Network").attr("ovf:name", NETWORK_NAME)),
    );

    envelope.append_child(
        Element::new("DiskSection")
            .child(Element::new("Info").text("List of Virtual Disks"))
            .child(Element::new("Disk").attrs([
                ("ovf:diskId", disk_uuid.clone()),
                ("ovf:capacity", params.image.capacity_bytes().to_string()),
                ("ovf:populatedSize", disk.populated_size.to_string()),
                ("ovf:fileRef", file_uuid.clone()),
                ("ovf:parentRef", String::new()),
                ("ovf:format", QCOW_FORMAT_URL.to_string()),
                ("ovf:volume-format", "COW".to_string()),
                ("ovf:volume-type", "Sparse".to_string()),
                ("ovf:disk-interface", "VirtIO".to_string()),
                ("ovf:boot", "true".to_string()),
                ("ovf:disk-type", "System".to_string()),
                ("ovf:disk-alias", format!("Disk_{}", build)),
            ])),
    );

    let mut virtual_system = Element::new("VirtualSystem").attr("ovf:id", ovf_uuid.clone());
    // An empty script is the same as no script.
    if let Some(script) = params.script.as_deref().filter(|s| !s.is_empty()) {
        virtual_system.append_child(Element::new("VmInit").attrs([
            ("ovf:authorizedKeys", ""),
            ("ovf:regenerateKeys", "false"),
            ("ovf:networks", "[ ]"),
            ("ovf:customScript", script),
        ]));
    }
    let virtual_system = virtual_system
        .text_children(system_properties(params, &build, &ovf_uuid, &time))
        .child(os_section(params, &guest_os))
        .child(hardware_section(params, &file_uuid, &disk_uuid, &time, ids));
    envelope.append_child(virtual_system);

    OlvmOvf {
        document: envelope,
        guest_os,
    }
}

/// Engine properties of the virtual system, in the order the engine writes them.
fn system_properties(
    params: &OlvmParams,
    build: &str,
    ovf_uuid: &str,
    time: &str,
) -> Vec<(&'static str, String)> {
    let memory = params.memory_mb.to_string();
    let mut properties = vec![
        ("Name", build.to_string()),
        ("Description", "Generated by oracle-linux-image-tools".to_string()),
        ("Comment", String::new()),
        ("CreationDate", time.to_string()),
        ("ExportDate", time.to_string()),
        ("DeleteProtected", "false".to_string()),
        ("NumOfIoThreads", "1".to_string()),
        ("TimeZone", "Etc/GMT".to_string()),
        ("ClusterCompatibilityVersion", "4.2".to_string()),
        // 1: server
        ("VmType", "1".to_string()),
        ("ResumeBehavior", "AUTO_RESUME".to_string()),
        ("MinAllocatedMem", memory.clone()),
        ("IsStateless", "false".to_string()),
        ("IsRunAndPause", "false".to_string()),
        ("AutoStartup", "false".to_string()),
        ("Priority", "1".to_string()),
        ("MigrationSupport", "0".to_string()),
        ("IsBootMenuEnabled", "false".to_string()),
        ("IsSpiceFileTransferEnabled", "true".to_string()),
        ("IsSpiceCopyPasteEnabled", "true".to_string()),
        ("AllowConsoleReconnect", "true".to_string()),
        ("ConsoleDisconnectAction", "LOCK_SCREEN".to_string()),
        ("MaxMemorySizeMb", memory),
        ("MultiQueuesEnabled", "true".to_string()),
        ("Origin", "0".to_string()),
        // 1: QXL, 2: VNC
        ("DefaultDisplayType", "2".to_string()),
        ("TrustedService", "false".to_string()),
        ("UseHostCpu", "false".to_string()),
    ];

    if params.template {
        properties.extend([
            ("TemplateId", ovf_uuid.to_string()),
            ("TemplateType", "TEMPLATE".to_string()),
            ("BaseTemplateId", ovf_uuid.to_string()),
            ("TemplateVersionNumber", "1".to_string()),
            ("TemplateVersionName", "base version".to_string()),
        ]);
    } else {
        properties.extend([
            ("TemplateId", NIL_UUID.to_string()),
            ("OriginalTemplateId", NIL_UUID.to_string()),
            ("OriginalTemplateName", "Blank".to_string()),
            ("UseLatestVersion", "false".to_string()),
            ("StopTime", time.to_string()),
        ]);
    }

    properties
}

fn os_section(params: &OlvmParams, guest_os: &GuestOs) -> Element {
    Element::new("OperatingSystemSection")
        .attrs([
            ("ovf:id", "1".to_string()),
            ("ovirt:id", guest_os.ovirt_id().to_string()),
            ("ovf:required", "false".to_string()),
        ])
        .child(Element::new("Info").text("Guest Operating System"))
        .child(
            Element::new("Description").text(format!("{}U{} x64", params.release, params.update)),
        )
}

/// Hardware items. Instance ids mix small literals and UUIDs the way the
/// engine's own exports do; the disk item reuses the file UUID.
fn hardware_section(
    params: &OlvmParams,
    file_uuid: &str,
    disk_uuid: &str,
    time: &str,
    ids: &mut impl IdSource,
) -> Element {
    let cpu = params.cpu.to_string();
    let memory = params.memory_mb.to_string();

    Element::new("VirtualHardwareSection")
        .child(Element::new("Info").text(format!("{} CPU, {} Memory", cpu, memory)))
        .child(
            Element::new("System")
                .child(Element::new("vssd:VirtualSystemType").text("ENGINE 4.1.0.0")),
        )
        .child(Element::new("Item").text_children([
            ("rasd:Caption", format!("{} virtual cpu", cpu)),
            ("rasd:Description", "Number of virtual CPU".to_string()),
            ("rasd:InstanceId", "1".to_string()),
            ("rasd:ResourceType", ResourceType::Processor.to_string()),
            ("rasd:num_of_sockets", cpu.clone()),
            ("rasd:cpu_per_socket", "1".to_string()),
            ("rasd:threads_per_cpu", "1".to_string()),
            ("rasd:max_num_of_vcpus", "16".to_string()),
            ("rasd:VirtualQuantity", cpu),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:Caption", format!("{} MB of memory", memory)),
            ("rasd:Description", "Memory Size".to_string()),
            ("rasd:InstanceId", "2".to_string()),
            ("rasd:ResourceType", ResourceType::Memory.to_string()),
            ("rasd:AllocationUnits", "MegaBytes".to_string()),
            ("rasd:VirtualQuantity", memory),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:Caption", "USB Controller".to_string()),
            ("rasd:InstanceId", "3".to_string()),
            ("rasd:ResourceType", ResourceType::UsbController.to_string()),
            ("rasd:UsbPolicy", "DISABLED".to_string()),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:Caption", "Graphical Controller".to_string()),
            ("rasd:InstanceId", ids.uuid()),
            ("rasd:ResourceType", ResourceType::OtherStorageDevice.to_string()),
            ("Type", "video".to_string()),
            ("rasd:VirtualQuantity", "1".to_string()),
            ("Device", "vga".to_string()),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:Caption", "Drive: 1".to_string()),
            ("rasd:InstanceId", file_uuid.to_string()),
            ("rasd:ResourceType", ResourceType::DiskDrive.to_string()),
            ("Type", "disk".to_string()),
            ("rasd:HostResource", format!("ovf:disk/{}", disk_uuid)),
            ("rasd:Parent", NIL_UUID.to_string()),
            ("rasd:Template", NIL_UUID.to_string()),
            ("rasd:ApplicationList", String::new()),
            ("rasd:StorageId", NIL_UUID.to_string()),
            ("rasd:StoragePoolId", NIL_UUID.to_string()),
            ("rasd:CreationDate", time.to_string()),
            ("rasd:LastModified", time.to_string()),
            ("rasd:last_modified_date", time.to_string()),
            ("Device", "disk".to_string()),
            ("BootOrder", "0".to_string()),
            ("IsPlugged", "true".to_string()),
            ("IsReadOnly", "false".to_string()),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:Caption", format!("Ethernet adapter on {}", NETWORK_NAME)),
            ("rasd:InstanceId", ids.uuid()),
            ("rasd:ResourceType", ResourceType::EthernetAdapter.to_string()),
            ("rasd:OtherResourceType", NETWORK_NAME.to_string()),
            ("rasd:ResourceSubType", "3".to_string()),
            ("rasd:Connection", NETWORK_NAME.to_string()),
            ("rasd:Linked", "true".to_string()),
            ("rasd:Name", "nic1".to_string()),
            ("rasd:ElementName", "nic1".to_string()),
            ("rasd:speed", "10000".to_string()),
            ("Type", "interface".to_string()),
            ("Device", "bridge".to_string()),
            ("BootOrder", "0".to_string()),
            ("IsPlugged", "true".to_string()),
            ("IsReadOnly", "false".to_string()),
        ]))
}
