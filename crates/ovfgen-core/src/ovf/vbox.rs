//! VirtualBox envelope.
//!
//! Produces an appliance descriptor VirtualBox imports without prompting: the
//! generic OVF sections plus a complete `vbox:Machine` configuration. The
//! first disk is announced as a streamOptimized VMDK (the form it has inside
//! an OVA); an additional disk is a plain VMDK.

use crate::ids::{iso_timestamp, mac_address, IdSource};
use crate::params::{DiskImage, VboxParams};
use crate::xml::Element;

use super::{envelope_namespaces, ResourceType, VBOX_NS};

/// VirtualBox OS id for Oracle Linux.
pub const OS_ID: u32 = 109;
/// VirtualBox OS type for x86_64 guests.
pub const OS_TYPE: &str = "Oracle_64";
/// VirtualBox OS type for aarch64 guests.
pub const OS_TYPE_AARCH64: &str = "Oracle_arm64";

/// Logical network the adapter is attached to.
pub const NETWORK_NAME: &str = "NAT";

/// Format URL of the boot disk.
pub const STREAM_OPTIMIZED_FORMAT_URL: &str =
    "http://www.vmware.com/interfaces/specifications/vmdk.html#streamOptimized";
/// Format URL of additional disks.
pub const PLAIN_VMDK_FORMAT_URL: &str = "http://www.vmware.com/interfaces/specifications/vmdk.html";

/// One disk with every identifier that refers to it.
struct VboxDisk<'a> {
    image: &'a DiskImage,
    /// 0-based attachment port.
    port: usize,
    file_ref: String,
    disk_id: String,
    uuid: String,
}

impl VboxDisk<'_> {
    fn format_url(&self) -> &'static str {
        if self.port == 0 {
            STREAM_OPTIMIZED_FORMAT_URL
        } else {
            PLAIN_VMDK_FORMAT_URL
        }
    }
}

/// Monotonic `rasd:InstanceID` allocator, seeded at 1.
struct InstanceIds(u32);

impl InstanceIds {
    fn new() -> Self {
        Self(0)
    }

    fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Assemble the VirtualBox envelope.
///
/// # Arguments
///
/// * `params` - Validated build parameters.
/// * `ids` - Source of UUIDs, the MAC address and the state-change time.
pub fn build_envelope(params: &VboxParams, ids: &mut impl IdSource) -> Element {
    let disks: Vec<VboxDisk<'_>> = params
        .disks()
        .enumerate()
        .map(|(port, image)| VboxDisk {
            image,
            port,
            file_ref: format!("file{}", port + 1),
            disk_id: format!("vmdisk{}", port + 1),
            uuid: ids.uuid(),
        })
        .collect();
    let machine_uuid = ids.uuid();
    let mac = mac_address(ids.mac_suffix());
    let time = iso_timestamp(ids.now());

    let mut envelope = Element::new("Envelope")
        .attr("ovf:version", "1.0")
        .attr("xml:lang", "en-US")
        .attrs(envelope_namespaces("vbox", VBOX_NS));

    let mut references = Element::new("References");
    let mut disk_section = Element::new("DiskSection")
        .child(Element::new("Info").text("List of the virtual disks used in the package"));
    for disk in &disks {
        references.append_child(Element::new("File").attrs([
            ("ovf:id", disk.file_ref.clone()),
            ("ovf:href", disk.image.file_name()),
        ]));
        disk_section.append_child(Element::new("Disk").attrs([
            ("ovf:capacity", disk.image.capacity_bytes().to_string()),
            ("ovf:diskId", disk.disk_id.clone()),
            ("ovf:fileRef", disk.file_ref.clone()),
            ("ovf:format", disk.format_url().to_string()),
            ("vbox:uuid", disk.uuid.clone()),
        ]));
    }
    envelope.append_child(references);
    envelope.append_child(disk_section);

    envelope.append_child(
        Element::new("NetworkSection")
            .child(Element::new("Info").text("Logical networks used in the package"))
            .child(
                Element::new("Network")
                    .attr("ovf:name", NETWORK_NAME)
                    .text_children([("Description", "Logical network used by this appliance.")]),
            ),
    );

    let os_type = if params.aarch64 {
        OS_TYPE_AARCH64
    } else {
        OS_TYPE
    };

    envelope.append_child(
        Element::new("VirtualSystem")
            .attr("ovf:id", params.name.as_str())
            .child(Element::new("Info").text("A virtual machine"))
            .child(
                Element::new("OperatingSystemSection")
                    .attr("ovf:id", OS_ID.to_string())
                    .child(
                        Element::new("Info").text("The kind of installed guest operating system"),
                    )
                    .child(Element::new("Description").text(os_type))
                    .child(
                        Element::new("vbox:OSType")
                            .attr("ovf:required", "false")
                            .text(os_type),
                    ),
            )
            .child(hardware_section(params, &disks))
            .child(machine_section(
                params,
                &disks,
                os_type,
                &machine_uuid,
                &mac,
                &time,
            )),
    );

    envelope
}

fn hardware_section(params: &VboxParams, disks: &[VboxDisk<'_>]) -> Element {
    let mut instance = InstanceIds::new();
    let cpu = format!("{} virtual CPU", params.cpu);
    let memory = format!("{} MB of memory", params.memory_mb);

    let mut section = Element::new("VirtualHardwareSection")
        .child(Element::new("Info").text("Virtual hardware requirements for a virtual machine"))
        .child(Element::new("System").text_children([
            ("vssd:ElementName", "Virtual Hardware Family".to_string()),
            ("vssd:InstanceID", "0".to_string()),
            ("vssd:VirtualSystemIdentifier", params.name.clone()),
            ("vssd:VirtualSystemType", "virtualbox-2.2".to_string()),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:Caption", cpu.clone()),
            ("rasd:Description", "Number of virtual CPUs".to_string()),
            ("rasd:ElementName", cpu),
            ("rasd:InstanceID", instance.next().to_string()),
            ("rasd:ResourceType", ResourceType::Processor.to_string()),
            ("rasd:VirtualQuantity", params.cpu.to_string()),
        ]))
        .child(Element::new("Item").text_children([
            ("rasd:AllocationUnits", "MegaBytes".to_string()),
            ("rasd:Caption", memory.clone()),
            ("rasd:Description", "Memory Size".to_string()),
            ("rasd:ElementName", memory),
            ("rasd:InstanceID", instance.next().to_string()),
            ("rasd:ResourceType", ResourceType::Memory.to_string()),
            ("rasd:VirtualQuantity", params.memory_mb.to_string()),
        ]));

    let controllers: &[(&str, &str, &str, &str, ResourceType)] = if params.uefi {
        &[(
            "0",
            "virtioSCSIController0",
            "VirtioSCSI Controller",
            "VirtioSCSI",
            ResourceType::OtherStorageDevice,
        )]
    } else {
        &[
            (
                "0",
                "ideController0",
                "IDE Controller",
                "PIIX4",
                ResourceType::IdeController,
            ),
            (
                "1",
                "ideController1",
                "IDE Controller",
                "PIIX4",
                ResourceType::IdeController,
            ),
            (
                "0",
                "sataController0",
                "SATA Controller",
                "AHCI",
                ResourceType::OtherStorageDevice,
            ),
        ]
    };

    // Disks hang off the last controller declared.
    let mut controller_id = 0;
    for (address, name, description, subtype, kind) in controllers {
        controller_id = instance.next();
        section.append_child(Element::new("Item").text_children([
            ("rasd:Address", address.to_string()),
            ("rasd:Caption", name.to_string()),
            ("rasd:Description", description.to_string()),
            ("rasd:ElementName", name.to_string()),
            ("rasd:InstanceID", controller_id.to_string()),
            ("rasd:ResourceSubType", subtype.to_string()),
            ("rasd:ResourceType", kind.to_string()),
        ]));
    }

    for disk in disks {
        let name = format!("disk{}", disk.port + 1);
        section.append_child(Element::new("Item").text_children([
            ("rasd:AddressOnParent", disk.port.to_string()),
            ("rasd:Caption", name.clone()),
            ("rasd:Description", "Disk Image".to_string()),
            ("rasd:ElementName", name),
            ("rasd:HostResource", format!("/disk/{}", disk.disk_id)),
            ("rasd:InstanceID", instance.next().to_string()),
            ("rasd:Parent", controller_id.to_string()),
            ("rasd:ResourceType", ResourceType::DiskDrive.to_string()),
        ]));
    }

    let adapter = format!("Ethernet adapter on '{}'", NETWORK_NAME);
    section.append_child(Element::new("Item").text_children([
        ("rasd:AutomaticAllocation", "true".to_string()),
        ("rasd:Caption", adapter.clone()),
        ("rasd:Connection", NETWORK_NAME.to_string()),
        ("rasd:ElementName", adapter),
        ("rasd:InstanceID", instance.next().to_string()),
        ("rasd:ResourceType", ResourceType::EthernetAdapter.to_string()),
    ]));

    section
}

fn machine_section(
    params: &VboxParams,
    disks: &[VboxDisk<'_>],
    os_type: &str,
    machine_uuid: &str,
    mac: &str,
    time: &str,
) -> Element {
    let version = if params.aarch64 {
        "1.20-macosx"
    } else {
        "1.19-linux"
    };

    let mut machine = Element::new("vbox:Machine")
        .attrs([
            ("ovf:required", "false".to_string()),
            ("version", version.to_string()),
            ("uuid", format!("{{{}}}", machine_uuid)),
            ("name", params.name.clone()),
            ("OSType", os_type.to_string()),
            ("snapshotFolder", "Snapshots".to_string()),
            ("lastStateChange", time.to_string()),
        ])
        .child(
            Element::new("ovf:Info")
                .text("Complete VirtualBox machine configuration in VirtualBox format"),
        )
        .child(machine_hardware(params, disks, mac));

    if params.aarch64 {
        machine.append_child(
            Element::new("Platform")
                .attr("architecture", "ARM")
                .child(Element::new("RTC").attr("localOrUTC", "UTC"))
                .child(Element::new("Chipset").attr("type", "ARMv8Virtual"))
                .child(Element::new("CPU").attr("count", params.cpu.to_string())),
        );
    }

    machine
}

fn enabled(name: &str) -> Element {
    Element::new(name).attr("enabled", "true")
}

fn machine_hardware(params: &VboxParams, disks: &[VboxDisk<'_>], mac: &str) -> Element {
    let mut hardware = Element::new("Hardware");

    if !params.uefi {
        hardware.append_child(
            Element::new("CPU")
                .attr("count", params.cpu.to_string())
                .child(enabled("PAE"))
                .child(enabled("LongMode"))
                .child(enabled("X2APIC"))
                .child(enabled("HardwareVirtExLargePages")),
        );
    }

    hardware.append_child(Element::new("Memory").attr("RAMSize", params.memory_mb.to_string()));

    if !params.uefi {
        let mut boot = Element::new("Boot");
        for (position, device) in ["HardDisk", "DVD", "None", "None"].iter().enumerate() {
            boot.append_child(
                Element::new("Order")
                    .attr("position", (position + 1).to_string())
                    .attr("device", *device),
            );
        }
        hardware.append_child(boot);
    }

    let (display_controller, vram) = if params.uefi {
        ("QemuRamFB", "20")
    } else {
        ("VMSVGA", "8")
    };
    hardware.append_child(
        Element::new("Display")
            .attr("controller", display_controller)
            .attr("VRAMSize", vram),
    );

    if !params.aarch64 {
        hardware.append_child(
            enabled("RemoteDisplay").child(
                Element::new("VRDEProperties")
                    .child(
                        Element::new("Property")
                            .attr("name", "TCP/Address")
                            .attr("value", "127.0.0.1"),
                    )
                    .child(
                        Element::new("Property")
                            .attr("name", "TCP/Ports")
                            .attr("value", "5905"),
                    ),
            ),
        );
    }

    if params.uefi {
        hardware.append_child(
            Element::new("Firmware")
                .attr("type", "EFI")
                .child(enabled("IOAPIC"))
                .child(enabled("SmbiosUuidLittleEndian"))
                .child(enabled("AutoSerialNumGen")),
        );
    } else {
        hardware.append_child(
            Element::new("BIOS")
                .child(enabled("IOAPIC"))
                .child(enabled("SmbiosUuidLittleEndian")),
        );
    }

    hardware.append_child(
        Element::new("Network").child(
            Element::new("Adapter")
                .attrs([
                    ("slot", "0"),
                    ("enabled", "true"),
                    ("MACAddress", mac),
                    ("type", "virtio"),
                ])
                .child(Element::new("NAT").attr("localhost-reachable", "true")),
        ),
    );
    hardware.append_child(Element::new("AudioAdapter").attr("driver", "Null"));
    hardware.append_child(Element::new("Clipboard"));
    hardware.append_child(storage_controllers(params, disks));

    hardware
}

fn storage_controllers(params: &VboxParams, disks: &[VboxDisk<'_>]) -> Element {
    let port_count = disks.len().to_string();
    let mut controllers = Element::new("StorageControllers");

    let mut boot_controller = if params.uefi {
        Element::new("StorageController").attrs([
            ("name", "VirtioSCSI".to_string()),
            ("type", "VirtioSCSI".to_string()),
            ("PortCount", port_count),
            ("useHostIOCache", "false".to_string()),
            ("Bootable", "true".to_string()),
        ])
    } else {
        controllers.append_child(Element::new("StorageController").attrs([
            ("name", "IDE Controller"),
            ("type", "PIIX4"),
            ("PortCount", "2"),
            ("useHostIOCache", "true"),
            ("Bootable", "true"),
        ]));
        Element::new("StorageController").attrs([
            ("name", "SATA Controller".to_string()),
            ("type", "AHCI".to_string()),
            ("PortCount", port_count),
            ("useHostIOCache", "false".to_string()),
            ("Bootable", "true".to_string()),
            ("IDE0MasterEmulationPort", "0".to_string()),
            ("IDE0SlaveEmulationPort", "1".to_string()),
            ("IDE1MasterEmulationPort", "2".to_string()),
            ("IDE1SlaveEmulationPort", "3".to_string()),
        ])
    };

    for disk in disks {
        boot_controller.append_child(
            Element::new("AttachedDevice")
                .attrs([
                    ("type", "HardDisk".to_string()),
                    ("hotpluggable", "false".to_string()),
                    ("port", disk.port.to_string()),
                    ("device", "0".to_string()),
                ])
                .child(Element::new("Image").attr("uuid", format!("{{{}}}", disk.uuid))),
        );
    }
    controllers.append_child(boot_controller);

    controllers
}
