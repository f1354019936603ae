//! Integration tests for the OLVM envelope.

mod common;

use common::{mask_volatile, parse, FixedIds, Node};
use ovfgen_core::disk::DiskMeasurement;
use ovfgen_core::ovf::olvm::{build_envelope, QCOW_FORMAT_URL, UNKNOWN_OS_ID};
use ovfgen_core::ovf::{OVF_NS, OVIRT_NS};
use ovfgen_core::{DiskImage, GuestOs, OlvmParams, RandomIds};

const FILE_SIZE: u64 = 734_003_200;
const POPULATED_SIZE: u64 = 1_621_360_640;

fn create_test_params() -> OlvmParams {
    OlvmParams {
        release: "OL8".to_string(),
        update: "7".to_string(),
        build_version: "2".to_string(),
        cpu: 2,
        memory_mb: 4096,
        image: DiskImage::new("System.qcow", 37),
        template: false,
        script: None,
    }
}

fn measurement() -> DiskMeasurement {
    DiskMeasurement {
        file_size: FILE_SIZE,
        populated_size: POPULATED_SIZE,
    }
}

fn build(params: &OlvmParams) -> (String, GuestOs) {
    let ovf = build_envelope(params, &measurement(), &mut FixedIds::new());
    let xml = ovf.to_xml().expect("Failed to serialize OVF");
    (xml, ovf.guest_os)
}

fn build_parsed(params: &OlvmParams) -> Node {
    parse(&build(params).0)
}

#[test]
fn test_olvm_xml_declaration() {
    let (xml, _) = build(&create_test_params());
    assert!(
        xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ovf:Envelope"),
        "OVF should start with XML declaration followed by the envelope"
    );
    assert!(xml.ends_with("</ovf:Envelope>\n"));
}

#[test]
fn test_olvm_envelope_namespaces() {
    let envelope = build_parsed(&create_test_params());
    assert_eq!(envelope.name, "ovf:Envelope");
    assert_eq!(envelope.attr("xmlns"), Some(OVF_NS));
    assert_eq!(envelope.attr("xmlns:ovf"), Some(OVF_NS));
    assert_eq!(envelope.attr("xmlns:ovirt"), Some(OVIRT_NS));
    assert!(envelope.attr("xmlns:rasd").is_some());
    assert!(envelope.attr("xmlns:vssd").is_some());
    assert!(envelope.attr("xmlns:xsi").is_some());
    assert!(envelope.attr("xmlns:vbox").is_none());
}

#[test]
fn test_olvm_section_order() {
    let envelope = build_parsed(&create_test_params());
    assert_eq!(
        envelope.child_names(),
        ["References", "NetworkSection", "DiskSection", "VirtualSystem"]
    );

    let virtual_system = envelope.child("VirtualSystem");
    let names = virtual_system.child_names();
    assert_eq!(names.first(), Some(&"Name"));
    assert_eq!(
        &names[names.len() - 2..],
        ["OperatingSystemSection", "VirtualHardwareSection"]
    );
}

#[test]
fn test_olvm_references_section() {
    let envelope = build_parsed(&create_test_params());
    let files = envelope.child("References").children_named("File");
    assert_eq!(files.len(), 1);

    let file = files[0];
    assert_eq!(file.attr("ovf:id"), Some(FixedIds::nth(1).as_str()));
    assert_eq!(file.attr("ovf:href"), file.attr("ovf:id"));
    assert_eq!(file.attr("ovf:size"), Some(FILE_SIZE.to_string().as_str()));
}

#[test]
fn test_olvm_network_section() {
    let envelope = build_parsed(&create_test_params());
    let section = envelope.child("NetworkSection");
    assert_eq!(section.text_of("Info"), "List of networks");
    assert_eq!(section.child("Network").attr("ovf:name"), Some("ovirtvm"));
}

#[test]
fn test_olvm_disk_section() {
    let envelope = build_parsed(&create_test_params());
    let section = envelope.child("DiskSection");
    assert_eq!(section.text_of("Info"), "List of Virtual Disks");

    let disk = section.child("Disk");
    assert_eq!(disk.attr("ovf:diskId"), Some(FixedIds::nth(2).as_str()));
    assert_eq!(disk.attr("ovf:capacity"), Some("39728447488"));
    assert_eq!(
        disk.attr("ovf:populatedSize"),
        Some(POPULATED_SIZE.to_string().as_str())
    );
    assert_eq!(disk.attr("ovf:fileRef"), Some(FixedIds::nth(1).as_str()));
    assert_eq!(disk.attr("ovf:parentRef"), Some(""));
    assert_eq!(disk.attr("ovf:format"), Some(QCOW_FORMAT_URL));
    assert_eq!(disk.attr("ovf:volume-format"), Some("COW"));
    assert_eq!(disk.attr("ovf:volume-type"), Some("Sparse"));
    assert_eq!(disk.attr("ovf:disk-interface"), Some("VirtIO"));
    assert_eq!(disk.attr("ovf:boot"), Some("true"));
    assert_eq!(disk.attr("ovf:disk-type"), Some("System"));
    assert_eq!(
        disk.attr("ovf:disk-alias"),
        Some("Disk_OL8U7_x86_64-olvm-b2")
    );
}

#[test]
fn test_olvm_disk_capacity() {
    for (size_gb, expected) in [(1u64, 1_073_741_824u64), (10, 10_737_418_240), (500, 536_870_912_000)] {
        let mut params = create_test_params();
        params.image.size_gb = size_gb;
        let envelope = build_parsed(&params);
        let disk = envelope.child("DiskSection").child("Disk");
        assert_eq!(
            disk.attr("ovf:capacity"),
            Some(expected.to_string().as_str()),
            "capacity for {} GB",
            size_gb
        );
    }
}

#[test]
fn test_olvm_cross_references_resolve_once() {
    let envelope = build_parsed(&create_test_params());
    let file_ids: Vec<&str> = envelope
        .descendants_named("File")
        .iter()
        .filter_map(|f| f.attr("ovf:id"))
        .collect();
    let disk_ids: Vec<&str> = envelope
        .descendants_named("Disk")
        .iter()
        .filter_map(|d| d.attr("ovf:diskId"))
        .collect();

    for disk in envelope.descendants_named("Disk") {
        let file_ref = disk.attr("ovf:fileRef").unwrap();
        assert_eq!(file_ids.iter().filter(|id| **id == file_ref).count(), 1);
    }

    let host_resources = envelope.descendants_named("rasd:HostResource");
    assert_eq!(host_resources.len(), 1);
    for resource in host_resources {
        let disk_id = resource
            .text
            .strip_prefix("ovf:disk/")
            .expect("host resource should reference a disk");
        assert_eq!(disk_ids.iter().filter(|id| **id == disk_id).count(), 1);
    }
}

#[test]
fn test_olvm_virtual_system_properties() {
    let envelope = build_parsed(&create_test_params());
    let vs = envelope.child("VirtualSystem");
    assert_eq!(vs.attr("ovf:id"), Some(FixedIds::nth(3).as_str()));
    assert_eq!(vs.text_of("Name"), "OL8U7_x86_64-olvm-b2");
    assert_eq!(vs.text_of("Description"), "Generated by oracle-linux-image-tools");
    assert_eq!(vs.text_of("Comment"), "");
    assert_eq!(vs.text_of("CreationDate"), "2024/03/07 09:05:02");
    assert_eq!(vs.text_of("ExportDate"), "2024/03/07 09:05:02");
    assert_eq!(vs.text_of("MinAllocatedMem"), "4096");
    assert_eq!(vs.text_of("MaxMemorySizeMb"), "4096");
    assert_eq!(vs.text_of("DefaultDisplayType"), "2");
    assert_eq!(vs.text_of("ResumeBehavior"), "AUTO_RESUME");
    assert_eq!(vs.text_of("ConsoleDisconnectAction"), "LOCK_SCREEN");
    assert!(vs.children_named("VmInit").is_empty());
}

#[test]
fn test_olvm_vm_properties() {
    let envelope = build_parsed(&create_test_params());
    let vs = envelope.child("VirtualSystem");
    assert_eq!(vs.text_of("TemplateId"), "00000000-0000-0000-0000-000000000000");
    assert_eq!(vs.text_of("OriginalTemplateName"), "Blank");
    assert_eq!(vs.text_of("StopTime"), "2024/03/07 09:05:02");
    assert!(vs.children_named("TemplateType").is_empty());
}

#[test]
fn test_olvm_template_properties() {
    let mut params = create_test_params();
    params.template = true;
    let envelope = build_parsed(&params);
    let vs = envelope.child("VirtualSystem");
    let ovf_id = vs.attr("ovf:id").unwrap();

    assert_eq!(vs.text_of("TemplateId"), ovf_id);
    assert_eq!(vs.text_of("BaseTemplateId"), ovf_id);
    assert_eq!(vs.text_of("TemplateType"), "TEMPLATE");
    assert_eq!(vs.text_of("TemplateVersionName"), "base version");
    assert!(vs.children_named("StopTime").is_empty());
    assert!(vs.children_named("OriginalTemplateId").is_empty());
}

#[test]
fn test_olvm_os_section_known_release() {
    let (xml, guest_os) = build(&create_test_params());
    assert_eq!(guest_os, GuestOs::Ol8);

    let envelope = parse(&xml);
    let os = envelope.child("VirtualSystem").child("OperatingSystemSection");
    assert_eq!(os.attr("ovf:id"), Some("1"));
    assert_eq!(os.attr("ovirt:id"), Some("5006"));
    assert_eq!(os.attr("ovf:required"), Some("false"));
    assert_eq!(os.text_of("Info"), "Guest Operating System");
    assert_eq!(os.text_of("Description"), "OL8U7 x64");
    assert!(!xml.contains("ovirt_id"));
}

#[test]
fn test_olvm_os_section_unknown_release() {
    let mut params = create_test_params();
    params.release = "OL99".to_string();
    let (xml, guest_os) = build(&params);
    assert_eq!(guest_os, GuestOs::Unknown("OL99".to_string()));

    let envelope = parse(&xml);
    let os = envelope.child("VirtualSystem").child("OperatingSystemSection");
    assert_eq!(os.attr("ovirt:id"), Some(UNKNOWN_OS_ID.to_string().as_str()));
    assert_eq!(os.text_of("Description"), "OL99U7 x64");
}

#[test]
fn test_olvm_hardware_items() {
    let envelope = build_parsed(&create_test_params());
    let vh = envelope.child("VirtualSystem").child("VirtualHardwareSection");
    assert_eq!(vh.text_of("Info"), "2 CPU, 4096 Memory");
    assert_eq!(
        vh.child("System").text_of("vssd:VirtualSystemType"),
        "ENGINE 4.1.0.0"
    );

    let items = vh.children_named("Item");
    let types: Vec<&str> = items.iter().map(|i| i.text_of("rasd:ResourceType")).collect();
    assert_eq!(types, ["3", "4", "23", "20", "17", "10"]);

    let cpu = items[0];
    assert_eq!(cpu.text_of("rasd:Caption"), "2 virtual cpu");
    assert_eq!(cpu.text_of("rasd:num_of_sockets"), "2");
    assert_eq!(cpu.text_of("rasd:VirtualQuantity"), "2");

    let memory = items[1];
    assert_eq!(memory.text_of("rasd:AllocationUnits"), "MegaBytes");
    assert_eq!(memory.text_of("rasd:VirtualQuantity"), "4096");

    assert_eq!(items[2].text_of("rasd:UsbPolicy"), "DISABLED");
    assert_eq!(items[3].text_of("Device"), "vga");

    let drive = items[4];
    assert_eq!(
        drive.text_of("rasd:HostResource"),
        format!("ovf:disk/{}", FixedIds::nth(2))
    );
    assert_eq!(drive.text_of("rasd:CreationDate"), "2024/03/07 09:05:02");

    let nic = items[5];
    assert_eq!(nic.text_of("rasd:Connection"), "ovirtvm");
    assert_eq!(nic.text_of("rasd:Name"), "nic1");
}

#[test]
fn test_olvm_instance_ids() {
    let envelope = build_parsed(&create_test_params());
    let vh = envelope.child("VirtualSystem").child("VirtualHardwareSection");
    let ids: Vec<String> = vh
        .children_named("Item")
        .iter()
        .map(|i| i.text_of("rasd:InstanceId").to_string())
        .collect();

    assert_eq!(
        ids,
        [
            "1".to_string(),
            "2".to_string(),
            "3".to_string(),
            FixedIds::nth(4),
            FixedIds::nth(1),
            FixedIds::nth(5),
        ]
    );
}

#[test]
fn test_olvm_custom_script_newlines() {
    let script = "#!/bin/sh\necho \"hello\" > /tmp/a\nsystemctl enable --now cockpit.socket";
    let mut params = create_test_params();
    params.script = Some(script.to_string());

    let (xml, _) = build(&params);
    assert_eq!(xml.matches("&#10;").count(), script.matches('\n').count());
    assert!(!xml.contains("&amp;#10;"));

    let envelope = parse(&xml);
    let vs = envelope.child("VirtualSystem");
    assert_eq!(vs.child_names()[0], "VmInit");

    let init = vs.child("VmInit");
    assert_eq!(init.attr("ovf:customScript"), Some(script));
    assert_eq!(init.attr("ovf:authorizedKeys"), Some(""));
    assert_eq!(init.attr("ovf:regenerateKeys"), Some("false"));
    assert_eq!(init.attr("ovf:networks"), Some("[ ]"));
}

#[test]
fn test_olvm_empty_script_omits_vm_init() {
    let mut params = create_test_params();
    params.script = Some(String::new());

    let ovf = build_envelope(&params, &measurement(), &mut FixedIds::new());
    let vs = ovf
        .document
        .find("VirtualSystem")
        .expect("envelope has a VirtualSystem");
    assert_eq!(vs.find_all("VmInit").count(), 0);
    assert_eq!(vs.children()[0].name(), "Name");
    assert_eq!(
        vs.find("Name").and_then(|n| n.text_content()),
        Some("OL8U7_x86_64-olvm-b2")
    );

    let items = vs
        .find("VirtualHardwareSection")
        .map(|hw| hw.find_all("Item").count());
    assert_eq!(items, Some(6));
}

#[test]
fn test_olvm_deterministic_with_fixed_ids() {
    let params = create_test_params();
    assert_eq!(build(&params).0, build(&params).0);
}

#[test]
fn test_olvm_random_runs_isomorphic() {
    let params = create_test_params();
    let first = build_envelope(&params, &measurement(), &mut RandomIds)
        .to_xml()
        .unwrap();
    let second = build_envelope(&params, &measurement(), &mut RandomIds)
        .to_xml()
        .unwrap();

    assert_ne!(first, second, "random identifiers should differ");
    assert_eq!(parse(&first).shape(), parse(&second).shape());
    assert_eq!(mask_volatile(&first), mask_volatile(&second));
}
