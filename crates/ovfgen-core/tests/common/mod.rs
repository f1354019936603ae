//! Shared helpers for envelope integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use ovfgen_core::IdSource;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Deterministic identifiers: sequential UUIDs, a fixed time and MAC suffix.
pub struct FixedIds {
    next: u32,
}

impl FixedIds {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// The UUID returned by the `n`-th call to `uuid()`, counting from 1.
    pub fn nth(n: u32) -> String {
        format!("00000000-0000-4000-8000-{:012x}", n)
    }
}

impl IdSource for FixedIds {
    fn uuid(&mut self) -> String {
        self.next += 1;
        Self::nth(self.next)
    }

    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap()
    }

    fn mac_suffix(&mut self) -> [u8; 3] {
        [0x12, 0xab, 0x05]
    }
}

/// An element parsed back from generated XML.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let name = String::from_utf8(e.name().as_ref().to_vec()).expect("UTF-8 element name");
        let attrs = e
            .attributes()
            .map(|attr| {
                let attr = attr.expect("valid, non-duplicate attribute");
                let key = String::from_utf8(attr.key.as_ref().to_vec()).expect("UTF-8 key");
                let value = attr.unescape_value().expect("valid attribute value");
                (key, value.into_owned())
            })
            .collect();
        Self {
            name,
            attrs,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> &Node {
        self.children
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("<{}> has no <{}> child", self.name, name))
    }

    pub fn children_named(&self, name: &str) -> Vec<&Node> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// Text of the first child named `name`.
    pub fn text_of(&self, name: &str) -> &str {
        &self.child(name).text
    }

    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    pub fn descendants_named(&self, name: &str) -> Vec<&Node> {
        self.descendants()
            .into_iter()
            .filter(|n| n.name == name)
            .collect()
    }

    /// Element names, attributes and text with volatile values masked.
    pub fn shape(&self) -> String {
        let mut out = String::new();
        self.write_shape(0, &mut out);
        out
    }

    fn write_shape(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push_str(&format!(" {}={:?}", key, mask_volatile(value)));
        }
        if !self.text.is_empty() {
            out.push_str(&format!(" text={:?}", mask_volatile(&self.text)));
        }
        out.push('\n');
        for child in &self.children {
            child.write_shape(depth + 1, out);
        }
    }
}

/// Parse a generated document, panicking if it is not well-formed.
pub fn parse(xml: &str) -> Node {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Node {
        name: String::from("#document"),
        attrs: Vec::new(),
        text: String::new(),
        children: Vec::new(),
    }];

    loop {
        match reader.read_event().expect("well-formed XML") {
            Event::Start(e) => stack.push(Node::from_start(&e)),
            Event::Empty(e) => {
                let node = Node::from_start(&e);
                stack.last_mut().unwrap().children.push(node);
            }
            Event::End(_) => {
                let node = stack.pop().unwrap();
                stack.last_mut().expect("end tag without start").children.push(node);
            }
            Event::Text(e) => {
                let text = e.unescape().expect("valid text");
                if !text.trim().is_empty() {
                    stack.last_mut().unwrap().text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    assert_eq!(stack.len(), 1, "unclosed elements at end of document");
    let mut document = stack.pop().unwrap();
    assert_eq!(document.children.len(), 1, "document must have one root");
    document.children.remove(0)
}

/// Replace UUIDs, timestamps and MAC addresses with placeholders.
pub fn mask_volatile(value: &str) -> String {
    const PATTERNS: &[(&str, &str)] = &[
        ("hhhhhhhh-hhhh-hhhh-hhhh-hhhhhhhhhhhh", "<uuid>"),
        ("dddd/dd/dd dd:dd:dd", "<time>"),
        ("dddd-dd-ddTdd:dd:ddZ", "<time>"),
        ("080027hhhhhh", "<mac>"),
    ];

    let chars: Vec<char> = value.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    'scan: while i < chars.len() {
        for (pattern, replacement) in PATTERNS {
            if matches_at(&chars[i..], pattern) {
                out.push_str(replacement);
                i += pattern.len();
                continue 'scan;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn matches_at(chars: &[char], pattern: &str) -> bool {
    if chars.len() < pattern.len() {
        return false;
    }
    pattern.chars().zip(chars).all(|(p, &c)| match p {
        'h' => c.is_ascii_hexdigit() && !c.is_ascii_uppercase(),
        'd' => c.is_ascii_digit(),
        literal => literal == c,
    })
}

/// Write an executable shell script standing in for `qemu-img`.
#[cfg(unix)]
pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A converter that writes the source twice into the destination and logs
/// its arguments next to itself.
#[cfg(unix)]
pub fn doubling_qemu_img(dir: &Path) -> PathBuf {
    write_tool(
        dir,
        "qemu-img",
        "echo \"$@\" > \"$(dirname \"$0\")/args.log\"\ncat \"$4\" \"$4\" > \"$5\"",
    )
}

/// A converter that always fails.
#[cfg(unix)]
pub fn failing_qemu_img(dir: &Path) -> PathBuf {
    write_tool(
        dir,
        "qemu-img",
        "echo \"qemu-img: Could not open '$4'\" >&2\nexit 1",
    )
}

/// Names of the files in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
