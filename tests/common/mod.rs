//! Fixtures for building plugin archives in tests

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const ACC_PUBLIC_SUPER: u16 = 0x0021;
pub const ACC_INTERFACE: u16 = 0x0601;

/// Compiled type header for `name` extending `extends` (qualified names)
pub fn class_bytes(name: &str, extends: Option<&str>) -> Vec<u8> {
    class_bytes_with(name, extends, &[], ACC_PUBLIC_SUPER)
}

/// Compiled type header with interfaces and access flags
pub fn class_bytes_with(name: &str, extends: Option<&str>, interfaces: &[&str], access: u16) -> Vec<u8> {
    let mut pool = Vec::new();
    let mut count: u16 = 1;

    let mut class_constant = |qualified: &str| -> u16 {
        let internal = qualified.replace('.', "/");
        pool.push(1u8);
        pool.extend_from_slice(&(internal.len() as u16).to_be_bytes());
        pool.extend_from_slice(internal.as_bytes());
        let utf8 = count;
        pool.push(7u8);
        pool.extend_from_slice(&utf8.to_be_bytes());
        count += 2;
        count - 1
    };

    let this = class_constant(name);
    let sup = extends.map_or(0, &mut class_constant);
    let ifaces: Vec<u16> = interfaces.iter().map(|i| class_constant(*i)).collect();

    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&61u16.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&pool);
    out.extend_from_slice(&access.to_be_bytes());
    out.extend_from_slice(&this.to_be_bytes());
    out.extend_from_slice(&sup.to_be_bytes());
    out.extend_from_slice(&(ifaces.len() as u16).to_be_bytes());
    for i in ifaces {
        out.extend_from_slice(&i.to_be_bytes());
    }
    // fields, methods, attributes
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out
}

/// Builder for a jar archive on disk
pub struct JarBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl JarBuilder {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add a type extending `extends`
    pub fn class(self, name: &str, extends: Option<&str>) -> Self {
        let path = format!("{}.class", name.replace('.', "/"));
        self.entry(&path, class_bytes(name, extends))
    }

    /// Add an arbitrary entry
    pub fn entry(mut self, path: &str, data: Vec<u8>) -> Self {
        self.entries.push((path.to_string(), data));
        self
    }

    /// Add the usual manifest
    pub fn manifest(self) -> Self {
        self.entry("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n".to_vec())
    }

    pub fn write(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);

        for (name, data) in self.entries {
            if name.ends_with('/') {
                zip.add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                    .unwrap();
            } else {
                zip.start_file(name, SimpleFileOptions::default()).unwrap();
                zip.write_all(&data).unwrap();
            }
        }

        zip.finish().unwrap();
        path
    }
}

/// Resolve-by-name helper for result assertions
pub fn names(types: &[plugjar::ResolvedType]) -> Vec<String> {
    types.iter().map(|t| t.name().to_string()).collect()
}
