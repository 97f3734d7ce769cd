//! In-memory package writer shared by the integration tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use byteorder::{BigEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use hpkg_reader::hpkg::format::header::{HPKG_HEADER_SIZE, HPKG_MAGIC, HPKG_VERSION, PackageHeader};
use hpkg_reader::{
    AttributeValueType, DecompressionAlgorithm, Decompressor, Decompressors, Result,
    StandardAttribute, ZlibAlgorithm,
};

pub const TYPE_INT: u8 = 1;
pub const TYPE_UINT: u8 = 2;
pub const TYPE_STRING: u8 = 3;
pub const TYPE_RAW: u8 = 4;

pub const COMPRESSION_NONE: u32 = 0;
pub const COMPRESSION_ZLIB: u32 = 1;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).expect("zlib write");
    encoder.finish().expect("zlib finish")
}

pub fn leb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn tag(type_index: u64, encoding: u8, has_children: bool) -> u64 {
    ((type_index << 3) | (u64::from(encoding) << 1) | u64::from(has_children)) + 1
}

/// Deterministic bytes that zlib cannot shrink.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

/// Repetitive bytes that compress well.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn header_bytes(header: &PackageHeader) -> Vec<u8> {
    let mut out = Vec::with_capacity(HPKG_HEADER_SIZE);
    out.write_u32::<BigEndian>(header.magic).unwrap();
    out.write_u16::<BigEndian>(header.header_size).unwrap();
    out.write_u16::<BigEndian>(header.version).unwrap();
    out.write_u64::<BigEndian>(header.total_size).unwrap();
    out.write_u32::<BigEndian>(header.attributes_compression).unwrap();
    out.write_u32::<BigEndian>(header.attributes_length_compressed).unwrap();
    out.write_u32::<BigEndian>(header.attributes_length_uncompressed).unwrap();
    out.write_u32::<BigEndian>(header.attributes_strings_length).unwrap();
    out.write_u32::<BigEndian>(header.attributes_strings_count).unwrap();
    out.write_u32::<BigEndian>(header.toc_compression).unwrap();
    out.write_u64::<BigEndian>(header.toc_length_compressed).unwrap();
    out.write_u64::<BigEndian>(header.toc_length_uncompressed).unwrap();
    out.write_u64::<BigEndian>(header.toc_attribute_types_length).unwrap();
    out.write_u64::<BigEndian>(header.toc_attribute_types_count).unwrap();
    out.write_u64::<BigEndian>(header.toc_strings_length).unwrap();
    out.write_u64::<BigEndian>(header.toc_strings_count).unwrap();
    assert_eq!(out.len(), HPKG_HEADER_SIZE);
    out
}

/// A consistent header for sections of the given sizes, both uncompressed.
pub fn plain_header(heap: u64, toc: u64, attributes: u32) -> PackageHeader {
    PackageHeader {
        magic: HPKG_MAGIC,
        header_size: HPKG_HEADER_SIZE as u16,
        version: HPKG_VERSION,
        total_size: HPKG_HEADER_SIZE as u64 + heap + toc + u64::from(attributes),
        attributes_compression: COMPRESSION_NONE,
        attributes_length_compressed: attributes,
        attributes_length_uncompressed: attributes,
        toc_compression: COMPRESSION_NONE,
        toc_length_compressed: toc,
        toc_length_uncompressed: toc,
        ..PackageHeader::default()
    }
}

pub fn string_section(strings: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for string in strings {
        out.extend_from_slice(string.as_bytes());
        out.push(0);
    }
    out.push(0);
    out
}

/// Writes the attribute type table, string table and attribute tree of a TOC.
#[derive(Debug, Default, Clone)]
pub struct TocWriter {
    types: Vec<(u8, String)>,
    strings: Vec<String>,
    pub tree: Vec<u8>,
}

impl TocWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_index(&mut self, type_code: u8, name: &str) -> u64 {
        if let Some(index) = self.types.iter().position(|(t, n)| *t == type_code && n == name) {
            return index as u64;
        }
        self.types.push((type_code, name.to_string()));
        (self.types.len() - 1) as u64
    }

    pub fn string_index(&mut self, string: &str) -> u64 {
        if let Some(index) = self.strings.iter().position(|s| s == string) {
            return index as u64;
        }
        self.strings.push(string.to_string());
        (self.strings.len() - 1) as u64
    }

    fn put_tag(&mut self, type_code: u8, name: &str, encoding: u8, has_children: bool) {
        let index = self.type_index(type_code, name);
        leb128(tag(index, encoding, has_children), &mut self.tree);
    }

    pub fn uint(&mut self, name: &str, value: u64, has_children: bool) -> &mut Self {
        let (encoding, width) = match value {
            v if v <= u64::from(u8::MAX) => (0, 1),
            v if v <= u64::from(u16::MAX) => (1, 2),
            v if v <= u64::from(u32::MAX) => (2, 4),
            _ => (3, 8),
        };
        self.put_tag(TYPE_UINT, name, encoding, has_children);
        self.tree.extend_from_slice(&value.to_be_bytes()[8 - width..]);
        self
    }

    pub fn int(&mut self, name: &str, value: i64) -> &mut Self {
        self.put_tag(TYPE_INT, name, 3, false);
        self.tree.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn string(&mut self, name: &str, value: &str, has_children: bool) -> &mut Self {
        self.put_tag(TYPE_STRING, name, 0, has_children);
        self.tree.extend_from_slice(value.as_bytes());
        self.tree.push(0);
        self
    }

    pub fn string_ref(&mut self, name: &str, value: &str, has_children: bool) -> &mut Self {
        let index = self.string_index(value);
        self.put_tag(TYPE_STRING, name, 1, has_children);
        leb128(index, &mut self.tree);
        self
    }

    pub fn raw_inline(&mut self, name: &str, bytes: &[u8], has_children: bool) -> &mut Self {
        self.put_tag(TYPE_RAW, name, 0, has_children);
        leb128(bytes.len() as u64, &mut self.tree);
        self.tree.extend_from_slice(bytes);
        self
    }

    pub fn raw_heap(&mut self, name: &str, offset: u64, size: u64, has_children: bool) -> &mut Self {
        self.put_tag(TYPE_RAW, name, 1, has_children);
        leb128(size, &mut self.tree);
        leb128(offset, &mut self.tree);
        self
    }

    /// Opens a `dir:entry` node; close it with [`end`](Self::end).
    pub fn begin_entry(&mut self, name: &str) -> &mut Self {
        self.string_ref("dir:entry", name, true)
    }

    /// An entry without any attributes.
    pub fn leaf_entry(&mut self, name: &str) -> &mut Self {
        self.string_ref("dir:entry", name, false)
    }

    pub fn end(&mut self) -> &mut Self {
        self.tree.push(0);
        self
    }

    pub fn types_section(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (type_code, name) in &self.types {
            out.push(*type_code);
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out.push(0);
        out
    }

    pub fn strings_section(&self) -> Vec<u8> {
        string_section(&self.strings)
    }

    pub fn type_count(&self) -> u64 {
        self.types.len() as u64
    }

    pub fn string_count(&self) -> u64 {
        self.strings.len() as u64
    }

    /// The attribute tree, closed with the root terminator.
    pub fn finished_tree(&self) -> Vec<u8> {
        let mut tree = self.tree.clone();
        tree.push(0);
        tree
    }
}

/// Assembles complete package files.
#[derive(Debug, Default, Clone)]
pub struct PackageBuilder {
    pub toc: TocWriter,
    pub heap: Vec<u8>,
    pub compress_toc: bool,
    pub compress_attributes: bool,
    pub package_strings: Vec<String>,
    /// Attribute tree of the package attributes section, without the root terminator.
    pub package_tree: Vec<u8>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes to the heap, returning their heap offset.
    pub fn add_heap(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.heap.len() as u64;
        self.heap.extend_from_slice(bytes);
        offset
    }

    /// Package attribute with an inline string value.
    pub fn package_string(
        &mut self,
        attribute: StandardAttribute,
        value: &str,
        has_children: bool,
    ) -> &mut Self {
        leb128(tag(attribute.index() as u64, 0, has_children), &mut self.package_tree);
        self.package_tree.extend_from_slice(value.as_bytes());
        self.package_tree.push(0);
        self
    }

    /// Package attribute referencing the section's string table.
    pub fn package_string_ref(
        &mut self,
        attribute: StandardAttribute,
        value: &str,
        has_children: bool,
    ) -> &mut Self {
        let index = match self.package_strings.iter().position(|s| s == value) {
            Some(index) => index,
            None => {
                self.package_strings.push(value.to_string());
                self.package_strings.len() - 1
            }
        };
        leb128(tag(attribute.index() as u64, 1, has_children), &mut self.package_tree);
        leb128(index as u64, &mut self.package_tree);
        self
    }

    /// Package attribute with a 32-bit unsigned value.
    pub fn package_uint(&mut self, attribute: StandardAttribute, value: u32) -> &mut Self {
        leb128(tag(attribute.index() as u64, 2, false), &mut self.package_tree);
        self.package_tree.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn package_end(&mut self) -> &mut Self {
        self.package_tree.push(0);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let types = self.toc.types_section();
        let strings = self.toc.strings_section();
        let mut toc = types.clone();
        toc.extend_from_slice(&strings);
        toc.extend_from_slice(&self.toc.finished_tree());

        let mut attributes = string_section(&self.package_strings);
        let attribute_strings_length = attributes.len();
        attributes.extend_from_slice(&self.package_tree);
        attributes.push(0);

        let (toc_compression, toc_stored) = compress_if(self.compress_toc, &toc);
        let (attributes_compression, attributes_stored) =
            compress_if(self.compress_attributes, &attributes);

        let header = PackageHeader {
            magic: HPKG_MAGIC,
            header_size: HPKG_HEADER_SIZE as u16,
            version: HPKG_VERSION,
            total_size: (HPKG_HEADER_SIZE + self.heap.len() + toc_stored.len() + attributes_stored.len())
                as u64,
            attributes_compression,
            attributes_length_compressed: attributes_stored.len() as u32,
            attributes_length_uncompressed: attributes.len() as u32,
            attributes_strings_length: attribute_strings_length as u32,
            attributes_strings_count: self.package_strings.len() as u32,
            toc_compression,
            toc_length_compressed: toc_stored.len() as u64,
            toc_length_uncompressed: toc.len() as u64,
            toc_attribute_types_length: types.len() as u64,
            toc_attribute_types_count: self.toc.type_count(),
            toc_strings_length: strings.len() as u64,
            toc_strings_count: self.toc.string_count(),
        };

        let mut out = header_bytes(&header);
        out.extend_from_slice(&self.heap);
        out.extend_from_slice(&toc_stored);
        out.extend_from_slice(&attributes_stored);
        out
    }
}

fn compress_if(compress: bool, data: &[u8]) -> (u32, Vec<u8>) {
    if compress {
        let compressed = zlib(data);
        assert!(
            compressed.len() < data.len(),
            "test section of {} bytes does not compress",
            data.len()
        );
        (COMPRESSION_ZLIB, compressed)
    } else {
        (COMPRESSION_NONE, data.to_vec())
    }
}

/// How [`chunked_payload`] stores each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    /// Compressed where zlib helps, verbatim otherwise.
    Auto,
    Verbatim,
}

/// Builds a block-compressed payload: offset table followed by the chunks.
pub fn chunked_payload(data: &[u8], chunk_size: usize, mode: ChunkMode) -> Vec<u8> {
    let chunks: Vec<Vec<u8>> = data
        .chunks(chunk_size)
        .map(|chunk| {
            let compressed = zlib(chunk);
            if mode == ChunkMode::Auto && compressed.len() < chunk.len() {
                compressed
            } else {
                chunk.to_vec()
            }
        })
        .collect();

    let mut out = Vec::new();
    let mut offset = 0u64;
    for chunk in &chunks[..chunks.len().saturating_sub(1)] {
        offset += chunk.len() as u64;
        out.write_u64::<BigEndian>(offset).unwrap();
    }
    for chunk in &chunks {
        out.extend_from_slice(chunk);
    }
    out
}

/// Zlib that counts how many decompressors it hands out.
#[derive(Debug, Clone, Default)]
pub struct CountingZlib {
    pub created: Rc<Cell<usize>>,
}

impl DecompressionAlgorithm for CountingZlib {
    fn create_decompressor(&self) -> Result<Box<dyn Decompressor>> {
        self.created.set(self.created.get() + 1);
        ZlibAlgorithm.create_decompressor()
    }
}

pub fn counting_decompressors() -> (Decompressors, Rc<Cell<usize>>) {
    let counter = CountingZlib::default();
    let created = counter.created.clone();
    let decompressors = Decompressors::empty()
        .with(hpkg_reader::CompressionType::Zlib, Box::new(counter))
        .expect("register zlib");
    (decompressors, created)
}

pub fn value_type(code: u8) -> AttributeValueType {
    AttributeValueType::try_from(code).expect("valid type code")
}
