//! Building program images.
//!
//! The writer is the encoding half of the wire format, used by the test
//! suites and the CLI's example generator. It always writes every literal
//! kind regardless of which decode features the build enables, so a build
//! can produce images it cannot itself load.

use crate::format::{
    pool_tag, IMAGE_MAGIC, PRODUCER_SIGNATURE, PRODUCER_VERSION, SECTION_DEBUG, SECTION_END,
    SECTION_TREE, TREE_SECTION_REVISION,
};
use crate::unit::CatchHandler;

/// Low-level big-endian emitter over a growable buffer.
pub struct ImageWriter {
    buffer: Vec<u8>,
}

impl ImageWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Current offset (length of the buffer so far).
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the writer and return the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Emit a raw byte.
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer (big-endian).
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 32-bit unsigned integer (big-endian).
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 64-bit float in native byte order, as producers do.
    pub fn emit_f64_native(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_ne_bytes());
    }

    /// Emit raw bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Reserve space for a u32 to be patched later; returns its offset.
    pub fn reserve_u32(&mut self) -> usize {
        let offset = self.offset();
        self.emit_u32(0);
        offset
    }

    /// Patch a previously reserved u32 at `offset`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Emit one literal-pool entry.
    pub fn emit_pool_entry(&mut self, entry: &PoolEntry) {
        match entry {
            PoolEntry::String(text) => {
                self.emit_u8(pool_tag::STRING);
                self.emit_u16(text.len() as u16);
                self.emit_bytes(text.as_bytes());
                self.emit_u8(0);
            }
            PoolEntry::Int32(value) => {
                self.emit_u8(pool_tag::INT32);
                self.emit_u32(*value as u32);
            }
            PoolEntry::Int64(value) => {
                self.emit_u8(pool_tag::INT64);
                self.emit_u32((*value as u64 >> 32) as u32);
                self.emit_u32(*value as u32);
            }
            PoolEntry::Float(value) => {
                self.emit_u8(pool_tag::FLOAT);
                self.emit_f64_native(*value);
            }
        }
    }

    /// Emit one serialized exception-handler record.
    pub fn emit_handler(&mut self, handler: &CatchHandler) {
        self.emit_u8(handler.kind);
        self.emit_u32(handler.begin);
        self.emit_u32(handler.end);
        self.emit_u32(handler.target);
    }
}

impl Default for ImageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// One literal-pool entry for the writer.
///
/// Deliberately independent of [`crate::Literal`]: the writer can emit
/// entries the current build's decoder has disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    /// Length-prefixed string entry.
    String(String),
    /// 32-bit integer entry.
    Int32(i32),
    /// 64-bit integer entry, written as two big-endian halves.
    Int64(i64),
    /// Double-precision float entry, native byte order.
    Float(f64),
}

/// Source description of one executable unit for image assembly.
#[derive(Debug, Clone, Default)]
pub struct UnitDef {
    /// Number of local variables.
    pub nlocals: u16,
    /// Number of virtual registers.
    pub nregs: u16,
    /// Instruction bytes.
    pub instructions: Vec<u8>,
    /// Exception-handler records appended after the instructions.
    pub handlers: Vec<CatchHandler>,
    /// Literal-pool entries, in order.
    pub pool: Vec<PoolEntry>,
    /// Symbol names, in order.
    pub symbols: Vec<String>,
    /// Child units, serialized depth-first after this record.
    pub children: Vec<UnitDef>,
}

/// Assemble a complete image: header, executable-tree section, end marker.
pub fn build_image(root: &UnitDef) -> Vec<u8> {
    build_image_with_debug(root, None)
}

/// Assemble a complete image with an optional opaque debug-section body
/// between the tree section and the end marker.
pub fn build_image_with_debug(root: &UnitDef, debug_body: Option<&[u8]>) -> Vec<u8> {
    let mut writer = ImageWriter::new();

    writer.emit_bytes(&IMAGE_MAGIC);
    writer.emit_bytes(b"00"); // reserved revision bytes
    let image_size_at = writer.reserve_u32();
    writer.emit_bytes(&PRODUCER_SIGNATURE);
    writer.emit_bytes(&PRODUCER_VERSION);

    let tree_start = writer.offset();
    writer.emit_bytes(&SECTION_TREE);
    let tree_size_at = writer.reserve_u32();
    writer.emit_bytes(&TREE_SECTION_REVISION);
    emit_unit_tree(&mut writer, root);
    writer.patch_u32(tree_size_at, (writer.offset() - tree_start) as u32);

    if let Some(body) = debug_body {
        let debug_start = writer.offset();
        writer.emit_bytes(&SECTION_DEBUG);
        let debug_size_at = writer.reserve_u32();
        writer.emit_bytes(body);
        writer.patch_u32(debug_size_at, (writer.offset() - debug_start) as u32);
    }

    writer.emit_bytes(&SECTION_END);
    writer.patch_u32(image_size_at, writer.offset() as u32);
    writer.into_bytes()
}

/// Serialize one unit record followed, depth-first, by each child subtree.
fn emit_unit_tree(writer: &mut ImageWriter, unit: &UnitDef) {
    let record_start = writer.offset();
    let record_size_at = writer.reserve_u32();

    writer.emit_u16(unit.nlocals);
    writer.emit_u16(unit.nregs);
    writer.emit_u16(unit.children.len() as u16);
    writer.emit_u16(unit.handlers.len() as u16);
    writer.emit_u16(unit.instructions.len() as u16);

    writer.emit_bytes(&unit.instructions);
    for handler in &unit.handlers {
        writer.emit_handler(handler);
    }

    writer.emit_u16(unit.pool.len() as u16);
    for entry in &unit.pool {
        writer.emit_pool_entry(entry);
    }

    writer.emit_u16(unit.symbols.len() as u16);
    for name in &unit.symbols {
        writer.emit_u16(name.len() as u16);
        writer.emit_bytes(name.as_bytes());
        writer.emit_u8(0);
    }

    // The record-size field covers this record up to the end of its symbol
    // table; the loader skips it without interpretation.
    writer.patch_u32(record_size_at, (writer.offset() - record_start) as u32);

    for child in &unit.children {
        emit_unit_tree(writer, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HEADER_LEN;

    #[test]
    fn test_header_layout() {
        let image = build_image(&UnitDef::default());

        assert_eq!(&image[..6], b"RITE02");
        assert_eq!(&image[12..16], b"MATZ");
        assert_eq!(&image[16..20], b"0000");
        let declared =
            u32::from_be_bytes([image[8], image[9], image[10], image[11]]) as usize;
        assert_eq!(declared, image.len());
    }

    #[test]
    fn test_sections_in_order() {
        let image = build_image_with_debug(&UnitDef::default(), Some(&[1, 2, 3]));

        assert_eq!(&image[HEADER_LEN..HEADER_LEN + 4], b"IREP");
        assert_eq!(&image[image.len() - 4..], b"END\0");

        let tree_size = u32::from_be_bytes([
            image[HEADER_LEN + 4],
            image[HEADER_LEN + 5],
            image[HEADER_LEN + 6],
            image[HEADER_LEN + 7],
        ]) as usize;
        let debug_start = HEADER_LEN + tree_size;
        assert_eq!(&image[debug_start..debug_start + 4], b"LVAR");
    }

    #[test]
    fn test_pool_entry_encoding() {
        let mut writer = ImageWriter::new();
        writer.emit_pool_entry(&PoolEntry::Int32(-2));

        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], pool_tag::INT32);
        assert_eq!(&bytes[1..], &0xFFFF_FFFEu32.to_be_bytes());
    }

    #[test]
    fn test_int64_entry_high_half_first() {
        let mut writer = ImageWriter::new();
        writer.emit_pool_entry(&PoolEntry::Int64(0x0102_0304_0506_0708));

        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], pool_tag::INT64);
        assert_eq!(&bytes[1..5], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[5..9], &[0x05, 0x06, 0x07, 0x08]);
    }
}
