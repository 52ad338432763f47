//! Program-image loading.
//!
//! A load is one synchronous top-to-bottom pass: validate the fixed header,
//! dispatch over the tagged sections, and materialize the executable tree
//! depth-first. Every decode step returns `Result` and failure
//! short-circuits all enclosing recursive calls; no partial program is ever
//! handed out.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::cursor::{ImageCursor, ReadError};
use crate::format::{
    HANDLER_RECORD_LEN, HEADER_LEN, IMAGE_MAGIC, PRODUCER_SIGNATURE, PRODUCER_VERSION,
    SECTION_DEBUG, SECTION_END, SECTION_TREE, TREE_SECTION_REVISION,
};
use crate::pool::decode_literal;
use crate::unit::ExecutableUnit;

/// Hard bound on executable-tree nesting depth. Child counts come from the
/// image, so recursion must not be allowed to exhaust the thread stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Errors surfaced by [`Program::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// Image preamble failed validation
    #[error("malformed image header")]
    MalformedHeader,

    /// Executable-tree section carries a revision this loader does not speak
    #[error("unsupported executable-tree revision {found:?}")]
    UnsupportedVersion {
        /// The revision literal found in the section header
        found: [u8; 4],
    },

    /// Unrecognized top-level section tag
    #[error("unknown section tag {tag:?} at offset {offset}")]
    UnknownSection {
        /// The 4-byte tag that was not recognized
        tag: [u8; 4],
        /// Image offset of the tag
        offset: usize,
    },

    /// Image ended before any executable-tree section
    #[error("image contains no executable-tree section")]
    MissingTreeSection,

    /// Truncated input or a structurally impossible unit record
    #[error("malformed executable unit: {0}")]
    MalformedUnit(#[from] ReadError),

    /// Executable tree nested deeper than the loader permits
    #[error("executable tree nested deeper than {MAX_NESTING_DEPTH} levels")]
    NestingTooDeep,

    /// Unrecognized literal-pool entry tag
    #[error("unknown literal tag {tag} at offset {offset}")]
    UnknownLiteralTag {
        /// The tag byte that was not recognized
        tag: u8,
        /// Image offset of the tag byte
        offset: usize,
    },

    /// Literal kind whose support is disabled in this build
    #[error("literal tag {tag} is not supported by this build")]
    UnsupportedLiteral {
        /// The tag byte of the unsupported literal
        tag: u8,
    },

    /// Storage reservation for the tree failed
    #[error("out of memory while materializing the executable tree")]
    OutOfMemory,
}

impl From<TryReserveError> for LoadError {
    fn from(_: TryReserveError) -> Self {
        LoadError::OutOfMemory
    }
}

/// A fully decoded program image.
///
/// The executable tree aliases `image` for instruction bytes and symbol
/// names, so the buffer must outlive the program.
#[derive(Debug)]
pub struct Program<'image> {
    /// Root of the executable tree.
    pub root: ExecutableUnit<'image>,
    /// The raw image the tree was decoded from.
    pub image: &'image [u8],
}

impl<'image> Program<'image> {
    /// Decode a complete program image.
    pub fn load(image: &'image [u8]) -> Result<Self, LoadError> {
        Loader::new(image).run()
    }
}

/// One parsing session over an image. Does not outlive the load call.
struct Loader<'image> {
    cursor: ImageCursor<'image>,
    image: &'image [u8],
}

impl<'image> Loader<'image> {
    fn new(image: &'image [u8]) -> Self {
        Self {
            cursor: ImageCursor::new(image),
            image,
        }
    }

    fn run(mut self) -> Result<Program<'image>, LoadError> {
        self.validate_header()?;

        let mut root = None;
        loop {
            let section_start = self.cursor.position();
            let tag = self.cursor.read_tag()?;
            match tag {
                SECTION_TREE => root = Some(self.load_tree_section(section_start)?),
                SECTION_DEBUG => self.skip_debug_section(section_start)?,
                SECTION_END => break,
                _ => {
                    return Err(LoadError::UnknownSection {
                        tag,
                        offset: section_start,
                    })
                }
            }
        }

        let root = root.ok_or(LoadError::MissingTreeSection)?;
        Ok(Program {
            root,
            image: self.image,
        })
    }

    /// Check the fixed 20-byte preamble without consuming anything on
    /// failure.
    fn validate_header(&mut self) -> Result<(), LoadError> {
        let header = self
            .image
            .get(..HEADER_LEN)
            .ok_or(LoadError::MalformedHeader)?;

        if header[..6] != IMAGE_MAGIC {
            return Err(LoadError::MalformedHeader);
        }
        // header[6..8]: reserved revision bytes, not interpreted.
        let declared_size =
            u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
        if declared_size != self.image.len() {
            return Err(LoadError::MalformedHeader);
        }
        if header[12..16] != PRODUCER_SIGNATURE {
            return Err(LoadError::MalformedHeader);
        }
        if header[16..20] != PRODUCER_VERSION {
            return Err(LoadError::MalformedHeader);
        }

        self.cursor.skip(HEADER_LEN)?;
        Ok(())
    }

    /// Executable-tree section: u32 size, 4-byte revision literal, then the
    /// serialized tree. The declared size is authoritative for where the
    /// section ends, so trailing declared padding is skipped.
    fn load_tree_section(
        &mut self,
        section_start: usize,
    ) -> Result<ExecutableUnit<'image>, LoadError> {
        let size = self.cursor.read_u32()? as usize;
        let revision = self.cursor.read_tag()?;
        if revision != TREE_SECTION_REVISION {
            return Err(LoadError::UnsupportedVersion { found: revision });
        }

        let root = self.load_unit_tree(0)?;
        self.jump_past_section(section_start, size)?;
        Ok(root)
    }

    /// Local-variable-debug section: consumed solely to keep the cursor
    /// aligned for the next section. No structural parsing.
    fn skip_debug_section(&mut self, section_start: usize) -> Result<(), LoadError> {
        let size = self.cursor.read_u32()? as usize;
        self.jump_past_section(section_start, size)
    }

    fn jump_past_section(&mut self, section_start: usize, size: usize) -> Result<(), LoadError> {
        let end = section_start
            .checked_add(size)
            .ok_or(ReadError::UnexpectedEnd(section_start))?;
        self.cursor.jump_to(end)?;
        Ok(())
    }

    /// Materialize one unit and, depth-first, the subtree of each declared
    /// child in order. After a unit's subtree is consumed the cursor points
    /// exactly one byte past its serialized form.
    fn load_unit_tree(&mut self, depth: usize) -> Result<ExecutableUnit<'image>, LoadError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(LoadError::NestingTooDeep);
        }

        let (mut unit, nchildren) = self.load_unit()?;
        unit.children.try_reserve_exact(nchildren as usize)?;
        for _ in 0..nchildren {
            unit.children.push(self.load_unit_tree(depth + 1)?);
        }
        Ok(unit)
    }

    /// Decode a single executable-unit record without recursing into
    /// children. Returns the unit and its declared child count.
    fn load_unit(&mut self) -> Result<(ExecutableUnit<'image>, u16), LoadError> {
        // Record-size field: present for compatibility, not interpreted.
        self.cursor.skip(4)?;

        let nlocals = self.cursor.read_u16()?;
        let nregs = self.cursor.read_u16()?;
        let nchildren = self.cursor.read_u16()?;
        let nhandlers = self.cursor.read_u16()?;
        let ilen = self.cursor.read_u16()?;

        // Instruction bytes plus the fixed-size handler records stay in the
        // image; the unit aliases them.
        let code_len = ilen as usize + nhandlers as usize * HANDLER_RECORD_LEN;
        let code = self.cursor.take(code_len)?;

        let plen = self.cursor.read_u16()?;
        let mut pool = Vec::new();
        pool.try_reserve_exact(plen as usize)?;
        for _ in 0..plen {
            pool.push(decode_literal(&mut self.cursor)?);
        }

        // Symbol names are skipped, not interpreted: the unit keeps a raw
        // slice over the whole table for lazy run-time resolution.
        let sym_start = self.cursor.position();
        let nsyms = self.cursor.read_u16()?;
        for _ in 0..nsyms {
            let len = self.cursor.read_u16()? as usize;
            self.cursor.skip(len + 1)?;
        }
        let symbol_table = &self.image[sym_start..self.cursor.position()];

        let unit = ExecutableUnit {
            nlocals,
            nregs,
            nhandlers,
            ilen,
            code,
            pool,
            symbol_table,
            children: Vec::new(),
        };
        Ok((unit, nchildren))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One serialized unit record with two instruction bytes, no handlers,
    /// an empty pool and an empty symbol table.
    fn unit_record(nlocals: u16, nchildren: u16) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&18u32.to_be_bytes()); // record size, skipped
        for count in [nlocals, 7, nchildren, 0, 2] {
            bytes.extend_from_slice(&count.to_be_bytes());
        }
        bytes.extend_from_slice(&[0xAB, 0xCD]); // instructions
        bytes.extend_from_slice(&0u16.to_be_bytes()); // pool count
        bytes.extend_from_slice(&0u16.to_be_bytes()); // symbol count
        bytes
    }

    #[test]
    fn test_unit_record_fields() {
        let record = unit_record(3, 0);
        let mut loader = Loader::new(&record);

        let (unit, nchildren) = loader.load_unit().unwrap();

        assert_eq!(unit.nlocals, 3);
        assert_eq!(unit.nregs, 7);
        assert_eq!(nchildren, 0);
        assert_eq!(unit.ilen, 2);
        assert_eq!(unit.code, &[0xAB, 0xCD]);
        assert_eq!(unit.symbol_table, &[0, 0]);
        assert_eq!(loader.cursor.position(), record.len());
    }

    #[test]
    fn test_cursor_lands_one_past_subtree() {
        let mut bytes = unit_record(1, 1);
        bytes.extend_from_slice(&unit_record(2, 0));
        let mut loader = Loader::new(&bytes);

        let unit = loader.load_unit_tree(0).unwrap();

        assert_eq!(unit.children.len(), 1);
        assert_eq!(unit.children[0].nlocals, 2);
        assert_eq!(loader.cursor.position(), bytes.len());
    }

    #[test]
    fn test_impossible_instruction_count_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        for count in [0u16, 0, 0, 0, 0xFFFF] {
            bytes.extend_from_slice(&count.to_be_bytes());
        }
        let mut loader = Loader::new(&bytes);

        assert!(matches!(
            loader.load_unit(),
            Err(LoadError::MalformedUnit(_))
        ));
    }

    #[test]
    fn test_missing_child_record_rejected() {
        // Declares one child but the buffer ends after the parent record.
        let bytes = unit_record(1, 1);
        let mut loader = Loader::new(&bytes);

        assert!(matches!(
            loader.load_unit_tree(0),
            Err(LoadError::MalformedUnit(_))
        ));
    }
}
