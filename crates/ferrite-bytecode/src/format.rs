//! Wire-format constants for Ferrite program images.
//!
//! All multi-byte integer fields in an image are big-endian. Float literals
//! are the one exception: producers write them with the host representation,
//! so the loader reads them native-endian.

/// Image identifier: format tag plus major/minor revision, bytes 0..6 of the
/// header. Only this revision is accepted.
pub const IMAGE_MAGIC: [u8; 6] = *b"RITE02";

/// Producer signature, bytes 12..16 of the header.
pub const PRODUCER_SIGNATURE: [u8; 4] = *b"MATZ";

/// Producer version string, bytes 16..20 of the header.
pub const PRODUCER_VERSION: [u8; 4] = *b"0000";

/// Revision literal carried by the executable-tree section.
pub const TREE_SECTION_REVISION: [u8; 4] = *b"0300";

/// Total size of the fixed image header.
pub const HEADER_LEN: usize = 20;

/// Section tag introducing the executable-tree section.
pub const SECTION_TREE: [u8; 4] = *b"IREP";

/// Section tag introducing the local-variable-debug section.
pub const SECTION_DEBUG: [u8; 4] = *b"LVAR";

/// Section tag terminating the image. Has no body.
pub const SECTION_END: [u8; 4] = *b"END\0";

/// Size in bytes of one serialized exception-handler record: a 1-byte
/// handler kind followed by begin, end and target instruction offsets.
pub const HANDLER_RECORD_LEN: usize = 13;

// Structural, not data: the record layout below must add up to the wire size.
const _: () = assert!(HANDLER_RECORD_LEN == 1 + 4 + 4 + 4);

/// Literal-pool entry tags.
pub mod pool_tag {
    /// Length-prefixed string payload.
    pub const STRING: u8 = 0;
    /// 32-bit integer payload.
    pub const INT32: u8 = 1;
    /// Length-prefixed string payload the producer considered static.
    /// Decoded identically to [`STRING`].
    pub const STATIC_STRING: u8 = 2;
    /// 64-bit integer payload, two big-endian halves, high half first.
    pub const INT64: u8 = 3;
    /// Double-precision float payload, native byte order.
    pub const FLOAT: u8 = 5;
}
