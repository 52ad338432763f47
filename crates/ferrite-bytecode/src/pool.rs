//! Literal-pool decoding.
//!
//! Each executable unit carries a pool of constant values referenced by its
//! instructions via index. Pool entries are tagged unions on the wire; which
//! tags this build can materialize is fixed at compile time by the `string`,
//! `float` and `int64` features. A tag whose feature is disabled still
//! consumes its full payload so the cursor stays aligned for the entries that
//! follow, then fails with [`LoadError::UnsupportedLiteral`].

use serde::Serialize;

use crate::cursor::ImageCursor;
use crate::format::pool_tag;
use crate::load::LoadError;

#[cfg(not(feature = "string"))]
use crate::cursor::ReadError;

/// Integer width of pool literals in this build.
#[cfg(feature = "int64")]
pub type Int = i64;

/// Integer width of pool literals in this build.
#[cfg(not(feature = "int64"))]
pub type Int = i32;

/// One decoded literal-pool object.
///
/// Created once during pool decode, never mutated, dropped with its owning
/// executable unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// String copied out of the image into owned storage.
    #[cfg(feature = "string")]
    String(String),
    /// Integer literal, sign-extended to the build's literal width.
    Integer(Int),
    /// Double-precision float literal.
    #[cfg(feature = "float")]
    Float(f64),
}

impl Literal {
    /// The string payload, if this literal is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            #[cfg(feature = "string")]
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this literal is an integer.
    pub fn as_int(&self) -> Option<Int> {
        #[allow(unreachable_patterns)]
        match self {
            Literal::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The float payload, if this literal is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            #[cfg(feature = "float")]
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Decode exactly one pool entry at the cursor.
pub(crate) fn decode_literal(cursor: &mut ImageCursor<'_>) -> Result<Literal, LoadError> {
    let offset = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        pool_tag::STRING | pool_tag::STATIC_STRING => decode_string(cursor, tag),
        pool_tag::INT32 => {
            let value = cursor.read_u32()?;
            Ok(Literal::Integer(value as i32 as Int))
        }
        pool_tag::INT64 => decode_int64(cursor),
        pool_tag::FLOAT => decode_float(cursor),
        _ => Err(LoadError::UnknownLiteralTag { tag, offset }),
    }
}

/// String payload: u16 length, `length` data bytes, one terminator byte.
#[cfg(feature = "string")]
fn decode_string(cursor: &mut ImageCursor<'_>, _tag: u8) -> Result<Literal, LoadError> {
    let len = cursor.read_u16()? as usize;
    let offset = cursor.position();
    let bytes = cursor.take(len)?;
    cursor.skip(1)?;

    let text = std::str::from_utf8(bytes)
        .map_err(|_| crate::cursor::ReadError::InvalidUtf8(offset))?;
    let mut owned = String::new();
    owned.try_reserve_exact(text.len())?;
    owned.push_str(text);
    Ok(Literal::String(owned))
}

#[cfg(not(feature = "string"))]
fn decode_string(cursor: &mut ImageCursor<'_>, tag: u8) -> Result<Literal, LoadError> {
    let len = cursor.read_u16()? as usize;
    let skipped = len
        .checked_add(1)
        .ok_or(ReadError::UnexpectedEnd(cursor.position()))?;
    cursor.skip(skipped)?;
    Err(LoadError::UnsupportedLiteral { tag })
}

/// 64-bit payload: two big-endian u32 halves, high half first.
#[cfg(feature = "int64")]
fn decode_int64(cursor: &mut ImageCursor<'_>) -> Result<Literal, LoadError> {
    let high = cursor.read_u32()? as u64;
    let low = cursor.read_u32()? as u64;
    Ok(Literal::Integer(((high << 32) | low) as i64))
}

#[cfg(not(feature = "int64"))]
fn decode_int64(cursor: &mut ImageCursor<'_>) -> Result<Literal, LoadError> {
    cursor.skip(8)?;
    Err(LoadError::UnsupportedLiteral {
        tag: pool_tag::INT64,
    })
}

#[cfg(feature = "float")]
fn decode_float(cursor: &mut ImageCursor<'_>) -> Result<Literal, LoadError> {
    Ok(Literal::Float(cursor.read_f64_native()?))
}

#[cfg(not(feature = "float"))]
fn decode_float(cursor: &mut ImageCursor<'_>) -> Result<Literal, LoadError> {
    cursor.skip(8)?;
    Err(LoadError::UnsupportedLiteral {
        tag: pool_tag::FLOAT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (Result<Literal, LoadError>, usize) {
        let mut cursor = ImageCursor::new(bytes);
        let result = decode_literal(&mut cursor);
        (result, cursor.position())
    }

    #[test]
    fn test_int32_entry() {
        let mut bytes = vec![pool_tag::INT32];
        bytes.extend_from_slice(&0x1234_5678u32.to_be_bytes());

        let (result, consumed) = decode(&bytes);
        assert_eq!(result.unwrap(), Literal::Integer(0x1234_5678));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_int32_sign_extends() {
        let mut bytes = vec![pool_tag::INT32];
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());

        let (result, _) = decode(&bytes);
        assert_eq!(result.unwrap().as_int(), Some(-1 as Int));
    }

    #[cfg(feature = "string")]
    #[test]
    fn test_string_entry_copies_payload() {
        let mut bytes = vec![pool_tag::STRING];
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(b"hi\0");

        let (result, consumed) = decode(&bytes);
        assert_eq!(result.unwrap(), Literal::String("hi".to_string()));
        assert_eq!(consumed, 6);
    }

    #[cfg(feature = "string")]
    #[test]
    fn test_static_string_entry_decodes_like_string() {
        let mut bytes = vec![pool_tag::STATIC_STRING];
        bytes.extend_from_slice(&5u16.to_be_bytes());
        bytes.extend_from_slice(b"hello\0");

        let (result, _) = decode(&bytes);
        assert_eq!(result.unwrap().as_str(), Some("hello"));
    }

    #[cfg(feature = "string")]
    #[test]
    fn test_string_entry_rejects_bad_utf8() {
        let mut bytes = vec![pool_tag::STRING];
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&[0xFF, 0x00]);

        let (result, _) = decode(&bytes);
        assert!(matches!(result, Err(LoadError::MalformedUnit(_))));
    }

    #[cfg(feature = "float")]
    #[test]
    fn test_float_entry() {
        let mut bytes = vec![pool_tag::FLOAT];
        bytes.extend_from_slice(&3.14159f64.to_ne_bytes());

        let (result, consumed) = decode(&bytes);
        assert_eq!(result.unwrap(), Literal::Float(3.14159));
        assert_eq!(consumed, 9);
    }

    #[cfg(feature = "int64")]
    #[test]
    fn test_int64_entry_composes_halves() {
        let mut bytes = vec![pool_tag::INT64];
        bytes.extend_from_slice(&0x0000_0001u32.to_be_bytes());
        bytes.extend_from_slice(&0x0000_0002u32.to_be_bytes());

        let (result, consumed) = decode(&bytes);
        assert_eq!(result.unwrap(), Literal::Integer(0x1_0000_0002));
        assert_eq!(consumed, 9);
    }

    #[cfg(not(feature = "int64"))]
    #[test]
    fn test_int64_entry_consumes_payload_and_fails() {
        let mut bytes = vec![pool_tag::INT64];
        bytes.extend_from_slice(&[0u8; 8]);

        let (result, consumed) = decode(&bytes);
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedLiteral {
                tag: pool_tag::INT64
            })
        ));
        // The cursor must stay aligned for the next entry.
        assert_eq!(consumed, 9);
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = [99u8, 0, 0];
        let (result, _) = decode(&bytes);
        assert!(matches!(
            result,
            Err(LoadError::UnknownLiteralTag { tag: 99, offset: 0 })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = [pool_tag::INT32, 0x12, 0x34];
        let (result, _) = decode(&bytes);
        assert!(matches!(result, Err(LoadError::MalformedUnit(_))));
    }
}
