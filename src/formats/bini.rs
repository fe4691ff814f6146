//! BINI (binary INI) decoder
//!
//! Freelancer compiles its INI files into a compact binary form before
//! shipping. Mods usually replace them with plain text, but a vanilla
//! install is almost entirely BINI.
//!
//! ## Format Overview
//!
//! A BINI file consists of:
//! - 12-byte header: magic `BINI`, version (always 1), offset of the
//!   string pool
//! - A run of sections, each `u16 name offset` + `u16 entry count`
//! - Per entry: `u16 name offset` + `u8 value count`, then 5-byte values
//!   (1 type byte, 4 payload bytes little-endian)
//! - The string pool: null-terminated Windows-1252 strings stretching from
//!   the pool offset to end of file
//!
//! Value types: `1` = int32, `2` = float32, `3` = offset of a string in
//! the pool. All offsets are bounds-checked; a string pointer must land on
//! the start of a pooled string.

use std::collections::HashMap;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{BinaryFormat, BinaryReason, Error, Result};
use crate::formats::{decode_windows_1252, Entry, Section, Value};

/// Magic number identifying a BINI file.
pub const MAGIC: &[u8; 4] = b"BINI";

const HEADER_LEN: usize = 12;
const SUPPORTED_VERSION: u32 = 1;

fn err(offset: u64, reason: BinaryReason) -> Error {
    Error::malformed(BinaryFormat::Bini, offset, reason)
}

/// Check whether `data` begins with the BINI magic number.
pub fn is_bini(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Decode a BINI byte stream into an ordered list of sections.
///
/// Never panics on arbitrary input; malformed data is reported through the
/// error variants described in the module documentation.
pub fn parse(data: &[u8]) -> Result<Vec<Section>> {
    if data.len() < HEADER_LEN {
        return Err(err(0, BinaryReason::Truncated));
    }
    if &data[..4] != MAGIC {
        return Err(err(0, BinaryReason::InvalidMagic));
    }

    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != SUPPORTED_VERSION {
        return Err(err(4, BinaryReason::UnsupportedVersion(version)));
    }

    let pool_offset = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    if pool_offset < HEADER_LEN || pool_offset > data.len() {
        return Err(err(8, BinaryReason::OffsetOutOfBounds));
    }

    let pool = StringPool::build(&data[pool_offset..], pool_offset as u64);

    // the section run occupies everything between the header and the pool
    let mut cursor = Cursor::new(&data[..pool_offset]);
    cursor.set_position(HEADER_LEN as u64);

    let mut sections = Vec::new();
    while (cursor.position() as usize) < pool_offset {
        sections.push(read_section(&mut cursor, &pool)?);
    }
    Ok(sections)
}

fn read_section(cursor: &mut Cursor<&[u8]>, pool: &StringPool) -> Result<Section> {
    let name_offset = read_u16(cursor)?;
    let entry_count = read_u16(cursor)?;

    let mut section = Section::new(pool.lookup(name_offset)?.to_ascii_lowercase());
    for _ in 0..entry_count {
        let key_offset = read_u16(cursor)?;
        let value_count = read_u8(cursor)?;
        let key = pool.lookup(key_offset)?.to_ascii_lowercase();

        let mut values = Vec::with_capacity(value_count as usize);
        for _ in 0..value_count {
            let type_byte = read_u8(cursor)?;
            let at = cursor.position();
            let payload = read_u32(cursor)?;
            values.push(match type_byte {
                1 => Value::Int(payload as i32),
                2 => Value::Float(f32::from_le_bytes(payload.to_le_bytes())),
                3 => Value::Str(pool.lookup(payload as u16)?.to_string()),
                other => return Err(err(at - 1, BinaryReason::UnknownValueType(other))),
            });
        }
        section.entries.push(Entry { key, values });
    }
    Ok(section)
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    let at = cursor.position();
    cursor.read_u8().map_err(|_| err(at, BinaryReason::Truncated))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    let at = cursor.position();
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| err(at, BinaryReason::Truncated))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let at = cursor.position();
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| err(at, BinaryReason::Truncated))
}

/// The decoded string pool: pool-relative offset of each string start to
/// its text. Keying by start offset enforces the invariant that every
/// string reference lands just after a null terminator (or at pool start).
struct StringPool {
    strings: HashMap<u16, String>,
    base: u64,
}

impl StringPool {
    fn build(raw: &[u8], base: u64) -> Self {
        let mut strings = HashMap::new();
        let mut start = 0usize;
        for (i, &b) in raw.iter().enumerate() {
            if b == 0 {
                if let Ok(offset) = u16::try_from(start) {
                    strings.insert(offset, decode_windows_1252(&raw[start..i]));
                }
                start = i + 1;
            }
        }
        // tolerate a final string without a terminator
        if start < raw.len() {
            if let Ok(offset) = u16::try_from(start) {
                strings.insert(offset, decode_windows_1252(&raw[start..]));
            }
        }
        StringPool { strings, base }
    }

    fn lookup(&self, offset: u16) -> Result<&str> {
        self.strings
            .get(&offset)
            .map(String::as_str)
            .ok_or_else(|| err(self.base + offset as u64, BinaryReason::OffsetOutOfBounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a BINI image from a body builder and a string pool.
    fn build(body: &[u8], pool: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        data.extend_from_slice(body);
        data.extend_from_slice(pool);
        data
    }

    fn int_value(v: i32) -> Vec<u8> {
        let mut out = vec![1u8];
        out.extend_from_slice(&v.to_le_bytes());
        out
    }

    #[test]
    fn test_single_section_int_entry() {
        // [Good] with price = 42; pool holds "Good\0price\0"
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes()); // section name offset -> "Good"
        body.extend_from_slice(&1u16.to_le_bytes()); // one entry
        body.extend_from_slice(&5u16.to_le_bytes()); // key offset -> "price"
        body.push(1); // one value
        body.extend_from_slice(&int_value(42));

        let sections = parse(&build(&body, b"Good\0price\0")).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "good");
        assert_eq!(sections[0].entries.len(), 1);
        assert_eq!(sections[0].entries[0].key, "price");
        assert_eq!(sections[0].entries[0].values, vec![Value::Int(42)]);
    }

    #[test]
    fn test_string_and_float_values() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&7u16.to_le_bytes()); // "pos"
        body.push(2);
        body.push(3); // string ref
        body.extend_from_slice(&11u32.to_le_bytes()); // -> "li01"
        body.push(2); // float
        body.extend_from_slice(&1.5f32.to_le_bytes());

        let sections = parse(&build(&body, b"object\0pos\0li01\0")).unwrap();
        assert_eq!(
            sections[0].entries[0].values,
            vec![Value::Str("li01".into()), Value::Float(1.5)]
        );
    }

    #[test]
    fn test_rejects_bad_magic() {
        let data = b"INIB\x01\x00\x00\x00\x0c\x00\x00\x00";
        assert!(matches!(
            parse(data),
            Err(Error::MalformedBinary {
                reason: BinaryReason::InvalidMagic,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut data = build(&[], b"\0");
        data[4] = 2;
        assert!(matches!(
            parse(&data),
            Err(Error::MalformedBinary {
                reason: BinaryReason::UnsupportedVersion(2),
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_pool_offset_beyond_eof() {
        let mut data = build(&[], b"\0");
        data[8..12].copy_from_slice(&0xFFFFu32.to_le_bytes());
        assert!(matches!(
            parse(&data),
            Err(Error::MalformedBinary {
                reason: BinaryReason::OffsetOutOfBounds,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_string_ref_into_middle_of_pool() {
        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_le_bytes()); // points inside "Good"
        body.extend_from_slice(&0u16.to_le_bytes());
        assert!(matches!(
            parse(&build(&body, b"Good\0")),
            Err(Error::MalformedBinary {
                reason: BinaryReason::OffsetOutOfBounds,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_truncated_entry() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes()); // promises an entry that is not there
        assert!(matches!(
            parse(&build(&body, b"x\0")),
            Err(Error::MalformedBinary {
                reason: BinaryReason::Truncated,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_value_type() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.push(1);
        body.push(9); // no such type
        body.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            parse(&build(&body, b"x\0")),
            Err(Error::MalformedBinary {
                reason: BinaryReason::UnknownValueType(9),
                ..
            })
        ));
    }

    #[test]
    fn test_section_order_matches_binary_order() {
        let mut body = Vec::new();
        for offset in [0u16, 2, 4] {
            body.extend_from_slice(&offset.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes());
        }
        let sections = parse(&build(&body, b"b\0a\0c\0")).unwrap();
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
