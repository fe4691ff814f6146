//! Decoders for Freelancer's on-disk formats
//!
//! Freelancer keeps its world definition in INI-style configuration files,
//! stored either as plain Windows-1252 text or in a compressed binary form
//! called BINI. Localised strings and rich-text infocards live in PE
//! resource DLLs, and binary assets (icons, models) in Universal Tree
//! Format (UTF) containers.
//!
//! Whatever the container, configuration data decodes to the same shape: an
//! ordered list of [`Section`]s, each an ordered multimap of lowercased keys
//! to tuples of typed [`Value`]s. [`load`] and [`parse`] pick the right
//! decoder by sniffing the magic number, so callers never branch on format.

pub mod bini;
pub mod dll;
pub mod ini;
pub mod utf;

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// A single typed value in a configuration entry.
///
/// The textual dialect types tokens by precedence (int, float, boolean
/// literal, string); BINI stores the type tag on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Numeric view of this value. The game writes integer literals where
    /// floats are expected (`spin = 1, 0, 0`), so `Int` coerces.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::Int(i) => Some(i as f32),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view. Integer `0`/`1` also appear as flags in the game files.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            _ => None,
        }
    }
}

/// One `key = values` line of a section. Keys are lowercased on ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub values: Vec<Value>,
}

impl Entry {
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.first().and_then(Value::as_str)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.first().and_then(Value::as_i32)
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.first().and_then(Value::as_f32)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.first().and_then(Value::as_bool)
    }

    /// The first three values as a vector, if all are numeric.
    pub fn as_vec3(&self) -> Option<(f32, f32, f32)> {
        match self.values.as_slice() {
            [x, y, z, ..] => Some((x.as_f32()?, y.as_f32()?, z.as_f32()?)),
            _ => None,
        }
    }
}

/// A named block of entries. Duplicate section names and duplicate keys are
/// both expected; order is preserved exactly as on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Section {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// The first entry for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key.eq_ignore_ascii_case(key))
    }

    /// All entries for `key`, in file order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.key.eq_ignore_ascii_case(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Entry::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Entry::as_i32)
    }

    pub fn float(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(Entry::as_f32)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Entry::as_bool)
    }

    pub fn vec3(&self, key: &str) -> Option<(f32, f32, f32)> {
        self.get(key).and_then(Entry::as_vec3)
    }

    /// Resource id fields are non-negative integers in the files.
    pub fn resource_id(&self, key: &str) -> Option<u32> {
        self.int(key).and_then(|id| u32::try_from(id).ok())
    }
}

/// Read and decode the configuration file at `path`, whichever dialect it
/// uses. The first four bytes decide: `BINI` dispatches to the binary
/// decoder, anything else to the textual parser.
pub fn load(path: &Path) -> Result<Vec<Section>> {
    let data = fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    parse(&data, &path.display().to_string())
}

/// Decode in-memory configuration data. `origin` labels diagnostics.
pub fn parse(data: &[u8], origin: &str) -> Result<Vec<Section>> {
    if data.starts_with(bini::MAGIC) {
        bini::parse(data)
    } else {
        Ok(ini::parse(data, origin))
    }
}

/// Decode a Windows-1252 byte string. Only the 0x80..0xA0 block differs
/// from a straight codepoint mapping.
pub(crate) fn decode_windows_1252(bytes: &[u8]) -> String {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}',
        '\u{017D}', '\u{008F}', '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
    ];
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => HIGH[(b - 0x80) as usize],
            _ => b as char,
        })
        .collect()
}
