//! UTF (Universal Tree Format) decoder
//!
//! UTF is Digital Anvil's hierarchical container for binary assets:
//! textures, icons, sounds and models. A file is a tree of named nodes;
//! interior nodes hold children, leaves hold byte blobs. fldata only needs
//! it to pull item icons out of `.3db` files.
//!
//! ## Format Overview
//!
//! - 56-byte header: magic `"UTF "`, version, tree offset/size, entry
//!   size, name pool offset/sizes, data block offset, file times
//! - Node table: 44-byte entries `(peer offset, name offset, flags, shared
//!   attributes, child-or-data offset, allocated/used/uncompressed sizes,
//!   three timestamps)`. Flag `0x80` marks an interior node whose offset
//!   points at its first child (relative to the tree); flag `0x10` marks a
//!   leaf whose offset points at its data (relative to the data block).
//! - Name pool: null-terminated strings referenced by pool offset
//!
//! Lookup is by `/`-delimited path, case-insensitive, leading slash
//! optional; the root node is unnamed. The node walk visits each node at
//! most once, so a corrupted sibling or child chain is rejected instead of
//! looping.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::error::{BinaryFormat, BinaryReason, Error, Result};
use crate::formats::decode_windows_1252;

/// Magic number identifying a UTF file.
pub const MAGIC: &[u8; 4] = b"UTF ";

const HEADER_LEN: usize = 56;
const NODE_LEN: usize = 44;

const FLAG_INTERIOR: u32 = 0x80;
const FLAG_LEAF: u32 = 0x10;

fn err(offset: u64, reason: BinaryReason) -> Error {
    Error::malformed(BinaryFormat::Utf, offset, reason)
}

#[derive(Debug, Clone, Copy)]
struct Node {
    peer_offset: u32,
    name_offset: u32,
    flags: u32,
    child_or_data: u32,
    used_size: u32,
}

/// A read-only UTF tree.
///
/// Parsing materialises and validates the node table; the path index is
/// built once on the first [`find`](UtfFile::find).
pub struct UtfFile {
    data: Vec<u8>,
    nodes: Vec<Node>,
    names: HashMap<u32, String>,
    entry_size: usize,
    data_start: usize,
    index: OnceCell<HashMap<String, (usize, usize)>>,
}

impl UtfFile {
    /// Check whether `data` begins with the UTF magic number.
    pub fn is_utf(data: &[u8]) -> bool {
        data.starts_with(MAGIC)
    }

    /// Parse a UTF image. The whole node table is decoded and its
    /// child/sibling graph validated up front; data blobs stay in place
    /// until looked up.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(err(0, BinaryReason::Truncated));
        }
        if &data[..4] != MAGIC {
            return Err(err(0, BinaryReason::InvalidMagic));
        }

        let word = |at: usize| u32::from_le_bytes(data[at..at + 4].try_into().unwrap());
        let tree_offset = word(8) as usize;
        let tree_size = word(12) as usize;
        let entry_size = word(20) as usize;
        let names_offset = word(24) as usize;
        let names_used = word(32) as usize;
        let data_start = word(36) as usize;

        if entry_size < NODE_LEN {
            return Err(err(20, BinaryReason::Truncated));
        }
        let tree = data
            .get(tree_offset..tree_offset.saturating_add(tree_size))
            .ok_or_else(|| err(8, BinaryReason::OffsetOutOfBounds))?;
        let name_pool = data
            .get(names_offset..names_offset.saturating_add(names_used))
            .ok_or_else(|| err(24, BinaryReason::OffsetOutOfBounds))?;

        let mut nodes = Vec::with_capacity(tree_size / entry_size);
        for chunk in tree.chunks_exact(entry_size) {
            let field = |at: usize| u32::from_le_bytes(chunk[at..at + 4].try_into().unwrap());
            nodes.push(Node {
                peer_offset: field(0),
                name_offset: field(4),
                flags: field(8),
                child_or_data: field(16),
                used_size: field(24),
            });
        }

        let mut names = HashMap::new();
        let mut start = 0usize;
        for (i, &b) in name_pool.iter().enumerate() {
            if b == 0 {
                names.insert(start as u32, decode_windows_1252(&name_pool[start..i]));
                start = i + 1;
            }
        }

        let utf = UtfFile {
            data: data.to_vec(),
            nodes,
            names,
            entry_size,
            data_start,
            index: OnceCell::new(),
        };
        utf.validate()?;
        Ok(utf)
    }

    /// Look up the blob stored at `path` (`/`-delimited names from the
    /// unnamed root; case-insensitive; leading slash optional).
    pub fn find(&self, path: &str) -> Option<&[u8]> {
        let index = self.index.get_or_init(|| self.build_index());
        let &(start, len) = index.get(&normalize(path))?;
        self.data.get(start..start + len)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// All leaf paths, in tree order.
    pub fn paths(&self) -> Vec<String> {
        let index = self.index.get_or_init(|| self.build_index());
        let mut paths: Vec<String> = index.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn node_at(&self, tree_relative: u32) -> Option<(usize, &Node)> {
        let offset = tree_relative as usize;
        if offset % self.entry_size != 0 {
            return None;
        }
        let idx = offset / self.entry_size;
        self.nodes.get(idx).map(|n| (idx, n))
    }

    /// Walk the whole tree once, rejecting out-of-range offsets and any
    /// sibling/child chain that revisits a node.
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        visited[0] = true;
        while let Some(at) = stack.pop() {
            let node = &self.nodes[at];
            for link in [
                (node.flags & FLAG_INTERIOR != 0).then_some(node.child_or_data),
                (node.peer_offset != 0 && at != 0).then_some(node.peer_offset),
            ]
            .into_iter()
            .flatten()
            {
                let (idx, _) = self
                    .node_at(link)
                    .ok_or_else(|| err(link as u64, BinaryReason::OffsetOutOfBounds))?;
                if visited[idx] {
                    return Err(err(link as u64, BinaryReason::CycleInNodeTable));
                }
                visited[idx] = true;
                stack.push(idx);
            }
        }
        Ok(())
    }

    fn build_index(&self) -> HashMap<String, (usize, usize)> {
        let mut index = HashMap::new();
        if self.nodes.is_empty() {
            return index;
        }
        // the graph is validated acyclic and in-bounds at parse time
        let mut stack: Vec<(usize, String)> = vec![(0, String::new())];
        while let Some((at, prefix)) = stack.pop() {
            let node = &self.nodes[at];
            // the root's name ("\") is not part of any path
            let path = if at == 0 {
                String::new()
            } else {
                let name = self
                    .names
                    .get(&node.name_offset)
                    .map(String::as_str)
                    .unwrap_or("");
                if prefix.is_empty() {
                    name.to_ascii_lowercase()
                } else {
                    format!("{prefix}/{}", name.to_ascii_lowercase())
                }
            };

            if node.peer_offset != 0 && at != 0 {
                if let Some((idx, _)) = self.node_at(node.peer_offset) {
                    stack.push((idx, prefix.clone()));
                }
            }
            if node.flags & FLAG_INTERIOR != 0 {
                if let Some((idx, _)) = self.node_at(node.child_or_data) {
                    stack.push((idx, path));
                }
            } else if node.flags & FLAG_LEAF != 0 {
                index.insert(
                    path,
                    (
                        self.data_start + node.child_or_data as usize,
                        node.used_size as usize,
                    ),
                );
            }
        }
        index
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches('/')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a UTF image from 44-byte node tuples, a name pool and a
    /// data block.
    fn build(nodes: &[(u32, u32, u32, u32, u32)], names: &[u8], blob: &[u8]) -> Vec<u8> {
        let tree_size = (nodes.len() * NODE_LEN) as u32;
        let names_offset = HEADER_LEN as u32 + tree_size;
        let data_start = names_offset + names.len() as u32;

        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&0x101u32.to_le_bytes()); // version
        data.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes()); // tree offset
        data.extend_from_slice(&tree_size.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&(NODE_LEN as u32).to_le_bytes()); // entry size
        data.extend_from_slice(&names_offset.to_le_bytes());
        data.extend_from_slice(&(names.len() as u32).to_le_bytes()); // allocated
        data.extend_from_slice(&(names.len() as u32).to_le_bytes()); // used
        data.extend_from_slice(&data_start.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]); // reserved + file times

        for &(peer, name, flags, child_or_data, used) in nodes {
            data.extend_from_slice(&peer.to_le_bytes());
            data.extend_from_slice(&name.to_le_bytes());
            data.extend_from_slice(&flags.to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes()); // shared attributes
            data.extend_from_slice(&child_or_data.to_le_bytes());
            data.extend_from_slice(&used.to_le_bytes()); // allocated
            data.extend_from_slice(&used.to_le_bytes()); // used
            data.extend_from_slice(&used.to_le_bytes()); // uncompressed
            data.extend_from_slice(&[0u8; 12]); // timestamps
        }
        data.extend_from_slice(names);
        data.extend_from_slice(blob);
        data
    }

    #[test]
    fn test_find_nested_leaf() {
        // root -> "icon" -> "MIP0" = b"TGA!"
        let names = b"\\\0icon\0MIP0\0";
        let nodes = [
            (0, 0, FLAG_INTERIOR, NODE_LEN as u32, 0),     // root, child at node 1
            (0, 2, FLAG_INTERIOR, 2 * NODE_LEN as u32, 0), // "icon", child at node 2
            (0, 7, FLAG_LEAF, 0, 4),                       // "MIP0" -> blob offset 0
        ];
        let utf = UtfFile::parse(&build(&nodes, names, b"TGA!")).unwrap();
        assert_eq!(utf.find("icon/MIP0"), Some(b"TGA!".as_slice()));
        assert_eq!(utf.find("/Icon/mip0"), Some(b"TGA!".as_slice()));
        assert_eq!(utf.find("icon\\MIP0"), Some(b"TGA!".as_slice()));
        assert!(utf.find("icon").is_none());
        assert_eq!(utf.paths(), vec!["icon/mip0".to_string()]);
    }

    #[test]
    fn test_sibling_chain() {
        let names = b"\\\0a\0b\0";
        let nodes = [
            (0, 0, FLAG_INTERIOR, NODE_LEN as u32, 0),
            (2 * NODE_LEN as u32, 2, FLAG_LEAF, 0, 1), // "a", peer -> "b"
            (0, 4, FLAG_LEAF, 1, 1),                   // "b"
        ];
        let utf = UtfFile::parse(&build(&nodes, names, b"xy")).unwrap();
        assert_eq!(utf.find("a"), Some(b"x".as_slice()));
        assert_eq!(utf.find("b"), Some(b"y".as_slice()));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut data = build(&[(0, 0, FLAG_INTERIOR, 0, 0)], b"\\\0", b"");
        data[0] = b'X';
        assert!(matches!(
            UtfFile::parse(&data),
            Err(Error::MalformedBinary {
                reason: BinaryReason::InvalidMagic,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_cycle_in_node_table() {
        // root's child points back at root
        let names = b"\\\0";
        let nodes = [(0, 0, FLAG_INTERIOR, 0, 0)];
        assert!(matches!(
            UtfFile::parse(&build(&nodes, names, b"")),
            Err(Error::MalformedBinary {
                reason: BinaryReason::CycleInNodeTable,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_child_offset_out_of_bounds() {
        let names = b"\\\0";
        let nodes = [(0, 0, FLAG_INTERIOR, 40 * NODE_LEN as u32, 0)];
        assert!(matches!(
            UtfFile::parse(&build(&nodes, names, b"")),
            Err(Error::MalformedBinary {
                reason: BinaryReason::OffsetOutOfBounds,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_truncated_header() {
        assert!(matches!(
            UtfFile::parse(b"UTF \x01\x01"),
            Err(Error::MalformedBinary {
                reason: BinaryReason::Truncated,
                ..
            })
        ));
    }
}
