use byteorder::{ByteOrder, LittleEndian};

use crate::error::{ensure_len, FormatError};
use crate::UNDEFINED_ADDRESS;

const TREE_SIGNATURE: &[u8; 4] = b"TREE";
const NODE_HEADER_LEN: usize = 24;

/// One chunk of a chunked dataset, located through the version 1 B-tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Element offsets of the chunk origin, one per stored dimension
    /// (including the trailing element-size dimension, always 0).
    pub offsets: Vec<u64>,
    /// Stored byte size of the chunk.
    pub size: u32,
    pub filter_mask: u32,
    /// File address of the chunk bytes.
    pub address: u64,
}

struct NodeHeader {
    node_type: u8,
    level: u8,
    entries_used: usize,
}

fn parse_node_header(file: &[u8], addr: usize) -> Result<NodeHeader, FormatError> {
    ensure_len(file, addr + NODE_HEADER_LEN)?;
    if &file[addr..addr + 4] != TREE_SIGNATURE {
        return Err(FormatError::BadSignature { expected: "TREE" });
    }
    Ok(NodeHeader {
        node_type: file[addr + 4],
        level: file[addr + 5],
        entries_used: LittleEndian::read_u16(&file[addr + 6..]) as usize,
    })
}

/// Walk a group B-tree (node type 0) and collect the addresses of all
/// leaf symbol table nodes, left to right.
pub fn collect_symbol_table_addresses(
    file: &[u8],
    addr: u64,
    out: &mut Vec<u64>,
) -> Result<(), FormatError> {
    let addr = addr as usize;
    let header = parse_node_header(file, addr)?;
    if header.node_type != 0 {
        return Err(FormatError::InvalidMessage {
            what: "B-tree node",
            detail: format!("expected group node, found type {}", header.node_type),
        });
    }
    // Entries alternate key/child starting with key 0; keys are local
    // heap offsets and are not needed to enumerate.
    let mut pos = addr + NODE_HEADER_LEN + 8;
    for _ in 0..header.entries_used {
        ensure_len(file, pos + 16)?;
        let child = LittleEndian::read_u64(&file[pos..]);
        if header.level == 0 {
            out.push(child);
        } else {
            collect_symbol_table_addresses(file, child, out)?;
        }
        pos += 16;
    }
    Ok(())
}

/// Walk a chunk B-tree (node type 1) for a dataset whose layout stores
/// `stored_dims` dimensions (spatial rank plus the element-size one).
pub fn collect_chunk_info(
    file: &[u8],
    addr: u64,
    stored_dims: usize,
    out: &mut Vec<ChunkInfo>,
) -> Result<(), FormatError> {
    if addr == UNDEFINED_ADDRESS {
        // No chunks were ever written.
        return Ok(());
    }
    let addr = addr as usize;
    let header = parse_node_header(file, addr)?;
    if header.node_type != 1 {
        return Err(FormatError::InvalidMessage {
            what: "B-tree node",
            detail: format!("expected chunk node, found type {}", header.node_type),
        });
    }
    let key_len = 8 + stored_dims * 8;
    let mut pos = addr + NODE_HEADER_LEN;
    for _ in 0..header.entries_used {
        ensure_len(file, pos + key_len + 8)?;
        let size = LittleEndian::read_u32(&file[pos..]);
        let filter_mask = LittleEndian::read_u32(&file[pos + 4..]);
        let offsets = (0..stored_dims)
            .map(|i| LittleEndian::read_u64(&file[pos + 8 + i * 8..]))
            .collect();
        let child = LittleEndian::read_u64(&file[pos + key_len..]);
        if header.level == 0 {
            out.push(ChunkInfo { offsets, size, filter_mask, address: child });
        } else {
            collect_chunk_info(file, child, stored_dims, out)?;
        }
        pos += key_len + 8;
    }
    Ok(())
}

/// Serialize a single leaf chunk node holding every chunk of a dataset.
/// `entries` must be keyed in ascending chunk-offset order.
pub fn serialize_chunk_leaf(entries: &[ChunkInfo], stored_dims: usize) -> Vec<u8> {
    let key_len = 8 + stored_dims * 8;
    let mut out = Vec::with_capacity(NODE_HEADER_LEN + entries.len() * (key_len + 8) + key_len);
    out.extend_from_slice(TREE_SIGNATURE);
    out.push(1); // node type: raw data chunks
    out.push(0); // leaf
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes()); // left sibling
    out.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes()); // right sibling
    for entry in entries {
        out.extend_from_slice(&entry.size.to_le_bytes());
        out.extend_from_slice(&entry.filter_mask.to_le_bytes());
        for &o in &entry.offsets {
            out.extend_from_slice(&o.to_le_bytes());
        }
        out.extend_from_slice(&entry.address.to_le_bytes());
    }
    // Final key: one past the last chunk in every dimension.
    if let Some(last) = entries.last() {
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        for &o in &last.offsets {
            out.extend_from_slice(&(o + 1).to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_leaf_round_trip() {
        let entries = vec![
            ChunkInfo { offsets: vec![0, 0, 0, 0], size: 64, filter_mask: 0, address: 1000 },
            ChunkInfo { offsets: vec![1, 0, 0, 0], size: 64, filter_mask: 0, address: 1064 },
        ];
        let bytes = serialize_chunk_leaf(&entries, 4);
        let mut out = Vec::new();
        collect_chunk_info(&bytes, 0, 4, &mut out).unwrap();
        assert_eq!(out, entries);
    }

    #[test]
    fn undefined_tree_address_means_no_chunks() {
        let mut out = Vec::new();
        collect_chunk_info(&[], UNDEFINED_ADDRESS, 4, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_wrong_node_type() {
        let entries =
            vec![ChunkInfo { offsets: vec![0], size: 8, filter_mask: 0, address: 512 }];
        let bytes = serialize_chunk_leaf(&entries, 1);
        match collect_symbol_table_addresses(&bytes, 0, &mut Vec::new()) {
            Err(FormatError::InvalidMessage { what: "B-tree node", .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }
}
