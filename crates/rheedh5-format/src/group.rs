//! Old-style (version 1) group storage: symbol table message, local
//! heap for link names, and SNOD leaf nodes reached through a B-tree.

use byteorder::{ByteOrder, LittleEndian};

use crate::btree_v1::collect_symbol_table_addresses;
use crate::error::{ensure_len, FormatError};

const HEAP_SIGNATURE: &[u8; 4] = b"HEAP";
const SNOD_SIGNATURE: &[u8; 4] = b"SNOD";

/// Symbol Table message body: the group's B-tree and name heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTableMessage {
    pub btree_address: u64,
    pub heap_address: u64,
}

impl SymbolTableMessage {
    pub fn parse(data: &[u8]) -> Result<SymbolTableMessage, FormatError> {
        ensure_len(data, 16)?;
        Ok(SymbolTableMessage {
            btree_address: LittleEndian::read_u64(data),
            heap_address: LittleEndian::read_u64(&data[8..]),
        })
    }
}

/// Local heap holding the NUL-terminated link names of a v1 group.
#[derive(Debug, Clone, Copy)]
pub struct LocalHeap {
    pub data_address: u64,
    pub data_size: u64,
}

impl LocalHeap {
    pub fn parse(file: &[u8], addr: u64) -> Result<LocalHeap, FormatError> {
        let addr = addr as usize;
        ensure_len(file, addr + 32)?;
        if &file[addr..addr + 4] != HEAP_SIGNATURE {
            return Err(FormatError::BadSignature { expected: "HEAP" });
        }
        if file[addr + 4] != 0 {
            return Err(FormatError::UnsupportedVersion {
                what: "local heap",
                version: file[addr + 4],
            });
        }
        Ok(LocalHeap {
            data_size: LittleEndian::read_u64(&file[addr + 8..]),
            data_address: LittleEndian::read_u64(&file[addr + 24..]),
        })
    }

    pub fn name_at(&self, file: &[u8], offset: u64) -> Result<String, FormatError> {
        if offset >= self.data_size {
            return Err(FormatError::InvalidMessage {
                what: "local heap",
                detail: format!("name offset {offset} beyond heap size {}", self.data_size),
            });
        }
        let start = (self.data_address + offset) as usize;
        let end = (self.data_address + self.data_size) as usize;
        ensure_len(file, end)?;
        let bytes = &file[start..end];
        let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..nul].to_vec()).map_err(|_| FormatError::InvalidMessage {
            what: "local heap",
            detail: "link name is not valid UTF-8".into(),
        })
    }
}

/// Resolve every `(name, object header address)` pair of a v1 group, in
/// symbol-table order.
pub fn resolve_v1_group_entries(
    file: &[u8],
    st: SymbolTableMessage,
) -> Result<Vec<(String, u64)>, FormatError> {
    let heap = LocalHeap::parse(file, st.heap_address)?;
    let mut snod_addrs = Vec::new();
    collect_symbol_table_addresses(file, st.btree_address, &mut snod_addrs)?;
    let mut entries = Vec::new();
    for snod in snod_addrs {
        parse_symbol_table_node(file, snod, &heap, &mut entries)?;
    }
    Ok(entries)
}

fn parse_symbol_table_node(
    file: &[u8],
    addr: u64,
    heap: &LocalHeap,
    out: &mut Vec<(String, u64)>,
) -> Result<(), FormatError> {
    let addr = addr as usize;
    ensure_len(file, addr + 8)?;
    if &file[addr..addr + 4] != SNOD_SIGNATURE {
        return Err(FormatError::BadSignature { expected: "SNOD" });
    }
    let count = LittleEndian::read_u16(&file[addr + 6..]) as usize;
    // 40-byte symbol table entries follow the 8-byte node header.
    let mut pos = addr + 8;
    for _ in 0..count {
        ensure_len(file, pos + 40)?;
        let name_offset = LittleEndian::read_u64(&file[pos..]);
        let object_header = LittleEndian::read_u64(&file[pos + 8..]);
        out.push((heap.name_at(file, name_offset)?, object_header));
        pos += 40;
    }
    Ok(())
}
