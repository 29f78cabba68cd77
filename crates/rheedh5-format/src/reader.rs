//! File handles: open a container, walk its groups, read attributes and
//! dataset contents.

use std::collections::HashMap;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::btree_v1::collect_chunk_info;
use crate::chunked::read_chunked_data;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::{Error, FormatError};
use crate::group::{resolve_v1_group_entries, SymbolTableMessage};
use crate::link::{LinkInfo, LinkMessage, LinkTarget};
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;
use crate::superblock::Superblock;
use crate::types::{attrs_to_map, AttrValue};

pub type Result<T> = std::result::Result<T, Error>;

/// An open HDF5 container, fully buffered in memory.
pub struct File {
    data: Vec<u8>,
    superblock: Superblock,
}

impl File {
    pub fn open(path: impl AsRef<Path>) -> Result<File> {
        let data = std::fs::read(path)?;
        File::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<File> {
        let superblock = Superblock::parse(&data)?;
        Ok(File { data, superblock })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// File contents with the user block stripped, so stored addresses
    /// are direct indices.
    fn body(&self) -> &[u8] {
        &self.data[self.superblock.base_address as usize..]
    }

    fn header_at(&self, addr: u64) -> Result<ObjectHeader> {
        Ok(ObjectHeader::parse(self.body(), addr)?)
    }

    /// The root group.
    pub fn root(&self) -> Result<Group<'_>> {
        let header = self.header_at(self.superblock.root_object_header)?;
        Ok(Group { file: self, name: "/".into(), header })
    }

    /// Resolve an absolute path like `/frames` to a dataset handle.
    pub fn dataset(&self, path: &str) -> Result<Dataset<'_>> {
        let (parent, name) = self.resolve_parent(path)?;
        parent.dataset(name)
    }

    /// Resolve an absolute path to a group handle.
    pub fn group(&self, path: &str) -> Result<Group<'_>> {
        let mut group = self.root()?;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            group = group.group(part)?;
        }
        Ok(group)
    }

    fn resolve_parent<'a>(&self, path: &'a str) -> Result<(Group<'_>, &'a str)> {
        let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let name = match parts.pop() {
            Some(name) => name,
            None => return Err(Error::NotADataset("/".into())),
        };
        let mut group = self.root()?;
        for part in parts {
            group = group.group(part)?;
        }
        Ok((group, name))
    }
}

fn is_dataset(header: &ObjectHeader) -> bool {
    header.find_message(MessageType::Datatype).is_some()
}

fn resolve_group_entries(body: &[u8], header: &ObjectHeader) -> Result<Vec<(String, u64)>> {
    if let Some(msg) = header.find_message(MessageType::SymbolTable) {
        let st = SymbolTableMessage::parse(&msg.data)?;
        return Ok(resolve_v1_group_entries(body, st)?);
    }
    if let Some(msg) = header.find_message(MessageType::LinkInfo) {
        let info = LinkInfo::parse(&msg.data)?;
        if !info.is_compact() {
            return Err(Error::Format(FormatError::InvalidMessage {
                what: "link info",
                detail: "dense link storage not supported".into(),
            }));
        }
    }
    let mut entries = Vec::new();
    for msg in header.messages_of(MessageType::Link) {
        let link = LinkMessage::parse(&msg.data)?;
        if let LinkTarget::Hard(addr) = link.target {
            entries.push((link.name, addr));
        }
    }
    Ok(entries)
}

/// A group handle borrowing the open file.
pub struct Group<'f> {
    file: &'f File,
    name: String,
    header: ObjectHeader,
}

impl<'f> Group<'f> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded attributes of this group.
    pub fn attrs(&self) -> Result<HashMap<String, AttrValue>> {
        Ok(attrs_to_map(&self.header)?)
    }

    /// `(name, object header address)` of every link, in stored order.
    pub fn children(&self) -> Result<Vec<(String, u64)>> {
        resolve_group_entries(self.file.body(), &self.header)
    }

    /// Names of the datasets directly inside this group.
    pub fn datasets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for (name, addr) in self.children()? {
            if is_dataset(&self.file.header_at(addr)?) {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn dataset(&self, name: &str) -> Result<Dataset<'f>> {
        let addr = self.child_addr(name)?;
        let header = self.file.header_at(addr)?;
        if !is_dataset(&header) {
            return Err(Error::NotADataset(name.into()));
        }
        Ok(Dataset { file: self.file, name: name.into(), header })
    }

    pub fn group(&self, name: &str) -> Result<Group<'f>> {
        let addr = self.child_addr(name)?;
        let header = self.file.header_at(addr)?;
        if is_dataset(&header) {
            return Err(Error::NotAGroup(name.into()));
        }
        Ok(Group { file: self.file, name: name.into(), header })
    }

    pub fn has_child(&self, name: &str) -> Result<bool> {
        Ok(self.children()?.iter().any(|(n, _)| n == name))
    }

    fn child_addr(&self, name: &str) -> Result<u64> {
        self.children()?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, addr)| addr)
            .ok_or_else(|| Error::NotFound(name.into()))
    }
}

/// A dataset handle borrowing the open file.
pub struct Dataset<'f> {
    file: &'f File,
    name: String,
    header: ObjectHeader,
}

impl Dataset<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Result<Vec<u64>> {
        Ok(self.dataspace()?.dims)
    }

    pub fn dtype(&self) -> Result<Datatype> {
        let msg = self
            .header
            .find_message(MessageType::Datatype)
            .ok_or(Error::MissingMessage("datatype"))?;
        Ok(Datatype::parse(&msg.data)?)
    }

    pub fn attrs(&self) -> Result<HashMap<String, AttrValue>> {
        Ok(attrs_to_map(&self.header)?)
    }

    fn dataspace(&self) -> Result<Dataspace> {
        let msg = self
            .header
            .find_message(MessageType::Dataspace)
            .ok_or(Error::MissingMessage("dataspace"))?;
        Ok(Dataspace::parse(&msg.data)?)
    }

    fn layout(&self) -> Result<DataLayout> {
        let msg = self
            .header
            .find_message(MessageType::DataLayout)
            .ok_or(Error::MissingMessage("data layout"))?;
        Ok(DataLayout::parse(&msg.data)?)
    }

    /// Element bytes in row-major order, reassembling chunked storage.
    pub fn read_raw(&self) -> Result<Vec<u8>> {
        let dtype = self.dtype()?;
        let space = self.dataspace()?;
        let elem_size = dtype.size() as usize;
        let body = self.file.body();
        match self.layout()? {
            DataLayout::Compact { data } => Ok(data),
            DataLayout::Contiguous { address, size } => {
                if DataLayout::is_undefined(address) {
                    // Never allocated: fill value of zero.
                    return Ok(vec![0; (space.num_elements() as usize) * elem_size]);
                }
                let start = address as usize;
                let end = start + size as usize;
                if body.len() < end {
                    return Err(Error::Format(FormatError::UnexpectedEof {
                        expected: end,
                        available: body.len(),
                    }));
                }
                Ok(body[start..end].to_vec())
            }
            DataLayout::Chunked { btree_address, chunk_dims } => {
                let mut chunks = Vec::new();
                collect_chunk_info(body, btree_address, chunk_dims.len(), &mut chunks)?;
                let spatial: Vec<u64> =
                    chunk_dims[..chunk_dims.len() - 1].iter().map(|&d| d as u64).collect();
                Ok(read_chunked_data(body, &space.dims, &spatial, elem_size, &chunks)?)
            }
        }
    }

    /// Unsigned byte elements (frame data).
    pub fn read_u8(&self) -> Result<Vec<u8>> {
        match self.dtype()? {
            Datatype::FixedPoint { size: 1, signed: false, .. } => self.read_raw(),
            other => Err(Error::TypeMismatch { expected: "u8", found: format!("{other:?}") }),
        }
    }

    pub fn read_i64(&self) -> Result<Vec<i64>> {
        match self.dtype()? {
            Datatype::FixedPoint { size: 8, signed: true, big_endian: false } => {
                let raw = self.read_raw()?;
                Ok(raw.chunks_exact(8).map(LittleEndian::read_i64).collect())
            }
            other => Err(Error::TypeMismatch { expected: "i64", found: format!("{other:?}") }),
        }
    }

    pub fn read_f64(&self) -> Result<Vec<f64>> {
        match self.dtype()? {
            Datatype::Float { size: 8, big_endian: false } => {
                let raw = self.read_raw()?;
                Ok(raw.chunks_exact(8).map(LittleEndian::read_f64).collect())
            }
            other => Err(Error::TypeMismatch { expected: "f64", found: format!("{other:?}") }),
        }
    }
}
