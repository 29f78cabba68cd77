//! Container writer used to produce RHEED-shaped fixtures and exports:
//! version 3 superblock, version 2 object headers, compact link groups,
//! contiguous or chunked dataset storage.

use std::path::Path;

use crate::attribute::AttributeMessage;
use crate::btree_v1::{serialize_chunk_leaf, ChunkInfo};
use crate::checksum::jenkins_lookup3;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::Error;
use crate::link::{LinkInfo, LinkMessage};
use crate::superblock::Superblock;
use crate::types::AttrValue;

const MSG_DATASPACE: u8 = 0x01;
const MSG_LINK_INFO: u8 = 0x02;
const MSG_DATATYPE: u8 = 0x03;
const MSG_FILL_VALUE: u8 = 0x05;
const MSG_LINK: u8 = 0x06;
const MSG_DATA_LAYOUT: u8 = 0x08;
const MSG_ATTRIBUTE: u8 = 0x0C;

/// The datatype message of a committed object never changes.
const FLAG_CONSTANT: u8 = 0x01;

#[derive(Debug, Clone)]
enum DatasetData {
    U8(Vec<u8>),
    I64(Vec<i64>),
    F64(Vec<f64>),
}

impl DatasetData {
    fn elem_size(&self) -> usize {
        match self {
            DatasetData::U8(_) => 1,
            DatasetData::I64(_) | DatasetData::F64(_) => 8,
        }
    }

    fn len(&self) -> usize {
        match self {
            DatasetData::U8(v) => v.len(),
            DatasetData::I64(v) => v.len(),
            DatasetData::F64(v) => v.len(),
        }
    }

    fn datatype_bytes(&self) -> Vec<u8> {
        match self {
            DatasetData::U8(_) => Datatype::serialize_fixed(1, false),
            DatasetData::I64(_) => Datatype::serialize_fixed(8, true),
            DatasetData::F64(_) => Datatype::serialize_f64(),
        }
    }

    fn raw_bytes(&self) -> Vec<u8> {
        match self {
            DatasetData::U8(v) => v.clone(),
            DatasetData::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            DatasetData::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct DatasetBuilder {
    dims: Vec<u64>,
    chunk_dims: Option<Vec<u64>>,
    data: DatasetData,
}

#[derive(Debug, Clone)]
enum Node {
    Group(GroupBuilder),
    Dataset(DatasetBuilder),
}

/// Builder for one group: attributes plus named children.
#[derive(Debug, Clone, Default)]
pub struct GroupBuilder {
    attrs: Vec<(String, AttrValue)>,
    children: Vec<(String, Node)>,
}

impl GroupBuilder {
    /// Attach an attribute. Later writes with the same name win.
    pub fn attr(&mut self, name: &str, value: AttrValue) -> &mut GroupBuilder {
        self.attrs.retain(|(n, _)| n != name);
        self.attrs.push((name.to_owned(), value));
        self
    }

    /// Create (or reopen) a child group.
    pub fn group(&mut self, name: &str) -> &mut GroupBuilder {
        let idx = match self.children.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.children.push((name.to_owned(), Node::Group(GroupBuilder::default())));
                self.children.len() - 1
            }
        };
        match &mut self.children[idx].1 {
            Node::Group(g) => g,
            Node::Dataset(_) => panic!("child {name:?} already exists as a dataset"),
        }
    }

    pub fn dataset_u8(&mut self, name: &str, dims: &[u64], data: Vec<u8>) -> &mut GroupBuilder {
        self.add_dataset(name, dims, None, DatasetData::U8(data))
    }

    /// Chunked unsigned-byte dataset; `chunk_dims` are the spatial chunk
    /// extents (frame streams use one frame per chunk).
    pub fn dataset_u8_chunked(
        &mut self,
        name: &str,
        dims: &[u64],
        chunk_dims: &[u64],
        data: Vec<u8>,
    ) -> &mut GroupBuilder {
        self.add_dataset(name, dims, Some(chunk_dims.to_vec()), DatasetData::U8(data))
    }

    pub fn dataset_i64(&mut self, name: &str, dims: &[u64], data: Vec<i64>) -> &mut GroupBuilder {
        self.add_dataset(name, dims, None, DatasetData::I64(data))
    }

    pub fn dataset_f64(&mut self, name: &str, dims: &[u64], data: Vec<f64>) -> &mut GroupBuilder {
        self.add_dataset(name, dims, None, DatasetData::F64(data))
    }

    fn add_dataset(
        &mut self,
        name: &str,
        dims: &[u64],
        chunk_dims: Option<Vec<u64>>,
        data: DatasetData,
    ) -> &mut GroupBuilder {
        let expected: u64 = dims.iter().product();
        assert_eq!(
            expected,
            data.len() as u64,
            "dataset {name:?}: {} elements for extent {dims:?}",
            data.len()
        );
        if let Some(chunks) = &chunk_dims {
            assert_eq!(chunks.len(), dims.len(), "dataset {name:?}: chunk rank mismatch");
        }
        self.children.retain(|(n, _)| n != name);
        self.children
            .push((name.to_owned(), Node::Dataset(DatasetBuilder { dims: dims.to_vec(), chunk_dims, data })));
        self
    }
}

/// Whole-file builder. Objects are laid out superblock first, object
/// headers in preorder, then raw dataset storage.
#[derive(Debug, Clone, Default)]
pub struct FileBuilder {
    root: GroupBuilder,
}

impl FileBuilder {
    pub fn new() -> FileBuilder {
        FileBuilder::default()
    }

    pub fn root(&mut self) -> &mut GroupBuilder {
        &mut self.root
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, self.build())?;
        Ok(())
    }

    pub fn build(&self) -> Vec<u8> {
        // Pass 1: serialize every object header with placeholder
        // addresses to learn the sizes, then assign real offsets.
        let mut plan = Plan::default();
        plan_group(&self.root, &mut plan);

        let mut header_addrs = Vec::with_capacity(plan.header_sizes.len());
        let mut cursor = Superblock::V3_SIZE as u64;
        for &size in &plan.header_sizes {
            header_addrs.push(cursor);
            cursor += size as u64;
        }
        let data_start = cursor;

        // Pass 2: serialize with the real addresses.
        let mut ctx = EmitContext {
            header_addrs,
            next_header: 0,
            data_cursor: data_start,
            headers: Vec::new(),
            data_region: Vec::new(),
        };
        emit_group(&self.root, &mut ctx);

        let eof = ctx.data_cursor;
        let root_addr = ctx.header_addrs[0];
        let mut out = Vec::with_capacity(eof as usize);
        out.extend_from_slice(&Superblock::serialize_v3(eof, root_addr));
        for header in ctx.headers {
            out.extend_from_slice(&header);
        }
        out.extend_from_slice(&ctx.data_region);
        out
    }
}

#[derive(Default)]
struct Plan {
    header_sizes: Vec<usize>,
}

// Preorder walk mirroring emit_group, recording header sizes only.
fn plan_group(group: &GroupBuilder, plan: &mut Plan) {
    let slot = plan.header_sizes.len();
    plan.header_sizes.push(0);
    let mut child_addrs = Vec::new();
    for (name, _) in &group.children {
        // Placeholder child address; width never depends on the value.
        child_addrs.push((name.as_str(), 0u64));
    }
    plan.header_sizes[slot] = group_header(&group.attrs, &child_addrs).len();
    for (_, node) in &group.children {
        match node {
            Node::Group(g) => plan_group(g, plan),
            Node::Dataset(d) => plan.header_sizes.push(dataset_header(d, 0, 0).len()),
        }
    }
}

struct EmitContext {
    header_addrs: Vec<u64>,
    next_header: usize,
    data_cursor: u64,
    headers: Vec<Vec<u8>>,
    data_region: Vec<u8>,
}

fn emit_group(group: &GroupBuilder, ctx: &mut EmitContext) {
    let slot = ctx.next_header;
    ctx.next_header += 1;
    ctx.headers.push(Vec::new());

    // Children occupy the following header slots in preorder.
    let mut child_addrs = Vec::new();
    let mut probe = ctx.next_header;
    for (name, node) in &group.children {
        child_addrs.push((name.as_str(), ctx.header_addrs[probe]));
        probe += 1 + match node {
            Node::Group(g) => count_headers(g) - 1,
            Node::Dataset(_) => 0,
        };
    }
    ctx.headers[slot] = group_header(&group.attrs, &child_addrs);

    for (_, node) in &group.children {
        match node {
            Node::Group(g) => emit_group(g, ctx),
            Node::Dataset(d) => emit_dataset(d, ctx),
        }
    }
}

fn count_headers(group: &GroupBuilder) -> usize {
    1 + group
        .children
        .iter()
        .map(|(_, node)| match node {
            Node::Group(g) => count_headers(g),
            Node::Dataset(_) => 1,
        })
        .sum::<usize>()
}

fn emit_dataset(dataset: &DatasetBuilder, ctx: &mut EmitContext) {
    let slot = ctx.next_header;
    ctx.next_header += 1;

    let raw = dataset.data.raw_bytes();
    let raw_len = raw.len() as u64;
    let elem_size = dataset.data.elem_size();
    let (layout_addr, storage) = match &dataset.chunk_dims {
        None => {
            let addr = ctx.data_cursor;
            (addr, raw)
        }
        Some(chunk_dims) => {
            // Chunk payloads first, then the single-leaf index node the
            // layout message points at.
            let mut storage = Vec::new();
            let mut infos = Vec::new();
            for (offsets, bytes) in split_into_chunks(&raw, &dataset.dims, chunk_dims, elem_size) {
                infos.push(ChunkInfo {
                    offsets,
                    size: bytes.len() as u32,
                    filter_mask: 0,
                    address: ctx.data_cursor + storage.len() as u64,
                });
                storage.extend_from_slice(&bytes);
            }
            let btree_addr = ctx.data_cursor + storage.len() as u64;
            storage.extend_from_slice(&serialize_chunk_leaf(&infos, dataset.dims.len() + 1));
            (btree_addr, storage)
        }
    };
    ctx.data_cursor += storage.len() as u64;
    ctx.data_region.extend_from_slice(&storage);
    ctx.headers.push(dataset_header(dataset, layout_addr, raw_len));
    // keep the two passes aligned
    debug_assert_eq!(ctx.headers.len(), slot + 1);
}

/// Split a row-major buffer into full-size chunks in ascending offset
/// order. Edge chunks are zero-padded to the full chunk extent.
fn split_into_chunks(
    raw: &[u8],
    dims: &[u64],
    chunk_dims: &[u64],
    elem_size: usize,
) -> Vec<(Vec<u64>, Vec<u8>)> {
    let rank = dims.len();
    let chunk_elems: u64 = chunk_dims.iter().product();
    let mut out = Vec::new();
    let mut origin = vec![0u64; rank];
    'outer: loop {
        let mut chunk = vec![0u8; (chunk_elems * elem_size as u64) as usize];
        gather_chunk(raw, dims, chunk_dims, &origin, elem_size, &mut chunk);
        let mut offsets = origin.clone();
        offsets.push(0); // element-size dimension
        out.push((offsets, chunk));

        // Advance the origin odometer by whole chunks.
        let mut d = rank;
        loop {
            if d == 0 {
                break 'outer;
            }
            d -= 1;
            origin[d] += chunk_dims[d];
            if origin[d] < dims[d] {
                break;
            }
            origin[d] = 0;
        }
    }
    out
}

fn gather_chunk(
    raw: &[u8],
    dims: &[u64],
    chunk_dims: &[u64],
    origin: &[u64],
    elem_size: usize,
    chunk: &mut [u8],
) {
    let rank = dims.len();
    let last = rank - 1;
    let mut ds_strides = vec![elem_size as u64; rank];
    let mut chunk_strides = vec![elem_size as u64; rank];
    for d in (0..last).rev() {
        ds_strides[d] = ds_strides[d + 1] * dims[d + 1];
        chunk_strides[d] = chunk_strides[d + 1] * chunk_dims[d + 1];
    }
    let run = (chunk_dims[last].min(dims[last] - origin[last]) * elem_size as u64) as usize;

    let mut idx = vec![0u64; last];
    loop {
        let mut src = origin[last] * ds_strides[last];
        let mut dst = 0u64;
        for d in 0..last {
            src += (origin[d] + idx[d]) * ds_strides[d];
            dst += idx[d] * chunk_strides[d];
        }
        let src = src as usize;
        let dst = dst as usize;
        chunk[dst..dst + run].copy_from_slice(&raw[src..src + run]);

        let mut d = last;
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < chunk_dims[d].min(dims[d] - origin[d]) {
                break;
            }
            idx[d] = 0;
        }
    }
}

fn group_header(attrs: &[(String, AttrValue)], children: &[(&str, u64)]) -> Vec<u8> {
    let mut messages: Vec<(u8, u8, Vec<u8>)> = Vec::new();
    messages.push((MSG_LINK_INFO, 0, LinkInfo::serialize_compact()));
    for (name, addr) in children {
        messages.push((MSG_LINK, 0, LinkMessage::serialize_hard(name, *addr)));
    }
    for (name, value) in attrs {
        messages.push((MSG_ATTRIBUTE, 0, build_attr_message(name, value)));
    }
    serialize_object_header(&messages)
}

fn dataset_header(dataset: &DatasetBuilder, layout_addr: u64, raw_len: u64) -> Vec<u8> {
    let layout = match &dataset.chunk_dims {
        None => DataLayout::serialize_v3_contiguous(layout_addr, raw_len),
        Some(chunk_dims) => {
            let mut stored: Vec<u32> = chunk_dims.iter().map(|&d| d as u32).collect();
            stored.push(dataset.data.elem_size() as u32);
            DataLayout::serialize_v3_chunked(layout_addr, &stored)
        }
    };
    serialize_object_header(&[
        (MSG_DATATYPE, FLAG_CONSTANT, dataset.data.datatype_bytes()),
        (MSG_DATASPACE, 0, Dataspace::serialize_v2(&dataset.dims)),
        (MSG_FILL_VALUE, FLAG_CONSTANT, vec![3, 0x0A]),
        (MSG_DATA_LAYOUT, 0, layout),
    ])
}

/// Encode one attribute as a version 2 attribute message.
pub fn build_attr_message(name: &str, value: &AttrValue) -> Vec<u8> {
    match value {
        AttrValue::I64(v) => AttributeMessage::serialize_v2(
            name,
            &Datatype::serialize_fixed(8, true),
            &[],
            &v.to_le_bytes(),
        ),
        AttrValue::U64(v) => AttributeMessage::serialize_v2(
            name,
            &Datatype::serialize_fixed(8, false),
            &[],
            &v.to_le_bytes(),
        ),
        AttrValue::F64(v) => {
            AttributeMessage::serialize_v2(name, &Datatype::serialize_f64(), &[], &v.to_le_bytes())
        }
        AttrValue::I64Array(values) => {
            let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            AttributeMessage::serialize_v2(
                name,
                &Datatype::serialize_fixed(8, true),
                &[values.len() as u64],
                &raw,
            )
        }
        AttrValue::F64Array(values) => {
            let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            AttributeMessage::serialize_v2(
                name,
                &Datatype::serialize_f64(),
                &[values.len() as u64],
                &raw,
            )
        }
        AttrValue::String(s) => {
            // Zero-size string datatypes are not representable; an empty
            // value becomes a single NUL.
            let raw = if s.is_empty() { vec![0u8] } else { s.as_bytes().to_vec() };
            AttributeMessage::serialize_v2(
                name,
                &Datatype::serialize_string(raw.len() as u32),
                &[],
                &raw,
            )
        }
        AttrValue::StringArray(values) => {
            let width = values.iter().map(|s| s.len()).max().unwrap_or(0).max(1);
            let mut raw = vec![0u8; width * values.len()];
            for (i, s) in values.iter().enumerate() {
                raw[i * width..i * width + s.len()].copy_from_slice(s.as_bytes());
            }
            AttributeMessage::serialize_v2(
                name,
                &Datatype::serialize_string(width as u32),
                &[values.len() as u64],
                &raw,
            )
        }
    }
}

/// Version 2 object header with a width-adaptive chunk-0 size field.
fn serialize_object_header(messages: &[(u8, u8, Vec<u8>)]) -> Vec<u8> {
    let body_len: usize = messages.iter().map(|(_, _, data)| 4 + data.len()).sum();
    let (width_code, width) = match body_len {
        0..=0xFF => (0u8, 1),
        0x100..=0xFFFF => (1, 2),
        0x1_0000..=0xFFFF_FFFF => (2, 4),
        _ => (3, 8),
    };
    let mut out = Vec::with_capacity(6 + width + body_len + 4);
    out.extend_from_slice(b"OHDR");
    out.push(2); // version
    out.push(width_code); // flags: size width only
    out.extend_from_slice(&(body_len as u64).to_le_bytes()[..width]);
    for (msg_type, flags, data) in messages {
        out.push(*msg_type);
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.push(*flags);
        out.extend_from_slice(data);
    }
    let checksum = jenkins_lookup3(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::File;

    fn make_measurement_file() -> Vec<u8> {
        let mut builder = FileBuilder::new();
        let root = builder.root();
        root.attr("data_id", AttrValue::String("4".into()));
        root.attr("avg_frame_rate", AttrValue::String("120".into()));
        root.attr("dims", AttrValue::I64Array(vec![2, 3, 4]));
        root.dataset_u8("frames", &[2, 3, 4], (0..24).collect());
        builder.build()
    }

    #[test]
    fn written_file_reads_back() {
        let file = File::from_bytes(make_measurement_file()).unwrap();
        let root = file.root().unwrap();
        let attrs = root.attrs().unwrap();
        assert_eq!(attrs["data_id"], AttrValue::String("4".into()));
        assert_eq!(attrs["avg_frame_rate"], AttrValue::String("120".into()));
        assert_eq!(attrs["dims"], AttrValue::I64Array(vec![2, 3, 4]));

        let frames = file.dataset("/frames").unwrap();
        assert_eq!(frames.shape().unwrap(), vec![2, 3, 4]);
        assert_eq!(frames.read_u8().unwrap(), (0..24).collect::<Vec<u8>>());
    }

    #[test]
    fn chunked_frames_read_back() {
        let data: Vec<u8> = (0..48).map(|v| v as u8).collect();
        let mut builder = FileBuilder::new();
        builder.root().dataset_u8_chunked("frames", &[4, 3, 4], &[1, 3, 4], data.clone());
        let file = File::from_bytes(builder.build()).unwrap();
        let frames = file.dataset("/frames").unwrap();
        assert_eq!(frames.shape().unwrap(), vec![4, 3, 4]);
        assert_eq!(frames.read_u8().unwrap(), data);
    }

    #[test]
    fn edge_chunks_round_trip() {
        let data: Vec<u8> = (0..30).collect();
        let mut builder = FileBuilder::new();
        builder.root().dataset_u8_chunked("frames", &[5, 6], &[2, 4], data.clone());
        let file = File::from_bytes(builder.build()).unwrap();
        assert_eq!(file.dataset("/frames").unwrap().read_u8().unwrap(), data);
    }

    #[test]
    fn f64_dataset_reads_back() {
        let mut builder = FileBuilder::new();
        builder.root().dataset_f64("rates", &[2], vec![120.0, 60.0]);
        let file = File::from_bytes(builder.build()).unwrap();
        let root = file.root().unwrap();
        assert_eq!(root.datasets().unwrap(), vec!["rates".to_owned()]);
        assert_eq!(root.dataset("rates").unwrap().read_f64().unwrap(), vec![120.0, 60.0]);
    }

    #[test]
    fn nested_groups_resolve() {
        let mut builder = FileBuilder::new();
        builder
            .root()
            .group("acquisition")
            .dataset_i64("timestamps", &[3], vec![10, 20, 30]);
        let file = File::from_bytes(builder.build()).unwrap();
        let ds = file.dataset("/acquisition/timestamps").unwrap();
        assert_eq!(ds.read_i64().unwrap(), vec![10, 20, 30]);
        assert!(file.group("/acquisition").unwrap().has_child("timestamps").unwrap());
        assert!(file.dataset("/acquisition/missing").is_err());
    }

    #[test]
    fn scalar_numeric_attrs_round_trip() {
        let mut builder = FileBuilder::new();
        builder
            .root()
            .attr("raw_frame_rate", AttrValue::F64(120.0))
            .attr("chunk_size", AttrValue::I64(50))
            .attr("total", AttrValue::U64(u64::MAX));
        let file = File::from_bytes(builder.build()).unwrap();
        let attrs = file.root().unwrap().attrs().unwrap();
        assert_eq!(attrs["raw_frame_rate"], AttrValue::F64(120.0));
        assert_eq!(attrs["chunk_size"], AttrValue::I64(50));
        assert_eq!(attrs["total"], AttrValue::U64(u64::MAX));
    }

    #[test]
    fn last_attr_write_wins() {
        let mut builder = FileBuilder::new();
        builder.root().attr("data_id", AttrValue::I64(1)).attr("data_id", AttrValue::I64(2));
        let file = File::from_bytes(builder.build()).unwrap();
        assert_eq!(file.root().unwrap().attrs().unwrap()["data_id"], AttrValue::I64(2));
    }
}
