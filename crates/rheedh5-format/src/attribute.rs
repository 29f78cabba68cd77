use byteorder::{ByteOrder, LittleEndian};

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::{ensure_len, FormatError};

/// A decoded attribute message: name plus typed raw element bytes.
#[derive(Debug, Clone)]
pub struct AttributeMessage {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    pub raw_data: Vec<u8>,
}

fn pad8(n: usize) -> usize {
    n.div_ceil(8) * 8
}

impl AttributeMessage {
    pub fn parse(data: &[u8]) -> Result<AttributeMessage, FormatError> {
        ensure_len(data, 8)?;
        let version = data[0];
        let (header_len, padded) = match version {
            1 => (8, true),
            2 => (8, false),
            3 => (9, false),
            other => {
                return Err(FormatError::UnsupportedVersion { what: "attribute", version: other })
            }
        };
        if version >= 2 && data[1] & 0x03 != 0 {
            return Err(FormatError::InvalidMessage {
                what: "attribute",
                detail: "shared datatype/dataspace not supported".into(),
            });
        }
        let name_size = LittleEndian::read_u16(&data[2..]) as usize;
        let dt_size = LittleEndian::read_u16(&data[4..]) as usize;
        let ds_size = LittleEndian::read_u16(&data[6..]) as usize;

        let mut pos = header_len;
        let name_span = if padded { pad8(name_size) } else { name_size };
        ensure_len(data, pos + name_span)?;
        let name_bytes = &data[pos..pos + name_size];
        let name = str_from_nul_terminated(name_bytes)?;
        pos += name_span;

        let dt_span = if padded { pad8(dt_size) } else { dt_size };
        ensure_len(data, pos + dt_span)?;
        let datatype = Datatype::parse(&data[pos..pos + dt_size])?;
        pos += dt_span;

        let ds_span = if padded { pad8(ds_size) } else { ds_size };
        ensure_len(data, pos + ds_span)?;
        let dataspace = Dataspace::parse(&data[pos..pos + ds_size])?;
        pos += ds_span;

        let data_len = (dataspace.num_elements() * datatype.size() as u64) as usize;
        ensure_len(data, pos + data_len)?;
        let raw_data = data[pos..pos + data_len].to_vec();
        Ok(AttributeMessage { name, datatype, dataspace, raw_data })
    }

    /// Version 2 attribute message bytes.
    pub fn serialize_v2(name: &str, datatype_bytes: &[u8], dims: &[u64], raw: &[u8]) -> Vec<u8> {
        let dataspace_bytes = Dataspace::serialize_v2(dims);
        let name_size = name.len() + 1;
        let mut out = Vec::with_capacity(8 + name_size + datatype_bytes.len() + raw.len());
        out.push(2); // version
        out.push(0); // flags
        out.extend_from_slice(&(name_size as u16).to_le_bytes());
        out.extend_from_slice(&(datatype_bytes.len() as u16).to_le_bytes());
        out.extend_from_slice(&(dataspace_bytes.len() as u16).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(datatype_bytes);
        out.extend_from_slice(&dataspace_bytes);
        out.extend_from_slice(raw);
        out
    }
}

fn str_from_nul_terminated(bytes: &[u8]) -> Result<String, FormatError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).map_err(|_| FormatError::InvalidMessage {
        what: "attribute",
        detail: "name is not valid UTF-8".into(),
    })
}
