use byteorder::{ByteOrder, LittleEndian};

use crate::error::{ensure_len, FormatError};
use crate::UNDEFINED_ADDRESS;

/// Parsed data layout message (versions 3 and 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    Compact { data: Vec<u8> },
    Contiguous { address: u64, size: u64 },
    /// `chunk_dims` carries the trailing element-size dimension the file
    /// stores alongside the spatial chunk extents.
    Chunked { btree_address: u64, chunk_dims: Vec<u32> },
}

impl DataLayout {
    pub fn parse(data: &[u8]) -> Result<DataLayout, FormatError> {
        ensure_len(data, 2)?;
        let version = data[0];
        let class = data[1];
        match (version, class) {
            (3 | 4, 0) => {
                ensure_len(data, 4)?;
                let size = LittleEndian::read_u16(&data[2..]) as usize;
                ensure_len(data, 4 + size)?;
                Ok(DataLayout::Compact { data: data[4..4 + size].to_vec() })
            }
            (3 | 4, 1) => {
                ensure_len(data, 18)?;
                let address = LittleEndian::read_u64(&data[2..]);
                let size = LittleEndian::read_u64(&data[10..]);
                Ok(DataLayout::Contiguous { address, size })
            }
            (3, 2) => {
                ensure_len(data, 11)?;
                let dimensionality = data[2] as usize;
                let btree_address = LittleEndian::read_u64(&data[3..]);
                ensure_len(data, 11 + dimensionality * 4)?;
                let chunk_dims = (0..dimensionality)
                    .map(|i| LittleEndian::read_u32(&data[11 + i * 4..]))
                    .collect();
                Ok(DataLayout::Chunked { btree_address, chunk_dims })
            }
            (4, 2) => Err(FormatError::InvalidMessage {
                what: "data layout",
                detail: "version 4 chunked layout not supported".into(),
            }),
            (3 | 4, other) => Err(FormatError::InvalidMessage {
                what: "data layout",
                detail: format!("unknown layout class {other}"),
            }),
            (other, _) => {
                Err(FormatError::UnsupportedVersion { what: "data layout", version: other })
            }
        }
    }

    pub fn is_undefined(address: u64) -> bool {
        address == UNDEFINED_ADDRESS
    }

    pub fn serialize_v3_contiguous(address: u64, size: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(18);
        out.push(3);
        out.push(1);
        out.extend_from_slice(&address.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out
    }

    /// `chunk_dims` must already include the element-size dimension.
    pub fn serialize_v3_chunked(btree_address: u64, chunk_dims: &[u32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(11 + chunk_dims.len() * 4);
        out.push(3);
        out.push(2);
        out.push(chunk_dims.len() as u8);
        out.extend_from_slice(&btree_address.to_le_bytes());
        for &d in chunk_dims {
            out.extend_from_slice(&d.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_round_trip() {
        let bytes = DataLayout::serialize_v3_contiguous(4096, 128);
        assert_eq!(
            DataLayout::parse(&bytes).unwrap(),
            DataLayout::Contiguous { address: 4096, size: 128 }
        );
    }

    #[test]
    fn chunked_round_trip() {
        let bytes = DataLayout::serialize_v3_chunked(2048, &[1, 354, 512, 1]);
        assert_eq!(
            DataLayout::parse(&bytes).unwrap(),
            DataLayout::Chunked { btree_address: 2048, chunk_dims: vec![1, 354, 512, 1] }
        );
    }

    #[test]
    fn undefined_address_marker() {
        assert!(DataLayout::is_undefined(u64::MAX));
        assert!(!DataLayout::is_undefined(0));
    }
}
