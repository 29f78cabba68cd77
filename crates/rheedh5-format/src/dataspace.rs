use byteorder::{ByteOrder, LittleEndian};

use crate::error::{ensure_len, FormatError};

/// Parsed dataspace message (versions 1 and 2). Maximum dimensions are
/// skipped; only current extents matter here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    pub version: u8,
    pub dims: Vec<u64>,
    pub is_scalar: bool,
}

impl Dataspace {
    pub fn parse(data: &[u8]) -> Result<Dataspace, FormatError> {
        ensure_len(data, 2)?;
        let version = data[0];
        match version {
            1 => {
                ensure_len(data, 8)?;
                let rank = data[1] as usize;
                Self::read_dims(data, 8, rank, version)
            }
            2 => {
                ensure_len(data, 4)?;
                let rank = data[1] as usize;
                let space_type = data[3];
                match space_type {
                    0 => Ok(Dataspace { version, dims: Vec::new(), is_scalar: true }),
                    1 => Self::read_dims(data, 4, rank, version),
                    2 => Ok(Dataspace { version, dims: Vec::new(), is_scalar: false }),
                    other => Err(FormatError::InvalidMessage {
                        what: "dataspace",
                        detail: format!("unknown space type {other}"),
                    }),
                }
            }
            other => Err(FormatError::UnsupportedVersion { what: "dataspace", version: other }),
        }
    }

    fn read_dims(
        data: &[u8],
        start: usize,
        rank: usize,
        version: u8,
    ) -> Result<Dataspace, FormatError> {
        ensure_len(data, start + rank * 8)?;
        let dims = (0..rank)
            .map(|i| LittleEndian::read_u64(&data[start + i * 8..]))
            .collect();
        Ok(Dataspace { version, dims, is_scalar: rank == 0 })
    }

    pub fn num_elements(&self) -> u64 {
        if self.is_scalar {
            return 1;
        }
        self.dims.iter().product()
    }

    /// Version 2 simple (or scalar, for rank 0) dataspace bytes.
    pub fn serialize_v2(dims: &[u64]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + dims.len() * 8);
        out.push(2); // version
        out.push(dims.len() as u8);
        out.push(0); // flags
        out.push(if dims.is_empty() { 0 } else { 1 });
        for &d in dims {
            out.extend_from_slice(&d.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_round_trip() {
        let bytes = Dataspace::serialize_v2(&[50, 354, 512]);
        let ds = Dataspace::parse(&bytes).unwrap();
        assert_eq!(ds.dims, vec![50, 354, 512]);
        assert_eq!(ds.num_elements(), 50 * 354 * 512);
        assert!(!ds.is_scalar);
    }

    #[test]
    fn v2_scalar() {
        let ds = Dataspace::parse(&Dataspace::serialize_v2(&[])).unwrap();
        assert!(ds.is_scalar);
        assert_eq!(ds.num_elements(), 1);
    }

    #[test]
    fn v1_simple() {
        let mut bytes = vec![1u8, 2, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&6u64.to_le_bytes());
        bytes.extend_from_slice(&7u64.to_le_bytes());
        let ds = Dataspace::parse(&bytes).unwrap();
        assert_eq!(ds.dims, vec![6, 7]);
    }
}
