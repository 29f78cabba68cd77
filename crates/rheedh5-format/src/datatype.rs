use byteorder::{ByteOrder, LittleEndian};

use crate::error::{ensure_len, FormatError};

/// The datatype classes RHEED containers use: integers, IEEE floats and
/// fixed-length strings. Everything else is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    FixedPoint { size: u32, signed: bool, big_endian: bool },
    Float { size: u32, big_endian: bool },
    String { size: u32 },
}

impl Datatype {
    pub fn parse(data: &[u8]) -> Result<Datatype, FormatError> {
        ensure_len(data, 8)?;
        let class = data[0] & 0x0F;
        let version = data[0] >> 4;
        if !(1..=3).contains(&version) {
            return Err(FormatError::UnsupportedVersion { what: "datatype", version });
        }
        let bf0 = data[1];
        let size = LittleEndian::read_u32(&data[4..8]);
        match class {
            0 => {
                if !matches!(size, 1 | 2 | 4 | 8) {
                    return Err(FormatError::UnsupportedDatatype { class, size });
                }
                Ok(Datatype::FixedPoint {
                    size,
                    signed: bf0 & 0x08 != 0,
                    big_endian: bf0 & 0x01 != 0,
                })
            }
            1 => {
                if size != 4 && size != 8 {
                    return Err(FormatError::UnsupportedDatatype { class, size });
                }
                Ok(Datatype::Float { size, big_endian: bf0 & 0x01 != 0 })
            }
            3 => Ok(Datatype::String { size }),
            other => Err(FormatError::UnsupportedDatatype { class: other, size }),
        }
    }

    pub fn size(&self) -> u32 {
        match *self {
            Datatype::FixedPoint { size, .. } => size,
            Datatype::Float { size, .. } => size,
            Datatype::String { size } => size,
        }
    }

    /// Little-endian signed/unsigned fixed-point datatype message bytes.
    pub fn serialize_fixed(size: u32, signed: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(12);
        out.push(0x10); // version 1, class 0
        out.push(if signed { 0x08 } else { 0x00 });
        out.push(0);
        out.push(0);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // bit offset
        out.extend_from_slice(&((size * 8) as u16).to_le_bytes()); // precision
        out
    }

    /// Little-endian IEEE f64 datatype message bytes.
    pub fn serialize_f64() -> Vec<u8> {
        let mut out = Vec::with_capacity(20);
        out.push(0x11); // version 1, class 1
        out.push(0x20); // LE, implied-MSB mantissa normalization
        out.push(63); // sign bit location
        out.push(0);
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // bit offset
        out.extend_from_slice(&64u16.to_le_bytes()); // precision
        out.push(52); // exponent location
        out.push(11); // exponent size
        out.push(0); // mantissa location
        out.push(52); // mantissa size
        out.extend_from_slice(&1023u32.to_le_bytes()); // exponent bias
        out
    }

    /// Fixed-length string datatype message bytes (null-terminated, UTF-8).
    pub fn serialize_string(size: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        out.push(0x13); // version 1, class 3
        out.push(0x10); // padding 0 (null terminate), charset 1 (UTF-8)
        out.push(0);
        out.push(0);
        out.extend_from_slice(&size.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_round_trip() {
        let dt = Datatype::parse(&Datatype::serialize_fixed(8, true)).unwrap();
        assert_eq!(dt, Datatype::FixedPoint { size: 8, signed: true, big_endian: false });
        let dt = Datatype::parse(&Datatype::serialize_fixed(1, false)).unwrap();
        assert_eq!(dt, Datatype::FixedPoint { size: 1, signed: false, big_endian: false });
    }

    #[test]
    fn f64_round_trip() {
        let dt = Datatype::parse(&Datatype::serialize_f64()).unwrap();
        assert_eq!(dt, Datatype::Float { size: 8, big_endian: false });
    }

    #[test]
    fn string_round_trip() {
        let dt = Datatype::parse(&Datatype::serialize_string(13)).unwrap();
        assert_eq!(dt, Datatype::String { size: 13 });
        assert_eq!(dt.size(), 13);
    }

    #[test]
    fn rejects_exotic_classes() {
        // Compound (class 6) is outside the supported subset.
        let mut bytes = Datatype::serialize_fixed(8, true);
        bytes[0] = 0x16;
        match Datatype::parse(&bytes) {
            Err(FormatError::UnsupportedDatatype { class: 6, .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }
}
