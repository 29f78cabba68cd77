use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::jenkins_lookup3;
use crate::error::{ensure_len, FormatError};
use crate::signature::{find_signature, HDF5_SIGNATURE};
use crate::UNDEFINED_ADDRESS;

/// Parsed superblock, normalized across versions 0 through 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub version: u8,
    pub offset_size: u8,
    pub length_size: u8,
    /// Byte offset of the signature inside the file (user-block size).
    pub base_address: u64,
    pub eof_address: u64,
    /// Address of the root group object header.
    pub root_object_header: u64,
}

impl Superblock {
    /// Locate and parse the superblock in `data`.
    pub fn parse(data: &[u8]) -> Result<Superblock, FormatError> {
        let start = find_signature(data)?;
        let buf = &data[start..];
        ensure_len(buf, 9)?;
        let version = buf[8];
        let mut sb = match version {
            0 | 1 => Self::parse_v0_v1(buf, version)?,
            2 | 3 => Self::parse_v2_v3(buf, version)?,
            other => {
                return Err(FormatError::UnsupportedVersion { what: "superblock", version: other })
            }
        };
        sb.base_address = start as u64;
        Ok(sb)
    }

    fn parse_v0_v1(buf: &[u8], version: u8) -> Result<Superblock, FormatError> {
        // v1 inserts two extra fields (indexed-storage k + reserved) after
        // the group internal node k.
        let addr_start = if version == 0 { 24 } else { 28 };
        ensure_len(buf, addr_start + 4 * 8 + 40)?;
        let offset_size = buf[13];
        let length_size = buf[14];
        validate_sizes(offset_size, length_size)?;
        let eof_address = LittleEndian::read_u64(&buf[addr_start + 16..]);
        // Root group symbol table entry follows the four file addresses:
        // link name offset (8), then the object header address.
        let root_entry = addr_start + 4 * 8;
        let root_object_header = LittleEndian::read_u64(&buf[root_entry + 8..]);
        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address: 0,
            eof_address,
            root_object_header,
        })
    }

    fn parse_v2_v3(buf: &[u8], version: u8) -> Result<Superblock, FormatError> {
        ensure_len(buf, 48)?;
        let offset_size = buf[9];
        let length_size = buf[10];
        validate_sizes(offset_size, length_size)?;
        let stored = LittleEndian::read_u32(&buf[44..48]);
        let computed = jenkins_lookup3(&buf[..44]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch { stored, computed });
        }
        let eof_address = LittleEndian::read_u64(&buf[28..36]);
        let root_object_header = LittleEndian::read_u64(&buf[36..44]);
        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address: 0,
            eof_address,
            root_object_header,
        })
    }

    /// Serialized size of the version 3 superblock this crate writes.
    pub const V3_SIZE: usize = 48;

    /// Serialize a version 3 superblock.
    pub fn serialize_v3(eof_address: u64, root_object_header: u64) -> [u8; Self::V3_SIZE] {
        let mut out = [0u8; Self::V3_SIZE];
        out[..8].copy_from_slice(&HDF5_SIGNATURE);
        out[8] = 3; // version
        out[9] = 8; // offset size
        out[10] = 8; // length size
        out[11] = 0; // file consistency flags
        LittleEndian::write_u64(&mut out[12..20], 0); // base address
        LittleEndian::write_u64(&mut out[20..28], UNDEFINED_ADDRESS); // extension
        LittleEndian::write_u64(&mut out[28..36], eof_address);
        LittleEndian::write_u64(&mut out[36..44], root_object_header);
        let checksum = jenkins_lookup3(&out[..44]);
        LittleEndian::write_u32(&mut out[44..48], checksum);
        out
    }
}

fn validate_sizes(offset_size: u8, length_size: u8) -> Result<(), FormatError> {
    if offset_size != 8 {
        return Err(FormatError::InvalidOffsetSize(offset_size));
    }
    if length_size != 8 {
        return Err(FormatError::InvalidOffsetSize(length_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_v0_bytes(root_oh: u64) -> Vec<u8> {
        let mut buf = vec![0u8; 24 + 32 + 40];
        buf[..8].copy_from_slice(&HDF5_SIGNATURE);
        buf[8] = 0; // superblock version
        buf[13] = 8; // offset size
        buf[14] = 8; // length size
        LittleEndian::write_u16(&mut buf[16..18], 4); // leaf k
        LittleEndian::write_u16(&mut buf[18..20], 16); // internal k
        LittleEndian::write_u64(&mut buf[24..32], 0); // base
        LittleEndian::write_u64(&mut buf[32..40], UNDEFINED_ADDRESS); // free space
        LittleEndian::write_u64(&mut buf[40..48], 4096); // eof
        LittleEndian::write_u64(&mut buf[48..56], UNDEFINED_ADDRESS); // driver info
        // root symbol table entry
        LittleEndian::write_u64(&mut buf[56..64], 0); // link name offset
        LittleEndian::write_u64(&mut buf[64..72], root_oh);
        buf
    }

    #[test]
    fn parses_v0() {
        let sb = Superblock::parse(&build_v0_bytes(96)).unwrap();
        assert_eq!(sb.version, 0);
        assert_eq!(sb.eof_address, 4096);
        assert_eq!(sb.root_object_header, 96);
    }

    #[test]
    fn v3_round_trip() {
        let bytes = Superblock::serialize_v3(2048, 48);
        let sb = Superblock::parse(&bytes).unwrap();
        assert_eq!(sb.version, 3);
        assert_eq!(sb.offset_size, 8);
        assert_eq!(sb.eof_address, 2048);
        assert_eq!(sb.root_object_header, 48);
    }

    #[test]
    fn v3_checksum_is_verified() {
        let mut bytes = Superblock::serialize_v3(2048, 48).to_vec();
        bytes[36] ^= 0xFF;
        match Superblock::parse(&bytes) {
            Err(FormatError::ChecksumMismatch { .. }) => {}
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = build_v0_bytes(96);
        bytes[8] = 9;
        match Superblock::parse(&bytes) {
            Err(FormatError::UnsupportedVersion { what: "superblock", version: 9 }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn records_user_block_offset() {
        let mut data = vec![0u8; 512];
        data.extend_from_slice(&Superblock::serialize_v3(1024, 48));
        let sb = Superblock::parse(&data).unwrap();
        assert_eq!(sb.base_address, 512);
    }
}
