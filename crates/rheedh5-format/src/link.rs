use byteorder::{ByteOrder, LittleEndian};

use crate::error::{ensure_len, FormatError};
use crate::UNDEFINED_ADDRESS;

/// Link Info message. Compact groups keep both addresses undefined and
/// store their links as inline Link messages instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo {
    pub fractal_heap: u64,
    pub name_index_btree: u64,
}

impl LinkInfo {
    pub fn parse(data: &[u8]) -> Result<LinkInfo, FormatError> {
        ensure_len(data, 2)?;
        if data[0] != 0 {
            return Err(FormatError::UnsupportedVersion { what: "link info", version: data[0] });
        }
        let flags = data[1];
        let mut pos = 2;
        if flags & 0x01 != 0 {
            pos += 8; // maximum creation index
        }
        ensure_len(data, pos + 16)?;
        let fractal_heap = LittleEndian::read_u64(&data[pos..]);
        let name_index_btree = LittleEndian::read_u64(&data[pos + 8..]);
        Ok(LinkInfo { fractal_heap, name_index_btree })
    }

    pub fn is_compact(&self) -> bool {
        self.fractal_heap == UNDEFINED_ADDRESS
    }

    pub fn serialize_compact() -> Vec<u8> {
        let mut out = Vec::with_capacity(18);
        out.push(0); // version
        out.push(0); // flags
        out.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        out.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Object header address.
    Hard(u64),
    Soft(String),
}

/// Version 1 Link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    pub name: String,
    pub target: LinkTarget,
}

impl LinkMessage {
    pub fn parse(data: &[u8]) -> Result<LinkMessage, FormatError> {
        ensure_len(data, 2)?;
        if data[0] != 1 {
            return Err(FormatError::UnsupportedVersion { what: "link", version: data[0] });
        }
        let flags = data[1];
        let mut pos = 2;
        let link_type = if flags & 0x08 != 0 {
            ensure_len(data, pos + 1)?;
            let t = data[pos];
            pos += 1;
            t
        } else {
            0
        };
        if flags & 0x04 != 0 {
            pos += 8; // creation order
        }
        if flags & 0x10 != 0 {
            pos += 1; // link name character set
        }
        let name_len_width = 1usize << (flags & 0x03);
        ensure_len(data, pos + name_len_width)?;
        let mut name_len = 0usize;
        for i in 0..name_len_width {
            name_len |= (data[pos + i] as usize) << (8 * i);
        }
        pos += name_len_width;
        ensure_len(data, pos + name_len)?;
        let name = String::from_utf8(data[pos..pos + name_len].to_vec()).map_err(|_| {
            FormatError::InvalidMessage { what: "link", detail: "name is not valid UTF-8".into() }
        })?;
        pos += name_len;
        let target = match link_type {
            0 => {
                ensure_len(data, pos + 8)?;
                LinkTarget::Hard(LittleEndian::read_u64(&data[pos..]))
            }
            1 => {
                ensure_len(data, pos + 2)?;
                let len = LittleEndian::read_u16(&data[pos..]) as usize;
                ensure_len(data, pos + 2 + len)?;
                let path =
                    String::from_utf8(data[pos + 2..pos + 2 + len].to_vec()).map_err(|_| {
                        FormatError::InvalidMessage {
                            what: "link",
                            detail: "soft link path is not valid UTF-8".into(),
                        }
                    })?;
                LinkTarget::Soft(path)
            }
            other => {
                return Err(FormatError::InvalidMessage {
                    what: "link",
                    detail: format!("unsupported link type {other}"),
                })
            }
        };
        Ok(LinkMessage { name, target })
    }

    /// Hard link with a single-byte name length.
    pub fn serialize_hard(name: &str, object_header: u64) -> Vec<u8> {
        debug_assert!(name.len() < 256);
        let mut out = Vec::with_capacity(3 + name.len() + 8);
        out.push(1); // version
        out.push(0); // flags: 1-byte name length, hard link
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&object_header.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_link_round_trip() {
        let bytes = LinkMessage::serialize_hard("frames", 0x1234);
        let link = LinkMessage::parse(&bytes).unwrap();
        assert_eq!(link.name, "frames");
        assert_eq!(link.target, LinkTarget::Hard(0x1234));
    }

    #[test]
    fn soft_link_parse() {
        let mut bytes = vec![1u8, 0x08, 1]; // version, link-type present, soft
        bytes.push(4);
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&7u16.to_le_bytes());
        bytes.extend_from_slice(b"/frames");
        let link = LinkMessage::parse(&bytes).unwrap();
        assert_eq!(link.name, "data");
        assert_eq!(link.target, LinkTarget::Soft("/frames".into()));
    }

    #[test]
    fn compact_link_info() {
        let info = LinkInfo::parse(&LinkInfo::serialize_compact()).unwrap();
        assert!(info.is_compact());
    }

    #[test]
    fn wide_name_length_field() {
        let name = "x".repeat(300);
        let mut bytes = vec![1u8, 0x01]; // 2-byte name length
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(name.as_bytes());
        bytes.extend_from_slice(&9u64.to_le_bytes());
        let link = LinkMessage::parse(&bytes).unwrap();
        assert_eq!(link.name.len(), 300);
        assert_eq!(link.target, LinkTarget::Hard(9));
    }
}
