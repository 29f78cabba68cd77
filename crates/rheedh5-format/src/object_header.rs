use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::jenkins_lookup3;
use crate::error::{ensure_len, FormatError};
use crate::message_type::MessageType;

const OHDR_SIGNATURE: &[u8; 4] = b"OHDR";
const OCHK_SIGNATURE: &[u8; 4] = b"OCHK";

/// One decoded header message, body kept as raw bytes for the
/// message-specific parsers.
#[derive(Debug, Clone)]
pub struct HeaderMessage {
    pub msg_type: MessageType,
    pub flags: u8,
    pub data: Vec<u8>,
}

/// Object header (version 1 or 2) with all continuation blocks folded in.
#[derive(Debug, Clone)]
pub struct ObjectHeader {
    pub version: u8,
    pub messages: Vec<HeaderMessage>,
}

/// The must-understand message flag.
const FLAG_FAIL_UNKNOWN: u8 = 0x08;

impl ObjectHeader {
    /// Parse the object header at absolute offset `addr` in `file`.
    pub fn parse(file: &[u8], addr: u64) -> Result<ObjectHeader, FormatError> {
        let addr = addr as usize;
        ensure_len(file, addr + 4)?;
        if &file[addr..addr + 4] == OHDR_SIGNATURE {
            Self::parse_v2(file, addr)
        } else {
            Self::parse_v1(file, addr)
        }
    }

    pub fn find_message(&self, ty: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == ty)
    }

    pub fn messages_of<'a>(
        &'a self,
        ty: MessageType,
    ) -> impl Iterator<Item = &'a HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == ty)
    }

    fn parse_v1(file: &[u8], addr: usize) -> Result<ObjectHeader, FormatError> {
        ensure_len(file, addr + 16)?;
        let version = file[addr];
        if version != 1 {
            return Err(FormatError::UnsupportedVersion { what: "object header", version });
        }
        let num_messages = LittleEndian::read_u16(&file[addr + 2..]) as usize;
        let header_size = LittleEndian::read_u32(&file[addr + 8..]) as usize;

        // The 12-byte prefix is padded so the first message starts on an
        // 8-byte boundary.
        let mut blocks: Vec<(usize, usize)> = vec![(addr + 16, header_size)];
        let mut messages = Vec::with_capacity(num_messages);
        let mut block_idx = 0;
        while messages.len() < num_messages {
            if block_idx >= blocks.len() {
                return Err(FormatError::InvalidMessage {
                    what: "object header",
                    detail: format!(
                        "header claims {num_messages} messages, found {}",
                        messages.len()
                    ),
                });
            }
            let (start, len) = blocks[block_idx];
            block_idx += 1;
            ensure_len(file, start + len)?;
            let mut pos = start;
            let end = start + len;
            while messages.len() < num_messages && pos + 8 <= end {
                let raw_type = LittleEndian::read_u16(&file[pos..]);
                let size = LittleEndian::read_u16(&file[pos + 2..]) as usize;
                let flags = file[pos + 4];
                pos += 8;
                if pos + size > end {
                    return Err(FormatError::UnexpectedEof { expected: pos + size, available: end });
                }
                let data = file[pos..pos + size].to_vec();
                pos += size;
                push_message(&mut messages, &mut blocks, raw_type, flags, data)?;
            }
        }
        Ok(ObjectHeader { version: 1, messages })
    }

    fn parse_v2(file: &[u8], addr: usize) -> Result<ObjectHeader, FormatError> {
        ensure_len(file, addr + 6)?;
        let version = file[addr + 4];
        if version != 2 {
            return Err(FormatError::UnsupportedVersion { what: "object header", version });
        }
        let header_flags = file[addr + 5];
        let mut pos = addr + 6;
        if header_flags & 0x20 != 0 {
            pos += 16; // access/mod/change/birth timestamps
        }
        if header_flags & 0x10 != 0 {
            pos += 4; // max compact / min dense attribute counts
        }
        let size_width = 1usize << (header_flags & 0x03);
        ensure_len(file, pos + size_width)?;
        let chunk0_size = read_le_uint(&file[pos..pos + size_width]) as usize;
        pos += size_width;

        let creation_order = header_flags & 0x04 != 0;
        let mut messages = Vec::new();
        // (messages start, messages len, checksum region start)
        let mut blocks: Vec<(usize, usize, usize)> = vec![(pos, chunk0_size, addr)];
        let mut block_idx = 0;
        while block_idx < blocks.len() {
            let (start, len, sig_start) = blocks[block_idx];
            block_idx += 1;
            ensure_len(file, start + len + 4)?;
            let stored = LittleEndian::read_u32(&file[start + len..]);
            let computed = jenkins_lookup3(&file[sig_start..start + len]);
            if stored != computed {
                return Err(FormatError::ChecksumMismatch { stored, computed });
            }
            parse_v2_messages(
                file,
                start,
                len,
                creation_order,
                &mut messages,
                &mut blocks,
            )?;
        }
        Ok(ObjectHeader { version: 2, messages })
    }
}

fn parse_v2_messages(
    file: &[u8],
    start: usize,
    len: usize,
    creation_order: bool,
    messages: &mut Vec<HeaderMessage>,
    blocks: &mut Vec<(usize, usize, usize)>,
) -> Result<(), FormatError> {
    let head_len = if creation_order { 6 } else { 4 };
    let mut pos = start;
    let end = start + len;
    while pos + head_len <= end {
        let raw_type = file[pos] as u16;
        let size = LittleEndian::read_u16(&file[pos + 1..]) as usize;
        let flags = file[pos + 3];
        pos += head_len;
        if pos + size > end {
            return Err(FormatError::UnexpectedEof { expected: pos + size, available: end });
        }
        let data = file[pos..pos + size].to_vec();
        pos += size;
        match MessageType::from_u16(raw_type) {
            MessageType::ObjectHeaderContinuation => {
                ensure_len(&data, 16)?;
                let offset = LittleEndian::read_u64(&data) as usize;
                let length = LittleEndian::read_u64(&data[8..]) as usize;
                // Continuation blocks open with an OCHK signature; the
                // stated length covers signature, messages and checksum.
                if length < 8 {
                    return Err(FormatError::InvalidMessage {
                        what: "continuation",
                        detail: format!("block length {length} too small"),
                    });
                }
                ensure_len(file, offset + 4)?;
                if &file[offset..offset + 4] != OCHK_SIGNATURE {
                    return Err(FormatError::BadSignature { expected: "OCHK" });
                }
                blocks.push((offset + 4, length - 8, offset));
            }
            MessageType::Unknown(ty) if flags & FLAG_FAIL_UNKNOWN != 0 => {
                return Err(FormatError::UnknownCriticalMessage(ty));
            }
            ty => messages.push(HeaderMessage { msg_type: ty, flags, data }),
        }
    }
    Ok(())
}

fn push_message(
    messages: &mut Vec<HeaderMessage>,
    blocks: &mut Vec<(usize, usize)>,
    raw_type: u16,
    flags: u8,
    data: Vec<u8>,
) -> Result<(), FormatError> {
    match MessageType::from_u16(raw_type) {
        MessageType::ObjectHeaderContinuation => {
            ensure_len(&data, 16)?;
            let offset = LittleEndian::read_u64(&data) as usize;
            let length = LittleEndian::read_u64(&data[8..]) as usize;
            blocks.push((offset, length));
            // The continuation still counts toward the message total.
            messages.push(HeaderMessage {
                msg_type: MessageType::Nil,
                flags,
                data: Vec::new(),
            });
        }
        MessageType::Unknown(ty) if flags & FLAG_FAIL_UNKNOWN != 0 => {
            return Err(FormatError::UnknownCriticalMessage(ty));
        }
        ty => messages.push(HeaderMessage { msg_type: ty, flags, data }),
    }
    Ok(())
}

fn read_le_uint(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for (i, &b) in bytes.iter().enumerate() {
        value |= (b as u64) << (8 * i);
    }
    value
}
