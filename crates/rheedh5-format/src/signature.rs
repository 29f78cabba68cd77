use crate::error::FormatError;

/// The 8-byte HDF5 file signature.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Locate the superblock signature: offset 0 first, then 512 doubling
/// upward until the buffer is exhausted.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    if data.len() >= 8 && data[..8] == HDF5_SIGNATURE {
        return Ok(0);
    }
    let mut offset = 512usize;
    while offset + 8 <= data.len() {
        if data[offset..offset + 8] == HDF5_SIGNATURE {
            return Ok(offset);
        }
        offset = match offset.checked_mul(2) {
            Some(next) => next,
            None => break,
        };
    }
    Err(FormatError::SignatureNotFound)
}
