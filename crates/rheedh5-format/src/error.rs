use std::fmt;

/// Errors produced while decoding or encoding the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// No HDF5 signature at offset 0 or any power-of-two offset >= 512.
    SignatureNotFound,
    /// A structure carried a version this crate does not handle.
    UnsupportedVersion { what: &'static str, version: u8 },
    /// Ran past the end of the available bytes.
    UnexpectedEof { expected: usize, available: usize },
    /// Offsets or lengths other than 8 bytes wide.
    InvalidOffsetSize(u8),
    /// Stored metadata checksum disagrees with the computed one.
    ChecksumMismatch { stored: u32, computed: u32 },
    /// A block signature ("OHDR", "TREE", ...) was not where it should be.
    BadSignature { expected: &'static str },
    /// A header message carried the must-understand flag but is unknown.
    UnknownCriticalMessage(u16),
    /// A message body did not decode.
    InvalidMessage { what: &'static str, detail: String },
    /// An address field was the undefined marker where a real one is needed.
    UndefinedAddress(&'static str),
    /// A datatype class/size combination this crate does not decode.
    UnsupportedDatatype { class: u8, size: u32 },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => write!(f, "HDF5 signature not found"),
            FormatError::UnsupportedVersion { what, version } => {
                write!(f, "unsupported {what} version {version}")
            }
            FormatError::UnexpectedEof { expected, available } => {
                write!(f, "unexpected end of data: needed {expected} bytes, had {available}")
            }
            FormatError::InvalidOffsetSize(size) => {
                write!(f, "unsupported offset/length size {size} (only 8 supported)")
            }
            FormatError::ChecksumMismatch { stored, computed } => {
                write!(f, "checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")
            }
            FormatError::BadSignature { expected } => {
                write!(f, "bad block signature, expected {expected:?}")
            }
            FormatError::UnknownCriticalMessage(ty) => {
                write!(f, "unknown header message type {ty:#06x} marked must-understand")
            }
            FormatError::InvalidMessage { what, detail } => {
                write!(f, "invalid {what} message: {detail}")
            }
            FormatError::UndefinedAddress(what) => {
                write!(f, "undefined address for {what}")
            }
            FormatError::UnsupportedDatatype { class, size } => {
                write!(f, "unsupported datatype class {class} of size {size}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Errors from the file-level reader and writer handles.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Format(FormatError),
    /// No object with that name/path.
    NotFound(String),
    /// The named object is a group, not a dataset.
    NotADataset(String),
    /// The named object is a dataset, not a group.
    NotAGroup(String),
    /// The object header lacks a message the operation needs.
    MissingMessage(&'static str),
    /// A typed read against a dataset of a different element type.
    TypeMismatch { expected: &'static str, found: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Format(err) => write!(f, "format error: {err}"),
            Error::NotFound(name) => write!(f, "object {name:?} not found"),
            Error::NotADataset(name) => write!(f, "object {name:?} is not a dataset"),
            Error::NotAGroup(name) => write!(f, "object {name:?} is not a group"),
            Error::MissingMessage(what) => write!(f, "object header has no {what} message"),
            Error::TypeMismatch { expected, found } => {
                write!(f, "expected {expected} elements, dataset stores {found}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Format(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Error {
        Error::Format(err)
    }
}

/// Bounds-check helper shared by the parsers.
pub(crate) fn ensure_len(buf: &[u8], needed: usize) -> Result<(), FormatError> {
    if buf.len() < needed {
        return Err(FormatError::UnexpectedEof { expected: needed, available: buf.len() });
    }
    Ok(())
}
