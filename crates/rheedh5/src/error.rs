use thiserror::Error;

/// Errors raised while extracting measurement metadata from a container.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("attribute {0:?} is missing")]
    MissingKey(String),

    #[error("attribute {key:?}: expected {expected}, found {found}")]
    WrongType { key: String, expected: &'static str, found: &'static str },

    #[error("attribute {key:?}: {value:?} does not parse as a number")]
    BadNumber { key: String, value: String },

    #[error("attribute {key:?}: {value:?} is not a millisecond UNIX timestamp")]
    BadTimestamp { key: String, value: String },

    #[error("file {0:?} is not available")]
    FileUnavailable(String),

    #[error("container error: {0}")]
    Container(#[from] rheedh5_format::Error),
}
