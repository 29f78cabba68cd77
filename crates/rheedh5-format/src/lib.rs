//! Pure-Rust reading and writing of the HDF5 binary-format subset that
//! RHEED acquisition containers use: superblocks 0-3, version 1/2
//! object headers, root and nested groups, scalar and array attributes,
//! contiguous and chunked dataset storage indexed by a version 1
//! B-tree. No filter pipeline and no C library.
//!
//! The low-level modules parse individual structures from byte slices;
//! [`reader::File`] and [`writer::FileBuilder`] are the handles most
//! callers want.

pub mod attribute;
pub mod btree_v1;
pub mod checksum;
pub mod chunked;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod group;
pub mod link;
pub mod message_type;
pub mod object_header;
pub mod reader;
pub mod signature;
pub mod superblock;
pub mod types;
pub mod writer;

pub use error::{Error, FormatError};
pub use reader::{Dataset, File, Group};
pub use types::AttrValue;
pub use writer::FileBuilder;

/// Address fields use all-ones to mean "not set".
pub const UNDEFINED_ADDRESS: u64 = u64::MAX;
