//! RHEED measurement schema: typed records, editor presentation
//! metadata, and a normalization pass that extracts acquisition
//! metadata from the referenced HDF5 containers.
//!
//! A measurement lists its container files in `hdf5_file`; running
//! [`normalize()`] opens each one through a [`FileAccess`] source, reads
//! the fixed root-attribute set, and fills `measurement_settings` plus
//! one [`Results`] entry per file.

pub mod access;
pub mod attrs;
pub mod error;
pub mod normalize;
pub mod plugin;
pub mod presentation;
pub mod records;

pub use access::{DirectoryAccess, FileAccess, MemoryAccess};
pub use attrs::AttrReader;
pub use error::ExtractError;
pub use normalize::{normalize, RHEED_DATA_STREAM};
pub use plugin::{RheedEntryPoint, SchemaPackage};
pub use presentation::{display_label, widget_hint, Widget, WidgetHint};
pub use records::{MeasurementSettings, Results, RheedMeasurement};
