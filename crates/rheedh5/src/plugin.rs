//! Plugin entry point: names the schema package and carries the
//! deserializable configuration knobs.

use serde::{Deserialize, Serialize};

use crate::presentation::{widget_hint, WidgetHint};

/// Configuration of the schema-package entry point. Deserialized from
/// plugin configuration; unspecified fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RheedEntryPoint {
    pub name: String,
    pub description: String,
    pub parameter: i64,
}

impl Default for RheedEntryPoint {
    fn default() -> RheedEntryPoint {
        RheedEntryPoint {
            name: "rheedh5.schema".into(),
            description: "RHEED measurement schema with HDF5 metadata extraction".into(),
            parameter: 0,
        }
    }
}

impl RheedEntryPoint {
    /// Materialize the package descriptor this entry point provides.
    pub fn load(&self) -> SchemaPackage {
        SchemaPackage { name: self.name.clone() }
    }
}

/// The loaded package: record names plus their presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaPackage {
    pub name: String,
}

impl SchemaPackage {
    pub const RECORDS: &'static [&'static str] =
        &["MeasurementSettings", "Results", "RheedMeasurement"];

    pub fn records(&self) -> &'static [&'static str] {
        Self::RECORDS
    }

    pub fn widget_hint(&self, record: &str, field: &str) -> Option<WidgetHint> {
        widget_hint(record, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::Widget;

    #[test]
    fn defaults_apply_to_missing_config() {
        let ep: RheedEntryPoint = serde_json::from_str("{}").unwrap();
        assert_eq!(ep, RheedEntryPoint::default());
        assert_eq!(ep.parameter, 0);
    }

    #[test]
    fn config_overrides_parameter() {
        let ep: RheedEntryPoint =
            serde_json::from_str(r#"{"parameter": 7, "name": "site.rheed"}"#).unwrap();
        assert_eq!(ep.parameter, 7);
        assert_eq!(ep.name, "site.rheed");
        assert_eq!(ep.load().name, "site.rheed");
    }

    #[test]
    fn package_exposes_presentation_metadata() {
        let package = RheedEntryPoint::default().load();
        assert!(package.records().contains(&"RheedMeasurement"));
        assert_eq!(
            package.widget_hint("RheedMeasurement", "hdf5_file").map(|h| h.widget),
            Some(Widget::FileEdit)
        );
    }
}
