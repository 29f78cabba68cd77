//! Typed measurement records. Every quantity is optional, mirroring an
//! entry that a user fills in (or an extraction pass populates) field
//! by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Acquisition parameters shared by all frames of one recording.
/// When a measurement references several files, the settings of the
/// last processed file are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSettings {
    /// Frame rate after on-camera averaging, in Hz.
    pub avg_frame_rate: Option<i64>,
    /// Frame extent as stored by the acquisition, e.g. `50,354,512`.
    pub dimensions: Option<String>,
    /// Frames per storage chunk; acquisitions write between 1 and 50.
    pub chunk_size: Option<i64>,
    /// Whether the sample stage rotated during acquisition.
    pub is_rotating: Option<bool>,
    /// Whether frames were streamed rather than stored in one shot.
    pub is_stream: Option<bool>,
    /// Native camera frame rate, in Hz.
    pub raw_frame_rate: Option<i64>,
}

/// Extraction output for one referenced container file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    /// The container file name.
    pub name: Option<String>,
    /// Opaque identifier the acquisition assigns to the recording.
    pub data_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Reference to the frame stack inside the file, `<file>#/frames`.
    pub frames: Option<String>,
}

/// One RHEED measurement entry: user-entered identification fields plus
/// the per-file extraction results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RheedMeasurement {
    pub name: Option<String>,
    /// When the measurement started; entered by the user, shown as
    /// "start_time".
    pub datetime: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Container files to extract from, in acquisition order.
    pub hdf5_file: Vec<String>,
    pub measurement_settings: Option<MeasurementSettings>,
    /// One entry per file in `hdf5_file`, same order.
    pub results: Vec<Results>,
}

/// Inclusive range the acquisition software uses for `chunk_size`.
pub const CHUNK_SIZE_RANGE: std::ops::RangeInclusive<i64> = 1..=50;

impl MeasurementSettings {
    /// Whether the stored chunk size is inside the documented range.
    /// An unset value counts as in range.
    pub fn chunk_size_in_range(&self) -> bool {
        self.chunk_size.map_or(true, |v| CHUNK_SIZE_RANGE.contains(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn chunk_size_range_check() {
        let mut settings = MeasurementSettings::default();
        assert!(settings.chunk_size_in_range());
        settings.chunk_size = Some(50);
        assert!(settings.chunk_size_in_range());
        settings.chunk_size = Some(0);
        assert!(!settings.chunk_size_in_range());
        settings.chunk_size = Some(51);
        assert!(!settings.chunk_size_in_range());
    }

    #[test]
    fn records_serialize_to_archive_json() {
        let measurement = RheedMeasurement {
            name: Some("growth run 7".into()),
            hdf5_file: vec!["50.h5".into()],
            results: vec![Results {
                name: Some("50.h5".into()),
                data_id: Some("4b6cc67b-9375-4818-90fd-81c07b107d43".into()),
                start_time: Utc.with_ymd_and_hms(2025, 3, 10, 14, 14, 38).single(),
                end_time: Utc.with_ymd_and_hms(2025, 3, 10, 14, 14, 38).single(),
                frames: Some("50.h5#/frames".into()),
            }],
            ..RheedMeasurement::default()
        };
        let json = serde_json::to_value(&measurement).unwrap();
        assert_eq!(json["results"][0]["frames"], "50.h5#/frames");
        assert_eq!(json["results"][0]["start_time"], "2025-03-10T14:14:38Z");
        assert_eq!(json["results"][0]["data_id"], "4b6cc67b-9375-4818-90fd-81c07b107d43");
        let back: RheedMeasurement = serde_json::from_value(json).unwrap();
        assert_eq!(back, measurement);
    }
}
