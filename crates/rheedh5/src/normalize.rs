//! The extraction pass: read the attribute set of every referenced
//! container and fill the measurement's settings and results.

use tracing::{debug, debug_span, warn};

use crate::access::FileAccess;
use crate::attrs::AttrReader;
use crate::error::ExtractError;
use crate::records::{MeasurementSettings, Results, RheedMeasurement};

/// Attribute value identifying RHEED containers.
pub const RHEED_DATA_STREAM: &str = "rheed";

/// Populate `measurement.results` and `measurement.measurement_settings`
/// from the files listed in `measurement.hdf5_file`, in order.
///
/// Results are rebuilt from scratch on every call, so repeating the pass
/// over unchanged inputs reproduces the same state. Settings are
/// overwritten per file; with several files the last one wins. An error
/// propagates immediately and leaves the results of the files already
/// processed in place.
pub fn normalize(
    measurement: &mut RheedMeasurement,
    access: &dyn FileAccess,
) -> Result<(), ExtractError> {
    let span = debug_span!("normalize", files = measurement.hdf5_file.len());
    let _guard = span.enter();

    measurement.results.clear();
    let file_names = measurement.hdf5_file.clone();
    for file_name in &file_names {
        extract_file(measurement, access, file_name)?;
    }
    Ok(())
}

fn extract_file(
    measurement: &mut RheedMeasurement,
    access: &dyn FileAccess,
    file_name: &str,
) -> Result<(), ExtractError> {
    debug!(file = file_name, "extracting container metadata");
    let file = access.open(file_name)?;
    let root = file.root()?;
    let attrs = AttrReader::from_group(&root)?;

    if let Some(stream) = attrs.optional_str("data_stream")? {
        if stream != RHEED_DATA_STREAM {
            warn!(file = file_name, data_stream = %stream, "unexpected data stream tag");
        }
    }

    let result = Results {
        name: Some(file_name.to_owned()),
        data_id: Some(attrs.require_str("data_id")?),
        start_time: Some(attrs.require_millis_utc("start_unix_ms_utc")?),
        end_time: Some(attrs.require_millis_utc("end_unix_ms_utc")?),
        frames: Some(format!("{file_name}#/frames")),
    };

    let settings = MeasurementSettings {
        avg_frame_rate: Some(attrs.require_i64("avg_frame_rate")?),
        dimensions: Some(attrs.require_str("dims")?),
        chunk_size: Some(attrs.require_i64("chunk_size")?),
        is_rotating: Some(attrs.require_bool("is_rotating")?),
        is_stream: Some(attrs.require_bool("is_stream")?),
        raw_frame_rate: Some(attrs.require_i64("raw_frame_rate")?),
    };
    if !settings.chunk_size_in_range() {
        warn!(file = file_name, chunk_size = ?settings.chunk_size, "chunk_size outside 1..=50");
    }
    check_frames_extent(&file, file_name, settings.dimensions.as_deref());

    measurement.measurement_settings = Some(settings);
    measurement.results.push(result);
    Ok(())
}

/// Cross-check the frame stack against the `dims` attribute. Shape
/// drift is logged, never fatal: the attribute set stays authoritative.
fn check_frames_extent(file: &rheedh5_format::File, file_name: &str, dims_attr: Option<&str>) {
    let frames = match file.dataset("/frames") {
        Ok(frames) => frames,
        Err(_) => {
            debug!(file = file_name, "no /frames dataset");
            return;
        }
    };
    let shape = match frames.shape() {
        Ok(shape) => shape,
        Err(err) => {
            warn!(file = file_name, error = %err, "frames shape unreadable");
            return;
        }
    };
    debug!(file = file_name, shape = ?shape, "frames dataset");
    let declared = dims_attr.and_then(leading_extent);
    if let (Some(declared), Some(&actual)) = (declared, shape.first()) {
        if declared != actual {
            warn!(
                file = file_name,
                declared,
                actual,
                "frame count in dims attribute disagrees with /frames"
            );
        }
    }
}

/// First integer inside a dims string such as `50,354,512`.
fn leading_extent(dims: &str) -> Option<u64> {
    let digits: String =
        dims.chars().skip_while(|c| !c.is_ascii_digit()).take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_extent_parses_dims_strings() {
        assert_eq!(leading_extent("50,354,512"), Some(50));
        assert_eq!(leading_extent("(50, 354, 512)"), Some(50));
        assert_eq!(leading_extent("none"), None);
    }
}
