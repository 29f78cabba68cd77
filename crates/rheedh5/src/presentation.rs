//! Editor widget hints, kept as data beside the records instead of
//! annotations on them. Keyed by record and field name.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Widget {
    StringEdit,
    NumberEdit,
    BoolEdit,
    DateTimeEdit,
    FileEdit,
}

/// How an editor should render one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetHint {
    pub widget: Widget,
    /// Display label when it differs from the field name.
    pub label: Option<&'static str>,
}

// (record, field, widget, label override)
const HINTS: &[(&str, &str, Widget, Option<&str>)] = &[
    ("Results", "name", Widget::StringEdit, Some("file_name")),
    ("Results", "data_id", Widget::StringEdit, None),
    ("Results", "start_time", Widget::DateTimeEdit, None),
    ("Results", "end_time", Widget::DateTimeEdit, None),
    ("MeasurementSettings", "avg_frame_rate", Widget::NumberEdit, None),
    ("MeasurementSettings", "dimensions", Widget::StringEdit, None),
    ("MeasurementSettings", "chunk_size", Widget::NumberEdit, None),
    ("MeasurementSettings", "is_rotating", Widget::BoolEdit, None),
    ("MeasurementSettings", "is_stream", Widget::BoolEdit, None),
    ("MeasurementSettings", "raw_frame_rate", Widget::NumberEdit, None),
    ("RheedMeasurement", "name", Widget::StringEdit, None),
    ("RheedMeasurement", "datetime", Widget::DateTimeEdit, Some("start_time")),
    ("RheedMeasurement", "end_time", Widget::DateTimeEdit, None),
    ("RheedMeasurement", "hdf5_file", Widget::FileEdit, None),
];

/// Hint for `record.field`, if the field is user-editable. Fields
/// without a hint (such as `Results.frames`) are extraction-only.
pub fn widget_hint(record: &str, field: &str) -> Option<WidgetHint> {
    HINTS
        .iter()
        .find(|(r, f, _, _)| *r == record && *f == field)
        .map(|&(_, _, widget, label)| WidgetHint { widget, label })
}

/// The label an editor should show for `record.field`: the override
/// when one exists, the field name otherwise.
pub fn display_label<'a>(record: &str, field: &'a str) -> &'a str {
    match widget_hint(record, field) {
        Some(WidgetHint { label: Some(label), .. }) => label,
        _ => field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_overrides() {
        assert_eq!(display_label("Results", "name"), "file_name");
        assert_eq!(display_label("RheedMeasurement", "datetime"), "start_time");
        assert_eq!(display_label("RheedMeasurement", "end_time"), "end_time");
    }

    #[test]
    fn settings_fields_have_hints() {
        for field in
            ["avg_frame_rate", "dimensions", "chunk_size", "is_rotating", "is_stream", "raw_frame_rate"]
        {
            assert!(widget_hint("MeasurementSettings", field).is_some(), "{field}");
        }
        assert_eq!(
            widget_hint("MeasurementSettings", "is_stream").map(|h| h.widget),
            Some(Widget::BoolEdit)
        );
    }

    #[test]
    fn data_id_edits_as_text() {
        assert_eq!(
            widget_hint("Results", "data_id").map(|h| h.widget),
            Some(Widget::StringEdit)
        );
    }

    #[test]
    fn frames_is_extraction_only() {
        assert!(widget_hint("Results", "frames").is_none());
    }

    #[test]
    fn file_picker_for_containers() {
        assert_eq!(
            widget_hint("RheedMeasurement", "hdf5_file").map(|h| h.widget),
            Some(Widget::FileEdit)
        );
    }
}
