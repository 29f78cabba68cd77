//! End-to-end extraction over containers built in memory, shaped like
//! the files the acquisition software writes.

use chrono::{TimeZone, Utc};
use rheedh5::{
    normalize, DirectoryAccess, ExtractError, MeasurementSettings, MemoryAccess, RheedMeasurement,
};
use rheedh5_format::{AttrValue, FileBuilder};

struct Fixture {
    start_ms: &'static str,
    end_ms: &'static str,
    data_id: &'static str,
    frames: u64,
    chunk_size: &'static str,
}

impl Default for Fixture {
    fn default() -> Fixture {
        Fixture {
            start_ms: "1741616078554",
            end_ms: "1741616078975",
            data_id: "4b6cc67b-9375-4818-90fd-81c07b107d43",
            frames: 4,
            chunk_size: "50",
        }
    }
}

// Attributes are stored as fixed-length strings, the way the
// acquisition software writes them.
fn build_container(fx: &Fixture) -> Vec<u8> {
    let mut builder = FileBuilder::new();
    let dims = format!("{},3,4", fx.frames);
    let root = builder.root();
    root.attr("avg_frame_rate", AttrValue::String("120".into()))
        .attr("chunk_size", AttrValue::String(fx.chunk_size.into()))
        .attr("data_id", AttrValue::String(fx.data_id.into()))
        .attr("data_stream", AttrValue::String("rheed".into()))
        .attr("dims", AttrValue::String(dims))
        .attr("end_unix_ms_utc", AttrValue::String(fx.end_ms.into()))
        .attr("is_rotating", AttrValue::String("0".into()))
        .attr("is_stream", AttrValue::String("0".into()))
        .attr("raw_frame_rate", AttrValue::String("120".into()))
        .attr("start_unix_ms_utc", AttrValue::String(fx.start_ms.into()))
        .dataset_u8_chunked(
            "frames",
            &[fx.frames, 3, 4],
            &[1, 3, 4],
            vec![7; (fx.frames * 12) as usize],
        );
    builder.build()
}

fn measurement(files: &[&str]) -> RheedMeasurement {
    RheedMeasurement {
        hdf5_file: files.iter().map(|s| (*s).to_owned()).collect(),
        ..RheedMeasurement::default()
    }
}

#[test]
fn extracts_the_sample_container() {
    let mut access = MemoryAccess::new();
    access.insert("50.h5", build_container(&Fixture::default()));
    let mut m = measurement(&["50.h5"]);
    normalize(&mut m, &access).unwrap();

    assert_eq!(m.results.len(), 1);
    let result = &m.results[0];
    assert_eq!(result.name.as_deref(), Some("50.h5"));
    assert_eq!(result.data_id.as_deref(), Some("4b6cc67b-9375-4818-90fd-81c07b107d43"));
    assert_eq!(result.start_time, Utc.with_ymd_and_hms(2025, 3, 10, 14, 14, 38).single());
    assert_eq!(result.end_time, Utc.with_ymd_and_hms(2025, 3, 10, 14, 14, 38).single());
    assert_eq!(result.frames.as_deref(), Some("50.h5#/frames"));

    assert_eq!(
        m.measurement_settings,
        Some(MeasurementSettings {
            avg_frame_rate: Some(120),
            dimensions: Some("4,3,4".into()),
            chunk_size: Some(50),
            is_rotating: Some(false),
            is_stream: Some(false),
            raw_frame_rate: Some(120),
        })
    );
}

#[test]
fn one_result_per_file_in_order() {
    let mut access = MemoryAccess::new();
    access.insert("a.h5", build_container(&Fixture { data_id: "aaa-1", ..Fixture::default() }));
    access.insert("b.h5", build_container(&Fixture { data_id: "bbb-2", ..Fixture::default() }));
    access.insert("c.h5", build_container(&Fixture { data_id: "ccc-3", ..Fixture::default() }));
    let mut m = measurement(&["a.h5", "b.h5", "c.h5"]);
    normalize(&mut m, &access).unwrap();

    let names: Vec<_> = m.results.iter().map(|r| r.name.clone().unwrap()).collect();
    assert_eq!(names, ["a.h5", "b.h5", "c.h5"]);
    let ids: Vec<_> = m.results.iter().map(|r| r.data_id.clone().unwrap()).collect();
    assert_eq!(ids, ["aaa-1", "bbb-2", "ccc-3"]);
}

#[test]
fn settings_from_the_last_file_win() {
    let mut access = MemoryAccess::new();
    access.insert("a.h5", build_container(&Fixture { chunk_size: "10", ..Fixture::default() }));
    access.insert("b.h5", build_container(&Fixture { chunk_size: "25", ..Fixture::default() }));
    let mut m = measurement(&["a.h5", "b.h5"]);
    normalize(&mut m, &access).unwrap();
    assert_eq!(m.measurement_settings.as_ref().unwrap().chunk_size, Some(25));
}

#[test]
fn repeated_passes_are_idempotent() {
    let mut access = MemoryAccess::new();
    access.insert("50.h5", build_container(&Fixture::default()));
    let mut m = measurement(&["50.h5"]);
    normalize(&mut m, &access).unwrap();
    let first = m.clone();
    normalize(&mut m, &access).unwrap();
    assert_eq!(m, first);
    assert_eq!(m.results.len(), 1);
}

#[test]
fn missing_attribute_leaves_partial_state() {
    // Second container lacks the whole attribute set.
    let mut bad = FileBuilder::new();
    bad.root().attr("data_id", AttrValue::String("9".into()));
    let mut access = MemoryAccess::new();
    access.insert("good.h5", build_container(&Fixture::default()));
    access.insert("bad.h5", bad.build());
    let mut m = measurement(&["good.h5", "bad.h5"]);

    match normalize(&mut m, &access) {
        Err(ExtractError::MissingKey(key)) => assert_eq!(key, "start_unix_ms_utc"),
        other => panic!("unexpected {other:?}"),
    }
    // The first file's result survives; the failing file contributed
    // nothing.
    assert_eq!(m.results.len(), 1);
    assert_eq!(m.results[0].name.as_deref(), Some("good.h5"));
}

#[test]
fn unknown_file_name_is_reported() {
    let access = MemoryAccess::new();
    let mut m = measurement(&["ghost.h5"]);
    match normalize(&mut m, &access) {
        Err(ExtractError::FileUnavailable(name)) => assert_eq!(name, "ghost.h5"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(m.results.is_empty());
}

#[test]
fn empty_file_list_clears_results_only() {
    let access = MemoryAccess::new();
    let mut m = RheedMeasurement {
        measurement_settings: Some(MeasurementSettings {
            chunk_size: Some(10),
            ..MeasurementSettings::default()
        }),
        results: vec![rheedh5::Results::default()],
        ..RheedMeasurement::default()
    };
    normalize(&mut m, &access).unwrap();
    assert!(m.results.is_empty());
    // Settings are only touched while processing a file.
    assert_eq!(m.measurement_settings.as_ref().unwrap().chunk_size, Some(10));
}

#[test]
fn numeric_attribute_encodings_also_extract() {
    // Attribute values written as native numbers instead of strings.
    let mut builder = FileBuilder::new();
    builder
        .root()
        .attr("avg_frame_rate", AttrValue::F64(60.0))
        .attr("chunk_size", AttrValue::I64(1))
        .attr("data_id", AttrValue::String("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0".into()))
        .attr("dims", AttrValue::String("2,3,4".into()))
        .attr("end_unix_ms_utc", AttrValue::I64(1741616078975))
        .attr("is_rotating", AttrValue::I64(1))
        .attr("is_stream", AttrValue::I64(0))
        .attr("raw_frame_rate", AttrValue::I64(120))
        .attr("start_unix_ms_utc", AttrValue::I64(1741616078554));
    let mut access = MemoryAccess::new();
    access.insert("n.h5", builder.build());
    let mut m = measurement(&["n.h5"]);
    normalize(&mut m, &access).unwrap();

    let settings = m.measurement_settings.unwrap();
    assert_eq!(settings.avg_frame_rate, Some(60));
    assert_eq!(settings.raw_frame_rate, Some(120));
    assert_eq!(settings.is_rotating, Some(true));
    assert_eq!(settings.is_stream, Some(false));
    assert_eq!(m.results[0].start_time, Utc.with_ymd_and_hms(2025, 3, 10, 14, 14, 38).single());
}

#[test]
fn extracts_from_containers_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("50.h5"), build_container(&Fixture::default())).unwrap();
    let access = DirectoryAccess::new(dir.path());
    let mut m = measurement(&["50.h5"]);
    normalize(&mut m, &access).unwrap();
    assert_eq!(m.results[0].frames.as_deref(), Some("50.h5#/frames"));
}
