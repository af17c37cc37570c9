use std::{fs, path::Path};

use phytopulse_core::{
    LabelError, TraceError, TraceStore, UNKNOWN_LABEL,
    fixtures::{write_label, write_trace_wav},
};
use serde_json::json;
use tempfile::tempdir;

fn store_in(root: &Path) -> TraceStore {
    let store = TraceStore::from_data_root(root);
    fs::create_dir_all(store.trace_dir()).expect("trace dir should be creatable");
    fs::create_dir_all(store.label_dir()).expect("label dir should be creatable");
    store
}

fn write_stereo_wav(path: &Path, frames: usize) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("test wav should be creatable");
    for _ in 0..frames {
        writer
            .write_sample(-i16::MAX)
            .expect("left sample write should succeed");
        writer
            .write_sample(i16::MAX)
            .expect("right sample write should succeed");
    }
    writer.finalize().expect("test wav finalize should succeed");
}

#[test]
fn scan_lists_only_top_level_wav_files_sorted() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = store_in(temp.path());
    let silence = vec![0.0_f32; 16];

    write_trace_wav(&store.trace_dir().join("b.wav"), &silence, 8_000).expect("wav write");
    write_trace_wav(&store.trace_dir().join("a.WAV"), &silence, 8_000).expect("wav write");
    fs::write(store.trace_dir().join("notes.txt"), "not audio").expect("txt write");
    write_trace_wav(&store.trace_dir().join("nested/c.wav"), &silence, 8_000).expect("wav write");

    let trace_set = store.scan_trace_set().expect("scan should succeed");
    assert_eq!(trace_set, vec!["a.WAV".to_string(), "b.wav".to_string()]);
}

#[test]
fn scan_reports_missing_directory() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = TraceStore::from_data_root(&temp.path().join("absent"));
    assert!(matches!(
        store.scan_trace_set(),
        Err(TraceError::ResourceMissing(_))
    ));
}

#[test]
fn load_normalizes_samples_into_voltage_range() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = store_in(temp.path());
    let raw: Vec<f32> = (0..400).map(|i| (i as f32 / 200.0) - 1.0).collect();
    write_trace_wav(&store.trace_dir().join("ramp.wav"), &raw, 8_000).expect("wav write");

    let trace = store.load_trace("ramp.wav").expect("load should succeed");
    assert_eq!(trace.identifier, "ramp.wav");
    assert_eq!(trace.sample_rate, 8_000);
    assert_eq!(trace.len(), 400);
    assert!(trace.samples().iter().all(|v| (0.0..=5.0).contains(v)));
    assert!(trace.samples()[0] < 0.01);
    assert!((trace.samples()[200] - 2.5).abs() < 0.01);
}

#[test]
fn load_uses_first_channel_only() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = store_in(temp.path());
    write_stereo_wav(&store.trace_dir().join("stereo.wav"), 300);

    let trace = store.load_trace("stereo.wav").expect("load should succeed");
    assert_eq!(trace.len(), 300);
    assert!(trace.samples().iter().all(|v| *v < 0.01));
}

#[test]
fn load_fails_for_missing_or_malformed_traces() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = store_in(temp.path());
    fs::write(store.trace_dir().join("garbage.wav"), b"RIFF but not really")
        .expect("garbage write");

    assert!(matches!(
        store.load_trace("missing.wav"),
        Err(TraceError::Decode { .. })
    ));
    assert!(matches!(
        store.load_trace("garbage.wav"),
        Err(TraceError::Decode { .. })
    ));
}

#[test]
fn label_fields_are_read_in_preference_order() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = store_in(temp.path());

    write_label(
        store.label_dir(),
        "both",
        &json!({ "label": "third", "state": "second", "emotion": "first" }),
    )
    .expect("label write");
    write_label(
        store.label_dir(),
        "state_only",
        &json!({ "state": "Light stress response" }),
    )
    .expect("label write");
    write_label(
        store.label_dir(),
        "empty_emotion",
        &json!({ "emotion": "", "label": "fallback" }),
    )
    .expect("label write");

    assert_eq!(store.resolve_label("both.wav"), "first");
    assert_eq!(
        store.resolve_label("state_only.wav"),
        "Light stress response"
    );
    assert_eq!(store.resolve_label("empty_emotion.wav"), "fallback");
}

#[test]
fn unusable_labels_resolve_to_unknown() {
    let temp = tempdir().expect("tempdir should be creatable");
    let store = store_in(temp.path());
    fs::write(store.label_dir().join("broken.json"), "{ not json").expect("label write");
    write_label(store.label_dir(), "other_keys", &json!({ "mood": "calm" })).expect("label write");
    write_label(store.label_dir(), "numeric", &json!({ "emotion": 3 })).expect("label write");

    assert!(matches!(
        store.read_label("absent.wav"),
        Err(LabelError::Missing(_))
    ));
    assert!(matches!(
        store.read_label("broken.wav"),
        Err(LabelError::Parse { .. })
    ));
    assert!(matches!(
        store.read_label("other_keys.wav"),
        Err(LabelError::NoField(_))
    ));

    for identifier in ["absent.wav", "broken.wav", "other_keys.wav", "numeric.wav"] {
        assert_eq!(store.resolve_label(identifier), UNKNOWN_LABEL);
    }
}
