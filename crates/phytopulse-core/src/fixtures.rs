use std::{
    f32::consts::TAU,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::trace::TraceStore;

pub const DEMO_SAMPLE_RATE: u32 = 8_000;
pub const DEMO_FRAMES: usize = 2_000;

struct DemoTrace {
    stem: &'static str,
    frequency_hz: f32,
    amplitude: f32,
    bias: f32,
    label: Option<Value>,
}

fn demo_traces() -> Vec<DemoTrace> {
    vec![
        DemoTrace {
            stem: "plant_01_calm",
            frequency_hz: 2.0,
            amplitude: 0.1,
            bias: 0.0,
            label: Some(json!({ "emotion": "Calm" })),
        },
        DemoTrace {
            stem: "plant_02_grow_light",
            frequency_hz: 12.0,
            amplitude: 0.4,
            bias: 0.2,
            label: Some(json!({ "state": "Light response" })),
        },
        DemoTrace {
            stem: "plant_03_drought",
            frequency_hz: 40.0,
            amplitude: 0.6,
            bias: -0.3,
            label: Some(json!({ "label": "Water stress", "confidence": 0.82 })),
        },
        DemoTrace {
            stem: "plant_04_unlabelled",
            frequency_hz: 5.0,
            amplitude: 0.25,
            bias: 0.0,
            label: None,
        },
    ]
}

/// Writes mono 16-bit PCM samples (nominally `[-1, 1]`) to `path`.
pub fn write_trace_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create wav: {}", path.display()))?;
    for sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        writer
            .write_sample(quantized)
            .with_context(|| format!("failed to write wav sample: {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("failed to finalize wav: {}", path.display()))?;
    Ok(())
}

pub fn write_label(label_dir: &Path, stem: &str, content: &Value) -> Result<PathBuf> {
    fs::create_dir_all(label_dir)
        .with_context(|| format!("failed to create directory: {}", label_dir.display()))?;
    let path = label_dir.join(format!("{stem}.json"));
    let json = serde_json::to_vec_pretty(content).context("failed to encode label json")?;
    fs::write(&path, json).with_context(|| format!("failed to write label: {}", path.display()))?;
    Ok(path)
}

/// Writes the demo trace set under `data_root` in the `wav_files` / `json_labels` layout.
#[instrument(fields(data_root = %data_root.display()))]
pub fn write_demo_dataset(data_root: &Path) -> Result<TraceStore> {
    let store = TraceStore::from_data_root(data_root);

    for trace in demo_traces() {
        let samples: Vec<f32> = (0..DEMO_FRAMES)
            .map(|frame| {
                let phase = frame as f32 / DEMO_SAMPLE_RATE as f32 * trace.frequency_hz * TAU;
                trace.bias + phase.sin() * trace.amplitude
            })
            .collect();
        write_trace_wav(
            &store.trace_dir().join(format!("{}.wav", trace.stem)),
            &samples,
            DEMO_SAMPLE_RATE,
        )?;

        if let Some(label) = &trace.label {
            write_label(store.label_dir(), trace.stem, label)?;
        }
    }

    info!(count = demo_traces().len(), "demo dataset written");
    Ok(store)
}
