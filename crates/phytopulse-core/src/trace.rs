use std::{
    fs::{self, File},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde_json::Value;
use symphonia::core::{
    audio::{AudioBufferRef, SampleBuffer},
    codecs::DecoderOptions,
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

pub const TRACE_EXTENSION: &str = "wav";
pub const LABEL_EXTENSION: &str = "json";
pub const UNKNOWN_LABEL: &str = "Unknown";
/// Label keys in preference order.
pub const LABEL_FIELDS: [&str; 3] = ["emotion", "state", "label"];
pub const MAX_VOLTAGE: f32 = 5.0;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace directory not found: {0}")]
    ResourceMissing(PathBuf),
    #[error("failed to decode trace {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

impl TraceError {
    fn decode(path: &Path, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("label file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read label file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid label json in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("label file {0} has no emotion, state or label field")]
    NoField(PathBuf),
}

/// Decoded voltage trace. Samples are normalized into `[0, MAX_VOLTAGE]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub identifier: String,
    pub sample_rate: u32,
    samples: Vec<f32>,
}

impl Trace {
    /// Builds a trace from raw `[-1, 1]` samples, normalizing each one.
    #[must_use]
    pub fn from_raw(identifier: impl Into<String>, sample_rate: u32, raw: &[f32]) -> Self {
        Self {
            identifier: identifier.into(),
            sample_rate,
            samples: raw.iter().copied().map(normalize_sample).collect(),
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Maps a raw audio sample onto the 0-5 V range.
#[must_use]
pub fn normalize_sample(raw: f32) -> f32 {
    ((raw + 1.0) * 2.5).clamp(0.0, MAX_VOLTAGE)
}

/// Read-only view over the trace and label directories.
#[derive(Debug, Clone)]
pub struct TraceStore {
    trace_dir: PathBuf,
    label_dir: PathBuf,
}

impl TraceStore {
    #[must_use]
    pub fn new(trace_dir: impl Into<PathBuf>, label_dir: impl Into<PathBuf>) -> Self {
        Self {
            trace_dir: trace_dir.into(),
            label_dir: label_dir.into(),
        }
    }

    /// Uses the `wav_files` / `json_labels` layout under `data_root`.
    #[must_use]
    pub fn from_data_root(data_root: &Path) -> Self {
        Self::new(data_root.join("wav_files"), data_root.join("json_labels"))
    }

    #[must_use]
    pub fn trace_dir(&self) -> &Path {
        &self.trace_dir
    }

    #[must_use]
    pub fn label_dir(&self) -> &Path {
        &self.label_dir
    }

    #[must_use]
    pub fn trace_path(&self, identifier: &str) -> PathBuf {
        self.trace_dir.join(identifier)
    }

    #[must_use]
    pub fn label_path(&self, identifier: &str) -> PathBuf {
        let stem = Path::new(identifier)
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or(identifier);
        self.label_dir.join(format!("{stem}.{LABEL_EXTENSION}"))
    }

    /// Lists the `.wav` files directly inside the trace directory, sorted by name.
    #[instrument(skip(self), fields(trace_dir = %self.trace_dir.display()))]
    pub fn scan_trace_set(&self) -> Result<Vec<String>, TraceError> {
        if !self.trace_dir.is_dir() {
            return Err(TraceError::ResourceMissing(self.trace_dir.clone()));
        }

        let mut identifiers = Vec::new();
        for entry in WalkDir::new(&self.trace_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(?error, "ignoring unreadable entry while scanning traces");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let is_trace = entry
                .path()
                .extension()
                .and_then(|value| value.to_str())
                .is_some_and(|value| value.eq_ignore_ascii_case(TRACE_EXTENSION));
            if !is_trace {
                continue;
            }

            if let Some(name) = entry.file_name().to_str() {
                identifiers.push(name.to_string());
            } else {
                warn!(path = %entry.path().display(), "skipping trace with non-utf8 name");
            }
        }

        identifiers.sort();
        debug!(count = identifiers.len(), "trace scan complete");
        Ok(identifiers)
    }

    /// Decodes the first channel of a trace and normalizes it.
    #[instrument(skip(self), fields(trace_dir = %self.trace_dir.display()))]
    pub fn load_trace(&self, identifier: &str) -> Result<Trace, TraceError> {
        let path = self.trace_path(identifier);
        let (sample_rate, raw) = decode_first_channel(&path)?;
        debug!(sample_rate, total_frames = raw.len(), "trace decode complete");
        Ok(Trace::from_raw(identifier, sample_rate, &raw))
    }

    /// Best-effort label lookup. Every failure resolves to [`UNKNOWN_LABEL`].
    #[must_use]
    pub fn resolve_label(&self, identifier: &str) -> String {
        match self.read_label(identifier) {
            Ok(label) => label,
            Err(error) => {
                debug!(identifier, %error, "label unresolved, using sentinel");
                UNKNOWN_LABEL.to_string()
            }
        }
    }

    pub fn read_label(&self, identifier: &str) -> Result<String, LabelError> {
        let path = self.label_path(identifier);
        if !path.is_file() {
            return Err(LabelError::Missing(path));
        }

        let bytes = fs::read(&path).map_err(|source| LabelError::Read {
            path: path.clone(),
            source,
        })?;
        let content: Value = serde_json::from_slice(&bytes).map_err(|source| LabelError::Parse {
            path: path.clone(),
            source,
        })?;

        LABEL_FIELDS
            .iter()
            .find_map(|field| {
                content
                    .get(field)
                    .and_then(Value::as_str)
                    .filter(|value| !value.is_empty())
            })
            .map(str::to_string)
            .ok_or(LabelError::NoField(path))
    }
}

fn decode_first_channel(path: &Path) -> Result<(u32, Vec<f32>), TraceError> {
    let file = File::open(path).map_err(|error| TraceError::decode(path, error))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(TRACE_EXTENSION);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|error| TraceError::decode(path, error))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| TraceError::decode(path, "no default audio track"))?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|error| TraceError::decode(path, error))?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(error)) if error.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(error) => return Err(TraceError::decode(path, error)),
        };

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!(reason, "skipping undecodable trace packet");
                continue;
            }
            Err(error) => return Err(TraceError::decode(path, error)),
        };

        sample_rate = decoded.spec().rate;
        push_first_channel(decoded, &mut samples);
    }

    if samples.is_empty() {
        return Err(TraceError::decode(path, "decoded zero samples"));
    }

    Ok((sample_rate, samples))
}

fn push_first_channel(decoded: AudioBufferRef<'_>, samples: &mut Vec<f32>) {
    let spec = *decoded.spec();
    let channel_count = spec.channels.count().max(1);
    let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
    sample_buffer.copy_interleaved_ref(decoded);
    samples.extend(
        sample_buffer
            .samples()
            .iter()
            .step_by(channel_count)
            .copied(),
    );
}
