use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    packet::{
        Clock, LocalClock, PlantId, PlantPacket, Readings, SIMULATED_ALERT, SIMULATED_LABEL,
        format_time_of_day,
    },
    profile::StateProfile,
    trace::{Trace, TraceError, TraceStore},
};

pub const DEFAULT_WINDOW_SIZE: usize = 100;

const MIN_MOISTURE: f64 = 10.0;
const MAX_MOISTURE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("trace {identifier} unavailable: {source}")]
    TraceUnavailable {
        identifier: String,
        #[source]
        source: TraceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub trace_index: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    pub window_size: usize,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            seed: None,
        }
    }
}

/// Bounded slice of `size` samples starting at `offset`, truncated at the end of `samples`.
#[must_use]
pub fn window(samples: &[f32], offset: usize, size: usize) -> &[f32] {
    let start = offset.min(samples.len());
    let end = offset.saturating_add(size).min(samples.len());
    &samples[start..end]
}

#[must_use]
pub fn mean_voltage(chunk: &[f32]) -> f64 {
    if chunk.is_empty() {
        return 0.0;
    }
    let sum: f64 = chunk.iter().copied().map(f64::from).sum();
    sum / chunk.len() as f64
}

/// Soil moisture estimate from the window's mean voltage plus jitter, clamped to 10-100.
#[must_use]
pub fn derive_moisture(avg_voltage: f64, jitter: f64) -> f64 {
    (avg_voltage * 20.0 + jitter).clamp(MIN_MOISTURE, MAX_MOISTURE)
}

struct ReplaySource {
    store: TraceStore,
    trace_set: Vec<String>,
    active: Option<Trace>,
    cursor: Cursor,
}

struct Frame {
    avg_voltage: f64,
    label: String,
}

impl ReplaySource {
    fn identifier(&self) -> &str {
        &self.trace_set[self.cursor.trace_index]
    }

    fn next_index(&self) -> usize {
        (self.cursor.trace_index + 1) % self.trace_set.len()
    }

    fn advance(&mut self, window_size: usize) -> Result<Frame, ReplayError> {
        let trace = match self.active.take() {
            Some(trace) => trace,
            None => self.recover()?,
        };

        let avg_voltage = mean_voltage(window(trace.samples(), self.cursor.offset, window_size));
        self.cursor.offset += window_size;

        if self.cursor.offset + window_size >= trace.len() {
            self.roll_over()?;
        } else {
            self.active = Some(trace);
        }

        // Deliberately resolved after rollover: the label follows the trace that is now active.
        let label = self.store.resolve_label(self.identifier());
        Ok(Frame { avg_voltage, label })
    }

    fn roll_over(&mut self) -> Result<(), ReplayError> {
        let from = self.cursor.trace_index;
        self.cursor = Cursor {
            trace_index: self.next_index(),
            offset: 0,
        };
        let trace = self.load_active()?;
        info!(
            from,
            to = self.cursor.trace_index,
            identifier = %trace.identifier,
            samples = trace.len(),
            "trace rolled over"
        );
        self.active = Some(trace);
        Ok(())
    }

    /// Retries the trace under the cursor after a failed reload. A second failure skips it.
    fn recover(&mut self) -> Result<Trace, ReplayError> {
        match self.load_active() {
            Ok(trace) => {
                info!(identifier = %trace.identifier, "trace recovered after failed reload");
                Ok(trace)
            }
            Err(error) => {
                self.cursor = Cursor {
                    trace_index: self.next_index(),
                    offset: 0,
                };
                Err(error)
            }
        }
    }

    fn load_active(&self) -> Result<Trace, ReplayError> {
        let identifier = self.identifier();
        self.store
            .load_trace(identifier)
            .map_err(|source| ReplayError::TraceUnavailable {
                identifier: identifier.to_string(),
                source,
            })
    }
}

/// Windowed replay over a set of recorded traces, with a random simulation fallback.
pub struct ReplayEngine {
    source: Option<ReplaySource>,
    window_size: usize,
    rng: StdRng,
    clock: Box<dyn Clock>,
}

impl ReplayEngine {
    /// Engine that only ever produces simulated packets.
    #[must_use]
    pub fn simulated(options: ReplayOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            source: None,
            window_size: options.window_size.max(1),
            rng,
            clock: Box::new(LocalClock),
        }
    }

    /// Scans the store and loads its first trace. Any startup failure leaves the engine in
    /// simulation mode for its whole lifetime.
    #[instrument(skip(store), fields(trace_dir = %store.trace_dir().display()))]
    pub fn open(store: TraceStore, options: ReplayOptions) -> Self {
        let mut engine = Self::simulated(options);

        let trace_set = match store.scan_trace_set() {
            Ok(trace_set) => trace_set,
            Err(error) => {
                warn!(%error, "trace data not found, using simulated data");
                return engine;
            }
        };

        let Some(first) = trace_set.first() else {
            warn!("no wav traces found, using simulated data");
            return engine;
        };

        match store.load_trace(first) {
            Ok(trace) => {
                info!(
                    count = trace_set.len(),
                    first = %trace.identifier,
                    samples = trace.len(),
                    "loaded trace set"
                );
                engine.source = Some(ReplaySource {
                    store,
                    trace_set,
                    active: Some(trace),
                    cursor: Cursor::default(),
                });
            }
            Err(error) => {
                warn!(%error, "failed to read first trace, using simulated data");
            }
        }

        engine
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.source.is_none()
    }

    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    #[must_use]
    pub fn trace_count(&self) -> usize {
        self.source
            .as_ref()
            .map_or(0, |source| source.trace_set.len())
    }

    #[must_use]
    pub fn cursor(&self) -> Option<Cursor> {
        self.source.as_ref().map(|source| source.cursor)
    }

    #[must_use]
    pub fn active_identifier(&self) -> Option<&str> {
        self.source.as_ref().map(ReplaySource::identifier)
    }

    /// `None` in simulation mode or while a failed reload awaits recovery.
    #[must_use]
    pub fn active_trace_len(&self) -> Option<usize> {
        self.source
            .as_ref()
            .and_then(|source| source.active.as_ref())
            .map(Trace::len)
    }

    /// Produces the next packet, advancing the cursor by one window.
    #[instrument(skip(self), fields(cursor = ?self.cursor()))]
    pub fn next_packet(&mut self) -> Result<PlantPacket, ReplayError> {
        let window_size = self.window_size;
        let frame = match &mut self.source {
            Some(source) => source.advance(window_size)?,
            None => return Ok(self.simulated_packet()),
        };

        let moisture = derive_moisture(frame.avg_voltage, self.rng.random_range(0.0..10.0));
        let temperature = self.rng.random_range(20.0..30.0);
        let profile = StateProfile::from_label(&frame.label);
        let details = profile.details();
        debug!(avg_voltage = frame.avg_voltage, label = %frame.label, ?profile, "replay packet");

        Ok(PlantPacket::assemble(
            PlantId::Replayed,
            Readings {
                signal_strength: frame.avg_voltage,
                electrical_activity: frame.avg_voltage / 2.5,
                moisture,
                temperature,
            },
            details,
            frame.label,
            details.alert_message,
            self.timestamp(),
        ))
    }

    /// Random packet used when no trace data is available. Never touches replay state.
    #[must_use]
    pub fn simulated_packet(&mut self) -> PlantPacket {
        let readings = Readings {
            signal_strength: self.rng.random_range(0.0..5.0),
            electrical_activity: self.rng.random_range(0.0..2.0),
            moisture: self.rng.random_range(50.0..60.0),
            temperature: self.rng.random_range(25.0..30.0),
        };

        PlantPacket::assemble(
            PlantId::Simulated,
            readings,
            StateProfile::Normal.details(),
            SIMULATED_LABEL.to_string(),
            SIMULATED_ALERT,
            self.timestamp(),
        )
    }

    /// [`Self::next_packet`], degrading an unavailable trace to a simulated packet.
    pub fn next_packet_or_simulated(&mut self) -> PlantPacket {
        match self.next_packet() {
            Ok(packet) => packet,
            Err(error) => {
                warn!(%error, "replay degraded to simulated packet");
                self.simulated_packet()
            }
        }
    }

    fn timestamp(&self) -> String {
        format_time_of_day(self.clock.time_of_day())
    }
}
