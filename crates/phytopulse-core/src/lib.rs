pub mod diagnostics;
pub mod fixtures;
pub mod packet;
pub mod profile;
pub mod replay;
pub mod trace;

pub use diagnostics::{LogSettings, TelemetryGuard, init_tracing};
pub use packet::{Clock, FixedClock, LocalClock, PlantId, PlantPacket};
pub use profile::{ProfileDetails, StateProfile};
pub use replay::{Cursor, DEFAULT_WINDOW_SIZE, ReplayEngine, ReplayError, ReplayOptions};
pub use trace::{LabelError, Trace, TraceError, TraceStore, UNKNOWN_LABEL};
