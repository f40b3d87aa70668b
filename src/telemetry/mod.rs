//! Telemetry scheduler (§4.4, §3.3): ordered playback of tones, Morse, and
//! recorded phrases into the conference, with pre-announcement delays,
//! holdoff on live audio, and cancellation.

pub mod mode;
pub mod morse;
pub mod queue;
pub mod tonespec;

pub use mode::Mode;
pub use queue::{Scheduler, TelemetryItem};
