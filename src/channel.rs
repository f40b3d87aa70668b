//! The host telephony framework's `Channel` capability (§1, §6 "external
//! interfaces"). Everything in this module is an interface the core
//! *consumes*; the host owns the implementation (audio frame delivery,
//! conference bridging, dialplan). The core never constructs a channel
//! itself except through this trait.

use std::time::Duration;

use crate::error::Result;

/// 8 kHz mono signed 16-bit PCM frame, 20 ms (160 samples) as used
/// throughout the node loop.
pub const FRAME_SAMPLES: usize = 160;

/// One event read from a channel (§4.1 "Reads available frames").
#[derive(Debug, Clone)]
pub enum Frame {
    /// Raw audio samples.
    Voice(Vec<i16>),
    /// Start of an in-band DTMF digit.
    DtmfBegin(char),
    /// End of an in-band DTMF digit (key released).
    DtmfEnd(char),
    /// Out-of-band control frame.
    Control(Control),
    /// A link-text / control-channel text line.
    Text(String),
    /// The channel was hung up by the far end, or the read returned EOF.
    Hangup,
}

/// Control sub-events (§4.1 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    RadioKey,
    RadioUnkey,
    Answer,
    Hangup,
}

/// An 8 kHz mono audio channel owned exclusively by one `Node` or `Link`.
///
/// Implementations are provided by the host; this trait is the seam the
/// core's run loop, telemetry workers, and link manager are generic over.
pub trait Channel: Send {
    /// Human-readable name, e.g. `"Zap/1"` or the link's pseudo channel name.
    fn name(&self) -> &str;

    /// Non-blocking poll: returns `Some(frame)` if one is immediately
    /// available, `None` if the channel is merely idle this iteration.
    fn try_read(&mut self) -> Result<Option<Frame>>;

    /// Write one 20 ms frame of outbound audio.
    fn write_voice(&mut self, samples: &[i16]) -> Result<()>;

    /// Send a DTMF digit outbound (radio or phone side, depending on channel).
    fn send_digit(&mut self, digit: char) -> Result<()>;

    /// Send a text control line (link channels only; no-op elsewhere is fine).
    fn send_text(&mut self, line: &str) -> Result<()>;

    /// Issue a control/indicate request (e.g. `RADIO_KEY`, `ANSWER`).
    fn indicate(&mut self, control: Control) -> Result<()>;

    /// Request a new outbound connection on the underlying technology
    /// (dial string is technology-specific, e.g. `"USRP/host:port"`).
    fn request(&mut self, dial_string: &str) -> Result<()>;

    /// Immediately tear down the channel; safe to call more than once.
    fn hangup(&mut self) -> Result<()>;

    /// True once a prior `hangup()` makes further reads return EOF.
    fn is_hungup(&self) -> bool;

    /// Block the calling thread until either a frame is ready or `timeout`
    /// elapses, whichever is first. Used by telemetry workers ("stream
    /// file and wait", §5).
    fn wait(&mut self, timeout: Duration) -> Result<bool>;

    /// Join the given conference number; `listen_only` suppresses this
    /// channel's own audio from being mixed back to itself.
    fn join_conference(&mut self, conf_num: u32, listen_only: bool) -> Result<()>;

    /// Leave whatever conference this channel currently belongs to.
    fn leave_conference(&mut self) -> Result<()>;
}

/// Allocates conference numbers and pseudo channels; owned by the host,
/// injected into a `Node` at construction (Design Notes §9: avoid hidden
/// module-level state).
pub trait ChannelFactory: Send {
    fn open_rx(&mut self, name: &str) -> Result<Box<dyn Channel>>;
    fn open_tx(&mut self, name: &str) -> Result<Box<dyn Channel>>;
    fn open_pseudo(&mut self) -> Result<Box<dyn Channel>>;
    fn new_conference(&mut self) -> Result<u32>;
}
