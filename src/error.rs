//! Error taxonomy for the repeater core (§7).
//!
//! Internal functions return `Result<T, RptError>` throughout rather than the
//! C original's bare `0`/`-1` convention (Design Notes §9). `anyhow` is
//! reserved for the CLI/glue boundary in `bin/rptd.rs`.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Error classes, one per §7 taxonomy entry.
#[derive(Debug, Error)]
pub enum RptError {
    /// Transient I/O: serial timeout, UDP `EAGAIN`, channel soft-hangup signal.
    #[error("io error on {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// Peer protocol violation: bad RTCP, malformed text message, bad DTMF packet.
    #[error("protocol violation from {peer:?}: {reason}")]
    Protocol {
        peer: Option<SocketAddr>,
        reason: String,
    },

    /// Configuration error: unknown rig tag, missing callsign, invalid band limit.
    #[error("configuration error in node {node}: {reason}")]
    Config { node: String, reason: String },

    /// Resource exhaustion: allocation failure, thread-create failure.
    #[error("resource exhausted: {0}")]
    Exhausted(String),

    /// Timeout: RX lingering without audio, ident overdue, remote rig non-responsive.
    #[error("timeout waiting for {0}")]
    Timeout(&'static str),

    /// Fatal: socket creation failure at startup, required external file missing.
    #[error("fatal startup error: {0}")]
    Fatal(String),
}

impl RptError {
    pub fn io(context: &'static str, source: io::Error) -> Self {
        RptError::Io { context, source }
    }

    pub fn protocol(peer: Option<SocketAddr>, reason: impl Into<String>) -> Self {
        RptError::Protocol {
            peer,
            reason: reason.into(),
        }
    }

    pub fn config(node: impl Into<String>, reason: impl Into<String>) -> Self {
        RptError::Config {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RptError>;

/// Return type for DTMF/command handlers (§4.2, §7): the `DC_*` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// Keep collecting digits; the accumulator is a valid prefix of some function.
    Indeterminate,
    /// Clear the buffer and continue; no counters are touched.
    ReqFlush,
    /// No function matches; clear the buffer and terminate the sequence.
    Error,
    /// A function executed successfully; clear buffer, bump counters.
    Complete,
    /// Like `Complete` but suppresses the confirmation tone/telemetry.
    CompleteQuiet,
    /// Keep the phone link keyed regardless of duplex policy.
    DoKey,
}
