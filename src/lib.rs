//! `rptcore`: the real-time core of an amateur-radio repeater controller
//! and linking engine (spec §1–§9).
//!
//! This crate does not embed a telephony host. It implements the hard part
//! — the node run loop, DTMF dispatcher, link manager, telemetry scheduler,
//! network link transports, and remote-base serial driver — against the
//! `Channel`/`ChannelFactory` seam a host would otherwise provide (see
//! [`channel`]). `bin/rptd.rs` is a minimal standalone host that wires a
//! configured set of [`node::Node`]s together for the CLI surface (§6.4).
//!
//! Module layout follows the dependency order of §2 (leaves first):
//! [`config`] and [`error`] underpin everything; [`remote`] and
//! [`transport`] are independent leaves; [`link`] builds on `transport`'s
//! channel seam; [`dtmf`] and [`telemetry`] build on `link`; [`node`] is the
//! run loop that composes all of the above.

pub mod channel;
pub mod config;
pub mod dtmf;
pub mod error;
pub mod link;
pub mod node;
pub mod remote;
pub mod telemetry;
pub mod transport;

pub use channel::{Channel, ChannelFactory, Control, Frame};
pub use config::NodeSection;
pub use error::{DispatchResult, Result, RptError};
pub use link::{Link, LinkManager};
pub use node::Node;
