//! Remote-base serial rig control (§4.6). `RemoteBase` owns the concrete
//! `Rig` trait object chosen for a node's `remote=` tag and serializes
//! access to it behind its own mutex, distinct from the node's main run
//! mutex (§5 "remlock"): rig I/O can block for up to the serial timeout and
//! must never hold up the audio path.

pub mod bump;
pub mod memory;
pub mod pltable;
pub mod rig;
pub mod rigs;
pub mod serial;
pub mod txlimits;

use std::sync::Mutex;

use crate::config::MemorySlot;
use crate::error::{RptError, Result};
use rig::{Mode, Offset, Rig, RigKind};
use serial::SerialIo;

/// Construct the concrete driver for `kind`, wiring up the I/O and CI-V/RBI
/// addressing parameters each family needs (§4.6 construction table).
pub fn build_rig(kind: RigKind, io: Box<dyn SerialIo>, civ_addr: u8, rbi_transport: rigs::rbi::RbiTransport) -> Box<dyn Rig> {
    match kind {
        RigKind::Ft897 | RigKind::Ft100 => Box::new(rigs::yaesu_bcd::YaesuBcdRig::new(kind, io)),
        RigKind::Ft950 => Box::new(rigs::ft950::Ft950Rig::new(io)),
        RigKind::Ic706 | RigKind::Xcat => Box::new(rigs::civ::CivRig::new(kind, civ_addr, io)),
        RigKind::Kenwood | RigKind::Tmd700 | RigKind::Tm271 => Box::new(rigs::kenwood::KenwoodRig::new(kind, io)),
        RigKind::Rbi => Box::new(rigs::rbi::RbiRig::new(rbi_transport, io)),
        RigKind::Rtx150 | RigKind::Rtx450 | RigKind::Ppp16 => Box::new(rigs::firmware_text::FirmwareTextRig::new(kind, io)),
    }
}

/// Owns one node's remote-base rig and serializes all access to it.
pub struct RemoteBase {
    node_name: String,
    rig: Mutex<Box<dyn Rig>>,
}

impl RemoteBase {
    pub fn new(node_name: impl Into<String>, rig: Box<dyn Rig>) -> RemoteBase {
        RemoteBase { node_name: node_name.into(), rig: Mutex::new(rig) }
    }

    pub fn from_tag(
        node_name: impl Into<String>,
        tag: &str,
        io: Box<dyn SerialIo>,
        civ_addr: u8,
        rbi_transport: rigs::rbi::RbiTransport,
    ) -> Result<RemoteBase> {
        let node_name = node_name.into();
        let kind = RigKind::from_tag(tag)
            .ok_or_else(|| RptError::config(node_name.clone(), format!("unknown remote-base rig tag '{tag}'")))?;
        Ok(RemoteBase::new(node_name, build_rig(kind, io, civ_addr, rbi_transport)))
    }

    pub fn kind(&self) -> RigKind {
        self.rig.lock().expect("remote-base mutex poisoned").kind()
    }

    /// Set frequency, validating it against the rig's own band table first
    /// (§4.6 "Frequency/mode validation").
    pub fn set_freq(&self, freq_hz: u64) -> Result<Mode> {
        let mut rig = self.rig.lock().expect("remote-base mutex poisoned");
        let mode = rig.check_freq(freq_hz).map_err(|_| {
            RptError::config(self.node_name.clone(), format!("{freq_hz} Hz rejected by {:?}", rig.kind()))
        })?;
        rig.set_freq(freq_hz)?;
        rig.set_mode(mode)?;
        Ok(mode)
    }

    pub fn set_offset(&self, offset: Offset, split_hz: u32) -> Result<()> {
        self.rig.lock().expect("remote-base mutex poisoned").set_offset(offset, split_hz)
    }

    pub fn set_ctcss(&self, tx_tone_decihz: Option<u32>, rx_tone_decihz: Option<u32>) -> Result<()> {
        self.rig
            .lock()
            .expect("remote-base mutex poisoned")
            .set_ctcss(tx_tone_decihz, rx_tone_decihz)
    }

    pub fn set_power(&self, level: u8) -> Result<()> {
        self.rig.lock().expect("remote-base mutex poisoned").set_power(level)
    }

    /// Recall a `[memory]` slot wholesale: frequency, offset, mode, power,
    /// and PL (§4.6, `memory.rs`).
    pub fn recall_memory(&self, slot: &MemorySlot) -> Result<()> {
        let freq_hz = parse_freq_mhz(&slot.freq)
            .ok_or_else(|| RptError::config(self.node_name.clone(), format!("bad memory frequency '{}'", slot.freq)))?;
        let offset = match slot.offset {
            '+' => Offset::Plus,
            '-' => Offset::Minus,
            _ => Offset::Simplex,
        };
        self.set_freq(freq_hz)?;
        self.set_offset(offset, 600_000)?;
        if slot.plon {
            let tone = parse_tone_decihz(&slot.txpl);
            self.set_ctcss(tone, if slot.rxplon { tone } else { None })?;
        } else {
            self.set_ctcss(None, None)?;
        }
        self.set_power(if slot.power.eq_ignore_ascii_case("high") { 100 } else { 25 })?;
        Ok(())
    }

    pub fn bump(&self, rate: rig::BumpRate, direction: i8) -> Result<u64> {
        self.rig.lock().expect("remote-base mutex poisoned").bump(rate, direction)
    }
}

fn parse_freq_mhz(s: &str) -> Option<u64> {
    let mhz: f64 = s.parse().ok()?;
    Some((mhz * 1_000_000.0).round() as u64)
}

fn parse_tone_decihz(s: &str) -> Option<u32> {
    if s.is_empty() || s.eq_ignore_ascii_case("no") {
        return None;
    }
    let hz: f64 = s.parse().ok()?;
    Some((hz * 10.0).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::serial::FakeSerial;

    #[test]
    fn from_tag_rejects_unknown_tag() {
        let result = RemoteBase::from_tag("rpt1", "nosuchrig", Box::new(FakeSerial::new()), 0x58, rigs::rbi::RbiTransport::ParallelPort);
        assert!(result.is_err());
    }

    #[test]
    fn from_tag_builds_ft897() {
        let base = RemoteBase::from_tag("rpt1", "ft897", Box::new(FakeSerial::new()), 0x58, rigs::rbi::RbiTransport::ParallelPort).unwrap();
        assert_eq!(base.kind(), RigKind::Ft897);
    }

    #[test]
    fn parse_freq_mhz_handles_decimal() {
        assert_eq!(parse_freq_mhz("146.520"), Some(146_520_000));
    }

    #[test]
    fn parse_tone_decihz_handles_no() {
        assert_eq!(parse_tone_decihz("no"), None);
        assert_eq!(parse_tone_decihz("67.0"), Some(670));
    }

    #[test]
    fn recall_memory_does_not_error() {
        let base = RemoteBase::from_tag("rpt1", "ft897", Box::new(FakeSerial::new()), 0x58, rigs::rbi::RbiTransport::ParallelPort).unwrap();
        let slot = MemorySlot {
            freq: "146.520".to_string(),
            offset: 'S',
            mode: "FM".to_string(),
            power: "high".to_string(),
            plon: true,
            rxplon: false,
            txpl: "100.0".to_string(),
            rxpl: "no".to_string(),
        };
        base.recall_memory(&slot).unwrap();
    }
}
