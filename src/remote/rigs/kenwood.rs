//! ASCII space-terminated command set shared by `kenwood`, `tmd700`, and
//! `tm271` (§4.6 table: "ASCII space-terminated (`VW …`, `RBN …`, `PC …`)").

use std::time::Duration;

use crate::error::{RptError, Result};
use crate::remote::pltable::kenwood_pl_code;
use crate::remote::rig::{BumpRate, Mode, Offset, Rig, RigKind};
use crate::remote::serial::SerialIo;

pub fn vfo_command(freq_hz: u64) -> String {
    // VW sets VFO frequency in 10s of Hz, per §4.6.
    format!("VW {:010} ", freq_hz / 10)
}

pub fn offset_command(offset: Offset, split_hz: u32) -> String {
    let dir = match offset {
        Offset::Simplex => 0,
        Offset::Plus => 1,
        Offset::Minus => 2,
    };
    format!("OS {dir} {:08} ", split_hz / 10)
}

pub fn mode_command(mode: Mode) -> String {
    let code = match mode {
        Mode::Fm => 2,
        Mode::Am => 5,
        Mode::Usb => 1,
        Mode::Lsb => 0,
        Mode::Cw => 3,
    };
    format!("MD {code} ")
}

pub fn tone_command(tx_tone_decihz: Option<u32>) -> Result<String> {
    match tx_tone_decihz {
        Some(tone) => {
            let code = kenwood_pl_code(tone)
                .ok_or_else(|| RptError::config("<remote>", format!("no CTCSS table entry for {tone} decihertz")))?;
            Ok(format!("RBN {code:02} "))
        }
        None => Ok("RBN 00 ".to_string()),
    }
}

pub fn power_command(level: u8) -> String {
    format!("PC {level:03} ")
}

pub struct KenwoodRig {
    kind: RigKind,
    io: Box<dyn SerialIo>,
    freq_hz: u64,
}

impl KenwoodRig {
    pub fn new(kind: RigKind, io: Box<dyn SerialIo>) -> KenwoodRig {
        KenwoodRig { kind, io, freq_hz: 146_520_000 }
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        self.io.write_all(cmd.as_bytes())?;
        let _ = self.io.read_until(b' ', Duration::from_millis(100));
        Ok(())
    }
}

impl Rig for KenwoodRig {
    fn kind(&self) -> RigKind {
        self.kind
    }

    fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        self.freq_hz = freq_hz;
        self.send(&vfo_command(freq_hz))
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.send(&mode_command(mode))
    }

    fn set_offset(&mut self, offset: Offset, split_hz: u32) -> Result<()> {
        self.send(&offset_command(offset, split_hz))
    }

    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, _rx_tone_decihz: Option<u32>) -> Result<()> {
        let cmd = tone_command(tx_tone_decihz)?;
        self.send(&cmd)
    }

    fn set_power(&mut self, level: u8) -> Result<()> {
        self.send(&power_command(level))
    }

    fn check_freq(&self, freq_hz: u64) -> Result<Mode> {
        match (self.kind, freq_hz) {
            (RigKind::Tm271, 144_000_000..=148_000_000) => Ok(Mode::Fm),
            (RigKind::Tmd700, 144_000_000..=148_000_000) | (RigKind::Tmd700, 420_000_000..=450_000_000) => {
                Ok(Mode::Fm)
            }
            (RigKind::Kenwood, 144_000_000..=148_000_000) | (RigKind::Kenwood, 420_000_000..=450_000_000) => {
                Ok(Mode::Fm)
            }
            _ => Err(RptError::config("<remote>", format!("{freq_hz} Hz outside configured band"))),
        }
    }

    fn bump(&mut self, rate: BumpRate, direction: i8) -> Result<u64> {
        let step = rate.hz_per_second();
        self.freq_hz = if direction >= 0 {
            self.freq_hz + step as u64
        } else {
            self.freq_hz.saturating_sub(step as u64)
        };
        self.set_freq(self.freq_hz)?;
        Ok(self.freq_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vfo_command_uses_ten_hz_steps() {
        assert_eq!(vfo_command(146_520_000), "VW 0014652000 ");
    }

    #[test]
    fn mode_command_maps_fm() {
        assert_eq!(mode_command(Mode::Fm), "MD 2 ");
    }

    #[test]
    fn tone_command_rejects_unknown_tone() {
        assert!(tone_command(Some(1)).is_err());
    }

    #[test]
    fn check_freq_respects_per_variant_band_limits() {
        let rig = KenwoodRig::new(RigKind::Tm271, Box::new(crate::remote::serial::FakeSerial::new()));
        assert!(rig.check_freq(440_000_000).is_err());
        assert_eq!(rig.check_freq(146_520_000).unwrap(), Mode::Fm);
    }
}
