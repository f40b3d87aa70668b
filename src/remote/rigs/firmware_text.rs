//! In-band text command protocol shared by `rtx150`, `rtx450`, and `ppp16`
//! (§4.6 table: "in-band text command, `SETFREQ …`"). These are homebrew
//! microcontroller-firmware interfaces rather than commercial rigs, so the
//! whole command set is one newline-terminated human-readable line.

use std::time::Duration;

use crate::error::Result;
use crate::remote::rig::{BumpRate, Mode, Offset, Rig, RigKind};
use crate::remote::serial::SerialIo;

pub fn setfreq_command(freq_hz: u64) -> String {
    format!("SETFREQ {freq_hz}\n")
}

pub fn setmode_command(mode: Mode) -> String {
    let tag = match mode {
        Mode::Fm => "FM",
        Mode::Am => "AM",
        Mode::Usb => "USB",
        Mode::Lsb => "LSB",
        Mode::Cw => "CW",
    };
    format!("SETMODE {tag}\n")
}

pub fn setoffset_command(offset: Offset, split_hz: u32) -> String {
    let tag = match offset {
        Offset::Simplex => "SIMPLEX",
        Offset::Plus => "PLUS",
        Offset::Minus => "MINUS",
    };
    format!("SETOFFSET {tag} {split_hz}\n")
}

pub fn settone_command(tx_tone_decihz: Option<u32>) -> String {
    match tx_tone_decihz {
        Some(tone) => format!("SETTONE {tone}\n"),
        None => "SETTONE OFF\n".to_string(),
    }
}

pub fn setpower_command(level: u8) -> String {
    format!("SETPOWER {level}\n")
}

pub struct FirmwareTextRig {
    kind: RigKind,
    io: Box<dyn SerialIo>,
    freq_hz: u64,
}

impl FirmwareTextRig {
    pub fn new(kind: RigKind, io: Box<dyn SerialIo>) -> FirmwareTextRig {
        FirmwareTextRig { kind, io, freq_hz: 146_520_000 }
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        self.io.write_all(cmd.as_bytes())?;
        let _ = self.io.read_until(b'\n', Duration::from_millis(200));
        Ok(())
    }
}

impl Rig for FirmwareTextRig {
    fn kind(&self) -> RigKind {
        self.kind
    }

    fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        self.freq_hz = freq_hz;
        self.send(&setfreq_command(freq_hz))
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.send(&setmode_command(mode))
    }

    fn set_offset(&mut self, offset: Offset, split_hz: u32) -> Result<()> {
        self.send(&setoffset_command(offset, split_hz))
    }

    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, _rx_tone_decihz: Option<u32>) -> Result<()> {
        self.send(&settone_command(tx_tone_decihz))
    }

    fn set_power(&mut self, level: u8) -> Result<()> {
        self.send(&setpower_command(level))
    }

    fn check_freq(&self, freq_hz: u64) -> Result<Mode> {
        match self.kind {
            RigKind::Rtx150 => Ok(Mode::Fm),
            RigKind::Rtx450 | RigKind::Ppp16 => Ok(Mode::Fm),
            _ => unreachable!("FirmwareTextRig only constructed for rtx150/rtx450/ppp16"),
        }
        .and_then(|mode| {
            let in_band = match self.kind {
                RigKind::Rtx150 => (144_000_000..=148_000_000).contains(&freq_hz),
                RigKind::Rtx450 => (420_000_000..=450_000_000).contains(&freq_hz),
                RigKind::Ppp16 => true,
                _ => false,
            };
            if in_band {
                Ok(mode)
            } else {
                Err(crate::error::RptError::config("<remote>", format!("{freq_hz} Hz outside configured band")))
            }
        })
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
