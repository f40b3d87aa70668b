//! ASCII `;`-terminated command set for the FT-950 (§4.6 table:
//! `FAnnnnnnnn;`, `OS02;`, `MD04;`, `CN0nn;`).

use std::time::Duration;

use crate::error::{RptError, Result};
use crate::remote::rig::{BumpRate, Mode, Offset, Rig, RigKind};
use crate::remote::serial::SerialIo;

fn mode_code(mode: Mode) -> u8 {
    match mode {
        Mode::Lsb => 1,
        Mode::Usb => 2,
        Mode::Cw => 3,
        Mode::Am => 5,
        Mode::Fm => 4,
    }
}

pub fn freq_command(freq_hz: u64) -> String {
    format!("FA{freq_hz:09};")
}

pub fn mode_command(mode: Mode) -> String {
    format!("MD0{};", mode_code(mode))
}

pub fn offset_command(offset: Offset) -> String {
    let code = match offset {
        Offset::Simplex => 0,
        Offset::Plus => 1,
        Offset::Minus => 2,
    };
    format!("OS0{code};")
}

pub fn power_command(level_pct: u8) -> String {
    format!("CN0{level_pct:02};")
}

pub struct Ft950Rig {
    io: Box<dyn SerialIo>,
    freq_hz: u64,
}

impl Ft950Rig {
    pub fn new(io: Box<dyn SerialIo>) -> Ft950Rig {
        Ft950Rig { io, freq_hz: 146_520_000 }
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        self.io.write_all(cmd.as_bytes())?;
        let _ = self.io.read_until(b';', Duration::from_millis(100));
        Ok(())
    }
}

impl Rig for Ft950Rig {
    fn kind(&self) -> RigKind {
        RigKind::Ft950
    }

    fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        self.freq_hz = freq_hz;
        self.send(&freq_command(freq_hz))
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.send(&mode_command(mode))
    }

    fn set_offset(&mut self, offset: Offset, _split_hz: u32) -> Result<()> {
        self.send(&offset_command(offset))
    }

    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, _rx_tone_decihz: Option<u32>) -> Result<()> {
        self.send(if tx_tone_decihz.is_some() { "CT01;" } else { "CT00;" })
    }

    fn set_power(&mut self, level: u8) -> Result<()> {
        self.send(&power_command(level))
    }

    fn check_freq(&self, freq_hz: u64) -> Result<Mode> {
        match freq_hz {
            1_800_000..=450_000_000 => Ok(if (144_000_000..=450_000_000).contains(&freq_hz) {
                Mode::Fm
            } else {
                Mode::Usb
            }),
            _ => Err(RptError::config("<remote>", format!("{freq_hz} Hz outside rig coverage"))),
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
    fn freq_command_formats_nine_digit_freq() {
        assert_eq!(freq_command(146_520_000), "FA146520000;");
    }

    #[test]
    fn mode_command_formats_fm() {
        assert_eq!(mode_command(Mode::Fm), "MD04;");
    }

    #[test]
    fn offset_command_formats_plus() {
        assert_eq!(offset_command(Offset::Plus), "OS01;");
    }
}
