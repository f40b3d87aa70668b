//! Packed-BCD 5-byte command framing shared by `ft897` and `ft100`
//! (§4.6 table: "Packed-BCD 5-byte commands"). Each command is a 4-byte
//! data field (frequency or parameter) followed by a 1-byte opcode.

use std::time::Duration;

use crate::error::{RptError, Result};
use crate::remote::rig::{BumpRate, Mode, Offset, Rig, RigKind};
use crate::remote::serial::SerialIo;

const OP_SET_FREQ: u8 = 0x01;
const OP_SET_MODE: u8 = 0x07;

const MODE_LSB: u8 = 0x00;
const MODE_USB: u8 = 0x01;
const MODE_CW: u8 = 0x02;
const MODE_AM: u8 = 0x04;
const MODE_FM: u8 = 0x08;

fn mode_byte(mode: Mode) -> u8 {
    match mode {
        Mode::Lsb => MODE_LSB,
        Mode::Usb => MODE_USB,
        Mode::Cw => MODE_CW,
        Mode::Am => MODE_AM,
        Mode::Fm => MODE_FM,
    }
}

/// 4-byte packed-BCD frequency in 10 Hz steps, as the Yaesu CAT protocol
/// represents it (1 decimal digit per nibble, most-significant first).
pub fn encode_freq_bcd(freq_hz: u64) -> [u8; 4] {
    let tens_of_hz = freq_hz / 10;
    let digits = format!("{tens_of_hz:08}");
    let b = digits.as_bytes();
    let nibble = |c: u8| c - b'0';
    [
        (nibble(b[0]) << 4) | nibble(b[1]),
        (nibble(b[2]) << 4) | nibble(b[3]),
        (nibble(b[4]) << 4) | nibble(b[5]),
        (nibble(b[6]) << 4) | nibble(b[7]),
    ]
}

pub fn command(data: [u8; 4], opcode: u8) -> [u8; 5] {
    [data[0], data[1], data[2], data[3], opcode]
}

/// Default mode per band (§4.6: "Band-dependent default mode").
pub fn default_mode_for_band(freq_hz: u64) -> Mode {
    match freq_hz {
        144_000_000..=148_000_000 | 420_000_000..=450_000_000 => Mode::Fm,
        _ => Mode::Usb,
    }
}

pub struct YaesuBcdRig {
    kind: RigKind,
    io: Box<dyn SerialIo>,
    freq_hz: u64,
    /// FT-897/FT-100 apply a 75 ms settle delay after every command
    /// (§5 "the FT-100 and FT-897 have 75 ms post-command delays").
    post_command_delay: Duration,
}

impl YaesuBcdRig {
    pub fn new(kind: RigKind, io: Box<dyn SerialIo>) -> YaesuBcdRig {
        YaesuBcdRig { kind, io, freq_hz: 146_520_000, post_command_delay: Duration::from_millis(75) }
    }

    fn send(&mut self, data: [u8; 4], opcode: u8) -> Result<()> {
        self.io.write_all(&command(data, opcode))?;
        self.io.sleep(self.post_command_delay);
        Ok(())
    }
}

impl Rig for YaesuBcdRig {
    fn kind(&self) -> RigKind {
        self.kind
    }

    fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        self.freq_hz = freq_hz;
        self.send(encode_freq_bcd(freq_hz), OP_SET_FREQ)
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.send([mode_byte(mode), 0, 0, 0], OP_SET_MODE)
    }

    fn set_offset(&mut self, offset: Offset, split_hz: u32) -> Result<()> {
        // Simplex offset is sent as a split in kHz, packed into the first
        // data byte in tens of kHz (§4.6: "± simplex offset as split in kHz").
        let tens_khz = (split_hz / 10_000) as u8;
        let dir = match offset {
            Offset::Simplex => 0,
            Offset::Plus => 1,
            Offset::Minus => 2,
        };
        self.send([dir, tens_khz, 0, 0], 0x09)
    }

    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, _rx_tone_decihz: Option<u32>) -> Result<()> {
        let on = tx_tone_decihz.is_some() as u8;
        let tone = tx_tone_decihz.unwrap_or(0);
        self.send([on, (tone >> 8) as u8, tone as u8, 0], 0x0A)
    }

    fn set_power(&mut self, level: u8) -> Result<()> {
        self.send([level, 0, 0, 0], 0x0B)
    }

    fn check_freq(&self, freq_hz: u64) -> Result<Mode> {
        match freq_hz {
            1_800_000..=450_000_000 => Ok(default_mode_for_band(freq_hz)),
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
    use crate::remote::serial::FakeSerial;

    #[test]
    fn freq_bcd_encodes_146_520_000() {
        // 146520000 Hz / 10 = 14652000 -> "14652000"
        assert_eq!(encode_freq_bcd(146_520_000), [0x14, 0x65, 0x20, 0x00]);
    }

    #[test]
    fn command_appends_opcode() {
        assert_eq!(command([1, 2, 3, 4], OP_SET_FREQ), [1, 2, 3, 4, OP_SET_FREQ]);
    }

    #[test]
    fn default_mode_is_fm_on_vhf_uhf() {
        assert_eq!(default_mode_for_band(146_520_000), Mode::Fm);
        assert_eq!(default_mode_for_band(7_200_000), Mode::Usb);
    }

    #[test]
    fn set_freq_does_not_error() {
        let mut rig = YaesuBcdRig::new(RigKind::Ft897, Box::new(FakeSerial::new()));
        rig.set_freq(146_520_000).unwrap();
    }
}
