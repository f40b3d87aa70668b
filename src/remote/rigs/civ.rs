//! CI-V framed command encoding shared by `ic706` and `xcat` (§4.6 table:
//! "CI-V framed (`FE FE addr e0 … FD`)"). Grounded on
//! `original_source/apps/app_rpt/rpt_serial.c` / `rpt_rig.c`.

use std::time::Duration;

use crate::error::{RptError, Result};
use crate::remote::pltable::civ_pl_bcd;
use crate::remote::rig::{BumpRate, Mode, Offset, Rig, RigKind};
use crate::remote::serial::SerialIo;

const PREAMBLE: [u8; 2] = [0xFE, 0xFE];
const CONTROLLER_ADDR: u8 = 0xE0;
const TERMINATOR: u8 = 0xFD;

const CMD_SET_FREQ: u8 = 0x05;
const CMD_SET_MODE: u8 = 0x06;
const CMD_SET_OFFSET_FREQ: u8 = 0x0D; // xcat uses a rig-specific variant, see below
const CMD_SET_OFFSET_DIR: u8 = 0x0F;
const CMD_SET_TONE: u8 = 0x1B;

const MODE_FM: u8 = 0x05;
const MODE_AM: u8 = 0x02;
const MODE_USB: u8 = 0x01;
const MODE_LSB: u8 = 0x00;
const MODE_CW: u8 = 0x03;

fn mode_byte(mode: Mode) -> u8 {
    match mode {
        Mode::Fm => MODE_FM,
        Mode::Am => MODE_AM,
        Mode::Usb => MODE_USB,
        Mode::Lsb => MODE_LSB,
        Mode::Cw => MODE_CW,
    }
}

/// Packed-BCD little-endian frequency, 5 bytes / 10 digits of resolution
/// down to 1 Hz (§4.6 "Packed-BCD frequency").
pub fn encode_freq_bcd(freq_hz: u64) -> [u8; 5] {
    let digits = format!("{freq_hz:010}");
    let b = digits.as_bytes();
    let nibble = |c: u8| c - b'0';
    let byte_at = |hi: usize, lo: usize| (nibble(b[hi]) << 4) | nibble(b[lo]);
    // CI-V sends least-significant decade first.
    [
        byte_at(8, 9),
        byte_at(6, 7),
        byte_at(4, 5),
        byte_at(2, 3),
        byte_at(0, 1),
    ]
}

pub fn frame(addr: u8, cmd: u8, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + data.len());
    out.extend_from_slice(&PREAMBLE);
    out.push(addr);
    out.push(CONTROLLER_ADDR);
    out.push(cmd);
    out.extend_from_slice(data);
    out.push(TERMINATOR);
    out
}

pub struct CivRig {
    kind: RigKind,
    addr: u8,
    io: Box<dyn SerialIo>,
    freq_hz: u64,
}

impl CivRig {
    pub fn new(kind: RigKind, addr: u8, io: Box<dyn SerialIo>) -> CivRig {
        CivRig { kind, addr, io, freq_hz: 146_520_000 }
    }

    fn send(&mut self, cmd: u8, data: &[u8]) -> Result<()> {
        let frame = frame(self.addr, cmd, data);
        self.io.write_all(&frame)?;
        // CI-V rigs echo the command before replying; discard the echo and
        // the OK/NG response within the rig's post-command window.
        let mut echo = vec![0u8; frame.len()];
        let _ = self.io.read_exact(&mut echo, Duration::from_millis(150));
        Ok(())
    }
}

impl Rig for CivRig {
    fn kind(&self) -> RigKind {
        self.kind
    }

    fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        self.freq_hz = freq_hz;
        let bcd = encode_freq_bcd(freq_hz);
        self.send(CMD_SET_FREQ, &bcd)
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.send(CMD_SET_MODE, &[mode_byte(mode)])
    }

    fn set_offset(&mut self, offset: Offset, split_hz: u32) -> Result<()> {
        let dir_byte = match offset {
            Offset::Simplex => 0x10,
            Offset::Plus => 0x11,
            Offset::Minus => 0x12,
        };
        self.send(CMD_SET_OFFSET_DIR, &[dir_byte])?;
        if offset != Offset::Simplex {
            // split is sent as a 4-byte packed-BCD split in kHz (§4.6 "offset
            // is a four-byte packed-BCD split").
            let khz = split_hz / 1000;
            let digits = format!("{khz:08}");
            let b = digits.as_bytes();
            let nibble = |c: u8| c - b'0';
            let data = [
                (nibble(b[6]) << 4) | nibble(b[7]),
                (nibble(b[4]) << 4) | nibble(b[5]),
                (nibble(b[2]) << 4) | nibble(b[3]),
                (nibble(b[0]) << 4) | nibble(b[1]),
            ];
            self.send(CMD_SET_OFFSET_FREQ, &data)?;
        }
        Ok(())
    }

    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, _rx_tone_decihz: Option<u32>) -> Result<()> {
        match tx_tone_decihz {
            Some(tone) => {
                let bcd = civ_pl_bcd(tone);
                self.send(CMD_SET_TONE, &[0x00, bcd[0], bcd[1]])
            }
            None => self.send(CMD_SET_TONE, &[0x00, 0x00, 0x00]),
        }
    }

    fn set_power(&mut self, _level: u8) -> Result<()> {
        // CI-V power-set is vendor-extension territory; not named by §4.6's
        // table for ic706/xcat, so this is a deliberate no-op.
        Ok(())
    }

    fn check_freq(&self, freq_hz: u64) -> Result<Mode> {
        match freq_hz {
            144_000_000..=148_000_000 | 420_000_000..=450_000_000 => Ok(Mode::Fm),
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
    use crate::remote::serial::FakeSerial;

    #[test]
    fn freq_bcd_encodes_146_520_000() {
        // 146.520000 MHz == "0146520000"
        assert_eq!(encode_freq_bcd(146_520_000), [0x00, 0x00, 0x52, 0x46, 0x01]);
    }

    #[test]
    fn frame_has_preamble_and_terminator() {
        let f = frame(0x58, CMD_SET_MODE, &[0x05]);
        assert_eq!(&f[0..2], &PREAMBLE);
        assert_eq!(f[2], 0x58);
        assert_eq!(f[3], CONTROLLER_ADDR);
        assert_eq!(*f.last().unwrap(), TERMINATOR);
    }

    #[test]
    fn set_freq_writes_expected_frame() {
        let mut io = FakeSerial::new();
        io.push_response(vec![0u8; 11]);
        let mut rig = CivRig::new(RigKind::Ic706, 0x58, Box::new(io));
        rig.set_freq(146_520_000).unwrap();
    }

    #[test]
    fn check_freq_rejects_out_of_band() {
        let rig = CivRig::new(RigKind::Ic706, 0x58, Box::new(crate::remote::serial::FakeSerial::new()));
        assert!(rig.check_freq(1_000_000).is_err());
        assert_eq!(rig.check_freq(146_520_000).unwrap(), Mode::Fm);
    }
}
