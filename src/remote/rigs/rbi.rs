//! RBI-1 bit-banged interface, shared by the `rbi` tag (§4.6 table: "RBI-1
//! bit-banged, 5-byte frame"). Unlike the other rig families, RBI has no
//! command/response protocol: the controller writes a fixed 5-byte frame
//! that directly drives the interface's band-decoder latch, PL-tone DAC, and
//! power/offset relays, and the rig cannot be queried back.

use crate::error::{RptError, Result};
use crate::remote::pltable::kenwood_pl_code;
use crate::remote::rig::{BumpRate, Mode, Offset, Rig, RigKind};
use crate::remote::serial::SerialIo;

/// Which port the RBI latch is wired to (§4.6 "parallel port or PCI radio
/// interface card").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbiTransport {
    ParallelPort,
    PciRadio,
}

fn band_number(freq_hz: u64) -> Option<u8> {
    match freq_hz {
        50_000_000..=54_000_000 => Some(1),
        144_000_000..=148_000_000 => Some(4),
        222_000_000..=225_000_000 => Some(6),
        420_000_000..=450_000_000 => Some(8),
        _ => None,
    }
}

/// Pack the 5-byte RBI frame: band nibble, BCD frequency, offset/power bits,
/// PL tone index (§4.6 "band number, power, offset bits, PL index").
pub fn encode_frame(freq_hz: u64, offset: Offset, high_power: bool, tone_decihz: Option<u32>) -> Result<[u8; 5]> {
    let band = band_number(freq_hz)
        .ok_or_else(|| RptError::config("<remote>", format!("{freq_hz} Hz has no RBI band assignment")))?;
    // 100 kHz resolution packed BCD, two digits.
    let hundred_khz = ((freq_hz / 100_000) % 100) as u8;
    let bcd = ((hundred_khz / 10) << 4) | (hundred_khz % 10);
    let offset_bits = match offset {
        Offset::Simplex => 0b00,
        Offset::Plus => 0b01,
        Offset::Minus => 0b10,
    };
    let power_bit = if high_power { 0b100 } else { 0 };
    let control = offset_bits | power_bit;
    let pl_index = match tone_decihz {
        Some(tone) => kenwood_pl_code(tone)
            .ok_or_else(|| RptError::config("<remote>", format!("no CTCSS table entry for {tone} decihertz")))?,
        None => 0,
    };
    Ok([band, bcd, control, pl_index, 0x00])
}

pub struct RbiRig {
    transport: RbiTransport,
    io: Box<dyn SerialIo>,
    freq_hz: u64,
    offset: Offset,
    high_power: bool,
    tone_decihz: Option<u32>,
}

impl RbiRig {
    pub fn new(transport: RbiTransport, io: Box<dyn SerialIo>) -> RbiRig {
        RbiRig {
            transport,
            io,
            freq_hz: 52_525_000,
            offset: Offset::Simplex,
            high_power: true,
            tone_decihz: None,
        }
    }

    pub fn transport(&self) -> RbiTransport {
        self.transport
    }

    fn flush(&mut self) -> Result<()> {
        let frame = encode_frame(self.freq_hz, self.offset, self.high_power, self.tone_decihz)?;
        self.io.write_all(&frame)
    }
}

impl Rig for RbiRig {
    fn kind(&self) -> RigKind {
        RigKind::Rbi
    }

    fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        self.freq_hz = freq_hz;
        self.flush()
    }

    fn set_mode(&mut self, _mode: Mode) -> Result<()> {
        // RBI is FM-only; mode is fixed by the interface hardware.
        Ok(())
    }

    fn set_offset(&mut self, offset: Offset, _split_hz: u32) -> Result<()> {
        self.offset = offset;
        self.flush()
    }

    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, _rx_tone_decihz: Option<u32>) -> Result<()> {
        self.tone_decihz = tx_tone_decihz;
        self.flush()
    }

    fn set_power(&mut self, level: u8) -> Result<()> {
        self.high_power = level > 50;
        self.flush()
    }

    fn check_freq(&self, freq_hz: u64) -> Result<Mode> {
        band_number(freq_hz)
            .map(|_| Mode::Fm)
            .ok_or_else(|| RptError::config("<remote>", format!("{freq_hz} Hz has no RBI band assignment")))
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
    fn band_number_maps_two_meters() {
        assert_eq!(band_number(146_520_000), Some(4));
        assert_eq!(band_number(10_000_000), None);
    }

    #[test]
    fn encode_frame_rejects_out_of_band() {
        assert!(encode_frame(10_000_000, Offset::Simplex, true, None).is_err());
    }

    #[test]
    fn encode_frame_packs_band_and_bcd() {
        let frame = encode_frame(146_520_000, Offset::Minus, true, None).unwrap();
        assert_eq!(frame[0], 4);
        assert_eq!(frame[1], 0x65);
        assert_eq!(frame[2], 0b110);
    }

    #[test]
    fn set_freq_writes_a_frame() {
        let mut rig = RbiRig::new(RbiTransport::ParallelPort, Box::new(FakeSerial::new()));
        rig.set_freq(146_520_000).unwrap();
    }
}
