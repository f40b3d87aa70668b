//! `Rig` trait (§4.6, Design Notes §9 "tagged variants with per-variant
//! methods"). The C original's `setrem`/`closerem`/`check_freq`/
//! `multimode_bump_freq`/`set_mode` string-tag dispatch reduces to a match
//! on `RigKind` producing a trait object.

use crate::error::Result;

/// Modulation mode a rig can be commanded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fm,
    Am,
    Usb,
    Lsb,
    Cw,
}

/// Repeater offset direction (§4.6 "offset as split in kHz").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Simplex,
    Plus,
    Minus,
}

/// Bump/scan rate (§4.6 "Bump/scan").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpRate {
    Slow,
    Quick,
    Fast,
}

impl BumpRate {
    /// Hz per second at this rate (§4.6: "100/500/2000 Hz per-second rates").
    pub fn hz_per_second(self) -> u32 {
        match self {
            BumpRate::Slow => 100,
            BumpRate::Quick => 500,
            BumpRate::Fast => 2000,
        }
    }
}

/// One of the eleven supported rig tags (§4.6 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigKind {
    Ft897,
    Ft100,
    Ft950,
    Ic706,
    Xcat,
    Kenwood,
    Tmd700,
    Tm271,
    Rbi,
    Rtx150,
    Rtx450,
    Ppp16,
}

impl RigKind {
    pub fn from_tag(tag: &str) -> Option<RigKind> {
        Some(match tag {
            "ft897" => RigKind::Ft897,
            "ft100" => RigKind::Ft100,
            "ft950" => RigKind::Ft950,
            "ic706" => RigKind::Ic706,
            "xcat" => RigKind::Xcat,
            "kenwood" => RigKind::Kenwood,
            "tmd700" => RigKind::Tmd700,
            "tm271" => RigKind::Tm271,
            "rbi" => RigKind::Rbi,
            "rtx150" => RigKind::Rtx150,
            "rtx450" => RigKind::Rtx450,
            "ppp16" => RigKind::Ppp16,
            _ => return None,
        })
    }
}

/// Per-variant behavior a remote-base transceiver must implement (§4.6).
/// Frequencies are whole Hz throughout to avoid floating-point drift across
/// repeated `bump` calls.
pub trait Rig: Send {
    fn kind(&self) -> RigKind;

    fn set_freq(&mut self, freq_hz: u64) -> Result<()>;
    fn set_mode(&mut self, mode: Mode) -> Result<()>;
    fn set_offset(&mut self, offset: Offset, split_hz: u32) -> Result<()>;
    fn set_ctcss(&mut self, tx_tone_decihz: Option<u32>, rx_tone_decihz: Option<u32>) -> Result<()>;
    fn set_power(&mut self, level: u8) -> Result<()>;

    /// Validate `freq_hz` against this rig's per-band limits, returning the
    /// default modulation for that band (§4.6 "Frequency/mode validation").
    fn check_freq(&self, freq_hz: u64) -> Result<Mode>;

    /// Step the current frequency by one `rate`-sized increment, in
    /// `direction` (+1 up, -1 down), at 10 Hz resolution (§4.6 "Bump/scan").
    fn bump(&mut self, rate: BumpRate, direction: i8) -> Result<u64>;
}
