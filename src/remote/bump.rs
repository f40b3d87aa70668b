//! Bump/scan frequency stepping (§4.6 "Bump/scan": DTMF-driven up/down at
//! slow/quick/fast rate).

use crate::error::Result;
use crate::remote::rig::BumpRate;
use crate::remote::RemoteBase;

/// Step `base`'s current frequency one increment at `rate`, in `direction`
/// (+1 up, -1 down). Mirrors the original's `multimode_bump_freq`.
pub fn multimode_bump_freq(base: &RemoteBase, rate: BumpRate, direction: i8) -> Result<u64> {
    base.bump(rate, direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::rigs::rbi::RbiTransport;
    use crate::remote::serial::FakeSerial;

    #[test]
    fn bump_up_increases_frequency() {
        let base = RemoteBase::from_tag("rpt1", "ft897", Box::new(FakeSerial::new()), 0x58, RbiTransport::ParallelPort).unwrap();
        let before = base.set_freq(146_520_000).unwrap();
        let _ = before;
        let after = multimode_bump_freq(&base, BumpRate::Quick, 1).unwrap();
        assert_eq!(after, 146_520_000 + 500);
    }

    #[test]
    fn bump_down_decreases_frequency() {
        let base = RemoteBase::from_tag("rpt1", "ft897", Box::new(FakeSerial::new()), 0x58, RbiTransport::ParallelPort).unwrap();
        base.set_freq(146_520_000).unwrap();
        let after = multimode_bump_freq(&base, BumpRate::Slow, -1).unwrap();
        assert_eq!(after, 146_520_000 - 100);
    }
}
