//! Bit-packed `Link` flags (§3.2), grounded on `struct rpt_link`'s bitfields
//! in `original_source/apps/app_rpt/app_rpt.h`.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkFlags: u32 {
        const CONNECTED           = 1 << 0;
        const HAS_CONNECTED       = 1 << 1;
        const THIS_CONNECTED      = 1 << 2;
        const OUTBOUND            = 1 << 3;
        const PERMA               = 1 << 4;
        const LASTTX              = 1 << 5;
        const LASTTX1             = 1 << 6;
        const LASTRX              = 1 << 7;
        const LASTREALRX          = 1 << 8;
        const LASTRX1             = 1 << 9;
        const KILLME              = 1 << 10;
        const DTMFED              = 1 << 11;
        const GOTT                = 1 << 12;
        const CONNECT_IN_PROGRESS = 1 << 13;
        const LAST_FRAME_SENT     = 1 << 14;
    }
}

/// Link audio role (§3.2 "mode (monitor | transceive | local-monitor)").
/// Only `Transceive` links that have been heard from contribute to the
/// node's derived keying (§4.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Monitor,
    Transceive,
    LocalMonitor,
}

impl Default for LinkMode {
    fn default() -> Self {
        LinkMode::Transceive
    }
}

/// Phone-patch role (§3.2 "phone mode (none | phone-control | dumb-duplex |
/// dumb-simplex)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneMode {
    None,
    PhoneControl,
    DumbDuplex,
    DumbSimplex,
}

impl Default for PhoneMode {
    fn default() -> Self {
        PhoneMode::None
    }
}

/// `disced` is two bits wide: 0 = not, 1 = by us, 2 = by peer (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disced {
    No,
    ByUs,
    ByPeer,
}

impl Default for Disced {
    fn default() -> Self {
        Disced::No
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent_bits() {
        let mut f = LinkFlags::empty();
        f.insert(LinkFlags::CONNECTED);
        f.insert(LinkFlags::OUTBOUND);
        assert!(f.contains(LinkFlags::CONNECTED));
        assert!(f.contains(LinkFlags::OUTBOUND));
        assert!(!f.contains(LinkFlags::PERMA));
        f.remove(LinkFlags::CONNECTED);
        assert!(!f.contains(LinkFlags::CONNECTED));
        assert!(f.contains(LinkFlags::OUTBOUND));
    }
}
