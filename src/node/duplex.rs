//! Duplex policy (§4.1.1): what the five `duplex` settings mean for RX
//! muting, squelch pass-through, and announcement muting during local RX.

use crate::config::Duplex;

/// Derived behavior for one `duplex` setting, computed once per policy
/// rather than matched inline at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplexPolicy {
    /// RX audio is muted from TX while TX is keyed.
    pub mute_rx_while_tx: bool,
    /// Local carrier-squelch passes straight through to TX even without a
    /// function invocation (duplex 1).
    pub pass_squelch: bool,
    /// Announcements are muted while local RX is active (duplex 3).
    pub mute_announcements_during_rx: bool,
}

pub fn policy(duplex: Duplex) -> DuplexPolicy {
    match duplex {
        Duplex::Simplex => DuplexPolicy {
            mute_rx_while_tx: true,
            pass_squelch: false,
            mute_announcements_during_rx: false,
        },
        Duplex::SimplexPassSquelch => DuplexPolicy {
            mute_rx_while_tx: true,
            pass_squelch: true,
            mute_announcements_during_rx: false,
        },
        Duplex::HalfDuplex => DuplexPolicy {
            mute_rx_while_tx: false,
            pass_squelch: false,
            mute_announcements_during_rx: false,
        },
        Duplex::FullDuplexMuted => DuplexPolicy {
            mute_rx_while_tx: false,
            pass_squelch: false,
            mute_announcements_during_rx: true,
        },
        Duplex::FullDuplexAlways => DuplexPolicy {
            mute_rx_while_tx: false,
            pass_squelch: false,
            mute_announcements_during_rx: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplex_mutes_rx_while_keyed() {
        assert!(policy(Duplex::Simplex).mute_rx_while_tx);
        assert!(!policy(Duplex::Simplex).pass_squelch);
    }

    #[test]
    fn simplex_pass_squelch_variant_passes_through() {
        assert!(policy(Duplex::SimplexPassSquelch).pass_squelch);
    }

    #[test]
    fn half_duplex_never_mutes_rx() {
        assert!(!policy(Duplex::HalfDuplex).mute_rx_while_tx);
    }

    #[test]
    fn full_duplex_muted_suppresses_announcements_during_rx() {
        assert!(policy(Duplex::FullDuplexMuted).mute_announcements_during_rx);
        assert!(!policy(Duplex::FullDuplexAlways).mute_announcements_during_rx);
    }
}
