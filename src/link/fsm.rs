//! Outbound connect FSM (§4.3.1).

use std::time::Duration;

/// Interval at which the connect-identifier text is retransmitted while
/// `CONNECT_PENDING` (§4.3.1).
pub const LINKLISTSHORTTIME: Duration = Duration::from_millis(1000);

/// States per link (§4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Init,
    ConnectPending,
    Connected,
    Dead,
}

/// Why a link transitioned to `Dead` (for REMDISC/REMALREADY/REMNOTFOUND
/// telemetry selection, §7 "User-visible failure").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathReason {
    PeerHangup,
    DiscStrReceived,
    RxLingerExpired,
    RetriesExhausted,
    ChannelRequestFailed,
}

#[derive(Debug, Clone)]
pub struct ConnectFsm {
    state: LinkState,
    retries: u32,
    max_retries: u32,
    perma: bool,
}

/// `perma` links retry effectively forever (§3.2 "Retry policy").
pub const MAX_RETRIES_PERM: u32 = u32::MAX;
pub const MAX_RETRIES_DEFAULT: u32 = 5;

impl ConnectFsm {
    pub fn new(perma: bool) -> ConnectFsm {
        ConnectFsm {
            state: LinkState::Init,
            retries: 0,
            max_retries: if perma { MAX_RETRIES_PERM } else { MAX_RETRIES_DEFAULT },
            perma,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Channel-request succeeded; move to awaiting ANSWER.
    pub fn on_requested(&mut self) {
        if self.state == LinkState::Init {
            self.state = LinkState::ConnectPending;
        }
    }

    /// Channel-request failed: destroy, unless `perma` in which case the
    /// caller should retry (state remains `Init`).
    pub fn on_request_failed(&mut self) -> Option<DeathReason> {
        self.retries += 1;
        if self.perma {
            None
        } else if self.retries >= self.max_retries {
            self.state = LinkState::Dead;
            Some(DeathReason::RetriesExhausted)
        } else {
            None
        }
    }

    pub fn on_answer(&mut self) {
        if self.state == LinkState::ConnectPending {
            self.state = LinkState::Connected;
            self.retries = 0;
        }
    }

    pub fn on_peer_hangup(&mut self) -> DeathReason {
        self.state = LinkState::Dead;
        DeathReason::PeerHangup
    }

    pub fn on_discstr(&mut self) -> DeathReason {
        self.state = LinkState::Dead;
        DeathReason::DiscStrReceived
    }

    pub fn on_rx_linger_expired(&mut self) -> DeathReason {
        self.state = LinkState::Dead;
        DeathReason::RxLingerExpired
    }

    pub fn is_dead(&self) -> bool {
        self.state == LinkState::Dead
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}
