//! Sys-state bank (§3.1 "Sys-state bank"): ten configured toggle-flag rows
//! (`s0`..`s9`), one of which is "current"; each row disables some subset of
//! TX, timeout, link functions, autopatch, scheduler, user functions, and
//! toggles alt-tail / no-incoming-connections / sleep-enable.

use crate::config::SysStateFlag;

/// The active sys-state row plus the query methods every disable-gated path
/// in the node loop and DTMF dispatcher reads (§4.2 `cop` verb, §4.1 timers).
#[derive(Debug, Clone)]
pub struct SysStateBank {
    rows: [Vec<SysStateFlag>; 10],
    current: usize,
}

impl SysStateBank {
    pub fn new(rows: [Vec<SysStateFlag>; 10]) -> SysStateBank {
        SysStateBank { rows, current: 0 }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// `cop` verb support: switch the active row (§4.2 `cop` "set tail
    /// type" and sys-state selection live here).
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.rows.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    fn has(&self, flag: SysStateFlag) -> bool {
        self.rows[self.current].contains(&flag)
    }

    pub fn tx_disabled(&self) -> bool {
        self.has(SysStateFlag::TxDisable)
    }

    pub fn rx_disabled(&self) -> bool {
        self.has(SysStateFlag::RxDisable)
    }

    pub fn timeout_disabled(&self) -> bool {
        self.has(SysStateFlag::TimeoutDisable)
    }

    pub fn link_functions_disabled(&self) -> bool {
        self.has(SysStateFlag::LinkFunDisable)
    }

    pub fn autopatch_disabled(&self) -> bool {
        self.has(SysStateFlag::AutopatchDisable)
    }

    pub fn scheduler_disabled(&self) -> bool {
        self.has(SysStateFlag::SchedulerDisable)
    }

    pub fn user_functions_disabled(&self) -> bool {
        self.has(SysStateFlag::UserFunDisable)
    }

    pub fn alt_tail(&self) -> bool {
        self.has(SysStateFlag::AltTail)
    }

    pub fn no_incoming_connections(&self) -> bool {
        self.has(SysStateFlag::NoIncomingConnections)
    }

    pub fn sleep_enabled(&self) -> bool {
        self.has(SysStateFlag::SleepEnable)
    }
}

impl Default for SysStateBank {
    fn default() -> Self {
        SysStateBank::new(Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_row_has_nothing_disabled() {
        let bank = SysStateBank::default();
        assert!(!bank.tx_disabled());
        assert!(!bank.sleep_enabled());
    }

    #[test]
    fn switching_row_changes_visible_flags() {
        let mut rows: [Vec<SysStateFlag>; 10] = Default::default();
        rows[1] = vec![SysStateFlag::TxDisable, SysStateFlag::SleepEnable];
        let mut bank = SysStateBank::new(rows);
        assert!(!bank.tx_disabled());
        assert!(bank.set_current(1));
        assert!(bank.tx_disabled());
        assert!(bank.sleep_enabled());
    }

    #[test]
    fn set_current_rejects_out_of_range() {
        let mut bank = SysStateBank::default();
        assert!(!bank.set_current(10));
        assert_eq!(bank.current_index(), 0);
    }
}
