//! Per-node countdown timers (§3.1 "Timers"), all counted down by wall-clock
//! milliseconds each loop iteration and clamped at zero (§4.1 step 1).

use std::time::Duration;

/// One countdown timer. `0` means "not running" / "expired"; loading a new
/// value (re)arms it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer(u32);

impl Timer {
    pub fn armed(ms: u32) -> Timer {
        Timer(ms)
    }

    pub fn is_running(self) -> bool {
        self.0 > 0
    }

    pub fn remaining_ms(self) -> u32 {
        self.0
    }

    pub fn reload(&mut self, ms: u32) {
        self.0 = ms;
    }

    pub fn stop(&mut self) {
        self.0 = 0;
    }

    /// Decrement by `elapsed`, clamped at zero (§4.1 step 1). Returns `true`
    /// exactly on the iteration this timer reaches zero (edge-triggered
    /// expiry, so callers firing a one-shot action don't refire every tick
    /// once it's already at zero).
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.0 == 0 {
            return false;
        }
        let ms = elapsed.as_millis().min(u32::MAX as u128) as u32;
        if ms >= self.0 {
            self.0 = 0;
            true
        } else {
            self.0 -= ms;
            false
        }
    }
}

/// Every timer `rpt` counts down (§3.1 "Timers"). Grouped as a struct so the
/// loop's "decrement timers" step (§4.1 step 1) is one call.
#[derive(Debug, Clone, Default)]
pub struct NodeTimers {
    pub tail: Timer,
    pub timeout: Timer,
    pub ident: Timer,
    pub courtesy_scan: Timer,
    pub tail_message: Timer,
    pub scheduler: Timer,
    pub link_activity: Timer,
    pub repeater_inactivity: Timer,
    pub retransmit: Timer,
    pub re_receive: Timer,
    pub rx_linger: Timer,
    pub parrot: Timer,
    pub keyed_time: Timer,
    pub dtmf_local: Timer,
    /// Anti-kerchunk reset: gates whether `timeout` is allowed to clear
    /// (§4.1 step 2 "Transmit timeout" kerchunk gating).
    pub anti_kerchunk_reset: Timer,
}

impl NodeTimers {
    /// Decrement every timer by `elapsed` (§4.1 step 1).
    pub fn tick(&mut self, elapsed: Duration) {
        self.tail.tick(elapsed);
        self.timeout.tick(elapsed);
        self.ident.tick(elapsed);
        self.courtesy_scan.tick(elapsed);
        self.tail_message.tick(elapsed);
        self.scheduler.tick(elapsed);
        self.link_activity.tick(elapsed);
        self.repeater_inactivity.tick(elapsed);
        self.retransmit.tick(elapsed);
        self.re_receive.tick(elapsed);
        self.rx_linger.tick(elapsed);
        self.parrot.tick(elapsed);
        self.keyed_time.tick(elapsed);
        self.dtmf_local.tick(elapsed);
        self.anti_kerchunk_reset.tick(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_clamps_at_zero() {
        let mut t = Timer::armed(100);
        assert!(!t.tick(Duration::from_millis(50)));
        assert_eq!(t.remaining_ms(), 50);
        assert!(t.tick(Duration::from_millis(200)));
        assert_eq!(t.remaining_ms(), 0);
    }

    #[test]
    fn expired_timer_does_not_refire() {
        let mut t = Timer::armed(10);
        assert!(t.tick(Duration::from_millis(10)));
        assert!(!t.tick(Duration::from_millis(10)));
    }

    #[test]
    fn stopped_timer_never_expires() {
        let mut t = Timer::armed(0);
        assert!(!t.tick(Duration::from_millis(1000)));
    }

    #[test]
    fn all_timers_tick_together() {
        let mut timers = NodeTimers::default();
        timers.ident = Timer::armed(300_000);
        timers.tick(Duration::from_millis(300_000));
        assert_eq!(timers.ident.remaining_ms(), 0);
    }
}
