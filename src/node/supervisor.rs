//! Node thread-health supervisor (§4.1.4, added). Watches each node's
//! `lastthreadupdatetime` and decides when a stuck node's control thread
//! should be restarted, bounded by a restart count within a window so a
//! node that keeps dying doesn't thrash forever.
//!
//! Grounded on the teacher's `CEPin::save_state`/`restore_state` pattern of
//! small state machines advanced only by explicit method calls, not Drop.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    Healthy,
    Restart,
    Deleted,
}

#[derive(Debug, Clone)]
struct Watch {
    since_last_update: Duration,
    restarts_in_window: u32,
    window_elapsed: Duration,
    deleted: bool,
}

impl Default for Watch {
    fn default() -> Self {
        Watch { since_last_update: Duration::ZERO, restarts_in_window: 0, window_elapsed: Duration::ZERO, deleted: false }
    }
}

/// Polls at `RPT_THREAD_TIMEOUT / 4` in the real process; here driven by
/// explicit `poll` calls carrying the elapsed wall-clock since the last one.
#[derive(Debug, Clone)]
pub struct Supervisor {
    thread_timeout: Duration,
    max_restarts: u32,
    restart_window: Duration,
    nodes: HashMap<String, Watch>,
}

impl Supervisor {
    pub fn new(thread_timeout: Duration, max_restarts: u32, restart_window: Duration) -> Supervisor {
        Supervisor { thread_timeout, max_restarts, restart_window, nodes: HashMap::new() }
    }

    /// Call every node-loop iteration; resets the stuck-detector for that
    /// node (`lastthreadupdatetime` touch).
    pub fn touch(&mut self, node_name: &str) {
        let watch = self.nodes.entry(node_name.to_string()).or_default();
        watch.since_last_update = Duration::ZERO;
    }

    /// Call from the watchdog poll loop with the elapsed time since the
    /// previous poll. Returns the action the caller should take for this
    /// node.
    pub fn poll(&mut self, node_name: &str, elapsed: Duration) -> SupervisorAction {
        let watch = self.nodes.entry(node_name.to_string()).or_default();
        if watch.deleted {
            return SupervisorAction::Deleted;
        }

        watch.since_last_update += elapsed;
        watch.window_elapsed += elapsed;
        if watch.window_elapsed >= self.restart_window {
            watch.window_elapsed = Duration::ZERO;
            watch.restarts_in_window = 0;
        }

        if watch.since_last_update < self.thread_timeout {
            return SupervisorAction::Healthy;
        }

        watch.restarts_in_window += 1;
        watch.since_last_update = Duration::ZERO;
        if watch.restarts_in_window > self.max_restarts {
            watch.deleted = true;
            SupervisorAction::Deleted
        } else {
            SupervisorAction::Restart
        }
    }

    pub fn is_deleted(&self, node_name: &str) -> bool {
        self.nodes.get(node_name).map(|w| w.deleted).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touched_node_stays_healthy() {
        let mut sup = Supervisor::new(Duration::from_secs(10), 3, Duration::from_secs(60));
        sup.touch("repeater1");
        assert_eq!(sup.poll("repeater1", Duration::from_secs(5)), SupervisorAction::Healthy);
    }

    #[test]
    fn stuck_node_is_restarted() {
        let mut sup = Supervisor::new(Duration::from_secs(10), 3, Duration::from_secs(60));
        sup.touch("repeater1");
        assert_eq!(sup.poll("repeater1", Duration::from_secs(11)), SupervisorAction::Restart);
    }

    #[test]
    fn exceeding_restart_bound_deletes_the_node() {
        let mut sup = Supervisor::new(Duration::from_millis(10), 2, Duration::from_secs(60));
        sup.touch("flaky");
        for _ in 0..2 {
            assert_eq!(sup.poll("flaky", Duration::from_millis(11)), SupervisorAction::Restart);
        }
        assert_eq!(sup.poll("flaky", Duration::from_millis(11)), SupervisorAction::Deleted);
        assert!(sup.is_deleted("flaky"));
    }

    #[test]
    fn window_rollover_resets_restart_count() {
        let mut sup = Supervisor::new(Duration::from_millis(10), 1, Duration::from_millis(100));
        sup.touch("node2");
        assert_eq!(sup.poll("node2", Duration::from_millis(11)), SupervisorAction::Restart);
        // Window rolls over before the next stall, so the bound doesn't trip.
        assert_eq!(sup.poll("node2", Duration::from_millis(100)), SupervisorAction::Restart);
        assert!(!sup.is_deleted("node2"));
    }
}
