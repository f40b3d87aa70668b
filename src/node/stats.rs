//! Statistics counters (§3.1 "Statistics counters"): daily and lifetime
//! kerchunks, keyups, timeouts, executed commands, plus TX-accumulated
//! time. Backs the `stats`/`lstats` CLI surface (§6.4).

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub kerchunks: u64,
    pub keyups: u64,
    pub timeouts: u64,
    pub executed_commands: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    pub daily: Counters,
    pub total: Counters,
    pub tx_accumulated: Duration,
}

impl NodeStats {
    pub fn record_keyup(&mut self) {
        self.daily.keyups += 1;
        self.total.keyups += 1;
    }

    /// A keyup shorter than the node's kerchunk threshold (§4.1 step 2,
    /// glossary "Kerchunk").
    pub fn record_kerchunk(&mut self) {
        self.daily.kerchunks += 1;
        self.total.kerchunks += 1;
    }

    pub fn record_timeout(&mut self) {
        self.daily.timeouts += 1;
        self.total.timeouts += 1;
    }

    pub fn record_executed_command(&mut self) {
        self.daily.executed_commands += 1;
        self.total.executed_commands += 1;
    }

    pub fn accumulate_tx(&mut self, d: Duration) {
        self.tx_accumulated += d;
    }

    /// Roll daily counters over at local midnight; totals are untouched.
    pub fn reset_daily(&mut self) {
        self.daily = Counters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_survive_daily_reset() {
        let mut stats = NodeStats::default();
        stats.record_keyup();
        stats.record_kerchunk();
        stats.reset_daily();
        assert_eq!(stats.daily.keyups, 0);
        assert_eq!(stats.total.keyups, 1);
        assert_eq!(stats.total.kerchunks, 1);
    }

    #[test]
    fn tx_time_accumulates() {
        let mut stats = NodeStats::default();
        stats.accumulate_tx(Duration::from_secs(5));
        stats.accumulate_tx(Duration::from_secs(3));
        assert_eq!(stats.tx_accumulated, Duration::from_secs(8));
    }
}
