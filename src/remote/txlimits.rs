//! Per-login-level TX-band permission check (§4.6 "Frequency/mode
//! validation" combined with §6.1 `[txlimits]`): a remote-base tune request
//! must pass both the rig's own band table and the operator's login-level
//! permission before `RemoteBase::set_freq` is called.

use crate::config::TxLimits;
use crate::error::{RptError, Result};

/// Check whether `login_level` may transmit on `freq_hz`.
pub fn check_tx_freq(limits: &TxLimits, login_level: &str, freq_hz: u64) -> Result<()> {
    let freq_mhz = freq_hz as f64 / 1_000_000.0;
    if limits.permits(login_level, freq_mhz) {
        Ok(())
    } else {
        Err(RptError::config(
            "<txlimits>",
            format!("login level '{login_level}' may not transmit on {freq_mhz:.4} MHz"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn limits() -> TxLimits {
        let mut section = HashMap::new();
        section.insert("LOW".to_string(), "144.0-148.0".to_string());
        TxLimits::from_section(&section).unwrap()
    }

    #[test]
    fn check_tx_freq_permits_in_range() {
        assert!(check_tx_freq(&limits(), "LOW", 146_520_000).is_ok());
    }

    #[test]
    fn check_tx_freq_rejects_out_of_range() {
        assert!(check_tx_freq(&limits(), "LOW", 440_000_000).is_err());
    }

    #[test]
    fn check_tx_freq_rejects_unknown_level() {
        assert!(check_tx_freq(&limits(), "HIGH", 146_520_000).is_err());
    }
}
