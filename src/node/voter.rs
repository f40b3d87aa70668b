//! RSSI-based voter arbitration (§4.1.2). Compares RSSI across links
//! flagged as voter-receivers during a short window after any RX-on and
//! routes the strongest one into the conference.

use crate::link::{Link, LinkManager};

/// `votertype` (§6.1 "Voting"): 0 none, 1 repeater, 2 voter rx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoterType {
    #[default]
    None,
    Repeater,
    VoterRx,
}

/// `votermode` (§6.1): single-shot evaluates once per RX-on window and
/// then holds; continuous keeps re-evaluating for as long as RX stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoterMode {
    #[default]
    OneShot,
    Continuous,
}

/// How many frames after RX-on the vote window stays open (§4.1.2
/// "short window (`vote_counter` frames after any RX-on)").
pub const VOTE_WINDOW_FRAMES: u32 = 20;

#[derive(Debug, Clone)]
pub struct Voter {
    pub voter_type: VoterType,
    pub mode: VoterMode,
    /// dB advantage a challenger needs over the incumbent to take the vote.
    pub margin: i32,
    window_remaining: u32,
    voted: Option<String>,
}

impl Voter {
    pub fn new(voter_type: VoterType, mode: VoterMode, margin: i32) -> Voter {
        Voter { voter_type, mode, margin, window_remaining: 0, voted: None }
    }

    pub fn voted_link(&self) -> Option<&str> {
        self.voted.as_deref()
    }

    /// Call once when RX transitions from unkeyed to keyed, opening (or
    /// re-opening, in continuous mode) the evaluation window.
    pub fn on_rx_up(&mut self) {
        if self.voter_type != VoterType::Repeater {
            return;
        }
        self.window_remaining = VOTE_WINDOW_FRAMES;
        if self.mode == VoterMode::Continuous {
            self.voted = None;
        }
    }

    pub fn on_rx_down(&mut self) {
        self.window_remaining = 0;
        self.voted = None;
    }

    /// Re-evaluate the incumbent against every voter-receiver link's
    /// reported RSSI; call once per node-loop iteration while RX is keyed.
    pub fn evaluate(&mut self, links: &LinkManager) {
        if self.voter_type != VoterType::Repeater {
            return;
        }
        let window_open = self.window_remaining > 0 || self.mode == VoterMode::Continuous;
        if !window_open {
            return;
        }
        if self.window_remaining > 0 {
            self.window_remaining -= 1;
        }

        let best = links
            .iter()
            .filter(|l| l.is_voter_link)
            .max_by_key(|l| l.last_rssi);

        let Some(best) = best else { return };

        match &self.voted {
            None => self.voted = Some(best.node_name.clone()),
            Some(incumbent_name) => {
                let incumbent_rssi = links.find(incumbent_name).map(|l| l.last_rssi).unwrap_or(i32::MIN);
                if best.node_name != *incumbent_name && best.last_rssi >= incumbent_rssi + self.margin {
                    self.voted = Some(best.node_name.clone());
                }
            }
        }
    }

    pub fn is_voted(&self, link: &Link) -> bool {
        self.voted.as_deref() == Some(link.node_name.as_str())
    }
}

impl Default for Voter {
    fn default() -> Self {
        Voter::new(VoterType::None, VoterMode::OneShot, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, Control, Frame};
    use crate::error::Result;
    use std::time::Duration;

    struct NullChannel;
    impl Channel for NullChannel {
        fn name(&self) -> &str {
            "null"
        }
        fn try_read(&mut self) -> Result<Option<Frame>> {
            Ok(None)
        }
        fn write_voice(&mut self, _samples: &[i16]) -> Result<()> {
            Ok(())
        }
        fn send_digit(&mut self, _digit: char) -> Result<()> {
            Ok(())
        }
        fn send_text(&mut self, _line: &str) -> Result<()> {
            Ok(())
        }
        fn indicate(&mut self, _control: Control) -> Result<()> {
            Ok(())
        }
        fn request(&mut self, _dial_string: &str) -> Result<()> {
            Ok(())
        }
        fn hangup(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_hungup(&self) -> bool {
            false
        }
        fn wait(&mut self, _timeout: Duration) -> Result<bool> {
            Ok(false)
        }
        fn join_conference(&mut self, _conf_num: u32, _listen_only: bool) -> Result<()> {
            Ok(())
        }
        fn leave_conference(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn voter_link(name: &str, rssi: i32) -> Link {
        let mut l = Link::new_inbound(name, Box::new(NullChannel));
        l.is_voter_link = true;
        l.last_rssi = rssi;
        l
    }

    #[test]
    fn non_repeater_voter_never_votes() {
        let mut voter = Voter::new(VoterType::None, VoterMode::OneShot, 3);
        let mut links = LinkManager::new();
        links.add(voter_link("a", 50));
        voter.on_rx_up();
        voter.evaluate(&links);
        assert_eq!(voter.voted_link(), None);
    }

    #[test]
    fn picks_strongest_rssi_within_window() {
        let mut voter = Voter::new(VoterType::Repeater, VoterMode::OneShot, 3);
        let mut links = LinkManager::new();
        links.add(voter_link("weak", 10));
        links.add(voter_link("strong", 40));
        voter.on_rx_up();
        voter.evaluate(&links);
        assert_eq!(voter.voted_link(), Some("strong"));
    }

    #[test]
    fn incumbent_holds_until_margin_exceeded() {
        let mut voter = Voter::new(VoterType::Repeater, VoterMode::Continuous, 10);
        let mut links = LinkManager::new();
        links.add(voter_link("a", 40));
        links.add(voter_link("b", 45));
        voter.on_rx_up();
        voter.evaluate(&links);
        assert_eq!(voter.voted_link(), Some("a"));

        links.find_mut("b").unwrap().last_rssi = 48;
        voter.evaluate(&links);
        assert_eq!(voter.voted_link(), Some("a"), "margin not yet exceeded");

        links.find_mut("b").unwrap().last_rssi = 55;
        voter.evaluate(&links);
        assert_eq!(voter.voted_link(), Some("b"), "margin exceeded, b takes over");
    }

    #[test]
    fn rx_down_clears_vote() {
        let mut voter = Voter::new(VoterType::Repeater, VoterMode::OneShot, 3);
        let mut links = LinkManager::new();
        links.add(voter_link("a", 40));
        voter.on_rx_up();
        voter.evaluate(&links);
        assert!(voter.voted_link().is_some());
        voter.on_rx_down();
        assert_eq!(voter.voted_link(), None);
    }
}
