//! Link data model and manager (§3.2, §4.3). A `Link` is one point-to-point
//! connection to a peer node or phone patch; `LinkManager` owns the set of
//! links for one node and the operations that add, find, and retire them.

pub mod extnodes;
pub mod flags;
pub mod fsm;
pub mod gossip;
pub mod lifecycle;
pub mod newkey;
pub mod text;

use std::time::Instant;

use crate::channel::Channel;
use crate::error::Result;
use flags::{Disced, LinkFlags, LinkMode, PhoneMode};
use fsm::{ConnectFsm, DeathReason, LinkState};
use newkey::NewKeyState;

/// One connection slot (§3.2). The channel itself is owned here; `Node`
/// holds links only through `LinkManager`, never a raw index into a Vec it
/// manages itself (Design Notes §9).
pub struct Link {
    pub node_name: String,
    pub chan: Box<dyn Channel>,
    pub mode: LinkMode,
    pub phone_mode: PhoneMode,
    pub flags: LinkFlags,
    pub disced: Disced,
    pub newkey: NewKeyState,
    pub fsm: ConnectFsm,
    pub last_keepalive: Instant,
    pub elaptime: Instant,
    /// Seqno of the last gossip `L` line this link has been told about, to
    /// avoid rebroadcast storms (§4.3.4).
    pub gossip_seen: u32,
    /// Voting fields (§3.2 "Voting fields", §4.1.2): whether this link is a
    /// voter-receiver candidate, whether it currently holds the vote, and
    /// its last reported RSSI.
    pub is_voter_link: bool,
    pub vote_winner: bool,
    pub last_rssi: i32,
}

impl Link {
    pub fn new_outbound(node_name: impl Into<String>, chan: Box<dyn Channel>, perma: bool) -> Link {
        let mut flags = LinkFlags::OUTBOUND;
        if perma {
            flags.insert(LinkFlags::PERMA);
        }
        Link {
            node_name: node_name.into(),
            chan,
            mode: LinkMode::default(),
            phone_mode: PhoneMode::default(),
            flags,
            disced: Disced::No,
            newkey: NewKeyState::Allowed,
            fsm: ConnectFsm::new(perma),
            last_keepalive: Instant::now(),
            elaptime: Instant::now(),
            gossip_seen: 0,
            is_voter_link: false,
            vote_winner: false,
            last_rssi: i32::MIN,
        }
    }

    pub fn new_inbound(node_name: impl Into<String>, chan: Box<dyn Channel>) -> Link {
        Link {
            node_name: node_name.into(),
            chan,
            mode: LinkMode::default(),
            phone_mode: PhoneMode::default(),
            flags: LinkFlags::empty(),
            disced: Disced::No,
            newkey: NewKeyState::Allowed,
            fsm: ConnectFsm::new(false),
            last_keepalive: Instant::now(),
            elaptime: Instant::now(),
            gossip_seen: 0,
            is_voter_link: false,
            vote_winner: false,
            last_rssi: i32::MIN,
        }
    }

    pub fn with_mode(mut self, mode: LinkMode) -> Link {
        self.mode = mode;
        self
    }

    pub fn is_perma(&self) -> bool {
        self.flags.contains(LinkFlags::PERMA)
    }

    pub fn state(&self) -> LinkState {
        self.fsm.state()
    }

    pub fn mark_connected(&mut self) {
        self.fsm.on_answer();
        self.flags.insert(LinkFlags::CONNECTED | LinkFlags::THIS_CONNECTED | LinkFlags::HAS_CONNECTED);
    }

    pub fn mark_dead(&mut self, reason: DeathReason) {
        self.flags.remove(LinkFlags::CONNECTED | LinkFlags::THIS_CONNECTED);
        self.flags.insert(LinkFlags::KILLME);
        let _ = reason;
    }

    pub fn send_text(&mut self, line: &str) -> Result<()> {
        self.chan.send_text(line)
    }
}

/// Owns every link for one node; the single place links are created,
/// looked up, and retired (§4.3).
#[derive(Default)]
pub struct LinkManager {
    links: Vec<Link>,
}

impl LinkManager {
    pub fn new() -> LinkManager {
        LinkManager { links: Vec::new() }
    }

    pub fn add(&mut self, link: Link) {
        self.links.push(link);
    }

    pub fn find(&self, node_name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.node_name == node_name)
    }

    pub fn find_mut(&mut self, node_name: &str) -> Option<&mut Link> {
        self.links.iter_mut().find(|l| l.node_name == node_name)
    }

    pub fn contains(&self, node_name: &str) -> bool {
        self.find(node_name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Drop every link flagged `KILLME`, returning their node names so the
    /// caller can log/telemetry the disconnect (§4.3.5).
    pub fn reap(&mut self) -> Vec<String> {
        let mut reaped = Vec::new();
        self.links.retain(|l| {
            if l.flags.contains(LinkFlags::KILLME) {
                reaped.push(l.node_name.clone());
                false
            } else {
                true
            }
        });
        reaped
    }

    /// Count of links currently `CONNECTED`, used by the node loop's
    /// duplex/keying decisions (§4.1.1) and `*80`/status telemetry.
    pub fn connected_count(&self) -> usize {
        self.links.iter().filter(|l| l.flags.contains(LinkFlags::CONNECTED)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Control, Frame};
    use std::time::Duration;

    struct NullChannel {
        hungup: bool,
    }

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
            self.hungup = true;
            Ok(())
        }
        fn is_hungup(&self) -> bool {
            self.hungup
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

    #[test]
    fn manager_finds_and_reaps_links() {
        let mut mgr = LinkManager::new();
        mgr.add(Link::new_outbound("node1", Box::new(NullChannel { hungup: false }), false));
        assert!(mgr.contains("node1"));
        mgr.find_mut("node1").unwrap().mark_dead(DeathReason::PeerHangup);
        let reaped = mgr.reap();
        assert_eq!(reaped, vec!["node1".to_string()]);
        assert!(!mgr.contains("node1"));
    }

    #[test]
    fn connected_count_reflects_flag() {
        let mut mgr = LinkManager::new();
        let mut link = Link::new_outbound("node2", Box::new(NullChannel { hungup: false }), false);
        link.fsm.on_requested();
        link.mark_connected();
        mgr.add(link);
        assert_eq!(mgr.connected_count(), 1);
    }
}
