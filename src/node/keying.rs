//! Keying state (§3.1 "Keying state") and derived-keying evaluation
//! (§4.1 step 3).

use crate::link::flags::LinkMode;
use crate::link::newkey::NewKeyState;
use crate::link::{Link, LinkManager};

/// Booleans tracked per node (§3.1). `new_key` is the node's own
/// new-key handshake state, independent of each link's (§4.3.2).
#[derive(Debug, Clone, Default)]
pub struct KeyingState {
    pub keyed: bool,
    pub txkeyed: bool,
    pub rxchankeyed: bool,
    pub exttx: bool,
    pub localtx: bool,
    pub remrx: bool,
    pub reallykeyed: bool,
    pub dtmfkeyed: bool,
    pub new_key: NewKeyState,
}

impl KeyingState {
    /// Is a link eligible to contribute to derived keying (§4.1 step 3)?
    /// Transceive mode, has been heard from, and not local-monitor.
    fn link_contributes(link: &Link) -> bool {
        use crate::link::flags::LinkFlags;
        link.mode == LinkMode::Transceive && link.flags.contains(LinkFlags::LASTRX)
    }

    /// `keyed = rxchankeyed OR exists link with mode=transceive AND lastrx
    /// AND NOT local-monitor` (§4.1 step 3), absent voter arbitration.
    pub fn derive_keyed(&self, links: &LinkManager) -> bool {
        self.rxchankeyed || links.iter().any(Self::link_contributes)
    }

    /// Re-evaluate `self.keyed` from current state; call once per iteration
    /// after links/rxchankeyed have been updated for this tick.
    pub fn update(&mut self, links: &LinkManager) {
        self.keyed = self.derive_keyed(links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Control, Frame};
    use crate::error::Result;
    use crate::link::flags::LinkFlags;
    use std::time::Duration;

    struct NullChannel;
    impl crate::channel::Channel for NullChannel {
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

    #[test]
    fn rxchankeyed_alone_derives_keyed() {
        let ks = KeyingState { rxchankeyed: true, ..Default::default() };
        let links = LinkManager::new();
        assert!(ks.derive_keyed(&links));
    }

    #[test]
    fn transceive_link_heard_derives_keyed() {
        let ks = KeyingState::default();
        let mut links = LinkManager::new();
        let mut link = Link::new_inbound("peer1", Box::new(NullChannel));
        link.flags.insert(LinkFlags::LASTRX);
        links.add(link);
        assert!(ks.derive_keyed(&links));
    }

    #[test]
    fn local_monitor_link_does_not_derive_keyed() {
        let ks = KeyingState::default();
        let mut links = LinkManager::new();
        let mut link = Link::new_inbound("peer1", Box::new(NullChannel)).with_mode(crate::link::flags::LinkMode::LocalMonitor);
        link.flags.insert(LinkFlags::LASTRX);
        links.add(link);
        assert!(!ks.derive_keyed(&links));
    }

    #[test]
    fn idle_node_is_not_keyed() {
        let ks = KeyingState::default();
        let links = LinkManager::new();
        assert!(!ks.derive_keyed(&links));
    }
}
