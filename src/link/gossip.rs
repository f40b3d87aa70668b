//! Link-list gossip (§4.3.4): periodically broadcast this node's link list
//! to every connected peer as an `L` text line, so peers can maintain an
//! indirect view of the network without a central directory.

use std::time::Duration;

use crate::link::text::TextMessage;

/// Interval between unsolicited link-list broadcasts (§4.3.4 `LINKLISTTIME`).
pub const LINKLISTTIME: Duration = Duration::from_secs(10);

/// Build the `L` line advertising `node_name`'s current link set.
pub fn build_link_list_line(node_name: &str, peers: &[String]) -> String {
    TextMessage::LinkList { src: node_name.to_string(), list: peers.to_vec() }.to_line()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_link_list_line_with_no_peers() {
        assert_eq!(build_link_list_line("rpt1", &[]), "L rpt1 ");
    }

    #[test]
    fn build_link_list_line_with_peers() {
        let peers = vec!["rpt2".to_string(), "rpt3".to_string()];
        assert_eq!(build_link_list_line("rpt1", &peers), "L rpt1 rpt2,rpt3");
    }

    #[test]
    fn build_link_list_line_round_trips_through_parse() {
        let peers = vec!["rpt2".to_string(), "rpt3".to_string()];
        let line = build_link_list_line("rpt1", &peers);
        let parsed = TextMessage::parse(&line).unwrap();
        assert_eq!(parsed, TextMessage::LinkList { src: "rpt1".to_string(), list: peers });
    }
}
