//! Network peer roster (§3.4): a global in-memory map keyed by
//! `(peer IP, peer port)`, replacing the C original's `tsearch`/`tfind` tree
//! with the idiomatic ordered-map equivalent (Design Notes §9). Owned by one
//! `transport::tlb` instance; access is serialized by the transport's own
//! mutex (§5 "Shared-resource policy"), never called without it held.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

/// One roster entry: everything the transport tracks about a connected peer.
#[derive(Debug, Clone)]
pub struct Peer {
    pub callsign: String,
    pub remote_name: String,
    /// Heartbeats remaining before this peer is considered timed out
    /// (§4.5.2 "Heartbeat"), reloaded from `rtcptimeout` on each SDES.
    pub countdown: i32,
    /// Next RTP sequence number this transport will use when sending to
    /// this peer.
    pub tx_sequence: u16,
    /// Receive codec currently in effect, updated on payload-type change
    /// (§4.5.2 "Codec negotiation").
    pub rxcodec: &'static str,
    pub txcodec: &'static str,
    pub last_heard: Instant,
    /// Index of the bridged channel this peer is associated with; the
    /// roster holds a numeric handle rather than a back-reference so the
    /// transport never owns a `Box<dyn Channel>` directly (Design Notes §9).
    pub channel_id: u64,
}

#[derive(Debug, Default)]
pub struct PeerRoster {
    peers: BTreeMap<(IpAddr, u16), Peer>,
}

impl PeerRoster {
    pub fn new() -> PeerRoster {
        PeerRoster::default()
    }

    pub fn insert(&mut self, addr: SocketAddr, peer: Peer) {
        self.peers.insert((addr.ip(), addr.port()), peer);
    }

    pub fn get(&self, addr: SocketAddr) -> Option<&Peer> {
        self.peers.get(&(addr.ip(), addr.port()))
    }

    pub fn get_mut(&mut self, addr: SocketAddr) -> Option<&mut Peer> {
        self.peers.get_mut(&(addr.ip(), addr.port()))
    }

    pub fn remove(&mut self, addr: SocketAddr) -> Option<Peer> {
        self.peers.remove(&(addr.ip(), addr.port()))
    }

    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.peers.contains_key(&(addr.ip(), addr.port()))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(IpAddr, u16), &Peer)> {
        self.peers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&(IpAddr, u16), &mut Peer)> {
        self.peers.iter_mut()
    }

    /// Walk the roster decrementing every peer's countdown, returning the
    /// addresses that have gone negative (§4.5.2 "Heartbeat" / §8 "Peer
    /// timeout"). Callers remove those entries (soft-hangup their channel
    /// first) after sending the 20x BYE burst.
    pub fn tick_heartbeat(&mut self) -> Vec<SocketAddr> {
        let mut expired = Vec::new();
        for (&(ip, port), peer) in self.peers.iter_mut() {
            peer.countdown -= 1;
            if peer.countdown < 0 {
                expired.push(SocketAddr::new(ip, port));
            }
        }
        expired
    }
}
