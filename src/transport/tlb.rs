//! Roster UDP transport ("TLB", §4.5.2): RTP audio on `port`, RTCP SDES/BYE
//! control on `port+1`. Grounded on `original_source/channels/chan_tlb.c`.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crc32fast::Hasher;

use crate::error::{RptError, Result};
use crate::transport::roster::{Peer, PeerRoster};
use crate::transport::rtcp::{RtcpPacket, SdesItems};
use crate::transport::rtp::RtpPacket;

/// Default heartbeat interval in loop iterations between SDES re-sends
/// (§4.5.2 "Heartbeat").
pub const DEFAULT_KEEPALIVE: u32 = 10;
/// Default countdown reload value: 15 missed heartbeats disconnects a peer
/// (§8 scenario 6 "Peer timeout").
pub const DEFAULT_RTCPTIMEOUT: i32 = 15;
/// Number of BYE packets sent on timeout/disconnect (§4.5.2 "Heartbeat").
pub const BYE_BURST: u32 = 20;

/// SSRC is `CRC32(callsign)` (§4.5.2 "CRC-based SSRC").
pub fn ssrc_for_callsign(callsign: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(callsign.as_bytes());
    hasher.finalize()
}

/// Minimal shell-style glob (`*`, `?`) matcher for deny/permit CNAME lists
/// (§4.5.2 "consults deny/permit lists (fnmatch against the CNAME)").
pub fn fnmatch(pattern: &str, text: &str) -> bool {
    fn rec(p: &[u8], t: &[u8]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some(b'*') => rec(&p[1..], t) || (!t.is_empty() && rec(p, &t[1..])),
            Some(b'?') => !t.is_empty() && rec(&p[1..], &t[1..]),
            Some(&c) => !t.is_empty() && t[0] == c && rec(&p[1..], &t[1..]),
        }
    }
    rec(pattern.as_bytes(), text.as_bytes())
}

/// An entry in the `[nodes]` table this transport dials out to.
#[derive(Debug, Clone)]
pub struct DialTarget {
    pub callsign: String,
    pub addr: SocketAddr,
    pub codec: &'static str,
}

/// Access control applied to inbound SDES from unknown peers.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    pub permit: Vec<String>,
    pub deny: Vec<String>,
}

impl AccessList {
    pub fn allows(&self, cname: &str) -> bool {
        if self.deny.iter().any(|pat| fnmatch(pat, cname)) {
            return false;
        }
        self.permit.is_empty() || self.permit.iter().any(|pat| fnmatch(pat, cname))
    }
}

/// Whether inbound peers are bridged into the shared conference channel or
/// given a fresh channel at a dialplan extension (§4.5.2 "Call establishment").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    Conference,
    Extension,
}

pub struct TlbTransport {
    audio_socket: UdpSocket,
    ctrl_socket: UdpSocket,
    local_callsign: String,
    local_ssrc: u32,
    access: AccessList,
    bridge_mode: BridgeMode,
    keepalive: u32,
    rtcptimeout: i32,
    roster: Mutex<PeerRoster>,
    iterations_since_heartbeat: u32,
    dtmf_guard: Mutex<std::collections::HashMap<(u32, u32), Instant>>,
}

/// Outcome of processing one inbound packet, handed up to the node loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlbEvent {
    Answer { peer: SocketAddr },
    Voice { peer: SocketAddr, codec: &'static str, samples: Vec<u8> },
    Dtmf { peer: SocketAddr, digit: char },
    PeerRemoved { peer: SocketAddr },
    Denied { cname: String },
}

impl TlbTransport {
    pub fn bind(
        bind_ip: std::net::IpAddr,
        port: u16,
        local_callsign: &str,
        access: AccessList,
        bridge_mode: BridgeMode,
    ) -> Result<TlbTransport> {
        let audio_addr = SocketAddr::new(bind_ip, port);
        let ctrl_addr = SocketAddr::new(bind_ip, port + 1);
        let audio_socket = UdpSocket::bind(audio_addr).map_err(|e| RptError::io("tlb audio bind", e))?;
        let ctrl_socket = UdpSocket::bind(ctrl_addr).map_err(|e| RptError::io("tlb ctrl bind", e))?;
        audio_socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .map_err(|e| RptError::io("tlb audio set_read_timeout", e))?;
        ctrl_socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .map_err(|e| RptError::io("tlb ctrl set_read_timeout", e))?;
        Ok(TlbTransport {
            audio_socket,
            ctrl_socket,
            local_ssrc: ssrc_for_callsign(local_callsign),
            local_callsign: local_callsign.to_string(),
            access,
            bridge_mode,
            keepalive: DEFAULT_KEEPALIVE,
            rtcptimeout: DEFAULT_RTCPTIMEOUT,
            roster: Mutex::new(PeerRoster::new()),
            iterations_since_heartbeat: 0,
            dtmf_guard: Mutex::new(std::collections::HashMap::new()),
        })
    }

    /// Outbound call: send our SDES to `target.addr`'s control port
    /// (§4.5.2 "Call establishment" step 1).
    pub fn connect(&mut self, target: &DialTarget, channel_id: u64) -> Result<()> {
        let ctrl_addr = SocketAddr::new(target.addr.ip(), target.addr.port() + 1);
        {
            let mut roster = self.roster.lock().unwrap();
            roster.insert(
                target.addr,
                Peer {
                    callsign: target.callsign.clone(),
                    remote_name: target.callsign.clone(),
                    countdown: self.rtcptimeout,
                    tx_sequence: rand::random::<u16>(),
                    rxcodec: target.codec,
                    txcodec: target.codec,
                    last_heard: Instant::now(),
                    channel_id,
                },
            );
        }
        self.send_sdes(ctrl_addr)
    }

    fn send_sdes(&self, ctrl_addr: SocketAddr) -> Result<()> {
        let pkt = RtcpPacket::Sdes {
            ssrc: self.local_ssrc,
            items: SdesItems {
                cname: Some(self.local_callsign.clone()),
                name: Some(self.local_callsign.clone()),
                tool: Some("rptcore".to_string()),
            },
        };
        self.ctrl_socket
            .send_to(&pkt.to_bytes(), ctrl_addr)
            .map_err(|e| RptError::io("tlb sdes send", e))?;
        Ok(())
    }

    fn send_bye(&self, ctrl_addr: SocketAddr) -> Result<()> {
        let pkt = RtcpPacket::Bye { ssrc: self.local_ssrc, reason: None };
        self.ctrl_socket
            .send_to(&pkt.to_bytes(), ctrl_addr)
            .map_err(|e| RptError::io("tlb bye send", e))?;
        Ok(())
    }

    /// Drain one pending control packet, if any (§4.5.2 "Call establishment"
    /// steps 2-3). `next_channel_id` is supplied by the caller when a fresh
    /// channel must be opened for a newly-accepted peer.
    pub fn poll_control(&mut self, next_channel_id: u64) -> Result<Option<TlbEvent>> {
        let mut buf = [0u8; 1500];
        let (n, from) = match self.ctrl_socket.recv_from(&mut buf) {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                return Ok(None)
            }
            Err(e) => return Err(RptError::io("tlb ctrl recv_from", e)),
        };
        let audio_peer = SocketAddr::new(from.ip(), from.port() - 1);
        match RtcpPacket::parse(&buf[..n])? {
            RtcpPacket::Sdes { items, .. } => {
                let cname = items.cname.clone().unwrap_or_default();
                let mut roster = self.roster.lock().unwrap();
                let already_known = roster.contains(audio_peer);
                if !already_known {
                    if !self.access.allows(&cname) {
                        return Ok(Some(TlbEvent::Denied { cname }));
                    }
                    roster.insert(
                        audio_peer,
                        Peer {
                            callsign: cname,
                            remote_name: items.name.unwrap_or_default(),
                            countdown: self.rtcptimeout,
                            tx_sequence: rand::random::<u16>(),
                            rxcodec: "gsm",
                            txcodec: "gsm",
                            last_heard: Instant::now(),
                            channel_id: next_channel_id,
                        },
                    );
                    drop(roster);
                    self.send_sdes(from)?;
                    return Ok(Some(TlbEvent::Answer { peer: audio_peer }));
                }
                if let Some(peer) = roster.get_mut(audio_peer) {
                    peer.countdown = self.rtcptimeout;
                    peer.last_heard = Instant::now();
                }
                Ok(None)
            }
            RtcpPacket::Bye { .. } => {
                let mut roster = self.roster.lock().unwrap();
                roster.remove(audio_peer);
                Ok(Some(TlbEvent::PeerRemoved { peer: audio_peer }))
            }
        }
    }

    /// Drain one pending audio-port packet: voice or a DTMF-over-audio frame
    /// (§4.5.2 "DTMF over audio port", "Codec negotiation").
    pub fn poll_audio(&mut self) -> Result<Option<TlbEvent>> {
        let mut buf = [0u8; 1500];
        let (n, from) = match self.audio_socket.recv_from(&mut buf) {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                return Ok(None)
            }
            Err(e) => return Err(RptError::io("tlb audio recv_from", e)),
        };
        let pkt = RtpPacket::parse(&buf[..n])?;

        if pkt.payload_type == crate::transport::rtp::PT_DTMF {
            return self.handle_dtmf_frame(from, &pkt.payload);
        }

        let codec = RtpPacket::codec_for_payload_type(pkt.payload_type)
            .ok_or_else(|| RptError::protocol(Some(from), "unknown audio payload type"))?;

        let mut roster = self.roster.lock().unwrap();
        if let Some(peer) = roster.get_mut(from) {
            if peer.rxcodec != codec {
                peer.rxcodec = codec; // one renegotiation per change (§8)
            }
            peer.last_heard = Instant::now();
        }
        Ok(Some(TlbEvent::Voice { peer: from, codec, samples: pkt.payload }))
    }

    fn handle_dtmf_frame(&self, from: SocketAddr, body: &[u8]) -> Result<Option<TlbEvent>> {
        // body: "DTMF<c> <seq> <time>"
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        let rest = text
            .strip_prefix("DTMF")
            .ok_or_else(|| RptError::protocol(Some(from), "malformed DTMF frame"))?;
        let mut parts = rest.splitn(3, ' ');
        let digit = parts
            .next()
            .and_then(|s| s.chars().next())
            .ok_or_else(|| RptError::protocol(Some(from), "DTMF frame missing digit"))?;
        let seq: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let time: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);

        let mut guard = self.dtmf_guard.lock().unwrap();
        let key = (seq, time);
        if guard.contains_key(&key) {
            return Ok(None); // duplicate suppressed by (seq, time) monotonicity guard
        }
        guard.insert(key, Instant::now());
        guard.retain(|_, seen| seen.elapsed() < Duration::from_secs(30));
        Ok(Some(TlbEvent::Dtmf { peer: from, digit }))
    }

    pub fn send_voice(&self, peer: SocketAddr, codec_payload_type: u8, body: &[u8]) -> Result<()> {
        let mut roster = self.roster.lock().unwrap();
        let seq = match roster.get_mut(peer) {
            Some(p) => {
                let s = p.tx_sequence;
                p.tx_sequence = p.tx_sequence.wrapping_add(1);
                s
            }
            None => 0,
        };
        drop(roster);
        let pkt = RtpPacket {
            marker: false,
            payload_type: codec_payload_type,
            sequence: seq,
            timestamp: 0,
            ssrc: self.local_ssrc,
            payload: body.to_vec(),
        };
        self.audio_socket
            .send_to(&pkt.to_bytes(), peer)
            .map_err(|e| RptError::io("tlb audio send_to", e))?;
        Ok(())
    }

    pub fn send_dtmf(&self, peer: SocketAddr, digit: char, seq: u32, time_secs: u32) -> Result<()> {
        let body = format!("DTMF{digit} {seq} {time_secs}");
        let pkt = RtpPacket {
            marker: false,
            payload_type: crate::transport::rtp::PT_DTMF,
            sequence: seq as u16,
            timestamp: 0,
            ssrc: self.local_ssrc,
            payload: body.into_bytes(),
        };
        self.audio_socket
            .send_to(&pkt.to_bytes(), peer)
            .map_err(|e| RptError::io("tlb dtmf send_to", e))?;
        Ok(())
    }

    /// Run one iteration of the heartbeat writer (§4.5.2 "Heartbeat"): every
    /// `keepalive` calls, SDES every peer and decrement countdowns; on
    /// expiry, burst BYE and report the peer for removal.
    pub fn tick(&mut self) -> Result<Vec<SocketAddr>> {
        self.iterations_since_heartbeat += 1;
        if self.iterations_since_heartbeat < self.keepalive {
            return Ok(Vec::new());
        }
        self.iterations_since_heartbeat = 0;

        let addrs: Vec<SocketAddr> = {
            let roster = self.roster.lock().unwrap();
            roster.iter().map(|(&(ip, port), _)| SocketAddr::new(ip, port)).collect()
        };
        for addr in &addrs {
            let ctrl_addr = SocketAddr::new(addr.ip(), addr.port() + 1);
            self.send_sdes(ctrl_addr)?;
        }

        let expired = {
            let mut roster = self.roster.lock().unwrap();
            roster.tick_heartbeat()
        };
        for addr in &expired {
            let ctrl_addr = SocketAddr::new(addr.ip(), addr.port() + 1);
            for _ in 0..BYE_BURST {
                self.send_bye(ctrl_addr)?;
            }
            self.roster.lock().unwrap().remove(*addr);
        }
        Ok(expired)
    }

    pub fn peer_count(&self) -> usize {
        self.roster.lock().unwrap().len()
    }
}
