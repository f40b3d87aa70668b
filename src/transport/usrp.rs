//! Compact USRP-framed UDP link transport (§4.5.1). One peer per transport
//! instance; no roster, no RTCP — keying is carried in the header itself.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::error::{RptError, Result};

/// `eye` magic at the start of every packet.
pub const MAGIC: &[u8; 4] = b"USRP";
pub const HEADER_LEN: usize = 8 + 8; // magic+seq, then 8 reserved bytes (§6.2)
pub const USRP_VOICE_FRAME_SIZE: usize = 320;

/// Iterations of "no voice frame received" after which an implicit
/// `RADIO_UNKEY` is synthesized on receive (§4.5.1 "Keying").
pub const MAX_RXKEY_TIME: u32 = 10;

/// Control-payload type byte for a DTMF text packet (§4.5.1 "DTMF").
const CTRL_TYPE_TEXT: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsrpPayload {
    /// 160 signed-linear samples, `keyup` from the header.
    Voice { keyup: bool, samples: Vec<i16> },
    /// An unkey marker: empty body, `keyup=0`.
    Unkey,
    /// A DTMF/text control payload.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsrpPacket {
    pub sequence: u32,
    pub payload: UsrpPayload,
}

impl UsrpPacket {
    pub fn parse(buf: &[u8]) -> Result<UsrpPacket> {
        if buf.len() < HEADER_LEN {
            return Err(RptError::protocol(None, "USRP packet shorter than header"));
        }
        if &buf[0..4] != MAGIC {
            return Err(RptError::protocol(None, "bad USRP magic"));
        }
        let sequence = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        // reserved[0] doubles as the keyup flag, reserved[1] as the type byte,
        // mirroring chan_usrp's header layout.
        let keyup = buf[8] != 0;
        let ptype = buf[9];
        let body = &buf[HEADER_LEN..];

        let payload = if ptype == CTRL_TYPE_TEXT {
            UsrpPayload::Text(String::from_utf8_lossy(body).trim_end_matches('\0').to_string())
        } else if body.is_empty() {
            UsrpPayload::Unkey
        } else if body.len() == USRP_VOICE_FRAME_SIZE {
            let mut samples = Vec::with_capacity(USRP_VOICE_FRAME_SIZE / 2);
            for chunk in body.chunks_exact(2) {
                samples.push(i16::from_le_bytes([chunk[0], chunk[1]]));
            }
            UsrpPayload::Voice { keyup, samples }
        } else {
            return Err(RptError::protocol(None, "USRP voice body has unexpected length"));
        };
        Ok(UsrpPacket { sequence, payload })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + USRP_VOICE_FRAME_SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        match &self.payload {
            UsrpPayload::Voice { keyup, samples } => {
                out.push(if *keyup { 1 } else { 0 });
                out.push(0);
                out.extend_from_slice(&[0u8; 6]);
                for s in samples {
                    out.extend_from_slice(&s.to_le_bytes());
                }
            }
            UsrpPayload::Unkey => {
                out.push(0);
                out.push(0);
                out.extend_from_slice(&[0u8; 6]);
            }
            UsrpPayload::Text(s) => {
                out.push(0);
                out.push(CTRL_TYPE_TEXT);
                out.extend_from_slice(&[0u8; 6]);
                out.extend_from_slice(s.as_bytes());
            }
        }
        out
    }
}

/// Per-peer receive-key tracking: detects loss of voice frames and
/// synthesizes the `RADIO_UNKEY` indication after `MAX_RXKEY_TIME`
/// consecutive silent iterations (§4.5.1 "Keying").
#[derive(Debug, Default)]
pub struct RxKeyTracker {
    keyed: bool,
    idle_iterations: u32,
}

impl RxKeyTracker {
    pub fn on_voice_frame(&mut self, keyup: bool) -> Option<bool> {
        self.idle_iterations = 0;
        if keyup != self.keyed {
            self.keyed = keyup;
            return Some(keyup);
        }
        None
    }

    /// Call once per loop iteration when no voice frame arrived; returns
    /// `Some(false)` exactly once when the implicit unkey threshold is hit.
    pub fn on_no_frame(&mut self) -> Option<bool> {
        if !self.keyed {
            return None;
        }
        self.idle_iterations += 1;
        if self.idle_iterations >= MAX_RXKEY_TIME {
            self.keyed = false;
            return Some(false);
        }
        None
    }
}

/// One bound UDP socket talking to exactly one configured peer address
/// (§4.5.1 "Bind-address and peer-address are configured at construction").
pub struct UsrpLink {
    socket: UdpSocket,
    peer: SocketAddr,
    tx_sequence: u32,
}

impl UsrpLink {
    pub fn bind(bind_addr: SocketAddr, peer: SocketAddr) -> Result<UsrpLink> {
        let socket = UdpSocket::bind(bind_addr).map_err(|e| RptError::io("usrp bind", e))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .map_err(|e| RptError::io("usrp set_read_timeout", e))?;
        // RFC 3550 §6.4.1: the initial sequence number SHOULD be random so a
        // restarted link can't be mistaken for a replay of an earlier one.
        let tx_sequence = rand::random::<u32>();
        Ok(UsrpLink { socket, peer, tx_sequence })
    }

    pub fn send_voice(&mut self, keyup: bool, samples: &[i16]) -> Result<()> {
        let pkt = UsrpPacket {
            sequence: self.next_sequence(),
            payload: UsrpPayload::Voice { keyup, samples: samples.to_vec() },
        };
        self.send(&pkt)
    }

    pub fn send_unkey(&mut self) -> Result<()> {
        let pkt = UsrpPacket { sequence: self.next_sequence(), payload: UsrpPayload::Unkey };
        self.send(&pkt)
    }

    pub fn send_dtmf(&mut self, digit: char) -> Result<()> {
        let pkt = UsrpPacket {
            sequence: self.next_sequence(),
            payload: UsrpPayload::Text(digit.to_string()),
        };
        self.send(&pkt)
    }

    fn next_sequence(&mut self) -> u32 {
        let seq = self.tx_sequence;
        self.tx_sequence = self.tx_sequence.wrapping_add(1);
        seq
    }

    fn send(&mut self, pkt: &UsrpPacket) -> Result<()> {
        self.socket
            .send_to(&pkt.to_bytes(), self.peer)
            .map_err(|e| RptError::io("usrp send_to", e))?;
        Ok(())
    }

    /// Receive one packet, if any arrives before the read timeout. An
    /// out-of-order sequence is logged by the caller and otherwise ignored
    /// (§4.5.1 "Out-of-sequence numbers are logged but not retransmitted").
    pub fn try_recv(&mut self) -> Result<Option<UsrpPacket>> {
        let mut buf = [0u8; 2048];
        match self.socket.recv_from(&mut buf) {
            Ok((n, from)) if from == self.peer => Ok(Some(UsrpPacket::parse(&buf[..n])?)),
            Ok(_) => Ok(None), // not our configured peer; drop silently
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(RptError::io("usrp recv_from", e)),
        }
    }
}

#[derive(Debug, Default)]
pub struct SequenceTracker {
    last: Option<u32>,
    pub out_of_order_count: u64,
}

impl SequenceTracker {
    /// Updates tracking state and reports whether `seq` arrived in order.
    /// A 32-bit wrap is treated as in-order (§8 "A 32-bit RTP sequence wrap
    /// is handled without disconnect").
    pub fn observe(&mut self, seq: u32) -> bool {
        let in_order = match self.last {
            None => true,
            Some(last) => seq == last.wrapping_add(1),
        };
        if !in_order {
            self.out_of_order_count += 1;
        }
        self.last = Some(seq);
        in_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_frame_round_trips() {
        let pkt = UsrpPacket {
            sequence: 42,
            payload: UsrpPayload::Voice { keyup: true, samples: vec![1, -1, 100; USRP_VOICE_FRAME_SIZE / 2 / 3 + 1][..USRP_VOICE_FRAME_SIZE / 2].to_vec() },
        };
        let bytes = pkt.to_bytes();
        let parsed = UsrpPacket::parse(&bytes).unwrap();
        assert_eq!(parsed, pkt);
    }

    #[test]
    fn unkey_marker_round_trips() {
        let pkt = UsrpPacket { sequence: 1, payload: UsrpPayload::Unkey };
        let parsed = UsrpPacket::parse(&pkt.to_bytes()).unwrap();
        assert_eq!(parsed, UsrpPacket { sequence: 1, payload: UsrpPayload::Unkey });
    }

    #[test]
    fn dtmf_text_round_trips() {
        let pkt = UsrpPacket { sequence: 1, payload: UsrpPayload::Text("5".to_string()) };
        let parsed = UsrpPacket::parse(&pkt.to_bytes()).unwrap();
        assert_eq!(parsed, pkt);
    }

    #[test]
    fn rx_key_tracker_synthesizes_unkey_after_threshold() {
        let mut t = RxKeyTracker::default();
        assert_eq!(t.on_voice_frame(true), Some(true));
        for _ in 0..MAX_RXKEY_TIME - 1 {
            assert_eq!(t.on_no_frame(), None);
        }
        assert_eq!(t.on_no_frame(), Some(false));
    }

    #[test]
    fn sequence_tracker_flags_wrap_as_in_order() {
        let mut t = SequenceTracker::default();
        assert!(t.observe(u32::MAX - 1));
        assert!(t.observe(u32::MAX));
        assert!(t.observe(0));
        assert_eq!(t.out_of_order_count, 0);
    }

    #[test]
    fn sequence_tracker_flags_reorder() {
        let mut t = SequenceTracker::default();
        t.observe(5);
        assert!(!t.observe(10));
        assert_eq!(t.out_of_order_count, 1);
    }
}
