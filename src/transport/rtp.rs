//! Fixed 12-byte RTP v2 header parser/writer (§4.5.3), factored out of the
//! roster transport's packet assembly since it is standard RTP rather than
//! TLB-specific.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             SSRC                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! CSRC list and extension headers are not produced by this transport and
//! are rejected on parse (§4.5.2 names only payload types 0/3/96/97).

use crate::error::{RptError, Result};

pub const HEADER_LEN: usize = 12;

/// Payload type 3: GSM, 33 bytes per frame, 4 frames per packet (§4.5.2).
pub const PT_GSM: u8 = 3;
/// Payload type 97: G.726, 80 bytes per frame, 2 frames per packet.
pub const PT_G726: u8 = 97;
/// Payload type 0: mu-law, 160 bytes per frame, 2 frames per packet.
pub const PT_ULAW: u8 = 0;
/// Payload type 96: DTMF-over-audio-port frame (§4.5.2 "DTMF over audio port").
pub const PT_DTMF: u8 = 96;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub payload: Vec<u8>,
}

impl RtpPacket {
    pub fn parse(buf: &[u8]) -> Result<RtpPacket> {
        if buf.len() < HEADER_LEN {
            return Err(RptError::protocol(None, "RTP packet shorter than fixed header"));
        }
        let version = buf[0] >> 6;
        if version != 2 {
            return Err(RptError::protocol(None, format!("unsupported RTP version {version}")));
        }
        let cc = (buf[0] & 0x0F) as usize;
        let marker = buf[1] & 0x80 != 0;
        let payload_type = buf[1] & 0x7F;
        let sequence = u16::from_be_bytes([buf[2], buf[3]]);
        let timestamp = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let csrc_len = cc * 4;
        let payload_start = HEADER_LEN + csrc_len;
        if buf.len() < payload_start {
            return Err(RptError::protocol(None, "RTP packet shorter than CSRC list"));
        }
        Ok(RtpPacket {
            marker,
            payload_type,
            sequence,
            timestamp,
            ssrc,
            payload: buf[payload_start..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.push(0b1000_0000); // V=2, P=0, X=0, CC=0
        out.push(((self.marker as u8) << 7) | (self.payload_type & 0x7F));
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.ssrc.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// The receive codec a payload type implies, if it is one of the three
    /// voice types this transport understands (§4.5.2 "Codec negotiation").
    pub fn codec_for_payload_type(pt: u8) -> Option<&'static str> {
        match pt {
            PT_ULAW => Some("ulaw"),
            PT_GSM => Some("gsm"),
            PT_G726 => Some("g726"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let pkt = RtpPacket {
            marker: true,
            payload_type: PT_GSM,
            sequence: 42,
            timestamp: 12345,
            ssrc: 0xdead_beef,
            payload: vec![1, 2, 3, 4],
        };
        let bytes = pkt.to_bytes();
        let parsed = RtpPacket::parse(&bytes).unwrap();
        assert_eq!(parsed, pkt);
    }

    #[test]
    fn rejects_short_packet() {
        assert!(RtpPacket::parse(&[0; 4]).is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0] = 0b0100_0000; // version 1
        assert!(RtpPacket::parse(&bytes).is_err());
    }

    #[test]
    fn codec_lookup_matches_payload_types() {
        assert_eq!(RtpPacket::codec_for_payload_type(PT_GSM), Some("gsm"));
        assert_eq!(RtpPacket::codec_for_payload_type(PT_G726), Some("g726"));
        assert_eq!(RtpPacket::codec_for_payload_type(PT_ULAW), Some("ulaw"));
        assert_eq!(RtpPacket::codec_for_payload_type(PT_DTMF), None);
    }
}
