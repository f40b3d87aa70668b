//! RTCP SDES/BYE parser/writer (§4.5.2, §4.5.3), the control-port sibling of
//! `transport::rtp`. Only the SDES item types the roster transport needs are
//! modeled (§6.2): CNAME=1, NAME=2, TOOL=6.

use crate::error::{RptError, Result};

pub const PT_SDES: u8 = 202;
pub const PT_BYE: u8 = 203;

pub const SDES_CNAME: u8 = 1;
pub const SDES_NAME: u8 = 2;
pub const SDES_TOOL: u8 = 6;
const SDES_END: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdesItems {
    pub cname: Option<String>,
    pub name: Option<String>,
    pub tool: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpPacket {
    Sdes { ssrc: u32, items: SdesItems },
    Bye { ssrc: u32, reason: Option<String> },
}

impl RtcpPacket {
    pub fn parse(buf: &[u8]) -> Result<RtcpPacket> {
        if buf.len() < 8 {
            return Err(RptError::protocol(None, "RTCP packet shorter than fixed header"));
        }
        let version = buf[0] >> 6;
        if version != 2 {
            return Err(RptError::protocol(None, format!("unsupported RTCP version {version}")));
        }
        let pt = buf[1];
        let ssrc = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        match pt {
            PT_SDES => Ok(RtcpPacket::Sdes { ssrc, items: parse_sdes_items(&buf[8..])? }),
            PT_BYE => {
                let reason = parse_bye_reason(&buf[8..]);
                Ok(RtcpPacket::Bye { ssrc, reason })
            }
            other => Err(RptError::protocol(None, format!("unsupported RTCP packet type {other}"))),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RtcpPacket::Sdes { ssrc, items } => {
                let mut body = Vec::new();
                if let Some(c) = &items.cname {
                    push_item(&mut body, SDES_CNAME, c);
                }
                if let Some(n) = &items.name {
                    push_item(&mut body, SDES_NAME, n);
                }
                if let Some(t) = &items.tool {
                    push_item(&mut body, SDES_TOOL, t);
                }
                body.push(SDES_END);
                while body.len() % 4 != 0 {
                    body.push(0);
                }
                encode_header(PT_SDES, 1, *ssrc, &body)
            }
            RtcpPacket::Bye { ssrc, reason } => {
                let mut body = Vec::new();
                if let Some(r) = reason {
                    body.push(r.len() as u8);
                    body.extend_from_slice(r.as_bytes());
                    while body.len() % 4 != 0 {
                        body.push(0);
                    }
                }
                encode_header(PT_BYE, 1, *ssrc, &body)
            }
        }
    }
}

fn encode_header(pt: u8, count: u8, ssrc: u32, body: &[u8]) -> Vec<u8> {
    let words = 1 + (body.len() / 4);
    let mut out = Vec::with_capacity(8 + body.len());
    out.push(0b1000_0000 | (count & 0x1F));
    out.push(pt);
    out.extend_from_slice(&((words - 1) as u16).to_be_bytes());
    out.extend_from_slice(&ssrc.to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn push_item(body: &mut Vec<u8>, item_type: u8, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(255) as u8;
    body.push(item_type);
    body.push(len);
    body.extend_from_slice(&bytes[..len as usize]);
}

fn parse_sdes_items(mut rest: &[u8]) -> Result<SdesItems> {
    let mut items = SdesItems::default();
    // skip the per-source SSRC that prefixes the chunk, if present.
    if rest.len() >= 4 {
        rest = &rest[4..];
    }
    loop {
        if rest.is_empty() || rest[0] == SDES_END {
            break;
        }
        if rest.len() < 2 {
            return Err(RptError::protocol(None, "truncated SDES item"));
        }
        let item_type = rest[0];
        let len = rest[1] as usize;
        if rest.len() < 2 + len {
            return Err(RptError::protocol(None, "SDES item length exceeds packet"));
        }
        let value = String::from_utf8_lossy(&rest[2..2 + len]).to_string();
        match item_type {
            SDES_CNAME => items.cname = Some(value),
            SDES_NAME => items.name = Some(value),
            SDES_TOOL => items.tool = Some(value),
            _ => {}
        }
        rest = &rest[2 + len..];
    }
    Ok(items)
}

fn parse_bye_reason(rest: &[u8]) -> Option<String> {
    if rest.is_empty() {
        return None;
    }
    let len = rest[0] as usize;
    if rest.len() < 1 + len {
        return None;
    }
    Some(String::from_utf8_lossy(&rest[1..1 + len]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdes_round_trips() {
        let pkt = RtcpPacket::Sdes {
            ssrc: 0x1234_5678,
            items: SdesItems {
                cname: Some("W1AW".to_string()),
                name: Some("repeater".to_string()),
                tool: None,
            },
        };
        let bytes = pkt.to_bytes();
        let parsed = RtcpPacket::parse(&bytes).unwrap();
        match parsed {
            RtcpPacket::Sdes { ssrc, items } => {
                assert_eq!(ssrc, 0x1234_5678);
                assert_eq!(items.cname.as_deref(), Some("W1AW"));
                assert_eq!(items.name.as_deref(), Some("repeater"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn bye_round_trips_with_reason() {
        let pkt = RtcpPacket::Bye { ssrc: 7, reason: Some("timeout".to_string()) };
        let parsed = RtcpPacket::parse(&pkt.to_bytes()).unwrap();
        assert_eq!(parsed, pkt);
    }

    #[test]
    fn bye_round_trips_without_reason() {
        let pkt = RtcpPacket::Bye { ssrc: 7, reason: None };
        let parsed = RtcpPacket::parse(&pkt.to_bytes()).unwrap();
        assert_eq!(parsed, pkt);
    }
}
