//! Link-text control grammar (§4.3.3, §6.2): ASCII, space-delimited,
//! `\n`-terminated, max 512 bytes per line.

use crate::error::{RptError, Result};

pub const MAX_LINE_LEN: usize = 512;

/// One parsed text-control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMessage {
    /// `D dest src seq char` — DTMF digit from `src` toward `dest`.
    Dtmf { dest: String, src: String, seq: u32, digit: char },
    /// `K dest src seq keyed` — keying state broadcast, or `K ? src …` query.
    Keying { dest: String, src: String, seq: u32, keyed: bool, is_query: bool },
    /// `T src dest` — telemetry propagated from `src`.
    Telemetry { src: String, dest: String },
    /// `L src list` — directly-connected node list (CSV).
    LinkList { src: String, list: Vec<String> },
    /// `I src mdc-data` — MDC-1200 radio-ID notification.
    Mdc { src: String, data: String },
    /// `M src dest body` — private text message.
    Message { src: String, dest: String, body: String },
    /// `C src ctgroup dest` — CTCSS-group coupling.
    Ctcss { src: String, ctgroup: String, dest: String },
}

fn split_n(line: &str, n: usize) -> Option<Vec<String>> {
    // Splits into at most `n` whitespace-delimited fields, the last field
    // retaining any embedded spaces (needed for `M`'s free-text body).
    let mut parts = Vec::new();
    let mut rest = line.trim_end_matches('\n').trim_start();
    for _ in 0..n - 1 {
        let idx = rest.find(' ')?;
        parts.push(rest[..idx].to_string());
        rest = rest[idx + 1..].trim_start();
    }
    parts.push(rest.to_string());
    Some(parts)
}

impl TextMessage {
    pub fn parse(line: &str) -> Result<TextMessage> {
        if line.len() > MAX_LINE_LEN {
            return Err(RptError::protocol(None, "link-text line exceeds 512 bytes"));
        }
        let line = line.trim_end_matches('\n');
        let mut fields = line.splitn(2, ' ');
        let leading = fields
            .next()
            .ok_or_else(|| RptError::protocol(None, "empty link-text line"))?;
        let rest = fields.next().unwrap_or("");

        match leading {
            "D" => {
                let p = split_n(rest, 4).ok_or_else(|| RptError::protocol(None, "malformed D message"))?;
                let digit = p[3]
                    .chars()
                    .next()
                    .ok_or_else(|| RptError::protocol(None, "D message missing digit"))?;
                Ok(TextMessage::Dtmf {
                    dest: p[0].clone(),
                    src: p[1].clone(),
                    seq: p[2].parse().unwrap_or(0),
                    digit,
                })
            }
            "K" => {
                let p = split_n(rest, 4).ok_or_else(|| RptError::protocol(None, "malformed K message"))?;
                let is_query = p[0] == "?";
                Ok(TextMessage::Keying {
                    dest: p[0].clone(),
                    src: p[1].clone(),
                    seq: p[2].parse().unwrap_or(0),
                    keyed: p[3] == "1",
                    is_query,
                })
            }
            "T" => {
                let p = split_n(rest, 2).ok_or_else(|| RptError::protocol(None, "malformed T message"))?;
                Ok(TextMessage::Telemetry { src: p[0].clone(), dest: p[1].clone() })
            }
            "L" => {
                let p = split_n(rest, 2).ok_or_else(|| RptError::protocol(None, "malformed L message"))?;
                let list = if p[1].is_empty() {
                    Vec::new()
                } else {
                    p[1].split(',').map(str::to_string).collect()
                };
                Ok(TextMessage::LinkList { src: p[0].clone(), list })
            }
            "I" => {
                let p = split_n(rest, 2).ok_or_else(|| RptError::protocol(None, "malformed I message"))?;
                Ok(TextMessage::Mdc { src: p[0].clone(), data: p[1].clone() })
            }
            "M" => {
                let p = split_n(rest, 3).ok_or_else(|| RptError::protocol(None, "malformed M message"))?;
                Ok(TextMessage::Message { src: p[0].clone(), dest: p[1].clone(), body: p[2].clone() })
            }
            "C" => {
                let p = split_n(rest, 3).ok_or_else(|| RptError::protocol(None, "malformed C message"))?;
                Ok(TextMessage::Ctcss { src: p[0].clone(), ctgroup: p[1].clone(), dest: p[2].clone() })
            }
            other => Err(RptError::protocol(None, format!("unknown link-text leading char '{other}'"))),
        }
    }

    /// Re-emit in wire form. `D`/`K`/`T`/`L`/`I`/`M`/`C` round-trip exactly
    /// (§8 "Round-trip / idempotence").
    pub fn to_line(&self) -> String {
        match self {
            TextMessage::Dtmf { dest, src, seq, digit } => format!("D {dest} {src} {seq} {digit}"),
            TextMessage::Keying { dest, src, seq, keyed, is_query } => {
                let dest = if *is_query { "?".to_string() } else { dest.clone() };
                format!("K {dest} {src} {seq} {}", if *keyed { 1 } else { 0 })
            }
            TextMessage::Telemetry { src, dest } => format!("T {src} {dest}"),
            TextMessage::LinkList { src, list } => format!("L {src} {}", list.join(",")),
            TextMessage::Mdc { src, data } => format!("I {src} {data}"),
            TextMessage::Message { src, dest, body } => format!("M {src} {dest} {body}"),
            TextMessage::Ctcss { src, ctgroup, dest } => format!("C {src} {ctgroup} {dest}"),
        }
    }

    /// Source node this message originated from, for flooding-rule bookkeeping.
    pub fn src(&self) -> &str {
        match self {
            TextMessage::Dtmf { src, .. }
            | TextMessage::Telemetry { src, .. }
            | TextMessage::LinkList { src, .. }
            | TextMessage::Mdc { src, .. }
            | TextMessage::Message { src, .. }
            | TextMessage::Ctcss { src, .. } => src,
            TextMessage::Keying { src, .. } => src,
        }
    }
}
