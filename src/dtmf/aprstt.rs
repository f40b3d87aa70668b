//! APRStt short-circuit (§4.2 "APRStt short-circuit") and the `TT_COMMON`
//! external pipe/table (§6.3).

use std::io::Write;
use std::os::fd::FromRawFd;
use std::path::Path;

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::error::{RptError, Result};

/// Alphanumeric overlay map used to turn a DTMF payload into a callsign +
/// overlay character. Digits map to themselves; `A`-`D` map to letters in
/// groups of three/four per the standard APRStt two-key-per-letter scheme.
const OVERLAY_GROUPS: [&str; 4] = ["ABC", "DEF", "GHI", "JKL"];

/// Convert a raw digit accumulator (everything between the leading `A` and
/// the end char) into `(callsign, overlay)`, verifying the trailing checksum
/// digit (modulo-10 of the digit sum).
pub fn decode_payload(payload: &str) -> Result<(String, char)> {
    if payload.len() < 2 {
        return Err(RptError::protocol(None, "APRStt payload too short"));
    }
    let (body, checksum) = payload.split_at(payload.len() - 1);
    let checksum: u32 = checksum
        .parse()
        .map_err(|_| RptError::protocol(None, "APRStt checksum is not a digit"))?;
    let digit_sum: u32 = body
        .bytes()
        .filter(|b| b.is_ascii_digit())
        .map(|b| (b - b'0') as u32)
        .sum();
    if digit_sum % 10 != checksum {
        return Err(RptError::protocol(None, "APRStt checksum mismatch"));
    }

    let mut callsign = String::new();
    let mut overlay = '0';
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            if chars.peek().is_none() {
                // trailing digit before checksum position already stripped;
                // a lone digit group here selects the overlay character.
                overlay = c;
            } else {
                callsign.push(c);
            }
        }
    }
    Ok((callsign, overlay))
}

/// Given three presses of the same key (`1`..`4` position within a group)
/// return the corresponding letter, mirroring the legacy 2-of-9 keypad map.
pub fn overlay_letter(group: usize, position: usize) -> Option<char> {
    OVERLAY_GROUPS.get(group)?.chars().nth(position)
}

/// Sink for `(callsign, overlay)` notifications (§6.3 "APRStt notify pipe").
pub trait TtCommonSink: Send {
    fn notify(&mut self, callsign: &str, overlay: char) -> Result<()>;
}

/// Writer-only named-pipe implementation: one line `<callsign> <overlay>\n`
/// per event, as specified. `O_NONBLOCK` tolerance on the open call lets a
/// writer proceed even if no APRS daemon is currently reading the pipe.
pub struct FileTtCommon {
    path: std::path::PathBuf,
}

impl FileTtCommon {
    pub fn new(path: impl AsRef<Path>) -> FileTtCommon {
        FileTtCommon { path: path.as_ref().to_path_buf() }
    }
}

impl TtCommonSink for FileTtCommon {
    fn notify(&mut self, callsign: &str, overlay: char) -> Result<()> {
        let fd = nix::fcntl::open(&self.path, OFlag::O_WRONLY | OFlag::O_NONBLOCK, Mode::empty())
            .map_err(|e| RptError::io("aprstt pipe open", std::io::Error::from(e)))?;
        // SAFETY: `open` just returned this fd; nothing else holds it.
        let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
        writeln!(file, "{callsign} {overlay}").map_err(|e| RptError::io("aprstt pipe write", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_payload_verifies_checksum() {
        // body "123" digit sum 6, checksum digit "6"
        let (callsign, _overlay) = decode_payload("1236").unwrap();
        assert_eq!(callsign, "123");
    }

    #[test]
    fn decode_payload_rejects_bad_checksum() {
        assert!(decode_payload("1239").is_err());
    }
}
