//! Newkey handshake (§4.3.2).

use std::time::Duration;

/// Grace window to receive a peer's newkey text before downgrading to
/// `AllowedRedundant` (§4.3.1, scenario 5 in §8).
pub const NEWKEYTIME: Duration = Duration::from_millis(2000);

/// Per-link / per-node newkey state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewKeyState {
    /// Keying is carried out-of-band via `AST_CONTROL_RADIO_KEY` frames.
    Allowed,
    /// Same as `Allowed`, reached after a `newkeytimer` expiry with no reply.
    AllowedRedundant,
    /// Keying is carried in-band via text control messages; no `RADIO_KEY`.
    NotAllowed,
}

/// One of the three newkey text tokens exchanged after `ANSWER` (§4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewKeyToken {
    /// `!NEWKEY!` — legacy protocol, please use `RADIO_KEY` frames.
    NewKey,
    /// `!NEWKEY1!` — new protocol, do not send `RADIO_KEY`.
    NewKey1,
    /// `!IAXKEY!` — peer indicates IAX-keying is active on its side.
    IaxKey,
}

pub const NEWKEYSTR: &str = "!NEWKEY!";
pub const NEWKEY1STR: &str = "!NEWKEY1!";
pub const IAXKEYSTR: &str = "!IAXKEY!";

impl NewKeyToken {
    pub fn parse(line: &str) -> Option<NewKeyToken> {
        match line.trim() {
            NEWKEYSTR => Some(NewKeyToken::NewKey),
            NEWKEY1STR => Some(NewKeyToken::NewKey1),
            IAXKEYSTR => Some(NewKeyToken::IaxKey),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NewKeyToken::NewKey => NEWKEYSTR,
            NewKeyToken::NewKey1 => NEWKEY1STR,
            NewKeyToken::IaxKey => IAXKEYSTR,
        }
    }

    /// The receiving side's state transition on receipt of this token.
    pub fn received_state(self) -> NewKeyState {
        match self {
            NewKeyToken::NewKey => NewKeyState::Allowed,
            NewKeyToken::NewKey1 => NewKeyState::NotAllowed,
            NewKeyToken::IaxKey => NewKeyState::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for tok in [NewKeyToken::NewKey, NewKeyToken::NewKey1, NewKeyToken::IaxKey] {
            assert_eq!(NewKeyToken::parse(tok.as_str()), Some(tok));
        }
    }

    #[test]
    fn newkey1_sets_not_allowed() {
        assert_eq!(NewKeyToken::NewKey1.received_state(), NewKeyState::NotAllowed);
    }
}
