//! DTMF command parser and dispatcher (§4.2).

pub mod aprstt;
pub mod functions;

use std::time::{Duration, Instant};

use crate::error::DispatchResult;
use functions::{FunctionTable, Lookup};

/// Maximum accumulator length (§8 "DTMF buffer at MAXDTMF").
pub const MAXDTMF: usize = 32;

/// Inter-digit timeout: reset the accumulator if this much time passes
/// between digits (§4.2 "Character intake" step 1).
pub const DTMF_TIMEOUT: Duration = Duration::from_millis(3000);

/// Per-source tag (§4.2 "State per source").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Rpt,
    Lnk,
    Phone,
    Dphone,
    Alt,
}

/// Per-source accumulator state.
#[derive(Debug, Clone)]
pub struct SourceState {
    buf: String,
    /// `-1` (idle) is represented as `None`.
    index: Option<usize>,
    last_digit_at: Option<Instant>,
    in_aprstt: bool,
}

impl Default for SourceState {
    fn default() -> Self {
        SourceState {
            buf: String::new(),
            index: None,
            last_digit_at: None,
            in_aprstt: false,
        }
    }
}

impl SourceState {
    pub fn is_idle(&self) -> bool {
        self.index.is_none()
    }

    pub fn buffer(&self) -> &str {
        &self.buf
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.index = None;
        self.in_aprstt = false;
    }

    fn arm(&mut self) {
        self.buf.clear();
        self.index = Some(0);
    }

    fn push(&mut self, c: char) {
        self.buf.push(c);
        self.index = Some(self.buf.len());
    }
}

/// Config knobs the dispatcher needs that come from `NodeSection`.
#[derive(Debug, Clone, Copy)]
pub struct DtmfConfig {
    pub funcchar: char,
    pub endchar: char,
    pub aprstt: bool,
    pub dopfxtone: bool,
    pub propagate_dtmf: bool,
    pub propagate_phonedtmf: bool,
}

/// What the intake step decided to do with a single incoming character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// Character was passed straight through (radio echo or phone forward);
    /// nothing queued for dispatch.
    PassThrough,
    /// A lead-in funcchar armed the buffer; PFX-tone telemetry may be due.
    Armed { pfxtone: bool },
    /// Buffer reset due to timeout, overflow, or the two-funcchar escape.
    Reset,
    /// Buffer now holds `accum`; caller should run function lookup.
    Accumulating { accum: String },
}

/// Intake one character for `state`, following §4.2 "Character intake".
pub fn intake(state: &mut SourceState, cfg: &DtmfConfig, c: char, now: Instant) -> Intake {
    // Step 1: inter-digit timeout resets an idle-armed or mid-sequence buffer.
    if let Some(last) = state.last_digit_at {
        if !state.is_idle() && now.duration_since(last) > DTMF_TIMEOUT {
            state.reset();
        }
    }
    state.last_digit_at = Some(now);

    let is_funcchar = c == cfg.funcchar;

    if state.is_idle() {
        if is_funcchar {
            state.arm();
            return Intake::Armed { pfxtone: cfg.dopfxtone };
        }
        // Passed through as local DTMF echo or phone-forwarded DTMF.
        return Intake::PassThrough;
    }

    // Step 3: buffer full -> reset.
    if state.buf.len() >= MAXDTMF {
        state.reset();
        return Intake::Reset;
    }

    // Step 4: two consecutive funcchars erase the buffer (escape).
    if is_funcchar && state.buf.is_empty() {
        // first char after arm being another funcchar: escape immediately
        state.reset();
        return Intake::Reset;
    }

    state.push(c);
    Intake::Accumulating { accum: state.buf.clone() }
}

/// Result of running function-table lookup plus dispatch over an accumulated
/// sequence (§4.2 "Function dispatch").
pub fn dispatch<'a>(
    state: &mut SourceState,
    table: &'a FunctionTable,
    accum: &str,
    mut run: impl FnMut(&functions::FunctionEntry) -> DispatchResult,
) -> DispatchResult {
    match table.lookup(accum) {
        Lookup::Indeterminate => DispatchResult::Indeterminate,
        Lookup::Error => {
            state.reset();
            DispatchResult::Error
        }
        Lookup::Found(entry) => {
            let result = run(entry);
            match result {
                DispatchResult::Complete | DispatchResult::CompleteQuiet => state.reset(),
                DispatchResult::ReqFlush => state.reset(),
                DispatchResult::Error => state.reset(),
                DispatchResult::Indeterminate | DispatchResult::DoKey => {}
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DtmfConfig {
        DtmfConfig {
            funcchar: '*',
            endchar: '#',
            aprstt: false,
            dopfxtone: false,
            propagate_dtmf: false,
            propagate_phonedtmf: false,
        }
    }

    #[test]
    fn funcchar_arms_from_idle() {
        let mut s = SourceState::default();
        let now = Instant::now();
        assert_eq!(intake(&mut s, &cfg(), '*', now), Intake::Armed { pfxtone: false });
        assert!(!s.is_idle());
    }

    #[test]
    fn digit_passes_through_when_idle() {
        let mut s = SourceState::default();
        let now = Instant::now();
        assert_eq!(intake(&mut s, &cfg(), '5', now), Intake::PassThrough);
        assert!(s.is_idle());
    }

    #[test]
    fn double_funcchar_resets() {
        let mut s = SourceState::default();
        let now = Instant::now();
        intake(&mut s, &cfg(), '*', now);
        let r = intake(&mut s, &cfg(), '*', now);
        assert_eq!(r, Intake::Reset);
        assert!(s.is_idle());
    }

    #[test]
    fn buffer_accepts_up_to_maxdtmf_minus_one_then_resets_at_max() {
        let mut s = SourceState::default();
        let now = Instant::now();
        intake(&mut s, &cfg(), '*', now);
        for _ in 0..(MAXDTMF - 1) {
            let r = intake(&mut s, &cfg(), '1', now);
            assert!(matches!(r, Intake::Accumulating { .. }));
        }
        assert_eq!(s.buffer().len(), MAXDTMF - 1);
        // one more character is still accepted, filling the buffer to MAXDTMF
        let r = intake(&mut s, &cfg(), '1', now);
        assert!(matches!(r, Intake::Accumulating { .. }));
        assert_eq!(s.buffer().len(), MAXDTMF);
        // the next character after the buffer is full resets it
        let r = intake(&mut s, &cfg(), '1', now);
        assert_eq!(r, Intake::Reset);
        assert!(s.is_idle());
    }

    #[test]
    fn inter_digit_timeout_resets_buffer() {
        let mut s = SourceState::default();
        let t0 = Instant::now();
        intake(&mut s, &cfg(), '*', t0);
        intake(&mut s, &cfg(), '1', t0);
        let later = t0 + DTMF_TIMEOUT + Duration::from_millis(1);
        let r = intake(&mut s, &cfg(), '2', later);
        // buffer was reset due to timeout, then '2' armed or passed through
        assert_eq!(r, Intake::PassThrough);
    }
}
