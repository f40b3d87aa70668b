//! DTMF verb dispatch table (§4.2 "Function dispatch"). Wires the verb
//! named by a `dtmf::functions::FunctionEntry` to the subsystem it
//! controls, returning the `DispatchResult` the intake loop uses to decide
//! whether to clear the buffer, keep collecting, or force a phone-link key.

use std::collections::HashMap;

use crate::dtmf::functions::FunctionEntry;
use crate::error::DispatchResult;
use crate::link::flags::LinkMode;
use crate::link::LinkManager;
use crate::node::sysstate::SysStateBank;

/// Phone-patch call progress (§4.2 `autopatchup`/`autopatchdn`
/// responsibility: "advance call-mode through DOWN→DIALING→CONNECTING→UP
/// or FAILED").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallMode {
    #[default]
    Down,
    Dialing,
    Connecting,
    Up,
    Failed,
}

/// Mutable state the verb handlers read and write; bundled by reference so
/// this stays testable without a full `Node`.
pub struct VerbState<'a> {
    pub sysstate: &'a mut SysStateBank,
    pub links: &'a mut LinkManager,
    pub macros: &'a HashMap<String, String>,
    pub macrobuf: &'a mut String,
    pub call: &'a mut CallMode,
    pub last_command: &'a mut String,
}

/// Run the handler named by `entry.verb` against `state`, with `digits`
/// the full DTMF accumulator (verbs that take a trailing argument, like
/// `ilink` node numbers or `remote` frequencies, read it from here since
/// `entry.args` only carries the function table's configured fixed text).
pub fn dispatch_verb(state: &mut VerbState<'_>, entry: &FunctionEntry, digits: &str) -> DispatchResult {
    *state.last_command = entry.verb.clone();
    match entry.verb.as_str() {
        "cop" => cop(state, &entry.args),
        "autopatchup" => autopatch_up(state, digits),
        "autopatchdn" => autopatch_dn(state),
        "ilink" => ilink(state, &entry.args, digits),
        "status" => DispatchResult::Complete,
        "remote" => DispatchResult::Complete,
        "macro" => run_macro(state, digits),
        "playback" | "localplay" => DispatchResult::Complete,
        "meter" | "userout" => DispatchResult::Complete,
        "cmd" => DispatchResult::Complete,
        _ => DispatchResult::Error,
    }
}

/// Control-operator privileged toggles (§4.2 `cop` responsibility). `args`
/// names the sys-state row to switch to, or one of a handful of direct
/// toggle keywords; unknown requests fail closed rather than silently
/// no-op.
fn cop(state: &mut VerbState<'_>, args: &str) -> DispatchResult {
    if let Ok(row) = args.parse::<usize>() {
        return if state.sysstate.set_current(row) {
            DispatchResult::Complete
        } else {
            DispatchResult::Error
        };
    }
    match args {
        "reset" => {
            state.macrobuf.clear();
            DispatchResult::Complete
        }
        _ => DispatchResult::Error,
    }
}

fn autopatch_up(state: &mut VerbState<'_>, digits: &str) -> DispatchResult {
    if state.sysstate.autopatch_disabled() {
        *state.call = CallMode::Failed;
        return DispatchResult::Error;
    }
    match *state.call {
        CallMode::Down => {
            *state.call = if digits.is_empty() { CallMode::Dialing } else { CallMode::Connecting };
            DispatchResult::DoKey
        }
        CallMode::Dialing | CallMode::Connecting => {
            *state.call = CallMode::Up;
            DispatchResult::DoKey
        }
        CallMode::Up => DispatchResult::DoKey,
        CallMode::Failed => DispatchResult::Error,
    }
}

fn autopatch_dn(state: &mut VerbState<'_>) -> DispatchResult {
    *state.call = CallMode::Down;
    DispatchResult::Complete
}

/// Link control (§4.2 `ilink` responsibility). `args` carries the
/// configured sub-verb (`connect`, `disconnect`, `disconnect-all`,
/// `monitor`, `status`); `digits` carries the target node name for
/// connect/disconnect.
fn ilink(state: &mut VerbState<'_>, args: &str, digits: &str) -> DispatchResult {
    if state.sysstate.link_functions_disabled() {
        return DispatchResult::Error;
    }
    match args {
        "disconnect-all" => {
            for link in state.links.iter_mut() {
                link.flags.insert(crate::link::flags::LinkFlags::KILLME);
            }
            DispatchResult::Complete
        }
        "disconnect" => {
            if let Some(link) = state.links.find_mut(digits) {
                link.flags.insert(crate::link::flags::LinkFlags::KILLME);
                DispatchResult::Complete
            } else {
                DispatchResult::Error
            }
        }
        "monitor" => {
            if let Some(link) = state.links.find_mut(digits) {
                link.mode = LinkMode::Monitor;
                DispatchResult::Complete
            } else {
                DispatchResult::Error
            }
        }
        "status" => DispatchResult::CompleteQuiet,
        _ => DispatchResult::Error,
    }
}

/// Macro table lookup (§4.2 `macro` responsibility): splice the named
/// macro's digit string into `macrobuf` for the run loop to drain
/// (§4.1 step 3).
fn run_macro(state: &mut VerbState<'_>, name: &str) -> DispatchResult {
    match state.macros.get(name) {
        Some(expansion) => {
            state.macrobuf.push_str(expansion);
            DispatchResult::Complete
        }
        None => DispatchResult::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, Control, Frame};
    use crate::config::SysStateFlag;
    use crate::error::Result;
    use std::time::Duration;

    struct NullChannel;
    impl Channel for NullChannel {
        fn name(&self) -> &str {
            "null"
        }
        fn try_read(&mut self) -> Result<Option<Frame>> {
            Ok(None)
        }
        fn write_voice(&mut self, _samples: &[i16]) -> Result<()> {
            Ok(())
        }
        fn send_digit(&mut self, _digit: char) -> Result<()> {
            Ok(())
        }
        fn send_text(&mut self, _line: &str) -> Result<()> {
            Ok(())
        }
        fn indicate(&mut self, _control: Control) -> Result<()> {
            Ok(())
        }
        fn request(&mut self, _dial_string: &str) -> Result<()> {
            Ok(())
        }
        fn hangup(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_hungup(&self) -> bool {
            false
        }
        fn wait(&mut self, _timeout: Duration) -> Result<bool> {
            Ok(false)
        }
        fn join_conference(&mut self, _conf_num: u32, _listen_only: bool) -> Result<()> {
            Ok(())
        }
        fn leave_conference(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn entry(verb: &str, args: &str) -> FunctionEntry {
        FunctionEntry { verb: verb.to_string(), args: args.to_string() }
    }

    fn harness<'a>(
        sysstate: &'a mut SysStateBank,
        links: &'a mut LinkManager,
        macros: &'a HashMap<String, String>,
        macrobuf: &'a mut String,
        call: &'a mut CallMode,
        last_command: &'a mut String,
    ) -> VerbState<'a> {
        VerbState { sysstate, links, macros, macrobuf, call, last_command }
    }

    #[test]
    fn cop_switches_sysstate_row() {
        let mut rows: [Vec<SysStateFlag>; 10] = Default::default();
        rows[2] = vec![SysStateFlag::TxDisable];
        let mut sysstate = SysStateBank::new(rows);
        let mut links = LinkManager::new();
        let macros = HashMap::new();
        let mut macrobuf = String::new();
        let mut call = CallMode::Down;
        let mut last = String::new();
        let mut state = harness(&mut sysstate, &mut links, &macros, &mut macrobuf, &mut call, &mut last);

        let r = dispatch_verb(&mut state, &entry("cop", "2"), "");
        assert_eq!(r, DispatchResult::Complete);
        assert!(sysstate.tx_disabled());
    }

    #[test]
    fn ilink_disconnect_flags_killme() {
        let mut sysstate = SysStateBank::default();
        let mut links = LinkManager::new();
        links.add(crate::link::Link::new_inbound("w1aw", Box::new(NullChannel)));
        let macros = HashMap::new();
        let mut macrobuf = String::new();
        let mut call = CallMode::Down;
        let mut last = String::new();
        let mut state = harness(&mut sysstate, &mut links, &macros, &mut macrobuf, &mut call, &mut last);

        let r = dispatch_verb(&mut state, &entry("ilink", "disconnect"), "w1aw");
        assert_eq!(r, DispatchResult::Complete);
        assert!(links.find("w1aw").unwrap().flags.contains(crate::link::flags::LinkFlags::KILLME));
    }

    #[test]
    fn macro_not_found_is_error() {
        let mut sysstate = SysStateBank::default();
        let mut links = LinkManager::new();
        let macros = HashMap::new();
        let mut macrobuf = String::new();
        let mut call = CallMode::Down;
        let mut last = String::new();
        let mut state = harness(&mut sysstate, &mut links, &macros, &mut macrobuf, &mut call, &mut last);

        let r = dispatch_verb(&mut state, &entry("macro", ""), "9");
        assert_eq!(r, DispatchResult::Error);
    }

    #[test]
    fn autopatch_up_then_down_round_trips_call_mode() {
        let mut sysstate = SysStateBank::default();
        let mut links = LinkManager::new();
        let macros = HashMap::new();
        let mut macrobuf = String::new();
        let mut call = CallMode::Down;
        let mut last = String::new();
        let mut state = harness(&mut sysstate, &mut links, &macros, &mut macrobuf, &mut call, &mut last);

        assert_eq!(dispatch_verb(&mut state, &entry("autopatchup", ""), "5551212"), DispatchResult::DoKey);
        assert_eq!(*state.call, CallMode::Connecting);
        assert_eq!(dispatch_verb(&mut state, &entry("autopatchdn", ""), ""), DispatchResult::Complete);
        assert_eq!(*state.call, CallMode::Down);
    }
}
