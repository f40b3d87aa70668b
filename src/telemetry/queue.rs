//! Telemetry item lifecycle and scheduling primitives (§3.3, §4.4).
//!
//! `Node::run_loop` spawns one OS thread per announcement and has it call
//! `Scheduler::run` with a `TelemetryPlayer` the host supplies; the pure
//! serialization/holdoff/pre-delay decisions live here so they're testable
//! without real threads or real audio.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::telemetry::mode::{Mode, WaitKind};
use crate::telemetry::morse::Element as MorseElement;

/// Pre-announcement delay per wait class (§4.4 step 3), in milliseconds.
/// Grounded on `original_source/apps/app_rpt/rpt_telemetry.c`'s
/// `get_wait_interval` constant table.
pub fn get_wait_interval(kind: WaitKind) -> Duration {
    let ms = match kind {
        WaitKind::Telem => 200,
        WaitKind::Id => 500,
        WaitKind::Unkey => 0,
        WaitKind::CallTerm => 1500,
        WaitKind::Comp => 200,
        WaitKind::LinkUnkey => 200,
        WaitKind::Parrot => 0,
        WaitKind::Mdc1200 => 0,
    };
    Duration::from_millis(ms)
}

/// Private copy of the link fields a telemetry worker needs, so it never
/// locks the live link (§3.3 "Link snapshot (`mylink`)").
#[derive(Debug, Clone, Default)]
pub struct LinkSnapshot {
    pub node_name: String,
    pub was_connected: bool,
    pub was_outbound: bool,
}

/// One pending or active announcement (§3.3 `rpt_tele`).
pub struct TelemetryItem {
    pub mode: Mode,
    pub param: String,
    pub submode: i32,
    pub parrot: bool,
    pub mylink: Option<LinkSnapshot>,
    killed: AtomicBool,
    seq: u64,
}

impl TelemetryItem {
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }
}

/// What a worker asks the host to actually render (§4.4 step 4). The host
/// provides the implementation; the core only decides *when* and *what*.
pub trait TelemetryPlayer: Send {
    fn play_file(&mut self, name: &str) -> Result<()>;
    fn play_morse(&mut self, elements: &[MorseElement]) -> Result<()>;
    fn play_tone(&mut self, freq1: u32, freq2: u32, ms: u32) -> Result<()>;
    fn say_number(&mut self, n: i64) -> Result<()>;
}

/// Live audio state the holdoff check (§4.4 step 2) reads. A trait rather
/// than passing `&Node` directly so `Scheduler` doesn't need to know about
/// `node::Node` (leaf-first dependency order, §2).
pub trait HoldoffState {
    fn keyed(&self) -> bool;
    fn remrx(&self) -> bool;
}

/// FIFO-with-immediate-bypass queue of pending/active telemetry (§4.4 step
/// 1, Design Notes §9 "priority queue with two classes").
#[derive(Default)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    cv: Condvar,
}

#[derive(Default)]
struct SchedulerState {
    /// Non-immediate items, in arrival order; a worker waits until its item
    /// reaches the front before playing.
    normal: VecDeque<Arc<TelemetryItem>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler::default()
    }

    /// `rpt_telemetry(Node, mode, param)`: enqueue one item (§4.4
    /// "Queueing"). The caller is responsible for spawning the worker
    /// thread that calls `run`.
    pub fn request(&self, mode: Mode, param: impl Into<String>, submode: i32, parrot: bool, mylink: Option<LinkSnapshot>) -> Arc<TelemetryItem> {
        let mut st = self.state.lock().expect("telemetry scheduler mutex poisoned");
        let seq = st.next_seq;
        st.next_seq += 1;
        let item = Arc::new(TelemetryItem {
            mode,
            param: param.into(),
            submode,
            parrot,
            mylink,
            killed: AtomicBool::new(false),
            seq,
        });
        if !mode.is_immediate() {
            st.normal.push_back(item.clone());
        }
        self.cv.notify_all();
        item
    }

    /// True once every item queued strictly before `item` has finished
    /// (reached the front of the FIFO). Immediate items never wait.
    fn is_head(&self, item: &TelemetryItem) -> bool {
        let st = self.state.lock().expect("telemetry scheduler mutex poisoned");
        st.normal.front().map(|head| head.seq == item.seq).unwrap_or(true)
    }

    fn remove(&self, item: &TelemetryItem) {
        let mut st = self.state.lock().expect("telemetry scheduler mutex poisoned");
        st.normal.retain(|i| i.seq != item.seq);
        drop(st);
        self.cv.notify_all();
    }

    /// Block until `item` is at the head of the FIFO (no-op for immediate
    /// modes), honoring cancellation.
    fn wait_for_turn(&self, item: &TelemetryItem) {
        if item.mode.is_immediate() {
            return;
        }
        let guard = self.state.lock().expect("telemetry scheduler mutex poisoned");
        let _unused = self
            .cv
            .wait_while(guard, |st| {
                if item.is_killed() {
                    return false;
                }
                st.normal.front().map(|head| head.seq != item.seq).unwrap_or(false)
            })
            .expect("telemetry scheduler condvar poisoned");
    }

    /// Execute one item end to end (§4.4 steps 1-5): wait for FIFO turn,
    /// honor holdoff, sleep the mode's pre-delay, render it (unless
    /// cancelled), then remove itself from the list.
    pub fn run(&self, item: &Arc<TelemetryItem>, holdoff: &dyn HoldoffState, player: &mut dyn TelemetryPlayer, sleep: impl Fn(Duration)) {
        self.wait_for_turn(item);

        if !item.mode.is_id_family() {
            while !item.is_killed() && (holdoff.keyed() || holdoff.remrx()) {
                sleep(Duration::from_millis(20));
            }
        }

        if !item.is_killed() {
            sleep(get_wait_interval(item.mode.wait_kind()));
        }

        if !item.is_killed() {
            let _ = self.execute_mode(item, player);
        }

        self.remove(item);
    }

    fn execute_mode(&self, item: &TelemetryItem, player: &mut dyn TelemetryPlayer) -> Result<()> {
        match item.mode {
            Mode::Id | Mode::Id1 | Mode::IdTalkover => player.play_file(&item.param),
            Mode::Unkey | Mode::LinkUnkey | Mode::LocUnkey => player.play_tone(350, 440, 250),
            Mode::TimeoutWarning | Mode::ActTimeoutWarning | Mode::Timeout => {
                player.play_file(&item.param)?;
                player.say_number(item.submode as i64)
            }
            _ => player.play_file(&item.param),
        }
    }

    /// `flush_telem(Node)`: mark every pending item killed so its worker's
    /// next blocking point returns immediately (§4.4 "Cancellation").
    /// `SETREMOTE` items are immediate and excluded, matching §4.4's
    /// description of what `flush_telem` walks.
    pub fn flush(&self, items: &[Arc<TelemetryItem>]) {
        for item in items {
            if item.mode != Mode::SetRemote {
                item.kill();
            }
        }
        self.cv.notify_all();
    }

    /// Snapshot of currently queued (non-immediate) items, for `flush`.
    pub fn pending(&self) -> Vec<Arc<TelemetryItem>> {
        self.state.lock().expect("telemetry scheduler mutex poisoned").normal.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("telemetry scheduler mutex poisoned").normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct NoHold;
    impl HoldoffState for NoHold {
        fn keyed(&self) -> bool {
            false
        }
        fn remrx(&self) -> bool {
            false
        }
    }

    struct AlwaysKeyed;
    impl HoldoffState for AlwaysKeyed {
        fn keyed(&self) -> bool {
            true
        }
        fn remrx(&self) -> bool {
            false
        }
    }

    struct RecordingPlayer {
        played: RefCell<Vec<String>>,
    }
    impl TelemetryPlayer for RecordingPlayer {
        fn play_file(&mut self, name: &str) -> Result<()> {
            self.played.borrow_mut().push(name.to_string());
            Ok(())
        }
        fn play_morse(&mut self, _elements: &[MorseElement]) -> Result<()> {
            Ok(())
        }
        fn play_tone(&mut self, _freq1: u32, _freq2: u32, _ms: u32) -> Result<()> {
            Ok(())
        }
        fn say_number(&mut self, _n: i64) -> Result<()> {
            Ok(())
        }
    }

    fn no_sleep(_d: Duration) {}

    #[test]
    fn items_play_in_fifo_order() {
        let sched = Scheduler::new();
        let a = sched.request(Mode::Id, "a", 0, false, None);
        let b = sched.request(Mode::Id, "b", 0, false, None);

        assert!(sched.is_head(&a));
        assert!(!sched.is_head(&b));

        let mut player = RecordingPlayer { played: RefCell::new(Vec::new()) };
        sched.run(&a, &NoHold, &mut player, no_sleep);
        assert!(sched.is_head(&b));
        sched.run(&b, &NoHold, &mut player, no_sleep);

        assert_eq!(*player.played.borrow(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn immediate_modes_bypass_fifo() {
        let sched = Scheduler::new();
        let _a = sched.request(Mode::Id, "a", 0, false, None);
        let immediate = sched.request(Mode::SetRemote, "now", 0, false, None);
        assert_eq!(sched.len(), 1); // only the non-immediate item is tracked

        let mut player = RecordingPlayer { played: RefCell::new(Vec::new()) };
        sched.run(&immediate, &NoHold, &mut player, no_sleep);
        assert_eq!(*player.played.borrow(), vec!["now".to_string()]);
    }

    #[test]
    fn holdoff_blocks_non_id_telemetry_until_unkeyed() {
        let sched = Scheduler::new();
        let item = sched.request(Mode::Status, "status", 0, false, None);
        let mut player = RecordingPlayer { played: RefCell::new(Vec::new()) };
        sched.run(&item, &AlwaysKeyedThenFree::new(2), &mut player, no_sleep);
        assert_eq!(*player.played.borrow(), vec!["status".to_string()]);
    }

    struct AlwaysKeyedThenFree {
        remaining: RefCell<i32>,
    }
    impl AlwaysKeyedThenFree {
        fn new(n: i32) -> AlwaysKeyedThenFree {
            AlwaysKeyedThenFree { remaining: RefCell::new(n) }
        }
    }
    impl HoldoffState for AlwaysKeyedThenFree {
        fn keyed(&self) -> bool {
            let mut r = self.remaining.borrow_mut();
            if *r > 0 {
                *r -= 1;
                true
            } else {
                false
            }
        }
        fn remrx(&self) -> bool {
            false
        }
    }

    #[test]
    fn id_family_ignores_holdoff() {
        let sched = Scheduler::new();
        let item = sched.request(Mode::Id, "id_file", 0, false, None);
        let mut player = RecordingPlayer { played: RefCell::new(Vec::new()) };
        sched.run(&item, &AlwaysKeyed, &mut player, no_sleep);
        assert_eq!(*player.played.borrow(), vec!["id_file".to_string()]);
    }

    #[test]
    fn flush_marks_pending_items_killed_but_spares_setremote() {
        let sched = Scheduler::new();
        let a = sched.request(Mode::Id, "a", 0, false, None);
        let setremote = sched.request(Mode::SetRemote, "sr", 0, false, None);
        let pending = sched.pending();
        sched.flush(&pending);
        assert!(a.is_killed());
        assert!(!setremote.is_killed());
    }
}
