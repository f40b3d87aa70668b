//! The node aggregate (§3.1 `rpt`) and its per-iteration run loop (§4.1).
//!
//! One `Node` per configured repeater/link endpoint; the host runs
//! `Node::step` on a dedicated OS thread in a loop, feeding it the elapsed
//! wall-clock time since the previous iteration (Design Notes §9: no hidden
//! module-level clock, the caller supplies time so the loop stays
//! testable). Telemetry announcements are handed off to short-lived worker
//! threads (`spawn_telemetry`); the node loop itself never blocks on them.

pub mod duplex;
pub mod keying;
pub mod parrot;
pub mod stats;
pub mod supervisor;
pub mod sysstate;
pub mod timers;
pub mod verbs;
pub mod voter;
pub mod vox;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, trace, warn};

use crate::channel::{Channel, Control as ChanControl, Frame};
use crate::config::NodeSection;
use crate::dtmf::functions::FunctionTable;
use crate::dtmf::{self, DispatchResult as DtmfOutcome, DtmfConfig, Intake, Source, SourceState};
use crate::error::{DispatchResult, Result};
use crate::link::flags::LinkFlags;
use crate::link::text::TextMessage;
use crate::link::LinkManager;
use crate::telemetry::mode::Mode as TeleMode;
use crate::telemetry::queue::{HoldoffState, LinkSnapshot, Scheduler, TelemetryItem, TelemetryPlayer};

use duplex::DuplexPolicy;
use keying::KeyingState;
use parrot::ParrotRecorder;
use stats::NodeStats;
use sysstate::SysStateBank;
use timers::{NodeTimers, Timer};
use verbs::{dispatch_verb, CallMode, VerbState};
use voter::Voter;
use vox::VoxTracker;

/// Cross-thread mirror of live-audio state, read by telemetry worker
/// threads through `HoldoffState` without touching the node's own mutex
/// (§4.4 step 2, §5 lock ordering notes).
#[derive(Clone)]
struct LiveAudioFlags {
    keyed: Arc<AtomicBool>,
    remrx: Arc<AtomicBool>,
}

impl HoldoffState for LiveAudioFlags {
    fn keyed(&self) -> bool {
        self.keyed.load(Ordering::Acquire)
    }
    fn remrx(&self) -> bool {
        self.remrx.load(Ordering::Acquire)
    }
}

/// The node aggregate (§3.1). Owns its RX/TX channels, its links, and every
/// piece of derived run-loop state.
pub struct Node {
    pub name: String,
    config: NodeSection,
    rx: Box<dyn Channel>,
    tx: Box<dyn Channel>,

    pub links: LinkManager,
    pub keying: KeyingState,
    pub timers: NodeTimers,
    pub sysstate: SysStateBank,
    pub stats: NodeStats,
    pub duplex: DuplexPolicy,
    pub voter: Voter,
    pub vox: VoxTracker,

    telemetry: Arc<Scheduler>,
    pending_telemetry: Vec<Arc<TelemetryItem>>,
    live_audio: LiveAudioFlags,

    functions: HashMap<Source, FunctionTable>,
    dtmf_state: HashMap<Source, SourceState>,
    dtmf_cfg: DtmfConfig,
    macros: HashMap<String, String>,
    macrobuf: String,
    macro_timer: Timer,
    call: CallMode,
    last_dtmf_command: String,

    sleeping: bool,
    sleep_timer: Timer,
    link_activity_since_mark: bool,
    ident_pending: bool,

    parrot_recorder: Option<ParrotRecorder>,
    parrot_pending: Option<PathBuf>,
    parrot_dir: PathBuf,
    parrot_session: u64,

    was_keyed: bool,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        config: NodeSection,
        rx: Box<dyn Channel>,
        tx: Box<dyn Channel>,
        functions: HashMap<Source, FunctionTable>,
        macros: HashMap<String, String>,
    ) -> Node {
        let name = name.into();
        let dtmf_cfg = DtmfConfig {
            funcchar: config.funcchar,
            endchar: config.endchar,
            aprstt: false,
            dopfxtone: false,
            propagate_dtmf: config.propagate_dtmf,
            propagate_phonedtmf: config.propagate_phonedtmf,
        };
        let sysstate = SysStateBank::new(config.sysstates.clone());
        let duplex = duplex::policy(config.duplex);
        let idtime = config.idtime;
        let mut timers = NodeTimers::default();
        timers.ident = Timer::armed(idtime);

        Node {
            name,
            config,
            rx,
            tx,
            links: LinkManager::new(),
            keying: KeyingState::default(),
            timers,
            sysstate,
            stats: NodeStats::default(),
            duplex,
            voter: Voter::default(),
            vox: VoxTracker::new(false),
            telemetry: Arc::new(Scheduler::new()),
            pending_telemetry: Vec::new(),
            live_audio: LiveAudioFlags { keyed: Arc::new(AtomicBool::new(false)), remrx: Arc::new(AtomicBool::new(false)) },
            functions,
            dtmf_state: HashMap::new(),
            dtmf_cfg,
            macros,
            macrobuf: String::new(),
            macro_timer: Timer::armed(100),
            call: CallMode::Down,
            last_dtmf_command: String::new(),
            sleeping: false,
            sleep_timer: Timer::default(),
            link_activity_since_mark: false,
            ident_pending: false,
            parrot_recorder: None,
            parrot_pending: None,
            parrot_dir: std::env::temp_dir(),
            parrot_session: 0,
            was_keyed: false,
        }
    }

    pub fn config(&self) -> &NodeSection {
        &self.config
    }

    /// `rpt_telemetry(Node, mode, param)` (§4.4 "Queueing"): enqueue one
    /// announcement, returning the handle a worker thread will execute.
    pub fn enqueue_telemetry(&mut self, mode: TeleMode, param: impl Into<String>, submode: i32, parrot: bool, mylink: Option<LinkSnapshot>) -> Arc<TelemetryItem> {
        self.pending_telemetry.retain(|i| !i.is_killed());
        let item = self.telemetry.request(mode, param, submode, parrot, mylink);
        self.pending_telemetry.push(item.clone());
        item
    }

    /// Spawn the short-lived worker thread that actually renders `item`
    /// (§4.4 step 4), on a `TelemetryPlayer` the host supplies for this one
    /// announcement (typically bound to the node's monitor channel).
    pub fn spawn_telemetry(&self, item: Arc<TelemetryItem>, mut player: Box<dyn TelemetryPlayer + 'static>) -> std::thread::JoinHandle<()> {
        let sched = self.telemetry.clone();
        let holdoff = self.live_audio.clone();
        std::thread::spawn(move || {
            sched.run(&item, &holdoff, player.as_mut(), std::thread::sleep);
        })
    }

    /// `flush_telem(Node)` (§4.4 "Cancellation").
    pub fn flush_telemetry(&mut self) {
        self.telemetry.flush(&self.pending_telemetry);
        self.pending_telemetry.clear();
    }

    fn link_snapshot(link: &crate::link::Link) -> LinkSnapshot {
        LinkSnapshot {
            node_name: link.node_name.clone(),
            was_connected: link.flags.contains(LinkFlags::CONNECTED),
            was_outbound: link.flags.contains(LinkFlags::OUTBOUND),
        }
    }

    /// Run one iteration of the node loop (§4.1), advancing all timers by
    /// `elapsed` and reacting to whatever frames are currently available.
    #[instrument(level = "trace", skip(self), fields(node = %self.name))]
    pub fn step(&mut self, elapsed: Duration) -> Result<()> {
        self.timers.tick(elapsed);
        self.macro_timer.tick(elapsed);
        if self.sleeping {
            self.sleep_timer.tick(elapsed);
        }

        self.service_rx()?;
        self.service_links()?;

        self.keying.update(&self.links);
        self.live_audio.keyed.store(self.keying.keyed, Ordering::Release);
        self.live_audio.remrx.store(self.keying.remrx, Ordering::Release);
        self.voter.evaluate(&self.links);

        self.service_keying_edge();
        self.service_timers();
        self.drain_macro_buffer();

        self.was_keyed = self.keying.keyed;
        Ok(())
    }

    fn service_rx(&mut self) -> Result<()> {
        while let Some(frame) = self.rx.try_read()? {
            match frame {
                Frame::Voice(samples) => {
                    if let Some(rec) = self.parrot_recorder.as_mut() {
                        rec.write_samples(&samples)?;
                    }
                    if !self.duplex.mute_rx_while_tx || !self.keying.txkeyed {
                        self.tx.write_voice(&samples)?;
                    }
                }
                Frame::DtmfBegin(c) => {
                    let outcome = self.intake_digit(Source::Rpt, c);
                    trace!(digit = %c, ?outcome, "rpt dtmf digit");
                }
                Frame::DtmfEnd(_) => {}
                Frame::Control(ChanControl::RadioKey) => self.keying.rxchankeyed = true,
                Frame::Control(ChanControl::RadioUnkey) => self.keying.rxchankeyed = false,
                Frame::Control(_) => {}
                Frame::Text(_) => {}
                Frame::Hangup => warn!(node = %self.name, "rx channel hung up"),
            }
        }
        Ok(())
    }

    /// Reads every link's channel and applies text-control (§4.3.3) and
    /// keying-control effects. Collected as local actions first so the
    /// link iteration never needs to borrow the rest of `self`.
    fn service_links(&mut self) -> Result<()> {
        enum Action {
            DispatchLnk(char),
            Forward { from: String, line: String },
        }
        let mut actions = Vec::new();

        for link in self.links.iter_mut() {
            while let Some(frame) = link.chan.try_read()? {
                match frame {
                    Frame::Control(ChanControl::RadioKey) => link.flags.insert(LinkFlags::LASTRX),
                    Frame::Control(ChanControl::RadioUnkey) => link.flags.remove(LinkFlags::LASTRX),
                    Frame::Control(ChanControl::Answer) => link.mark_connected(),
                    Frame::Control(ChanControl::Hangup) | Frame::Hangup => {
                        link.mark_dead(crate::link::fsm::DeathReason::PeerHangup)
                    }
                    Frame::Text(line) => match TextMessage::parse(&line) {
                        Ok(TextMessage::Dtmf { dest, src: _, digit, .. }) => {
                            if dest == "0" || dest == self.name {
                                actions.push(Action::DispatchLnk(digit));
                            } else {
                                actions.push(Action::Forward { from: link.node_name.clone(), line: line.clone() });
                            }
                        }
                        Ok(TextMessage::Keying { dest, src, keyed, is_query: false, .. }) => {
                            if (dest == "*" || dest == self.name) && src == link.node_name {
                                if keyed {
                                    link.flags.insert(LinkFlags::LASTRX);
                                } else {
                                    link.flags.remove(LinkFlags::LASTRX);
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => debug!(from = %link.node_name, error = %e, "bad link text message"),
                    },
                    Frame::Voice(_) | Frame::DtmfBegin(_) | Frame::DtmfEnd(_) => {}
                }
            }
        }

        for action in actions {
            match action {
                Action::DispatchLnk(c) => {
                    let outcome = self.intake_digit(Source::Lnk, c);
                    trace!(digit = %c, ?outcome, "lnk dtmf digit");
                }
                Action::Forward { from, line } => {
                    for link in self.links.iter_mut().filter(|l| l.node_name != from) {
                        let _ = link.send_text(&line);
                    }
                }
            }
        }
        Ok(())
    }

    /// Feed one digit from `source` through intake and, once a full verb
    /// accumulates, through dispatch (§4.2).
    fn intake_digit(&mut self, source: Source, c: char) -> DtmfOutcome {
        let state = self.dtmf_state.entry(source).or_default();
        match dtmf::intake(state, &self.dtmf_cfg, c, Instant::now()) {
            Intake::Accumulating { accum } => {
                let Some(table) = self.functions.get(&source) else {
                    return DtmfOutcome::Indeterminate;
                };
                let mut sysstate = std::mem::take(&mut self.sysstate);
                let mut links = std::mem::take(&mut self.links);
                let macros = std::mem::take(&mut self.macros);
                let mut macrobuf = std::mem::take(&mut self.macrobuf);
                let mut call = self.call;
                let mut last_command = std::mem::take(&mut self.last_dtmf_command);

                let state = self.dtmf_state.get_mut(&source).expect("just inserted above");
                let result = dtmf::dispatch(state, table, &accum, |entry| {
                    let mut vstate = VerbState {
                        sysstate: &mut sysstate,
                        links: &mut links,
                        macros: &macros,
                        macrobuf: &mut macrobuf,
                        call: &mut call,
                        last_command: &mut last_command,
                    };
                    dispatch_verb(&mut vstate, entry, &accum)
                });

                self.sysstate = sysstate;
                self.links = links;
                self.macros = macros;
                self.macrobuf = macrobuf;
                self.call = call;
                self.last_dtmf_command = last_command;

                if matches!(result, DispatchResult::Complete | DispatchResult::CompleteQuiet) {
                    self.stats.record_executed_command();
                }
                result
            }
            Intake::Armed { .. } | Intake::PassThrough | Intake::Reset => DtmfOutcome::Indeterminate,
        }
    }

    /// Parrot start/stop and ident-on-key-down bookkeeping that only
    /// happens on the edge of a keying transition (§4.1 step 2 "Parrot",
    /// step 4 ident "polite ID" deferral).
    fn service_keying_edge(&mut self) {
        let now_keyed = self.keying.keyed;
        if now_keyed && !self.was_keyed {
            self.link_activity_since_mark = true;
            self.timers.repeater_inactivity.reload(self.config.rptinacttime);
            if self.sleeping {
                self.wake();
            }
            if self.config.parrot != crate::config::ParrotMode::Off && self.parrot_recorder.is_none() {
                self.parrot_session += 1;
                match ParrotRecorder::start(&self.parrot_dir, &self.name, self.parrot_session) {
                    Ok(rec) => self.parrot_recorder = Some(rec),
                    Err(e) => warn!(node = %self.name, error = %e, "failed to start parrot recording"),
                }
            }
            if self.ident_pending {
                self.fire_ident();
            }
        } else if !now_keyed && self.was_keyed {
            self.timers.tail.reload(self.config.hangtime);
            if let Some(rec) = self.parrot_recorder.take() {
                match rec.finish() {
                    Ok(path) => {
                        self.parrot_pending = Some(path);
                        self.timers.parrot.reload(self.config.parrottime);
                    }
                    Err(e) => warn!(node = %self.name, error = %e, "failed to finalize parrot recording"),
                }
            }
        }
    }

    fn fire_ident(&mut self) {
        self.ident_pending = false;
        self.timers.ident.reload(self.config.idtime);
        self.stats.record_keyup();
        self.enqueue_telemetry(TeleMode::Id, self.config.idrecording.clone(), 0, false, None);
    }

    /// Services every countdown timer that fires this iteration (§4.1 step
    /// 2, parrot scheduling, link/repeater inactivity, sleep).
    fn service_timers(&mut self) {
        if self.timers.timeout.is_running() && self.keying.txkeyed && self.timers.timeout.tick(Duration::ZERO) {
            self.stats.record_timeout();
            self.enqueue_telemetry(TeleMode::Timeout, "", 0, false, None);
        }

        if self.timers.ident.tick(Duration::ZERO) {
            if self.keying.keyed {
                self.fire_ident();
            } else {
                self.ident_pending = true;
                self.timers.ident.reload(self.config.politeid.max(1));
            }
        }

        if self.timers.repeater_inactivity.tick(Duration::ZERO) {
            if let Some(name) = self.config.dtmfkeys.clone() {
                self.macrobuf.push_str(&name);
            }
        }

        if self.link_activity_since_mark && self.timers.link_activity.tick(Duration::ZERO) {
            self.link_activity_since_mark = false;
            if let Some(name) = self.config.tonemacro.clone() {
                self.macrobuf.push_str(&name);
            }
        }

        if self.timers.parrot.tick(Duration::ZERO) {
            if let Some(path) = self.parrot_pending.take() {
                self.enqueue_telemetry(TeleMode::Parrot, path.to_string_lossy().into_owned(), 0, true, None);
            }
        }

        if self.config.sleeptime > 0 && !self.keying.keyed && self.links.is_empty() {
            if !self.sleeping && !self.sleep_timer.is_running() {
                self.sleep_timer.reload(self.config.sleeptime);
            }
            if self.sleep_timer.tick(Duration::ZERO) {
                self.sleeping = true;
            }
        }
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.sleep_timer.stop();
    }

    /// Drain one character from the macro buffer every `macrotimer`
    /// interval, delivering it as if it arrived from source RPT (§4.1
    /// step 3).
    fn drain_macro_buffer(&mut self) {
        if self.macro_timer.tick(Duration::ZERO) {
            self.macro_timer.reload(100);
            if !self.macrobuf.is_empty() {
                let c = self.macrobuf.remove(0);
                let _ = self.intake_digit(Source::Rpt, c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Control, Frame};
    use crate::config::{Duplex, ParrotMode};
    use crate::dtmf::functions::FunctionTable;
    use std::sync::Mutex;

    struct ScriptedChannel {
        frames: Mutex<std::collections::VecDeque<Frame>>,
        written: Mutex<Vec<Vec<i16>>>,
    }

    impl ScriptedChannel {
        fn new(frames: Vec<Frame>) -> ScriptedChannel {
            ScriptedChannel { frames: Mutex::new(frames.into()), written: Mutex::new(Vec::new()) }
        }
    }

    impl Channel for ScriptedChannel {
        fn name(&self) -> &str {
            "scripted"
        }
        fn try_read(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.lock().unwrap().pop_front())
        }
        fn write_voice(&mut self, samples: &[i16]) -> Result<()> {
            self.written.lock().unwrap().push(samples.to_vec());
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

    fn minimal_config(node_name: &str) -> NodeSection {
        let mut raw = crate::config::RawSections::new();
        raw.insert(
            node_name.to_string(),
            [("rxchannel".to_string(), "Zap/1".to_string())].into_iter().collect(),
        );
        NodeSection::from_sections(node_name, &raw).unwrap()
    }

    #[test]
    fn keying_control_frame_drives_keying_state() {
        let cfg = minimal_config("n1");
        let rx = Box::new(ScriptedChannel::new(vec![Frame::Control(Control::RadioKey)]));
        let tx = Box::new(ScriptedChannel::new(vec![]));
        let mut node = Node::new("n1", cfg, rx, tx, HashMap::new(), HashMap::new());

        node.step(Duration::from_millis(20)).unwrap();
        assert!(node.keying.rxchankeyed);
        assert!(node.keying.keyed);
    }

    #[test]
    fn voice_frame_passes_through_in_half_duplex() {
        let mut cfg = minimal_config("n2");
        cfg.duplex = Duplex::HalfDuplex;
        let rx = Box::new(ScriptedChannel::new(vec![Frame::Voice(vec![1, 2, 3])]));
        let tx_chan = ScriptedChannel::new(vec![]);
        let tx = Box::new(tx_chan);
        let mut node = Node::new("n2", cfg, rx, tx, HashMap::new(), HashMap::new());
        node.step(Duration::from_millis(20)).unwrap();
        // half duplex never mutes RX passthrough regardless of txkeyed
        assert!(!node.duplex.mute_rx_while_tx);
    }

    #[test]
    fn dtmf_digit_dispatches_through_function_table() {
        let cfg = minimal_config("n3");
        let rx = Box::new(ScriptedChannel::new(vec![Frame::DtmfBegin('1')]));
        let tx = Box::new(ScriptedChannel::new(vec![]));
        let mut table = FunctionTable::new();
        table.insert("1", "cop", "reset");
        let mut functions = HashMap::new();
        functions.insert(Source::Rpt, table);
        let mut node = Node::new("n3", cfg, rx, tx, functions, HashMap::new());
        node.step(Duration::from_millis(20)).unwrap();
        assert_eq!(node.last_dtmf_command, "cop");
    }

    #[test]
    fn ident_timer_fires_while_keyed() {
        let mut cfg = minimal_config("n4");
        cfg.idtime = 100;
        let rx = Box::new(ScriptedChannel::new(vec![Frame::Control(Control::RadioKey)]));
        let tx = Box::new(ScriptedChannel::new(vec![]));
        let mut node = Node::new("n4", cfg, rx, tx, HashMap::new(), HashMap::new());
        node.step(Duration::from_millis(150)).unwrap();
        assert!(node.telemetry.len() >= 0); // Id is immediate-equivalent here: no panic, ident reloaded
        assert!(node.timers.ident.remaining_ms() > 0);
    }

    #[test]
    fn sleep_engages_after_quiet_period_with_no_links() {
        let mut cfg = minimal_config("n5");
        cfg.sleeptime = 50;
        cfg.parrot = ParrotMode::Off;
        let rx = Box::new(ScriptedChannel::new(vec![]));
        let tx = Box::new(ScriptedChannel::new(vec![]));
        let mut node = Node::new("n5", cfg, rx, tx, HashMap::new(), HashMap::new());
        node.step(Duration::from_millis(10)).unwrap();
        assert!(!node.sleeping);
        node.step(Duration::from_millis(60)).unwrap();
        assert!(node.sleeping);
    }
}
