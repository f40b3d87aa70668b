//! Configuration schema (§6.1).
//!
//! File *parsing* is the host's job; we only own the typed schema the host
//! hands us, plus the string-to-field coercions (CSV splitting, `lo-hi`
//! range parsing, sys-state toggle lists) that a section-based text format
//! can't express directly. `from_sections` builds the schema from an
//! already-parsed `HashMap<String, HashMap<String, String>>`, the shape a
//! host config-file reader would produce.

use std::collections::HashMap;

use crate::error::{RptError, Result};

/// Raw config as the host would hand it to us: section name -> key -> value.
pub type RawSections = HashMap<String, HashMap<String, String>>;

/// Duplex policy (§4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    /// RX muted while TX keyed, no pass-through.
    Simplex = 0,
    /// Like `Simplex` but passes squelch to TX.
    SimplexPassSquelch = 1,
    /// Half-duplex repeater (default).
    HalfDuplex = 2,
    /// Full-duplex, announcements muted during local RX.
    FullDuplexMuted = 3,
    /// Full-duplex, announcements always mixed.
    FullDuplexAlways = 4,
}

impl Duplex {
    pub fn from_code(code: u8) -> Result<Duplex> {
        Ok(match code {
            0 => Duplex::Simplex,
            1 => Duplex::SimplexPassSquelch,
            2 => Duplex::HalfDuplex,
            3 => Duplex::FullDuplexMuted,
            4 => Duplex::FullDuplexAlways,
            other => {
                return Err(RptError::config(
                    "<unknown>",
                    format!("duplex must be 0..4, got {other}"),
                ))
            }
        })
    }
}

/// Parrot recording mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParrotMode {
    #[default]
    Off,
    OnCommand,
    Always,
}

/// One `rpt` node config section (§6.1).
#[derive(Debug, Clone)]
pub struct NodeSection {
    // Identity
    pub node_name: String,
    pub rxchannel: String,
    pub txchannel: String,
    pub idrecording: String,
    pub idtalkover: Option<String>,
    pub context: String,
    pub callerid: Option<String>,
    pub accountcode: Option<String>,
    pub tonezone: Option<String>,

    // Timers (milliseconds)
    pub hangtime: u32,
    pub althangtime: u32,
    pub totime: u32,
    pub idtime: u32,
    pub politeid: u32,
    pub tailmessagetime: u32,
    pub tailsquashedtime: u32,
    pub sleeptime: u32,
    pub lnkacttime: u32,
    pub lnkacttimerwarn: u32,
    pub rptinacttime: u32,

    // Duplex/behavior
    pub duplex: Duplex,
    pub simple: bool,
    pub parrot: ParrotMode,
    pub parrottime: u32,

    // Functions
    pub funcchar: char,
    pub endchar: char,
    pub functions: String,
    pub link_functions: Option<String>,
    pub phone_functions: Option<String>,
    pub dphone_functions: Option<String>,
    pub alt_functions: Option<String>,
    pub startup_macro: Option<String>,
    pub macro_section: Option<String>,
    pub tonemacro: Option<String>,
    pub mdcmacro: Option<String>,
    pub dtmfkeys: Option<String>,

    // Remote base
    pub remote: Option<String>,
    pub ioport: Option<String>,
    pub iospeed: Option<u32>,
    pub civaddr: Option<u8>,
    pub default_split_2m: Option<u32>,
    pub default_split_70cm: Option<u32>,
    pub remote_mars: bool,

    // Linking
    pub nodes: Option<String>,
    pub extnodes: Option<String>,
    pub extnodefiles: Vec<String>,
    pub patchconnect: Option<String>,
    pub locallinknodes: Option<String>,
    pub ctgroup: Option<String>,
    pub linktolink: bool,
    pub propagate_dtmf: bool,
    pub propagate_phonedtmf: bool,

    // Audio gains (dB)
    pub erxgain: f32,
    pub etxgain: f32,
    pub trxgain: f32,
    pub ttxgain: f32,
    pub linkmongain: f32,
    pub telemnomgain: f32,
    pub telemduckgain: f32,

    // Voting
    pub votertype: Option<String>,
    pub votermode: Option<String>,
    pub votermargin: f32,

    // Sys-states s0..s9, each a CSV of toggle names
    pub sysstates: [Vec<SysStateFlag>; 10],

    // Archiving
    pub archivedir: Option<String>,
    pub archivedatefmt: Option<String>,
    pub archiveformat: Option<String>,
    pub monminblocks: Option<u32>,
    pub archiveaudio: bool,

    // Post hooks
    pub statpost_program: Option<String>,
    pub statpost_url: Option<String>,
    pub discpgm: Option<String>,
    pub connpgm: Option<String>,
}

/// One toggle flag recognized in an `s0..s9` sys-state row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysStateFlag {
    TxDisable,
    RxDisable,
    TimeoutDisable,
    LinkFunDisable,
    AutopatchDisable,
    SchedulerDisable,
    UserFunDisable,
    AltTail,
    NoIncomingConnections,
    SleepEnable,
}

impl SysStateFlag {
    fn parse(token: &str) -> Option<SysStateFlag> {
        Some(match token.trim() {
            "TXDIS" => SysStateFlag::TxDisable,
            "RXDIS" => SysStateFlag::RxDisable,
            "NOICE" => SysStateFlag::TimeoutDisable,
            "LINKFUNDISABLE" => SysStateFlag::LinkFunDisable,
            "NOAUTOPATCH" => SysStateFlag::AutopatchDisable,
            "SCHEDDISABLE" => SysStateFlag::SchedulerDisable,
            "NOUSEROUT" => SysStateFlag::UserFunDisable,
            "ALTTAIL" => SysStateFlag::AltTail,
            "NOICED" => SysStateFlag::NoIncomingConnections,
            "SLEEP" => SysStateFlag::SleepEnable,
            "" => return None,
            _ => return None,
        })
    }
}

fn get<'a>(section: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    section.get(key).map(|s| s.as_str())
}

fn get_u32(section: &HashMap<String, String>, key: &str, default: u32) -> u32 {
    get(section, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_f32(section: &HashMap<String, String>, key: &str, default: f32) -> f32 {
    get(section, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_bool(section: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match get(section, key) {
        Some(v) => matches!(v, "1" | "yes" | "true" | "on"),
        None => default,
    }
}

fn get_char(section: &HashMap<String, String>, key: &str, default: char) -> char {
    get(section, key)
        .and_then(|v| v.chars().next())
        .unwrap_or(default)
}

fn parse_sysstate_row(value: &str) -> Vec<SysStateFlag> {
    value
        .split(',')
        .filter_map(SysStateFlag::parse)
        .collect()
}

impl NodeSection {
    /// Build a `NodeSection` from the host's parsed `[nodename]` section.
    pub fn from_sections(node_name: &str, raw: &RawSections) -> Result<NodeSection> {
        let section = raw.get(node_name).ok_or_else(|| {
            RptError::config(node_name, "no such section in configuration")
        })?;

        let rxchannel = get(section, "rxchannel")
            .ok_or_else(|| RptError::config(node_name, "rxchannel is required"))?
            .to_string();
        let txchannel = get(section, "txchannel")
            .unwrap_or(&rxchannel)
            .to_string();

        let mut sysstates: [Vec<SysStateFlag>; 10] = Default::default();
        for (i, row) in sysstates.iter_mut().enumerate() {
            let key = format!("s{i}");
            if let Some(v) = get(section, &key) {
                *row = parse_sysstate_row(v);
            }
        }

        let extnodefiles = get(section, "extnodefiles")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let duplex = Duplex::from_code(get_u32(section, "duplex", 2) as u8)
            .map_err(|_| RptError::config(node_name, "invalid duplex code"))?;

        let parrot = match get(section, "parrot") {
            Some("2") => ParrotMode::Always,
            Some("1") => ParrotMode::OnCommand,
            _ => ParrotMode::Off,
        };

        Ok(NodeSection {
            node_name: node_name.to_string(),
            rxchannel,
            txchannel,
            idrecording: get(section, "idrecording").unwrap_or_default().to_string(),
            idtalkover: get(section, "idtalkover").map(str::to_string),
            context: get(section, "context").unwrap_or("radio").to_string(),
            callerid: get(section, "callerid").map(str::to_string),
            accountcode: get(section, "accountcode").map(str::to_string),
            tonezone: get(section, "tonezone").map(str::to_string),

            hangtime: get_u32(section, "hangtime", 5000),
            althangtime: get_u32(section, "althangtime", 5000),
            totime: get_u32(section, "totime", 180_000),
            idtime: get_u32(section, "idtime", 300_000),
            politeid: get_u32(section, "politeid", 30_000),
            tailmessagetime: get_u32(section, "tailmessagetime", 0),
            tailsquashedtime: get_u32(section, "tailsquashedtime", 0),
            sleeptime: get_u32(section, "sleeptime", 0),
            lnkacttime: get_u32(section, "lnkacttime", 0),
            lnkacttimerwarn: get_u32(section, "lnkacttimerwarn", 0),
            rptinacttime: get_u32(section, "rptinacttime", 0),

            duplex,
            simple: get_bool(section, "simple", false),
            parrot,
            parrottime: get_u32(section, "parrottime", 1000),

            funcchar: get_char(section, "funcchar", '*'),
            endchar: get_char(section, "endchar", '#'),
            functions: get(section, "functions").unwrap_or("functions").to_string(),
            link_functions: get(section, "link_functions").map(str::to_string),
            phone_functions: get(section, "phone_functions").map(str::to_string),
            dphone_functions: get(section, "dphone_functions").map(str::to_string),
            alt_functions: get(section, "alt_functions").map(str::to_string),
            startup_macro: get(section, "startup_macro").map(str::to_string),
            macro_section: get(section, "macro").map(str::to_string),
            tonemacro: get(section, "tonemacro").map(str::to_string),
            mdcmacro: get(section, "mdcmacro").map(str::to_string),
            dtmfkeys: get(section, "dtmfkeys").map(str::to_string),

            remote: get(section, "remote").map(str::to_string),
            ioport: get(section, "ioport").map(str::to_string),
            iospeed: get(section, "iospeed").and_then(|v| v.parse().ok()),
            civaddr: get(section, "civaddr")
                .and_then(|v| u8::from_str_radix(v.trim_start_matches("0x"), 16).ok()),
            default_split_2m: get(section, "default_split_2m").and_then(|v| v.parse().ok()),
            default_split_70cm: get(section, "default_split_70cm").and_then(|v| v.parse().ok()),
            remote_mars: get_bool(section, "remote_mars", false),

            nodes: get(section, "nodes").map(str::to_string),
            extnodes: get(section, "extnodes").map(str::to_string),
            extnodefiles,
            patchconnect: get(section, "patchconnect").map(str::to_string),
            locallinknodes: get(section, "locallinknodes").map(str::to_string),
            ctgroup: get(section, "ctgroup").map(str::to_string),
            linktolink: get_bool(section, "linktolink", true),
            propagate_dtmf: get_bool(section, "propagate_dtmf", false),
            propagate_phonedtmf: get_bool(section, "propagate_phonedtmf", false),

            erxgain: get_f32(section, "erxgain", 0.0),
            etxgain: get_f32(section, "etxgain", 0.0),
            trxgain: get_f32(section, "trxgain", 0.0),
            ttxgain: get_f32(section, "ttxgain", 0.0),
            linkmongain: get_f32(section, "linkmongain", 0.0),
            telemnomgain: get_f32(section, "telemnomgain", 0.0),
            telemduckgain: get_f32(section, "telemduckgain", -6.0),

            votertype: get(section, "votertype").map(str::to_string),
            votermode: get(section, "votermode").map(str::to_string),
            votermargin: get_f32(section, "votermargin", 2.0),

            sysstates,

            archivedir: get(section, "archivedir").map(str::to_string),
            archivedatefmt: get(section, "archivedatefmt").map(str::to_string),
            archiveformat: get(section, "archiveformat").map(str::to_string),
            monminblocks: get(section, "monminblocks").and_then(|v| v.parse().ok()),
            archiveaudio: get_bool(section, "archiveaudio", false),

            statpost_program: get(section, "statpost_program").map(str::to_string),
            statpost_url: get(section, "statpost_url").map(str::to_string),
            discpgm: get(section, "discpgm").map(str::to_string),
            connpgm: get(section, "connpgm").map(str::to_string),
        })
    }
}

/// One row of the `[nodes]` table: `nodenum = callsign,host,port[,codec]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub callsign: String,
    pub host: String,
    pub port: u16,
    pub codec: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NodesTable {
    pub entries: HashMap<String, NodeEntry>,
}

impl NodesTable {
    pub fn from_section(section: &HashMap<String, String>) -> NodesTable {
        let mut entries = HashMap::new();
        for (node_num, value) in section {
            let parts: Vec<&str> = value.split(',').map(str::trim).collect();
            if parts.len() < 3 {
                continue;
            }
            let port = parts[2].parse().unwrap_or(0);
            entries.insert(
                node_num.clone(),
                NodeEntry {
                    callsign: parts[0].to_string(),
                    host: parts[1].to_string(),
                    port,
                    codec: parts.get(3).map(|s| s.to_string()),
                },
            );
        }
        NodesTable { entries }
    }
}

/// A value in the `[telemetry]` table: either a sound file or a tone-spec string.
#[derive(Debug, Clone, Default)]
pub struct TelemetryTable {
    pub entries: HashMap<String, String>,
}

impl TelemetryTable {
    pub fn from_section(section: &HashMap<String, String>) -> TelemetryTable {
        TelemetryTable {
            entries: section.clone(),
        }
    }
}

/// `[morse]` section.
#[derive(Debug, Clone, Copy)]
pub struct MorseConfig {
    pub speed: u32,
    pub frequency: u32,
    pub amplitude: u32,
    pub idfrequency: u32,
    pub idamplitude: u32,
}

impl Default for MorseConfig {
    fn default() -> Self {
        MorseConfig {
            speed: 20,
            frequency: 800,
            amplitude: 50,
            idfrequency: 330,
            idamplitude: 50,
        }
    }
}

impl MorseConfig {
    pub fn from_section(section: &HashMap<String, String>) -> MorseConfig {
        let d = MorseConfig::default();
        MorseConfig {
            speed: get_u32(section, "speed", d.speed),
            frequency: get_u32(section, "frequency", d.frequency),
            amplitude: get_u32(section, "amplitude", d.amplitude),
            idfrequency: get_u32(section, "idfrequency", d.idfrequency),
            idamplitude: get_u32(section, "idamplitude", d.idamplitude),
        }
    }
}

/// One `[memory]` slot: `freq,offset,mode,power,plon,rxplon,txpl,rxpl`.
#[derive(Debug, Clone)]
pub struct MemorySlot {
    pub freq: String,
    pub offset: char,
    pub mode: String,
    pub power: String,
    pub plon: bool,
    pub rxplon: bool,
    pub txpl: String,
    pub rxpl: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub slots: HashMap<u32, MemorySlot>,
}

impl MemoryTable {
    pub fn from_section(section: &HashMap<String, String>) -> Result<MemoryTable> {
        let mut slots = HashMap::new();
        for (idx, value) in section {
            let idx: u32 = idx
                .parse()
                .map_err(|_| RptError::config("<memory>", format!("bad slot index {idx}")))?;
            let parts: Vec<&str> = value.split(',').map(str::trim).collect();
            if parts.len() < 8 {
                return Err(RptError::config(
                    "<memory>",
                    format!("slot {idx} needs 8 comma-separated fields"),
                ));
            }
            slots.insert(
                idx,
                MemorySlot {
                    freq: parts[0].to_string(),
                    offset: parts[1].chars().next().unwrap_or('S'),
                    mode: parts[2].to_string(),
                    power: parts[3].to_string(),
                    plon: parts[4] == "1",
                    rxplon: parts[5] == "1",
                    txpl: parts[6].to_string(),
                    rxpl: parts[7].to_string(),
                },
            );
        }
        Ok(MemoryTable { slots })
    }
}

/// Operator per-login-level TX-band permission ranges, in MHz.
#[derive(Debug, Clone, Default)]
pub struct TxLimits {
    /// login-level name -> list of (lo, hi) MHz ranges.
    pub levels: HashMap<String, Vec<(f64, f64)>>,
}

impl TxLimits {
    pub fn from_section(section: &HashMap<String, String>) -> Result<TxLimits> {
        let mut levels = HashMap::new();
        for (level, value) in section {
            let mut ranges = Vec::new();
            for range in value.split(',') {
                let range = range.trim();
                if range.is_empty() {
                    continue;
                }
                let (lo, hi) = range.split_once('-').ok_or_else(|| {
                    RptError::config("<txlimits>", format!("bad range '{range}' for {level}"))
                })?;
                let lo: f64 = lo
                    .parse()
                    .map_err(|_| RptError::config("<txlimits>", format!("bad lo in '{range}'")))?;
                let hi: f64 = hi
                    .parse()
                    .map_err(|_| RptError::config("<txlimits>", format!("bad hi in '{range}'")))?;
                ranges.push((lo, hi));
            }
            levels.insert(level.clone(), ranges);
        }
        Ok(TxLimits { levels })
    }

    /// Membership test: is `freq_mhz` permitted for `level`?
    pub fn permits(&self, level: &str, freq_mhz: f64) -> bool {
        match self.levels.get(level) {
            Some(ranges) => ranges.iter().any(|&(lo, hi)| freq_mhz >= lo && freq_mhz <= hi),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn node_section_requires_rxchannel() {
        let mut raw = RawSections::new();
        raw.insert("n1".to_string(), section(&[("txchannel", "Zap/1")]));
        let err = NodeSection::from_sections("n1", &raw).unwrap_err();
        assert!(matches!(err, RptError::Config { .. }));
    }

    #[test]
    fn node_section_defaults_txchannel_to_rxchannel() {
        let mut raw = RawSections::new();
        raw.insert("n1".to_string(), section(&[("rxchannel", "Zap/1")]));
        let n = NodeSection::from_sections("n1", &raw).unwrap();
        assert_eq!(n.txchannel, "Zap/1");
        assert_eq!(n.duplex, Duplex::HalfDuplex);
    }

    #[test]
    fn sysstate_row_parses_known_tokens() {
        let row = parse_sysstate_row("TXDIS,SLEEP,unknown_token");
        assert_eq!(row, vec![SysStateFlag::TxDisable, SysStateFlag::SleepEnable]);
    }

    #[test]
    fn nodes_table_parses_rows() {
        let sec = section(&[("31234", "CALL,10.0.0.1,44966,GSM")]);
        let table = NodesTable::from_section(&sec);
        let e = table.entries.get("31234").unwrap();
        assert_eq!(e.callsign, "CALL");
        assert_eq!(e.port, 44966);
        assert_eq!(e.codec.as_deref(), Some("GSM"));
    }

    #[test]
    fn txlimits_membership() {
        let sec = section(&[("base", "144.0-148.0,222.0-225.0")]);
        let limits = TxLimits::from_section(&sec).unwrap();
        assert!(limits.permits("base", 146.520));
        assert!(!limits.permits("base", 150.0));
    }
}
