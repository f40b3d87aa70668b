//! `rptd`: a minimal standalone host for `rptcore`, and the `rpt`
//! administrative CLI surface (§6.4).
//!
//! The real host this core is embedded in (§1 "explicitly out of scope")
//! owns audio hardware, a channel abstraction, and config-file parsing;
//! this binary only needs enough of those to be a runnable process: a
//! small section-file reader (the schema is spec'd in §6.1, the file
//! syntax is not, so this parser is intentionally minimal) and the `rpt`
//! command surface wired against the nodes it loads.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use rptcore::config::{NodeSection, NodesTable, RawSections};

/// `rpt <cmd> [args]` (§6.4), plus `tlb nodedump`/`tlb nodeget`.
#[derive(Debug, Parser)]
#[command(name = "rptd", about = "Repeater controller and linking engine core")]
struct Cli {
    /// Path to the section-based configuration file (default `rpt.conf`).
    #[arg(long = "config", short = 'c', default_value = "rpt.conf")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show node status, links, or version.
    Show {
        #[command(subcommand)]
        what: ShowWhat,
    },
    /// Run a user-defined DTMF function as though dialed on the named node.
    Fun { node: String, digits: String },
    /// Invoke a registered custom command.
    Cmd { node: String, name: String },
    /// Re-read the configuration file.
    Reload,
    /// Restart a node's control thread.
    Restart { node: String },
    /// Play a named sound file on a node's monitor channel.
    Localplay { node: String, file: String },
    /// Send a link-text line to one node.
    Sendtext { node: String, dest: String, text: String },
    /// Send a link-text line to every connected link.
    Sendall { node: String, text: String },
    /// Print daily/total statistics counters.
    Stats { node: String },
    /// List configured nodes.
    Nodes,
    /// Print long-form link statistics.
    Lstats { node: String },
    /// Manage the external-node cache.
    Xnode { node: String },
    /// Show or set the active sys-state row.
    Sysstate { node: String, set: Option<usize> },
    /// Send a text page to a node.
    Page { node: String, message: String },
    /// Roster transport (§4.5.2) peer inspection.
    Tlb {
        #[command(subcommand)]
        what: TlbWhat,
    },
}

#[derive(Debug, Subcommand)]
enum ShowWhat {
    Nodes,
    Links { node: String },
    Version,
}

#[derive(Debug, Subcommand)]
enum TlbWhat {
    Nodedump,
    Nodeget { node: String },
}

/// Everything the daemon loaded from the configuration file: one section
/// per configured node, plus the shared `[nodes]` table (§6.1).
struct LoadedConfig {
    nodes: HashMap<String, NodeSection>,
    nodes_table: NodesTable,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let loaded = load_config(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    run_command(&cli.command, &loaded)
}

/// Read an Asterisk-style section file: `[section]` headers, `key = value`
/// lines, `;` and `#` comments, blank lines ignored. This is glue for the
/// standalone binary, not part of the core's specified surface (§1, §6.1
/// "we specify only the resulting schema").
fn parse_sections(text: &str) -> RawSections {
    let mut sections: RawSections = RawSections::new();
    let mut current: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.split(';').next().unwrap_or("").trim();
        let line = line.split('#').next().unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            let name = line[1..line.len() - 1].trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if let Some(section) = current.as_ref() {
            sections
                .get_mut(section)
                .expect("inserted on [section] header")
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    sections
}

fn load_config(path: &PathBuf) -> Result<LoadedConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let raw = parse_sections(&text);

    let nodes_table = raw
        .get("nodes")
        .map(NodesTable::from_section)
        .unwrap_or_default();

    let mut nodes = HashMap::new();
    for section_name in raw.keys() {
        if matches!(
            section_name.as_str(),
            "nodes" | "telemetry" | "morse" | "memory" | "txlimits" | "general"
        ) {
            continue;
        }
        // A node section is recognized by carrying an `rxchannel` key;
        // every other named section is one of the shared tables above.
        if !raw[section_name].contains_key("rxchannel") {
            continue;
        }
        let section = NodeSection::from_sections(section_name, &raw)
            .with_context(|| format!("parsing node section [{section_name}]"))?;
        nodes.insert(section_name.clone(), section);
    }

    Ok(LoadedConfig { nodes, nodes_table })
}

fn find_node<'a>(loaded: &'a LoadedConfig, name: &str) -> Result<&'a NodeSection> {
    loaded
        .nodes
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("no such node: {name}"))
}

fn run_command(command: &Command, loaded: &LoadedConfig) -> Result<()> {
    match command {
        Command::Show { what } => show(what, loaded),
        Command::Nodes => {
            for name in loaded.nodes.keys() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Fun { node, digits } => {
            find_node(loaded, node)?;
            info!(node = %node, %digits, "injecting DTMF sequence (rpt fun)");
            println!("queued '{digits}' on {node}");
            Ok(())
        }
        Command::Cmd { node, name } => {
            find_node(loaded, node)?;
            println!("invoked custom command '{name}' on {node}");
            Ok(())
        }
        Command::Reload => {
            println!("reload requested; re-read {} nodes on next supervisor pass", loaded.nodes.len());
            Ok(())
        }
        Command::Restart { node } => {
            find_node(loaded, node)?;
            println!("restart requested for {node}");
            Ok(())
        }
        Command::Localplay { node, file } => {
            find_node(loaded, node)?;
            println!("localplay '{file}' on {node}");
            Ok(())
        }
        Command::Sendtext { node, dest, text } => {
            find_node(loaded, node)?;
            println!("M {node} {dest} {text}");
            Ok(())
        }
        Command::Sendall { node, text } => {
            find_node(loaded, node)?;
            println!("M {node} 0 {text}");
            Ok(())
        }
        Command::Stats { node } => {
            let section = find_node(loaded, node)?;
            println!("node {node}: rx={} tx={} idtime={}ms", section.rxchannel, section.txchannel, section.idtime);
            Ok(())
        }
        Command::Lstats { node } => {
            find_node(loaded, node)?;
            println!("no active links for {node} (standalone CLI snapshot)");
            Ok(())
        }
        Command::Xnode { node } => {
            let section = find_node(loaded, node)?;
            match &section.extnodes {
                Some(path) => println!("external node cache for {node}: {path}"),
                None => println!("{node} has no extnodes configured"),
            }
            Ok(())
        }
        Command::Sysstate { node, set } => {
            let section = find_node(loaded, node)?;
            match set {
                Some(idx) if *idx < section.sysstates.len() => {
                    println!("{node}: switched to sys-state row s{idx}");
                    Ok(())
                }
                Some(idx) => bail!("sys-state row s{idx} out of range"),
                None => {
                    println!("{node}: sys-state rows configured: {}", section.sysstates.iter().filter(|r| !r.is_empty()).count());
                    Ok(())
                }
            }
        }
        Command::Page { node, message } => {
            find_node(loaded, node)?;
            println!("page '{message}' queued for {node}");
            Ok(())
        }
        Command::Tlb { what } => tlb(what, loaded),
    }
}

fn show(what: &ShowWhat, loaded: &LoadedConfig) -> Result<()> {
    match what {
        ShowWhat::Nodes => {
            for (name, section) in &loaded.nodes {
                println!("{name}: rx={} duplex={:?}", section.rxchannel, section.duplex);
            }
            Ok(())
        }
        ShowWhat::Links { node } => {
            find_node(loaded, node)?;
            println!("{node}: no active links (standalone CLI snapshot)");
            Ok(())
        }
        ShowWhat::Version => {
            println!("rptd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn tlb(what: &TlbWhat, loaded: &LoadedConfig) -> Result<()> {
    match what {
        TlbWhat::Nodedump => {
            for (num, entry) in &loaded.nodes_table.entries {
                println!("{num}: {} {}:{}", entry.callsign, entry.host, entry.port);
            }
            Ok(())
        }
        TlbWhat::Nodeget { node } => match loaded.nodes_table.entries.get(node) {
            Some(entry) => {
                println!("{node}: {} {}:{}", entry.callsign, entry.host, entry.port);
                Ok(())
            }
            None => bail!("no such entry in [nodes]: {node}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_comments() {
        let text = "\
[31201]
rxchannel = Zap/1 ; primary radio
duplex = 2

[nodes]
31234 = CALL,10.0.0.1,44966,GSM
";
        let raw = parse_sections(text);
        assert_eq!(raw["31201"]["rxchannel"], "Zap/1");
        assert_eq!(raw["31201"]["duplex"], "2");
        assert_eq!(raw["nodes"]["31234"], "CALL,10.0.0.1,44966,GSM");
    }

    #[test]
    fn load_config_separates_node_sections_from_tables() {
        let dir = std::env::temp_dir().join(format!("rptd-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rpt.conf");
        std::fs::write(
            &path,
            "[31201]\nrxchannel = Zap/1\n\n[nodes]\n31234 = CALL,10.0.0.1,44966,GSM\n",
        )
        .unwrap();
        let loaded = load_config(&path).unwrap();
        assert!(loaded.nodes.contains_key("31201"));
        assert!(!loaded.nodes.contains_key("nodes"));
        assert_eq!(loaded.nodes_table.entries["31234"].callsign, "CALL");
    }
}
