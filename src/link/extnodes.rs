//! External node file (§6.3 `/var/lib/asterisk/rpt_extnodes`): one line per
//! node, `nodenum,callsign,host,port[,codec]` — the same row shape as the
//! `[nodes]` config section, but flattened to plain CSV lines instead of
//! INI key/value pairs, since it's refreshed wholesale by an external tool
//! rather than hand-edited.

use std::collections::HashMap;

use crate::config::NodeEntry;
use crate::error::{RptError, Result};

#[derive(Debug, Clone, Default)]
pub struct ExtNodesTable {
    pub entries: HashMap<String, NodeEntry>,
}

impl ExtNodesTable {
    /// Parse the whole file contents at once; a malformed line is skipped
    /// rather than aborting the load, since the file is machine-generated
    /// and may be read mid-rewrite by an external refresh job.
    pub fn parse(contents: &str) -> ExtNodesTable {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some((node_num, entry)) = parse_line(line) {
                entries.insert(node_num, entry);
            }
        }
        ExtNodesTable { entries }
    }

    pub fn get(&self, node_num: &str) -> Option<&NodeEntry> {
        self.entries.get(node_num)
    }
}

fn parse_line(line: &str) -> Option<(String, NodeEntry)> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return None;
    }
    let port: u16 = parts[3].parse().ok()?;
    Some((
        parts[0].to_string(),
        NodeEntry {
            callsign: parts[1].to_string(),
            host: parts[2].to_string(),
            port,
            codec: parts.get(4).map(|s| s.to_string()),
        },
    ))
}

/// Validate a single row before accepting it into a reload, surfacing the
/// same error class a `[nodes]` config section parse error would.
pub fn validate_row(line: &str) -> Result<NodeEntry> {
    parse_line(line)
        .map(|(_, entry)| entry)
        .ok_or_else(|| RptError::config("<extnodes>", format!("malformed row '{line}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_rows() {
        let table = ExtNodesTable::parse("1999,W1AW,repeater.example.org,4569\n2000,K1ABC,10.0.0.5,4569,ulaw\n");
        assert_eq!(table.entries.len(), 2);
        let e = table.get("1999").unwrap();
        assert_eq!(e.callsign, "W1AW");
        assert_eq!(e.port, 4569);
        assert_eq!(e.codec, None);
        assert_eq!(table.get("2000").unwrap().codec.as_deref(), Some("ulaw"));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let table = ExtNodesTable::parse("; comment\n\n1999,W1AW,host,4569\n");
        assert_eq!(table.entries.len(), 1);
    }

    #[test]
    fn skips_malformed_rows() {
        let table = ExtNodesTable::parse("bad,row\n1999,W1AW,host,4569\n");
        assert_eq!(table.entries.len(), 1);
    }

    #[test]
    fn validate_row_rejects_malformed() {
        assert!(validate_row("bad,row").is_err());
        assert!(validate_row("1999,W1AW,host,4569").is_ok());
    }
}
