//! `*2` / memory-recall command support (§4.6, §3 `MemoryTable`).

use crate::config::MemoryTable;
use crate::error::{RptError, Result};
use crate::remote::RemoteBase;

/// Recall memory slot `index` onto `base` (DTMF function `*2NN`).
pub fn set_mem(base: &RemoteBase, table: &MemoryTable, index: u32) -> Result<()> {
    let slot = table
        .slots
        .get(&index)
        .ok_or_else(|| RptError::config("<memory>", format!("no memory slot {index}")))?;
    base.recall_memory(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::rigs::rbi::RbiTransport;
    use crate::remote::serial::FakeSerial;
    use std::collections::HashMap;

    #[test]
    fn set_mem_rejects_unknown_slot() {
        let base = RemoteBase::from_tag("rpt1", "ft897", Box::new(FakeSerial::new()), 0x58, RbiTransport::ParallelPort).unwrap();
        let table = MemoryTable::default();
        assert!(set_mem(&base, &table, 1).is_err());
    }

    #[test]
    fn set_mem_recalls_known_slot() {
        let base = RemoteBase::from_tag("rpt1", "ft897", Box::new(FakeSerial::new()), 0x58, RbiTransport::ParallelPort).unwrap();
        let mut section = HashMap::new();
        section.insert("1".to_string(), "146.520,S,FM,high,0,0,no,no".to_string());
        let table = MemoryTable::from_section(&section).unwrap();
        assert!(set_mem(&base, &table, 1).is_ok());
    }
}
