use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Write as _};

use serde::Serialize;

use super::{NodeValue, Page};
use crate::compare::KeyOrder;
use crate::size;
use slotpage_types::{PageError, PageId, Result};

/// Serializable snapshot of a page, used by the inspector and by failure logs.
#[derive(Clone, Debug, Serialize)]
pub struct PageDump {
    /// Page number from the header.
    pub page: u64,
    /// Page role.
    pub kind: &'static str,
    /// End of the offset table.
    pub lower: u16,
    /// Start of the node region.
    pub upper: u16,
    /// Free bytes.
    pub size_left: usize,
    /// Bytes in use.
    pub size_used: usize,
    /// Value length for overflow pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow_size: Option<usize>,
    /// Entries in table order.
    pub entries: Vec<EntryDump>,
}

/// One record of a [`PageDump`].
#[derive(Clone, Debug, Serialize)]
pub struct EntryDump {
    /// Slot index.
    pub index: usize,
    /// Record offset.
    pub offset: usize,
    /// Record kind.
    pub kind: &'static str,
    /// Key as lowercase hex.
    pub key_hex: String,
    /// Key with non-printable bytes escaped.
    pub key_text: String,
    /// Inline payload length for data records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_len: Option<usize>,
    /// Referenced page for page-reference records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<u64>,
    /// Padded record size, offset slot excluded.
    pub size: usize,
}

impl<B: AsRef<[u8]>> Page<B> {
    /// Returns `true` when [`Page::debug_validate`] will scan this page.
    ///
    /// An explicit [`crate::PageOptions::validate()`] wins; otherwise the scan
    /// follows `debug_assertions` and the `validate-pages` feature.
    pub fn validation_enabled(&self) -> bool {
        self.validate
            .unwrap_or(cfg!(debug_assertions) || cfg!(feature = "validate-pages"))
    }

    /// Full structural check: strict key order and unique child references.
    ///
    /// The key of index 0 on a branch page is never compared.
    pub fn validate<C>(&self, cmp: &C) -> Result<()>
    where
        C: KeyOrder + ?Sized,
    {
        let result = self.check_order(cmp).and_then(|_| self.check_page_refs());
        if let Err(err) = &result {
            let rendered = match self.dump() {
                Ok(dump) => dump.render(true),
                Err(dump_err) => format!("<page dump failed: {dump_err}>"),
            };
            tracing::error!(
                target: "slotpage::page",
                page = self.page_number().0,
                error = %err,
                "page validation failed\n{rendered}"
            );
        }
        result
    }

    /// Runs [`Page::validate`] only when validation is enabled.
    pub fn debug_validate<C>(&self, cmp: &C) -> Result<()>
    where
        C: KeyOrder + ?Sized,
    {
        if !self.validation_enabled() {
            return Ok(());
        }
        self.validate(cmp)
    }

    fn check_order<C>(&self, cmp: &C) -> Result<()>
    where
        C: KeyOrder + ?Sized,
    {
        let first = if self.is_branch() { 2 } else { 1 };
        for index in first..self.number_of_entries() {
            let prev = self.node_key(index - 1)?;
            let cur = self.node_key(index)?;
            if cmp.compare_keys(prev, cur) != Ordering::Less {
                return Err(PageError::Unsorted {
                    page: self.page_number(),
                    index,
                });
            }
        }
        Ok(())
    }

    fn check_page_refs(&self) -> Result<()> {
        let mut seen: HashSet<PageId> = HashSet::new();
        for node in self.nodes() {
            if let NodeValue::PageRef(child) = node?.value() {
                if !seen.insert(child) {
                    return Err(PageError::DuplicatePageRef {
                        page: self.page_number(),
                        child,
                    });
                }
            }
        }
        Ok(())
    }

    /// Snapshot of the header and every entry.
    pub fn dump(&self) -> Result<PageDump> {
        let mut entries = Vec::with_capacity(self.number_of_entries());
        for (index, node) in self.nodes().enumerate() {
            let node = node?;
            entries.push(EntryDump {
                index,
                offset: node.offset(),
                kind: node.kind().name(),
                key_hex: hex::encode(node.key()),
                key_text: node.key().escape_ascii().to_string(),
                data_len: node.data().map(<[u8]>::len),
                page_ref: node.page_ref().map(|page| page.0),
                size: size::node_entry_of(&node),
            });
        }
        Ok(PageDump {
            page: self.page_number().0,
            kind: self.kind().name(),
            lower: self.lower(),
            upper: self.upper(),
            size_left: self.size_left(),
            size_used: self.size_used(),
            overflow_size: self.is_overflow().then(|| self.overflow_size()),
            entries,
        })
    }
}

impl PageDump {
    /// Human-readable table; `hex_keys` adds a hex column.
    pub fn render(&self, hex_keys: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "page #{} {} lower={} upper={} used={} left={}",
            self.page, self.kind, self.lower, self.upper, self.size_used, self.size_left
        );
        if let Some(len) = self.overflow_size {
            let _ = writeln!(out, "  overflow value: {len} bytes");
        }
        for entry in &self.entries {
            let value = match (entry.data_len, entry.page_ref) {
                (_, Some(page)) => format!("-> #{page}"),
                (Some(len), None) => format!("{len} bytes"),
                (None, None) => String::from("-"),
            };
            let _ = write!(
                out,
                "  [{:>3}] @{:<5} {:<7} key=\"{}\" {value} size={}",
                entry.index,
                entry.offset,
                entry.kind,
                entry.key_text,
                entry.size
            );
            if hex_keys {
                let _ = write!(out, " hex={}", entry.key_hex);
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for PageDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}
