use smallvec::SmallVec;

use super::node::{self, InsertValue, Node, NodeValue};
use super::Page;
use crate::size;
use slotpage_types::page::{NODE_HEADER_LEN, NODE_OFFSET_LEN, PAGE_HEADER_LEN};
use slotpage_types::{PageError, PageId, Result};

const INLINE_OFFSETS: usize = 64;

impl<B: AsRef<[u8]> + AsMut<[u8]>> Page<B> {
    /// Inserts a record for `key` at slot `index`, shifting later slots up.
    ///
    /// For [`InsertValue::Data`] the returned slice is the zeroed payload
    /// region for the caller to fill; page references return `None`. The
    /// caller is expected to have checked [`Page::has_space_for`]; a full
    /// page is reported as [`PageError::PageFull`] and nothing is written.
    pub fn insert(
        &mut self,
        index: usize,
        key: &[u8],
        value: InsertValue,
    ) -> Result<Option<&mut [u8]>> {
        let page = self.page_number();
        let entries = self.number_of_entries();
        if self.is_overflow() {
            return Err(PageError::Invalid("overflow pages hold no entries"));
        }
        if index > entries {
            tracing::error!(
                target: "slotpage::page",
                page = page.0,
                index,
                entries,
                "insert out of range"
            );
            return Err(PageError::IndexOutOfRange {
                page,
                index,
                entries,
            });
        }
        self.check_sentinel(index, key, value)?;
        let node_max = self.node_max_size();
        if key.len() > size::max_key_size(self.page_size()) {
            return Err(PageError::Invalid("key longer than the node size limit"));
        }
        if let InsertValue::Data(len) = value {
            if size::requires_overflow(node_max, key.len(), len) {
                return Err(PageError::ValueTooLarge {
                    page,
                    len,
                    max: node_max,
                });
            }
        }
        let node_size = size::node_entry(node_max, key.len(), value.size_request());
        self.ensure_space(node_size + NODE_OFFSET_LEN)?;

        let lower = self.lower() as usize;
        let slot = PAGE_HEADER_LEN + index * NODE_OFFSET_LEN;
        self.bytes_mut()
            .copy_within(slot..lower, slot + NODE_OFFSET_LEN);
        let offset = self.allocate(index, node_size);
        node::encode(
            &mut self.bytes_mut()[offset..offset + node_size],
            key,
            value,
        )?;
        self.dirty = true;
        tracing::trace!(
            target: "slotpage::page",
            page = page.0,
            index,
            node_size,
            kind = ?value.kind(),
            "inserted node"
        );

        match value {
            InsertValue::Data(len) => {
                let start = offset + NODE_HEADER_LEN + key.len();
                Ok(Some(&mut self.bytes_mut()[start..start + len]))
            }
            InsertValue::PageRef(_) => Ok(None),
        }
    }

    /// Inserts a data record and copies `data` into it.
    pub fn insert_data(&mut self, index: usize, key: &[u8], data: &[u8]) -> Result<()> {
        if let Some(slot) = self.insert(index, key, InsertValue::Data(data.len()))? {
            slot.copy_from_slice(data);
        }
        Ok(())
    }

    /// Inserts a page reference record.
    pub fn insert_page_ref(&mut self, index: usize, key: &[u8], child: PageId) -> Result<()> {
        self.insert(index, key, InsertValue::PageRef(child))?;
        Ok(())
    }

    /// Points the page reference in slot `index` at `child`.
    pub fn set_page_ref(&mut self, index: usize, child: PageId) -> Result<()> {
        let offset = {
            let node = self.node(index)?;
            if node.page_ref().is_none() {
                return Err(PageError::Invalid("entry is not a page reference"));
            }
            node.offset()
        };
        let start = offset + slotpage_types::page::node::PAGE_NUMBER.start;
        self.bytes_mut()[start..start + 8].copy_from_slice(&(child.0 as i64).to_le_bytes());
        self.dirty = true;
        Ok(())
    }

    /// Removes the record in slot `index` and closes the gap it leaves.
    ///
    /// The implicit entry of a branch page may only go when exactly two
    /// entries remain, i.e. while collapsing the page into its last child.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let page = self.page_number();
        let entries = self.number_of_entries();
        if index >= entries {
            tracing::error!(
                target: "slotpage::page",
                page = page.0,
                index,
                entries,
                "remove out of range"
            );
            return Err(PageError::IndexOutOfRange {
                page,
                index,
                entries,
            });
        }
        if self.is_branch() && index == 0 && entries != 2 {
            tracing::error!(
                target: "slotpage::page",
                page = page.0,
                entries,
                "implicit entry removal"
            );
            return Err(PageError::BranchSentinelRemoval { page, entries });
        }

        let (node_offset, removed) = {
            let node = self.node(index)?;
            (node.offset(), size::node_entry_of(&node))
        };
        let upper = self.upper() as usize;
        let lower = self.lower() as usize;

        let mut offsets: SmallVec<[u16; INLINE_OFFSETS]> = SmallVec::with_capacity(entries - 1);
        for idx in 0..entries {
            if idx == index {
                continue;
            }
            let offset = self.offset_at(idx)?;
            if (offset as usize) < node_offset {
                offsets.push(offset + removed as u16);
            } else {
                offsets.push(offset);
            }
        }
        for (idx, offset) in offsets.iter().enumerate() {
            self.set_offset(idx, *offset);
        }

        let bytes = self.bytes_mut();
        bytes.copy_within(upper..node_offset, upper + removed);
        bytes[upper..upper + removed].fill(0);
        bytes[lower - NODE_OFFSET_LEN..lower].fill(0);
        self.set_lower((lower - NODE_OFFSET_LEN) as u16);
        self.set_upper((upper + removed) as u16);
        self.dirty = true;
        tracing::trace!(
            target: "slotpage::page",
            page = page.0,
            index,
            removed,
            "removed node"
        );
        Ok(())
    }

    /// Appends a verbatim copy of `node` as the new last entry.
    ///
    /// Pages filled this way must receive records in ascending key order.
    pub fn copy_node_to_end(&mut self, node: &Node<'_>) -> Result<()> {
        self.append_node(node, node.key())
    }

    /// Appends a copy of `node` stored under `key` instead of its own key.
    pub fn copy_node_to_end_with_key(&mut self, node: &Node<'_>, key: &[u8]) -> Result<()> {
        self.append_node(node, key)
    }

    fn append_node(&mut self, node: &Node<'_>, key: &[u8]) -> Result<()> {
        let index = self.number_of_entries();
        let value = match node.value() {
            NodeValue::Data(data) => {
                if self.is_branch() {
                    return Err(PageError::Invalid("branch pages hold only page references"));
                }
                InsertValue::Data(data.len())
            }
            NodeValue::PageRef(child) => InsertValue::PageRef(child),
        };
        if self.is_overflow() {
            return Err(PageError::Invalid("overflow pages hold no entries"));
        }
        self.check_sentinel(index, key, value)?;
        let node_size = size::node_entry_with_key(node, key.len());
        if node_size > self.node_max_size() {
            return Err(PageError::ValueTooLarge {
                page: self.page_number(),
                len: node_size,
                max: self.node_max_size(),
            });
        }
        self.ensure_space(node_size + NODE_OFFSET_LEN)?;

        let offset = self.allocate(index, node_size);
        let record = &mut self.bytes_mut()[offset..offset + node_size];
        node::encode(record, key, value)?;
        if let NodeValue::Data(data) = node.value() {
            let start = NODE_HEADER_LEN + key.len();
            record[start..start + data.len()].copy_from_slice(data);
        }
        self.dirty = true;
        Ok(())
    }

    fn check_sentinel(&self, index: usize, key: &[u8], value: InsertValue) -> Result<()> {
        if self.is_branch() && index == 0 {
            let is_ref = matches!(value, InsertValue::PageRef(_));
            if !key.is_empty() || !is_ref {
                let page = self.page_number();
                tracing::error!(
                    target: "slotpage::page",
                    page = page.0,
                    "non-empty implicit entry"
                );
                return Err(PageError::BranchSentinelKey { page });
            }
        }
        Ok(())
    }

    /// Reserves `node_size` bytes below `Upper` and points slot `index` at them.
    fn allocate(&mut self, index: usize, node_size: usize) -> usize {
        let offset = self.upper() as usize - node_size;
        let lower = self.lower();
        self.set_offset(index, offset as u16);
        self.set_upper(offset as u16);
        self.set_lower(lower + NODE_OFFSET_LEN as u16);
        offset
    }
}
