//! Node record codec.
//!
//! ```text
//! [key_size:u16][kind:u8][data_size:i32 | page_number:i64][key][payload]
//! ```
//!
//! The 8-byte slot after the kind byte is interpreted by the kind alone; a
//! data record only uses its first four bytes.

use std::convert::TryFrom;

use crate::size::SizeRequest;
use slotpage_types::page::{node, NodeKind, NODE_HEADER_LEN};
use slotpage_types::{PageError, PageId, Result};

/// Value half of a record about to be written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertValue {
    /// Inline payload of the given length, filled in by the caller.
    Data(usize),
    /// Reference to a child page or an overflow chain head.
    PageRef(PageId),
}

impl InsertValue {
    /// The sizing request matching this value.
    pub fn size_request(self) -> SizeRequest {
        match self {
            InsertValue::Data(len) => SizeRequest::Data(len),
            InsertValue::PageRef(_) => SizeRequest::PageRef,
        }
    }

    /// Node kind written for this value.
    pub fn kind(self) -> NodeKind {
        match self {
            InsertValue::Data(_) => NodeKind::Data,
            InsertValue::PageRef(_) => NodeKind::PageRef,
        }
    }
}

/// Decoded value half of a stored record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeValue<'a> {
    /// Inline payload bytes.
    Data(&'a [u8]),
    /// Referenced page number.
    PageRef(PageId),
}

/// Borrowed view of one record stored on a page.
#[derive(Clone, Copy, Debug)]
pub struct Node<'a> {
    offset: usize,
    key: &'a [u8],
    value: NodeValue<'a>,
}

impl<'a> Node<'a> {
    /// Decodes the record starting at `offset` in `page`.
    pub fn decode(page: &'a [u8], offset: usize) -> Result<Self> {
        let header_end = offset
            .checked_add(NODE_HEADER_LEN)
            .ok_or(PageError::Corruption("node offset overflow"))?;
        if header_end > page.len() {
            return Err(PageError::Corruption("node header beyond page end"));
        }
        let rec = &page[offset..];
        let key_len = u16::from_le_bytes([rec[node::KEY_SIZE.start], rec[node::KEY_SIZE.start + 1]])
            as usize;
        let kind = NodeKind::try_from(rec[node::KIND])?;
        let key_end = node::KEY + key_len;
        if key_end > rec.len() {
            return Err(PageError::Corruption("node key beyond page end"));
        }
        let key = &rec[node::KEY..key_end];
        let value = match kind {
            NodeKind::Data => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&rec[node::DATA_SIZE]);
                let len = usize::try_from(i32::from_le_bytes(raw))
                    .map_err(|_| PageError::Corruption("negative node data size"))?;
                let data_end = key_end
                    .checked_add(len)
                    .ok_or(PageError::Corruption("node data size overflow"))?;
                if data_end > rec.len() {
                    return Err(PageError::Corruption("node data beyond page end"));
                }
                NodeValue::Data(&rec[key_end..data_end])
            }
            NodeKind::PageRef => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&rec[node::PAGE_NUMBER]);
                NodeValue::PageRef(PageId(i64::from_le_bytes(raw) as u64))
            }
        };
        Ok(Self { offset, key, value })
    }

    /// Absolute offset of the record within its page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Key bytes.
    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    /// Stored record kind.
    pub fn kind(&self) -> NodeKind {
        match self.value {
            NodeValue::Data(_) => NodeKind::Data,
            NodeValue::PageRef(_) => NodeKind::PageRef,
        }
    }

    /// Decoded value.
    pub fn value(&self) -> NodeValue<'a> {
        self.value
    }

    /// Inline payload, if this is a data record.
    pub fn data(&self) -> Option<&'a [u8]> {
        match self.value {
            NodeValue::Data(data) => Some(data),
            NodeValue::PageRef(_) => None,
        }
    }

    /// Referenced page, if this is a page reference.
    pub fn page_ref(&self) -> Option<PageId> {
        match self.value {
            NodeValue::PageRef(page) => Some(page),
            NodeValue::Data(_) => None,
        }
    }
}

/// Writes a record header and key into `dst`, which spans the whole record.
///
/// Payload and padding bytes are zeroed; the caller copies payload in later.
pub(crate) fn encode(dst: &mut [u8], key: &[u8], value: InsertValue) -> Result<()> {
    let key_len =
        u16::try_from(key.len()).map_err(|_| PageError::Invalid("key longer than u16::MAX"))?;
    let payload_len = match value {
        InsertValue::Data(len) => len,
        InsertValue::PageRef(_) => 0,
    };
    if NODE_HEADER_LEN + key.len() + payload_len > dst.len() {
        return Err(PageError::Invalid("node record larger than its allocation"));
    }
    dst.fill(0);
    dst[node::KEY_SIZE].copy_from_slice(&key_len.to_le_bytes());
    dst[node::KIND] = value.kind().as_u8();
    match value {
        InsertValue::Data(len) => {
            let len = i32::try_from(len)
                .map_err(|_| PageError::Invalid("node data size exceeds i32::MAX"))?;
            dst[node::DATA_SIZE].copy_from_slice(&len.to_le_bytes());
        }
        InsertValue::PageRef(page) => {
            dst[node::PAGE_NUMBER].copy_from_slice(&(page.0 as i64).to_le_bytes());
        }
    }
    dst[node::KEY..node::KEY + key.len()].copy_from_slice(key);
    Ok(())
}
