//! Byte-cost accounting for node records.
//!
//! Every record is charged `NODE_HEADER_LEN + key + payload`, padded to an
//! even length. A payload that would push a record past the node limit is
//! redirected to an overflow chain, in which case only the header and key are
//! stored on the page.

use crate::page::{Node, NodeValue};
use slotpage_types::page::{NODE_HEADER_LEN, NODE_OFFSET_LEN, PAGE_HEADER_LEN};

/// What a prospective record stores next to its key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeRequest {
    /// Inline payload of the given length (subject to overflow redirect).
    Data(usize),
    /// Page reference (branch child or overflow head).
    PageRef,
}

/// Bytes available for the offset table and records.
pub fn max_space(page_size: usize) -> usize {
    page_size.saturating_sub(PAGE_HEADER_LEN)
}

/// Largest record a page accepts inline; two of them plus their offset slots always fit.
pub fn node_max_size(page_size: usize) -> usize {
    (max_space(page_size) / 2).saturating_sub(NODE_OFFSET_LEN) & !1
}

/// Longest key that still leaves room for a record header.
pub fn max_key_size(page_size: usize) -> usize {
    node_max_size(page_size).saturating_sub(NODE_HEADER_LEN)
}

/// Returns `true` when a `len`-byte value under `key_len` must live in overflow pages.
pub fn requires_overflow(node_max_size: usize, key_len: usize, len: usize) -> bool {
    NODE_HEADER_LEN + key_len + len > node_max_size
}

/// Exact on-page cost of a new record, excluding its offset slot.
pub fn node_entry(node_max_size: usize, key_len: usize, request: SizeRequest) -> usize {
    let mut size = NODE_HEADER_LEN + key_len;
    if let SizeRequest::Data(len) = request {
        if !requires_overflow(node_max_size, key_len, len) {
            size += len;
        }
    }
    align(size)
}

/// Cost of a new record plus the offset slot that points at it.
pub fn required_space(node_max_size: usize, key_len: usize, request: SizeRequest) -> usize {
    node_entry(node_max_size, key_len, request) + NODE_OFFSET_LEN
}

/// Cost of an existing record.
pub fn node_entry_of(node: &Node<'_>) -> usize {
    node_entry_with_key(node, node.key().len())
}

/// Cost of `node` once re-keyed to a `key_len`-byte key.
pub fn node_entry_with_key(node: &Node<'_>, key_len: usize) -> usize {
    let payload = match node.value() {
        NodeValue::Data(data) => data.len(),
        NodeValue::PageRef(_) => 0,
    };
    align(NODE_HEADER_LEN + key_len + payload)
}

/// Number of overflow pages needed for a `len`-byte value.
///
/// Each chain starts with one page header; the data runs on contiguously.
pub fn overflow_pages(page_size: usize, len: usize) -> usize {
    let total = len + PAGE_HEADER_LEN;
    (total + page_size - 1) / page_size
}

fn align(size: usize) -> usize {
    size + (size & 1)
}
