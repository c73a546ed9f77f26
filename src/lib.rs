//! Slotted page engine for a copy-on-write B+Tree.
//!
//! A [`Page`] is a view over one fixed-size buffer holding a header, a sorted
//! table of record offsets growing upwards, and node records growing
//! downwards from the end of the page. The tree layer above supplies the key
//! ordering through [`KeyOrder`]; it also owns page allocation, overflow
//! chains and splitting. This crate only keeps a single page consistent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compare;
pub mod options;
pub mod page;
pub mod scratch;
pub mod size;

pub use compare::{KeyOrder, Lexicographic, SearchKey};
pub use options::PageOptions;
pub use page::{EntryDump, InsertValue, Node, NodeValue, Page, PageDump, SearchResult};
pub use scratch::{ScratchLease, ScratchPool};
pub use size::SizeRequest;
pub use slotpage_types::page::{
    NodeKind, PageKind, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, NODE_HEADER_LEN,
    NODE_OFFSET_LEN, PAGE_HEADER_LEN,
};
pub use slotpage_types::{ErrorCategory, PageError, PageId, Result};
