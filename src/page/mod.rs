//! Slotted page view.
//!
//! A page buffer is laid out as
//!
//! ```text
//! | header (17) | offset table -> |   free   | <- node records |
//! 0             17                Lower      Upper             page_size
//! ```
//!
//! The offset table holds one little-endian `u16` per entry, in key order,
//! each pointing at the start of a node record. Records are allocated
//! downwards from the end of the page. [`Page`] never owns the buffer: it
//! borrows `&[u8]` for readers or `&mut [u8]` for the single writer and only
//! carries the last search result and a dirty flag.

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;

use crate::options::PageOptions;
use crate::size::{self, SizeRequest};
use slotpage_types::page::{self as layout, header, PageKind, NODE_OFFSET_LEN, PAGE_HEADER_LEN};
use slotpage_types::{PageError, PageId, Result};

mod mutate;
mod node;
mod search;
mod truncate;
mod validate;

pub use node::{InsertValue, Node, NodeValue};
pub use search::SearchResult;
pub use validate::{EntryDump, PageDump};

/// View over one fixed-size page buffer.
pub struct Page<B> {
    buf: B,
    kind: PageKind,
    last_match: Ordering,
    last_search_position: usize,
    dirty: bool,
    validate: Option<bool>,
}

impl<B: AsRef<[u8]>> Page<B> {
    /// Opens an existing page image, checking its header for consistency.
    pub fn open(buf: B) -> Result<Self> {
        let kind = check_header(buf.as_ref())?;
        Ok(Self::from_parts(buf, kind))
    }

    /// Opens an existing page image, enforcing the configured page size.
    pub fn open_with(buf: B, options: &PageOptions) -> Result<Self> {
        options.verify()?;
        if buf.as_ref().len() != options.page_size {
            return Err(PageError::Invalid("buffer length differs from configured page size"));
        }
        let mut page = Self::open(buf)?;
        page.validate = options.validate;
        Ok(page)
    }

    fn from_parts(buf: B, kind: PageKind) -> Self {
        Self {
            buf,
            kind,
            last_match: Ordering::Equal,
            last_search_position: 0,
            dirty: false,
            validate: None,
        }
    }

    /// Raw page bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Releases the view and hands the buffer back.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Page number stored in the header.
    pub fn page_number(&self) -> PageId {
        PageId(read_u64(self.as_bytes(), header::PAGE_NUMBER.start))
    }

    /// Page role.
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Returns `true` for leaf pages.
    pub fn is_leaf(&self) -> bool {
        self.kind == PageKind::Leaf
    }

    /// Returns `true` for branch pages.
    pub fn is_branch(&self) -> bool {
        self.kind == PageKind::Branch
    }

    /// Returns `true` for overflow pages.
    pub fn is_overflow(&self) -> bool {
        self.kind == PageKind::Overflow
    }

    /// End of the offset table.
    pub fn lower(&self) -> u16 {
        read_u16(self.as_bytes(), header::LOWER.start)
    }

    /// Start of the node region.
    pub fn upper(&self) -> u16 {
        read_u16(self.as_bytes(), header::UPPER.start)
    }

    /// Logical size of the value an overflow page starts.
    pub fn overflow_size(&self) -> usize {
        let raw = read_i32(self.as_bytes(), header::OVERFLOW_SIZE.start);
        usize::try_from(raw).unwrap_or(0)
    }

    /// Data area of an overflow page (everything after the header).
    pub fn overflow_data(&self) -> &[u8] {
        &self.as_bytes()[PAGE_HEADER_LEN..]
    }

    /// Buffer length.
    pub fn page_size(&self) -> usize {
        self.as_bytes().len()
    }

    /// Bytes usable for the offset table and records.
    pub fn max_space(&self) -> usize {
        size::max_space(self.page_size())
    }

    /// Largest record this page stores inline.
    pub fn node_max_size(&self) -> usize {
        size::node_max_size(self.page_size())
    }

    /// Number of entries in the offset table.
    pub fn number_of_entries(&self) -> usize {
        (self.lower() as usize - PAGE_HEADER_LEN) / NODE_OFFSET_LEN
    }

    /// Free bytes between the offset table and the node region.
    pub fn size_left(&self) -> usize {
        (self.upper() - self.lower()) as usize
    }

    /// Bytes taken by the offset table and the node region.
    pub fn size_used(&self) -> usize {
        self.lower() as usize + self.max_space() - self.upper() as usize
    }

    /// Returns `true` when more than `threshold` bytes are in use.
    pub fn uses_more_than(&self, threshold: usize) -> bool {
        self.size_used() > threshold
    }

    /// Recomputes [`Page::size_used`] by walking every record.
    pub fn calc_size_used(&self) -> Result<usize> {
        let mut used = 0;
        for idx in 0..self.number_of_entries() {
            used += size::node_entry_of(&self.node(idx)?) + NODE_OFFSET_LEN;
        }
        Ok(used)
    }

    /// Recomputes [`Page::size_left`] by walking every record.
    pub fn calc_size_left(&self) -> Result<usize> {
        self.max_space()
            .checked_sub(self.calc_size_used()?)
            .ok_or(PageError::Corruption("records overlap or exceed the page"))
    }

    /// Whether a mutation touched the page since the view was created.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Comparator result of the last search (search key against stored key).
    pub fn last_match(&self) -> Ordering {
        self.last_match
    }

    /// Position produced by the last search.
    pub fn last_search_position(&self) -> usize {
        self.last_search_position
    }

    /// Last search position, clamped to the final entry.
    pub fn last_search_position_or_last_entry(&self) -> usize {
        let entries = self.number_of_entries();
        if self.last_search_position >= entries {
            entries.saturating_sub(1)
        } else {
            self.last_search_position
        }
    }

    /// Record offset stored in slot `index`.
    pub fn offset_at(&self, index: usize) -> Result<u16> {
        let entries = self.number_of_entries();
        if index >= entries {
            return Err(PageError::IndexOutOfRange {
                page: self.page_number(),
                index,
                entries,
            });
        }
        Ok(read_u16(
            self.as_bytes(),
            PAGE_HEADER_LEN + index * NODE_OFFSET_LEN,
        ))
    }

    /// Record referenced by slot `index`.
    pub fn node(&self, index: usize) -> Result<Node<'_>> {
        let offset = self.offset_at(index)? as usize;
        if offset < self.upper() as usize {
            return Err(PageError::Corruption("node offset below upper bound"));
        }
        Node::decode(self.as_bytes(), offset)
    }

    /// Key of the record in slot `index`.
    pub fn node_key(&self, index: usize) -> Result<&[u8]> {
        Ok(self.node(index)?.key())
    }

    /// Iterates the records in key order.
    pub fn nodes(&self) -> impl Iterator<Item = Result<Node<'_>>> + '_ {
        (0..self.number_of_entries()).map(move |idx| self.node(idx))
    }

    /// Copies out every key in order.
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        self.nodes()
            .map(|node| node.map(|n| n.key().to_vec()))
            .collect()
    }

    /// Bytes a new record needs, offset slot included.
    pub fn required_space(&self, key: &[u8], request: SizeRequest) -> usize {
        size::required_space(self.node_max_size(), key.len(), request)
    }

    /// Returns `true` when a record for `key` and `request` fits.
    pub fn has_space_for(&self, key: &[u8], request: SizeRequest) -> bool {
        self.required_space(key, request) <= self.size_left()
    }

    /// Fails with [`PageError::PageFull`] when a record for `key` does not fit.
    pub fn ensure_has_space_for(&self, key: &[u8], request: SizeRequest) -> Result<()> {
        let required = self.required_space(key, request);
        self.ensure_space(required)
    }

    fn ensure_space(&self, required: usize) -> Result<()> {
        let available = self.size_left();
        if required > available {
            let page = self.page_number();
            tracing::error!(
                target: "slotpage::page",
                page = page.0,
                required,
                available,
                "page full"
            );
            return Err(PageError::PageFull {
                page,
                required,
                available,
            });
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Page<B> {
    /// Formats `buf` as an empty leaf or branch page.
    pub fn init(mut buf: B, page: PageId, kind: PageKind) -> Result<Self> {
        if kind == PageKind::Overflow {
            return Err(PageError::Invalid("overflow pages are created with init_overflow"));
        }
        let page_size = buf.as_ref().len();
        write_header(buf.as_mut(), page, kind, page_size, 0)?;
        let mut view = Self::from_parts(buf, kind);
        view.dirty = true;
        Ok(view)
    }

    /// Formats `buf` using the configured page size and validation toggle.
    pub fn init_with(buf: B, page: PageId, kind: PageKind, options: &PageOptions) -> Result<Self> {
        options.verify()?;
        if buf.as_ref().len() != options.page_size {
            return Err(PageError::Invalid("buffer length differs from configured page size"));
        }
        let mut view = Self::init(buf, page, kind)?;
        view.validate = options.validate;
        Ok(view)
    }

    /// Formats `buf` as the first page of an overflow chain for `value_len` bytes.
    pub fn init_overflow(mut buf: B, page: PageId, value_len: usize) -> Result<Self> {
        let overflow = i32::try_from(value_len)
            .map_err(|_| PageError::Invalid("overflow value exceeds i32::MAX"))?;
        write_header(
            buf.as_mut(),
            page,
            PageKind::Overflow,
            PAGE_HEADER_LEN,
            overflow,
        )?;
        let mut view = Self::from_parts(buf, PageKind::Overflow);
        view.dirty = true;
        Ok(view)
    }

    /// Mutable data area of an overflow page.
    pub fn overflow_data_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.bytes_mut()[PAGE_HEADER_LEN..]
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    pub(crate) fn set_lower(&mut self, value: u16) {
        write_u16(self.bytes_mut(), header::LOWER.start, value);
    }

    pub(crate) fn set_upper(&mut self, value: u16) {
        write_u16(self.bytes_mut(), header::UPPER.start, value);
    }

    pub(crate) fn set_offset(&mut self, index: usize, offset: u16) {
        write_u16(
            self.bytes_mut(),
            PAGE_HEADER_LEN + index * NODE_OFFSET_LEN,
            offset,
        );
    }
}

impl<B: AsRef<[u8]>> fmt::Display for Page<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} (count: {}) {:?}",
            self.page_number(),
            self.number_of_entries(),
            self.kind
        )
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for Page<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page", &self.page_number())
            .field("kind", &self.kind)
            .field("lower", &self.lower())
            .field("upper", &self.upper())
            .field("entries", &self.number_of_entries())
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn check_header(buf: &[u8]) -> Result<PageKind> {
    if !layout::is_valid_page_size(buf.len()) {
        return Err(PageError::Corruption("page buffer has an unsupported size"));
    }
    let kind = PageKind::try_from(buf[header::FLAGS])?;
    let lower = read_u16(buf, header::LOWER.start) as usize;
    let upper = read_u16(buf, header::UPPER.start) as usize;
    if lower < PAGE_HEADER_LEN {
        return Err(PageError::Corruption("page lower bound inside header"));
    }
    if lower > upper {
        return Err(PageError::Corruption("page lower bound beyond upper bound"));
    }
    if upper > buf.len() {
        return Err(PageError::Corruption("page upper bound beyond page end"));
    }
    if (lower - PAGE_HEADER_LEN) % NODE_OFFSET_LEN != 0 {
        return Err(PageError::Corruption("offset table has a partial slot"));
    }
    if kind == PageKind::Overflow && read_i32(buf, header::OVERFLOW_SIZE.start) < 0 {
        return Err(PageError::Corruption("negative overflow size"));
    }
    Ok(kind)
}

fn write_header(
    buf: &mut [u8],
    page: PageId,
    kind: PageKind,
    upper: usize,
    overflow_size: i32,
) -> Result<()> {
    if !layout::is_valid_page_size(buf.len()) {
        return Err(PageError::Invalid("page buffer has an unsupported size"));
    }
    let upper =
        u16::try_from(upper).map_err(|_| PageError::Invalid("page upper bound exceeds u16"))?;
    buf.fill(0);
    buf[header::PAGE_NUMBER].copy_from_slice(&page.0.to_le_bytes());
    buf[header::FLAGS] = kind.as_u8();
    write_u16(buf, header::LOWER.start, PAGE_HEADER_LEN as u16);
    write_u16(buf, header::UPPER.start, upper);
    buf[header::OVERFLOW_SIZE].copy_from_slice(&overflow_size.to_le_bytes());
    Ok(())
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
