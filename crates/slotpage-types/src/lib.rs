#![forbid(unsafe_code)]

//! Shared identifiers, error taxonomy and on-disk constants for slotted pages.

use std::fmt;

/// Page number assigned by the pager.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    fn from(value: u64) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u64 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

/// Errors raised by page views.
///
/// Invariant and validation variants carry the page number plus the offending
/// index or reference so a failure can be traced back to the caller.
#[derive(thiserror::Error, Debug)]
pub enum PageError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("corruption: {0}")]
    Corruption(&'static str),
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    #[error("page {page} is full: entry needs {required} bytes, {available} left")]
    PageFull {
        page: PageId,
        required: usize,
        available: usize,
    },
    #[error("page {page}: index {index} out of range for {entries} entries")]
    IndexOutOfRange {
        page: PageId,
        index: usize,
        entries: usize,
    },
    #[error("branch page {page}: index 0 must be a page reference with an empty key")]
    BranchSentinelKey { page: PageId },
    #[error("branch page {page}: implicit left entry removed while {entries} entries remain")]
    BranchSentinelRemoval { page: PageId, entries: usize },
    #[error("page {page}: value of {len} bytes exceeds the {max} byte node limit")]
    ValueTooLarge { page: PageId, len: usize, max: usize },
    #[error("page {page} is not sorted at index {index}")]
    Unsorted { page: PageId, index: usize },
    #[error("page {page} references page {child} more than once")]
    DuplicatePageRef { page: PageId, child: PageId },
}

/// Coarse classification of a [`PageError`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Caller broke a page contract; the page was left untouched.
    Invariant,
    /// An explicit consistency scan found a malformed page.
    Validation,
    /// Buffer contents do not decode as a page.
    Corruption,
    /// Bad configuration or argument.
    Invalid,
    /// Reading or writing page images failed.
    Io,
}

impl PageError {
    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PageError::Io(_) => ErrorCategory::Io,
            PageError::Corruption(_) => ErrorCategory::Corruption,
            PageError::Invalid(_) => ErrorCategory::Invalid,
            PageError::PageFull { .. }
            | PageError::IndexOutOfRange { .. }
            | PageError::BranchSentinelKey { .. }
            | PageError::BranchSentinelRemoval { .. }
            | PageError::ValueTooLarge { .. } => ErrorCategory::Invariant,
            PageError::Unsorted { .. } | PageError::DuplicatePageRef { .. } => {
                ErrorCategory::Validation
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PageError>;

pub mod page {
    //! On-disk layout of slotted pages. All multi-byte fields are little-endian.

    use core::convert::TryFrom;

    use super::{PageError, Result};

    pub const DEFAULT_PAGE_SIZE: usize = 4096;
    pub const MIN_PAGE_SIZE: usize = 128;
    /// `Upper` is a u16, so the page end must stay representable.
    pub const MAX_PAGE_SIZE: usize = 32 * 1024;

    /// `PageNumber:i64 | Flags:u8 | Lower:u16 | Upper:u16 | OverflowSize:i32`
    pub const PAGE_HEADER_LEN: usize = 17;
    /// Width of one offset table slot.
    pub const NODE_OFFSET_LEN: usize = 2;
    /// `KeySize:u16 | Kind:u8 | DataSize:i32 / PageNumber:i64`
    pub const NODE_HEADER_LEN: usize = 11;

    pub mod header {
        //! Byte offsets for fixed page header fields.
        use core::ops::Range;

        pub const PAGE_NUMBER: Range<usize> = 0..8;
        pub const FLAGS: usize = 8;
        pub const LOWER: Range<usize> = 9..11;
        pub const UPPER: Range<usize> = 11..13;
        pub const OVERFLOW_SIZE: Range<usize> = 13..17;
    }

    pub mod node {
        //! Byte offsets inside a node record, relative to the record start.
        use core::ops::Range;

        pub const KEY_SIZE: Range<usize> = 0..2;
        pub const KIND: usize = 2;
        pub const DATA_SIZE: Range<usize> = 3..7;
        pub const PAGE_NUMBER: Range<usize> = 3..11;
        pub const KEY: usize = super::NODE_HEADER_LEN;
    }

    /// Page role stored in the header flags byte.
    #[repr(u8)]
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub enum PageKind {
        Leaf = 1,
        Branch = 2,
        Overflow = 4,
    }

    impl PageKind {
        pub const fn as_u8(self) -> u8 {
            self as u8
        }

        pub const fn name(self) -> &'static str {
            match self {
                PageKind::Leaf => "Leaf",
                PageKind::Branch => "Branch",
                PageKind::Overflow => "Overflow",
            }
        }
    }

    impl TryFrom<u8> for PageKind {
        type Error = PageError;

        fn try_from(value: u8) -> Result<Self> {
            match value {
                1 => Ok(PageKind::Leaf),
                2 => Ok(PageKind::Branch),
                4 => Ok(PageKind::Overflow),
                _ => Err(PageError::Corruption("unknown page flags")),
            }
        }
    }

    /// Record kind stored in a node header.
    #[repr(u8)]
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub enum NodeKind {
        Data = 1,
        PageRef = 2,
    }

    impl NodeKind {
        pub const fn as_u8(self) -> u8 {
            self as u8
        }

        pub const fn name(self) -> &'static str {
            match self {
                NodeKind::Data => "Data",
                NodeKind::PageRef => "PageRef",
            }
        }
    }

    impl TryFrom<u8> for NodeKind {
        type Error = PageError;

        fn try_from(value: u8) -> Result<Self> {
            match value {
                1 => Ok(NodeKind::Data),
                2 => Ok(NodeKind::PageRef),
                _ => Err(PageError::Corruption("unknown node kind")),
            }
        }
    }

    /// Returns `true` when `size` can back a page view.
    pub fn is_valid_page_size(size: usize) -> bool {
        size.is_power_of_two() && (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size)
    }
}
