//! Transaction-scoped scratch pages.
//!
//! Compaction rebuilds a page in a scratch buffer of the same size before
//! copying it back. The pool keeps a few zeroed buffers around so repeated
//! truncates inside one transaction do not allocate; a lease is returned to
//! the pool when it is dropped.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use crate::options::PageOptions;
use slotpage_types::page::is_valid_page_size;
use slotpage_types::{PageError, Result};

/// Pool of page-sized scratch buffers.
pub struct ScratchPool {
    page_size: usize,
    max_cached: usize,
    free: Mutex<Vec<Box<[u8]>>>,
}

impl ScratchPool {
    /// Creates a pool for `page_size` buffers that caches at most `max_cached` of them.
    pub fn new(page_size: usize, max_cached: usize) -> Result<Self> {
        if !is_valid_page_size(page_size) {
            return Err(PageError::Invalid("scratch page size unsupported"));
        }
        Ok(Self {
            page_size,
            max_cached,
            free: Mutex::new(Vec::new()),
        })
    }

    /// Creates a pool matching `options`.
    pub fn from_options(options: &PageOptions) -> Result<Self> {
        options.verify()?;
        Self::new(options.page_size, options.scratch_pages)
    }

    /// Size of every buffer handed out.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of idle buffers currently cached.
    pub fn cached(&self) -> usize {
        self.free.lock().len()
    }

    /// Hands out a zeroed scratch page.
    pub fn lease(&self) -> ScratchLease<'_> {
        let buf = match self.free.lock().pop() {
            Some(mut buf) => {
                buf.fill(0);
                buf
            }
            None => vec![0u8; self.page_size].into_boxed_slice(),
        };
        ScratchLease { pool: self, buf }
    }

    fn release(&self, buf: Box<[u8]>) {
        let mut free = self.free.lock();
        if free.len() < self.max_cached {
            free.push(buf);
        }
    }
}

/// Scratch page borrowed from a [`ScratchPool`].
pub struct ScratchLease<'a> {
    pool: &'a ScratchPool,
    buf: Box<[u8]>,
}

impl Deref for ScratchLease<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for ScratchLease<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for ScratchLease<'_> {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        if buf.len() == self.pool.page_size {
            self.pool.release(buf);
        }
    }
}
