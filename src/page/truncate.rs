use super::Page;
use crate::scratch::ScratchPool;
use slotpage_types::page::PAGE_HEADER_LEN;
use slotpage_types::{PageError, Result};

impl<B: AsRef<[u8]> + AsMut<[u8]>> Page<B> {
    /// Keeps the first `keep` entries and drops the rest.
    ///
    /// The survivors are re-appended into a scratch page and copied back, so
    /// the record region comes out contiguous. A no-op when `keep` is at least
    /// the current entry count.
    pub fn truncate(&mut self, keep: usize, scratch: &ScratchPool) -> Result<()> {
        if keep >= self.number_of_entries() {
            return Ok(());
        }
        self.rebuild_prefix(keep, scratch)
    }

    /// Rewrites all entries contiguously, reclaiming fragmented space.
    pub fn compact(&mut self, scratch: &ScratchPool) -> Result<()> {
        let entries = self.number_of_entries();
        self.rebuild_prefix(entries, scratch)
    }

    fn rebuild_prefix(&mut self, keep: usize, scratch: &ScratchPool) -> Result<()> {
        if scratch.page_size() != self.page_size() {
            return Err(PageError::Invalid("scratch page size differs from page size"));
        }
        let page = self.page_number();
        let entries = self.number_of_entries();
        let mut lease = scratch.lease();
        let (lower, upper) = {
            let mut copy = Page::init(&mut lease[..], page, self.kind())?;
            for idx in 0..keep {
                copy.copy_node_to_end(&self.node(idx)?)?;
            }
            (copy.lower(), copy.upper())
        };
        self.bytes_mut()[PAGE_HEADER_LEN..].copy_from_slice(&lease[PAGE_HEADER_LEN..]);
        self.set_lower(lower);
        self.set_upper(upper);
        if self.last_search_position > keep {
            self.last_search_position = keep;
        }
        self.dirty = true;
        tracing::debug!(
            target: "slotpage::page",
            page = page.0,
            kept = keep,
            dropped = entries - keep,
            size_left = self.size_left(),
            "rebuilt page"
        );
        Ok(())
    }
}
