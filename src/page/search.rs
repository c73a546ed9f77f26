use std::cmp::Ordering;

use super::{Node, NodeValue, Page};
use crate::compare::{KeyOrder, SearchKey};
use slotpage_types::{PageId, Result};

/// Outcome of [`Page::search`].
///
/// `ordering` compares the search key against the stored key at `position`
/// (`Greater` when the search key sorts after it). `Equal` is an exact hit;
/// anything else marks an insertion point. `node` is `None` when `position`
/// is past the last entry.
#[derive(Clone, Copy, Debug)]
pub struct SearchResult<'a> {
    /// Comparator result of the last comparison.
    pub ordering: Ordering,
    /// Lower-bound position.
    pub position: usize,
    /// Record at `position`, if any.
    pub node: Option<Node<'a>>,
}

impl SearchResult<'_> {
    /// Returns `true` for an exact key match.
    pub fn is_exact(&self) -> bool {
        self.ordering == Ordering::Equal && self.node.is_some()
    }
}

impl<B: AsRef<[u8]>> Page<B> {
    /// Lower-bound lookup of `key`.
    ///
    /// Branch pages skip the implicit entry at index 0 when comparing. On a
    /// branch page holding only that entry the search key is compared against
    /// an empty key instead, so any non-empty key lands past the end
    /// (`Greater`, position 1) and routes to the implicit child.
    pub fn search<C>(&mut self, key: SearchKey<'_>, cmp: &C) -> Result<SearchResult<'_>>
    where
        C: KeyOrder + ?Sized,
    {
        let entries = self.number_of_entries();
        if entries == 0 {
            self.record_search(Ordering::Greater, 0);
            return Ok(SearchResult {
                ordering: Ordering::Greater,
                position: 0,
                node: None,
            });
        }

        let (ordering, position) = match key {
            SearchKey::BeforeAll => (Ordering::Greater, 0),
            SearchKey::AfterAll => (Ordering::Less, entries - 1),
            SearchKey::Key(search) => {
                let (ordering, position) = self.lower_bound(search, cmp, entries)?;
                if ordering == Ordering::Greater {
                    (ordering, position + 1)
                } else {
                    (ordering, position)
                }
            }
        };
        self.record_search(ordering, position);

        let node = if position < entries {
            Some(self.node(position)?)
        } else {
            None
        };
        Ok(SearchResult {
            ordering,
            position,
            node,
        })
    }

    fn lower_bound<C>(&self, search: &[u8], cmp: &C, entries: usize) -> Result<(Ordering, usize)>
    where
        C: KeyOrder + ?Sized,
    {
        let mut low = if self.is_leaf() { 0 } else { 1 };
        let mut high = entries - 1;
        if low > high {
            // Only the implicit entry: weigh the key against its empty key.
            return Ok((cmp.compare_keys(search, &[]), 0));
        }
        let mut position = 0;
        let mut ordering = Ordering::Equal;
        while low <= high {
            position = (low + high) >> 1;
            ordering = cmp.compare_keys(search, self.node_key(position)?);
            match ordering {
                Ordering::Equal => break,
                Ordering::Greater => low = position + 1,
                Ordering::Less => {
                    if position == 0 {
                        break;
                    }
                    high = position - 1;
                }
            }
        }
        Ok((ordering, position))
    }

    fn record_search(&mut self, ordering: Ordering, position: usize) {
        self.last_match = ordering;
        self.last_search_position = position;
    }

    /// Position `key` would occupy; also updates the stored search state.
    pub fn node_position_for<C>(&mut self, key: SearchKey<'_>, cmp: &C) -> Result<usize>
    where
        C: KeyOrder + ?Sized,
    {
        Ok(self.search(key, cmp)?.position)
    }

    /// Index of the page reference pointing at `child`, if any.
    pub fn node_position_referencing(&self, child: PageId) -> Result<Option<usize>> {
        for (idx, node) in self.nodes().enumerate() {
            if node?.value() == NodeValue::PageRef(child) {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }
}
