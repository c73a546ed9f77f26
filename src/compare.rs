//! Key ordering seam between the page and the tree layer.

use std::cmp::Ordering;

/// Total order over raw key bytes supplied by the tree layer.
pub trait KeyOrder {
    /// Compares `a` against `b`.
    fn compare_keys(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Unsigned byte-wise ordering, shorter keys first on a shared prefix.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lexicographic;

impl KeyOrder for Lexicographic {
    fn compare_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

impl<F> KeyOrder for F
where
    F: Fn(&[u8], &[u8]) -> Ordering,
{
    fn compare_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        self(a, b)
    }
}

/// Key argument for [`crate::Page::search`].
///
/// The two synthetic extremes never reach the comparator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchKey<'a> {
    /// Sorts before every stored key.
    BeforeAll,
    /// Sorts after every stored key.
    AfterAll,
    /// Ordinary key bytes.
    Key(&'a [u8]),
}

impl<'a> From<&'a [u8]> for SearchKey<'a> {
    fn from(key: &'a [u8]) -> Self {
        SearchKey::Key(key)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for SearchKey<'a> {
    fn from(key: &'a [u8; N]) -> Self {
        SearchKey::Key(key.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for SearchKey<'a> {
    fn from(key: &'a Vec<u8>) -> Self {
        SearchKey::Key(key.as_slice())
    }
}
