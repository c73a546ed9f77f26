use slotpage_types::page::{is_valid_page_size, DEFAULT_PAGE_SIZE};
use slotpage_types::{PageError, Result};

use crate::size;

/// Configuration shared by page views and scratch pools of one environment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageOptions {
    /// Page size in bytes; a power of two between 128 and 32 KiB.
    pub page_size: usize,
    /// Forces [`crate::Page::debug_validate`] on or off.
    ///
    /// `None` keeps the build default: enabled under `debug_assertions` or the
    /// `validate-pages` feature, disabled otherwise.
    pub validate: Option<bool>,
    /// Number of idle scratch pages a pool keeps for reuse.
    pub scratch_pages: usize,
}

impl PageOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            validate: None,
            scratch_pages: 2,
        }
    }

    /// Sets the page size.
    pub fn page_size(mut self, bytes: usize) -> Self {
        self.page_size = bytes;
        self
    }

    /// Enables or disables page validation, overriding the build default.
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = Some(enabled);
        self
    }

    /// Sets how many scratch pages are cached.
    pub fn scratch_pages(mut self, pages: usize) -> Self {
        self.scratch_pages = pages;
        self
    }

    /// Checks the options for consistency.
    pub fn verify(&self) -> Result<()> {
        if !is_valid_page_size(self.page_size) {
            return Err(PageError::Invalid(
                "page size must be a power of two between 128 and 32768",
            ));
        }
        Ok(())
    }

    /// Whether pages opened with these options run [`crate::Page::debug_validate`].
    pub fn validation_enabled(&self) -> bool {
        self.validate
            .unwrap_or(cfg!(debug_assertions) || cfg!(feature = "validate-pages"))
    }

    /// Bytes available below the header.
    pub fn max_space(&self) -> usize {
        size::max_space(self.page_size)
    }

    /// Largest record stored inline; larger values go to overflow pages.
    pub fn node_max_size(&self) -> usize {
        size::node_max_size(self.page_size)
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::new()
    }
}
