//! Paging primitives shared by every list operation.

use serde::{Deserialize, Serialize};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Slice an already-ordered, fully materialised result set.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let window = items
            .iter()
            .skip(start)
            .take(self.size as usize)
            .cloned()
            .collect();
        Page::new(window, *self, items.len() as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            u32::try_from(total_elements.div_ceil(u64::from(request.size))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
