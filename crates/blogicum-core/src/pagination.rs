//! Fixed-size pagination with Django `Paginator.get_page` semantics.

use serde::Serialize;

/// Number of posts per listing page.
pub const PAGE_SIZE: u64 = 10;

/// A requested page number, as received from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    First,
    Number(i64),
}

impl PageRequest {
    /// Parses a raw `page` query value. Anything that is not an integer
    /// requests the first page.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .map_or(Self::First, Self::Number)
    }

    /// Resolves the request against `total` items.
    ///
    /// Numbers below 1 or past the end land on the last page, and an empty
    /// listing still has one page.
    pub fn resolve(self, total: u64) -> PageWindow {
        let total_pages = total.div_ceil(PAGE_SIZE).max(1);
        let number = match self {
            Self::First => 1,
            Self::Number(n) if n >= 1 && (n as u64) <= total_pages => n as u64,
            Self::Number(_) => total_pages,
        };

        PageWindow {
            number,
            total_pages,
            total_items: total,
            offset: (number - 1) * PAGE_SIZE,
            limit: PAGE_SIZE,
        }
    }
}

/// A resolved page: which slice of the ordered listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub offset: u64,
    pub limit: u64,
}

/// One page of an ordered listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            total_pages: window.total_pages,
            total_items: window.total_items,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}
