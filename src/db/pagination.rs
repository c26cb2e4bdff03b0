use serde::Serialize;

/// One page of a listing plus the numbers a pager needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let pages = ((total as u64).div_ceil(per_page as u64)) as u32;

        Page {
            items,
            page,
            per_page,
            total,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
        }
    }
}

/// Row offset of the first item on `page` (1-based).
pub fn offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(per_page)
}

/// Parse a `page` query value; anything but a positive decimal number is page 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    match raw {
        Some(value) if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
            value.parse().ok().filter(|page| *page > 0).unwrap_or(1)
        }
        _ => 1,
    }
}
