use serde::Serialize;

const DEFAULT_PER_PAGE: usize = 30;

/// One page of a state query result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub page: usize,
}

/// Slice `items` into pages. `page` counts from 1 and is clamped there;
/// `per_page` falls back to 30 and is capped at `max_per_page`. A page past
/// the end is empty rather than an error.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize, max_per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = if per_page == 0 {
        DEFAULT_PER_PAGE
    } else {
        per_page
    }
    .min(max_per_page.max(1));
    let total_pages = items.len().div_ceil(per_page).max(1);
    let start = (page - 1).saturating_mul(per_page);
    let selected = if start >= items.len() {
        Vec::new()
    } else {
        items[start..(start + per_page).min(items.len())].to_vec()
    };
    Page {
        items: selected,
        total_pages,
        page,
    }
}
