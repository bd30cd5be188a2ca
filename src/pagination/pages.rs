//! Visible page numbers for the pagination strip.

/// One slot in the pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Pages shown for `total_pages` with `current` selected.
///
/// Up to 7 pages are all shown. Past that: first, last and current±2,
/// de-duplicated and sorted, with an ellipsis wherever two consecutive shown
/// pages are non-adjacent. `(15, 8)` renders as `1 … 6 7 8 9 10 … 15`.
pub fn visible_pages(total_pages: u32, current: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    if total_pages <= 7 {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let current = current.clamp(1, total_pages);
    let mut pages: Vec<u32> = vec![1, total_pages];
    for page in current.saturating_sub(2)..=current + 2 {
        if (1..=total_pages).contains(&page) {
            pages.push(page);
        }
    }
    pages.sort_unstable();
    pages.dedup();

    let mut items = Vec::with_capacity(pages.len() + 2);
    let mut previous: Option<u32> = None;
    for page in pages {
        if let Some(prev) = previous {
            if page > prev + 1 {
                items.push(PageItem::Ellipsis);
            }
        }
        items.push(PageItem::Page(page));
        previous = Some(page);
    }
    items
}
