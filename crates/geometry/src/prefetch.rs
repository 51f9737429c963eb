//! Prefetch window calculation for thumbnail generation

/// Pages to prefetch around the current page
///
/// Returns 1-based page numbers in `[current - radius, current + radius]`
/// clipped to `[1, page_count]`, the current page first and neighbors
/// ordered outward so the most relevant thumbnails render first.
pub fn prefetch_window(current_page: u32, page_count: u32, radius: u32) -> Vec<u32> {
    if page_count == 0 || current_page == 0 {
        return Vec::new();
    }

    let current = current_page.min(page_count);
    let mut pages = vec![current];

    for offset in 1..=radius {
        if current > offset {
            pages.push(current - offset);
        }
        let upper = current + offset;
        if upper <= page_count {
            pages.push(upper);
        }
    }

    pages
}
