//! Row pagination for printed tables

use std::ops::Range;

/// Competitor rows fitting on one landscape A4 page under the header
///
/// (210 mm page height - 20 mm margins - 12 mm section title - header row) / 7.65 mm row
pub const ROWS_PER_PAGE: usize = 22;

/// Row ranges of every page, in order; no rows means no pages
///
/// # Examples
/// ```
/// use oris_analyzer::pagination::page_ranges;
///
/// // 50 rows = 3 pages (22 + 22 + 6)
/// assert_eq!(page_ranges(50, 22), vec![0..22, 22..44, 44..50]);
/// ```
pub fn page_ranges(total_rows: usize, per_page: usize) -> Vec<Range<usize>> {
    let per_page = per_page.max(1);
    (0..total_rows)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(total_rows))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_every_row_once() {
        for total in [1, 21, 22, 23, 44, 45, 500] {
            let ranges = page_ranges(total, ROWS_PER_PAGE);
            assert_eq!(ranges.len(), total.div_ceil(ROWS_PER_PAGE));
            assert_eq!(ranges.first().map(|r| r.start), Some(0));
            assert_eq!(ranges.last().map(|r| r.end), Some(total));
            assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
            assert!(ranges.iter().all(|r| r.len() <= ROWS_PER_PAGE && !r.is_empty()));
        }
    }

    #[test]
    fn test_no_rows_no_pages() {
        assert!(page_ranges(0, ROWS_PER_PAGE).is_empty());
    }

    #[test]
    fn test_zero_per_page_treated_as_one() {
        assert_eq!(page_ranges(2, 0), vec![0..1, 1..2]);
    }
}
