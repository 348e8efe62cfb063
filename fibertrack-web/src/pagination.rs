//! Page arithmetic for record listings (100 records per page)

/// Records per page
pub const PAGE_SIZE: i64 = 100;

/// A page request clamped to what exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-indexed
    pub page: i64,
    /// 0 when there are no results
    pub total_pages: i64,
    pub offset: i64,
}

impl Pagination {
    /// Clamp `requested_page` into `[1, total_pages]`.
    ///
    /// ```
    /// use fibertrack_web::pagination::Pagination;
    ///
    /// let p = Pagination::clamp(250, 99);
    /// assert_eq!((p.page, p.total_pages, p.offset), (3, 3, 200));
    /// ```
    pub fn clamp(total_results: i64, requested_page: i64) -> Self {
        let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
        let page = requested_page.clamp(1, total_pages.max(1));
        Self {
            page,
            total_pages,
            offset: (page - 1) * PAGE_SIZE,
        }
    }

    /// Offset for a page before the total is known
    pub fn offset_of(requested_page: i64) -> i64 {
        (requested_page.max(1) - 1).saturating_mul(PAGE_SIZE)
    }
}
