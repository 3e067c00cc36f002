#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub offset: i64,
    pub limit: i64,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: i64 = 20;
    pub const MAX_PAGE_SIZE: i64 = 100;

    /// Page defaults to 1, size to 20 and is clamped to 1..=100. Zero counts as absent.
    pub fn parse(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p != 0).unwrap_or(1).max(1);
        let page_size = page_size
            .filter(|s| *s != 0)
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE);

        Self {
            page,
            page_size,
            offset: (page - 1).saturating_mul(page_size),
            limit: page_size,
        }
    }

    pub fn pages(&self, total: i64) -> i64 {
        if self.page_size > 0 {
            (total + self.page_size - 1) / self.page_size
        } else {
            0
        }
    }

    pub fn has_next(&self, total: i64) -> bool {
        self.page < self.pages(total)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::parse(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = Pagination::default();
        assert_eq!((p.page, p.page_size, p.offset, p.limit), (1, 20, 0, 20));
    }

    #[test]
    fn clamps_and_offsets() {
        let p = Pagination::parse(Some(3), Some(500));
        assert_eq!(p.page_size, 100);
        assert_eq!(p.offset, 200);

        let p = Pagination::parse(Some(-4), Some(-1));
        assert_eq!((p.page, p.page_size), (1, 1));

        let p = Pagination::parse(Some(0), Some(0));
        assert_eq!((p.page, p.page_size), (1, 20));

        let p = Pagination::parse(Some(i64::MAX), Some(20));
        assert_eq!(p.offset, i64::MAX);
        assert!(!p.has_next(1_000));
    }

    #[test]
    fn page_counts() {
        let p = Pagination::parse(Some(2), Some(10));
        assert_eq!(p.pages(0), 0);
        assert_eq!(p.pages(25), 3);
        assert!(p.has_next(25));
        assert!(!p.has_next(20));
        assert!(p.has_prev());
        assert!(!Pagination::default().has_prev());
    }
}
