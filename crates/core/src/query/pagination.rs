//! Page/limit parsing for list endpoints.

/// Page used when `page` is absent or unusable.
pub const DEFAULT_PAGE: u64 = 1;

/// Results per page when `limit` is absent or unusable.
pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    /// `(page - 1) * limit`.
    pub skip: u64,
    /// Whether the caller supplied `page` at all; only then is an
    /// out-of-range page reported as an error.
    pub explicit_page: bool,
}

/// Parse raw page/limit values. Non-numeric, zero, or negative inputs fall
/// back to the defaults.
pub fn build_pagination(raw_page: Option<&str>, raw_limit: Option<&str>) -> Pagination {
    let page = parse_positive(raw_page).unwrap_or(DEFAULT_PAGE);
    let limit = parse_positive(raw_limit).unwrap_or(DEFAULT_LIMIT);
    Pagination {
        page,
        limit,
        skip: (page - 1).saturating_mul(limit),
        explicit_page: raw_page.is_some(),
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}
