use serde::Deserialize;

use crate::db::models::{VehicleSearch, VehicleSort};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 9;
pub const MAX_LIMIT: u64 = 100;

/// Raw `GET /allVehicles` query string. Every field is kept as text so a
/// bad number degrades to the default instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct VehicleQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Leading decimal digits of `raw`, ignoring surrounding whitespace.
/// Zero and non-numeric input yield `None`.
fn leading_positive_int(raw: &str) -> Option<u64> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl VehicleQuery {
    pub fn into_search(self) -> VehicleSearch {
        let sort = match self.sort.as_deref() {
            Some("priceAsc") => VehicleSort::PriceAsc,
            Some("priceDesc") => VehicleSort::PriceDesc,
            _ => VehicleSort::Newest,
        };
        let page = self
            .page
            .as_deref()
            .and_then(leading_positive_int)
            .unwrap_or(DEFAULT_PAGE);
        let limit = self
            .limit
            .as_deref()
            .and_then(leading_positive_int)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);

        VehicleSearch {
            search: non_empty(self.search),
            category: non_empty(self.category),
            sort,
            page,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>, sort: Option<&str>) -> VehicleQuery {
        VehicleQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
            sort: sort.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let search = VehicleQuery::default().into_search();
        assert_eq!(search.page, 1);
        assert_eq!(search.limit, 9);
        assert_eq!(search.sort, VehicleSort::Newest);
        assert_eq!(search.search, None);
        assert_eq!(search.category, None);
        assert_eq!(search.skip(), 0);
    }

    #[test]
    fn test_numbers_parse_leniently() {
        let search = query(Some("3"), Some("12"), None).into_search();
        assert_eq!((search.page, search.limit, search.skip()), (3, 12, 24));

        let search = query(Some("2abc"), Some("x"), None).into_search();
        assert_eq!((search.page, search.limit), (2, 9));

        let search = query(Some("0"), Some("-5"), None).into_search();
        assert_eq!((search.page, search.limit), (1, 9));

        let search = query(None, Some("5000"), None).into_search();
        assert_eq!(search.limit, MAX_LIMIT);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let search = query(Some("18446744073709551615"), Some("100"), None).into_search();
        assert_eq!(search.page, u64::MAX);
        assert_eq!(search.skip(), u64::MAX);

        // Digits beyond u64 fall back to the default page
        let search = query(Some("99999999999999999999999"), None, None).into_search();
        assert_eq!(search.page, DEFAULT_PAGE);
    }

    #[test]
    fn test_sort_options() {
        assert_eq!(query(None, None, Some("priceAsc")).into_search().sort, VehicleSort::PriceAsc);
        assert_eq!(query(None, None, Some("priceDesc")).into_search().sort, VehicleSort::PriceDesc);
        assert_eq!(query(None, None, Some("newest")).into_search().sort, VehicleSort::Newest);
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let search = VehicleQuery {
            search: Some("  ".to_string()),
            category: Some("SUV".to_string()),
            ..Default::default()
        }
        .into_search();
        assert_eq!(search.search, None);
        assert_eq!(search.category.as_deref(), Some("SUV"));
    }
}
