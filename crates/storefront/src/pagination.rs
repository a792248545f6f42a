//! Page-number pagination.
//!
//! Paginated lists answer with
//!
//! ```json
//! {"count": 42, "next": "http://host/store/products?page=3", "previous": "http://host/store/products?page=1", "results": [...]}
//! ```
//!
//! `next`/`previous` are absolute URLs built from the configured base URL and
//! keep every other query parameter. The link to page one drops `page`
//! entirely.

use axum::http::Uri;
use serde::Serialize;
use url::{Url, form_urlencoded};

use crate::error::AppError;

const INVALID_PAGE: &str = "Invalid page.";

/// A requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub number: u32,
    /// Items per page.
    pub size: u32,
}

impl PageRequest {
    /// Parse the `page` query parameter. Absent means page one.
    ///
    /// # Errors
    ///
    /// Returns a 404 `AppError` for anything but a positive integer.
    pub fn parse(page: Option<&str>, size: u32) -> Result<Self, AppError> {
        let number = match page.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| AppError::NotFound(INVALID_PAGE.to_owned()))?,
        };

        Ok(Self {
            number,
            size: size.max(1),
        })
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }

    /// Number of pages for `count` items. Always at least one.
    #[must_use]
    pub fn page_count(&self, count: i64) -> i64 {
        let size = i64::from(self.size);
        ((count + size - 1) / size).max(1)
    }

    /// Reject pages past the end.
    ///
    /// # Errors
    ///
    /// Returns a 404 `AppError` if the page does not exist.
    pub fn ensure_exists(&self, count: i64) -> Result<(), AppError> {
        if i64::from(self.number) > self.page_count(count) {
            return Err(AppError::NotFound(INVALID_PAGE.to_owned()));
        }
        Ok(())
    }
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Assemble a page, building navigation links from the request URI.
    #[must_use]
    pub fn new(
        results: Vec<T>,
        count: i64,
        request: PageRequest,
        base_url: &Url,
        uri: &Uri,
    ) -> Self {
        let next = (i64::from(request.number) < request.page_count(count))
            .then(|| page_link(base_url, uri, Some(request.number + 1)))
            .flatten();

        let previous = match request.number {
            1 => None,
            2 => page_link(base_url, uri, None),
            n => page_link(base_url, uri, Some(n - 1)),
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Absolute URL for the request with `page` replaced (or removed when `None`).
fn page_link(base_url: &Url, uri: &Uri, page: Option<u32>) -> Option<String> {
    let mut url = base_url.join(uri.path().trim_start_matches('/')).ok()?;

    let kept: Vec<(String, String)> = uri
        .query()
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .filter(|(key, _)| key != "page")
                .collect()
        })
        .unwrap_or_default();

    url.set_query(None);
    if !kept.is_empty() || page.is_some() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        if let Some(page) = page {
            pairs.append_pair("page", &page.to_string());
        }
    }

    Some(url.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://shop.test/").unwrap()
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(PageRequest::parse(None, 10).unwrap().number, 1);
        assert_eq!(PageRequest::parse(Some(""), 10).unwrap().number, 1);
        assert_eq!(PageRequest::parse(Some("3"), 10).unwrap().number, 3);
        assert!(PageRequest::parse(Some("0"), 10).is_err());
        assert!(PageRequest::parse(Some("-1"), 10).is_err());
        assert!(PageRequest::parse(Some("last"), 10).is_err());
    }

    #[test]
    fn test_limit_offset() {
        let page = PageRequest::parse(Some("3"), 10).unwrap();
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_page_count_and_bounds() {
        let page = PageRequest::parse(Some("1"), 10).unwrap();
        assert_eq!(page.page_count(0), 1);
        assert_eq!(page.page_count(10), 1);
        assert_eq!(page.page_count(11), 2);
        assert!(page.ensure_exists(0).is_ok());

        let page = PageRequest::parse(Some("3"), 10).unwrap();
        assert!(page.ensure_exists(20).is_err());
        assert!(page.ensure_exists(21).is_ok());
    }

    #[test]
    fn test_links_first_page() {
        let uri: Uri = "/store/products?collection_id=3".parse().unwrap();
        let request = PageRequest::parse(None, 10).unwrap();
        let page = Page::new(vec![1, 2], 25, request, &base(), &uri);

        assert_eq!(
            page.next.as_deref(),
            Some("http://shop.test/store/products?collection_id=3&page=2")
        );
        assert_eq!(page.previous, None);
    }

    #[test]
    fn test_links_second_page_drops_page_for_previous() {
        let uri: Uri = "/store/products?page=2&ordering=-price".parse().unwrap();
        let request = PageRequest::parse(Some("2"), 10).unwrap();
        let page = Page::new(vec![1], 25, request, &base(), &uri);

        assert_eq!(
            page.next.as_deref(),
            Some("http://shop.test/store/products?ordering=-price&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://shop.test/store/products?ordering=-price")
        );
    }

    #[test]
    fn test_links_last_page() {
        let uri: Uri = "/store/products?page=3".parse().unwrap();
        let request = PageRequest::parse(Some("3"), 10).unwrap();
        let page = Page::new(vec![1], 25, request, &base(), &uri);

        assert_eq!(page.next, None);
        assert_eq!(
            page.previous.as_deref(),
            Some("http://shop.test/store/products?page=2")
        );
    }

    #[test]
    fn test_links_respect_base_path() {
        let base = Url::parse("https://example.com/api/").unwrap();
        let uri: Uri = "/store/products".parse().unwrap();
        let request = PageRequest::parse(None, 1).unwrap();
        let page = Page::new(vec![1], 2, request, &base, &uri);
        assert_eq!(
            page.next.as_deref(),
            Some("https://example.com/api/store/products?page=2")
        );
    }
}
