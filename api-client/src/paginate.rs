//! Pagination driven by the `Link` response header, as used by the Github REST API.
//!
//! A page is any deserializable body which can hand over its items (see [`Paginator`]).
//! The next page is located by the `rel="next"` entry of the `Link` header:
//!
//! ```text
//! link: <https://api.github.com/app/installations?page=2>; rel="next", <https://api.github.com/app/installations?page=5>; rel="last"
//! ```

use http::{HeaderMap, Uri};

/// A single page of results returned by an API.
pub trait Paginator {
    /// The type of item that the paginator will return
    type Item;

    /// Get all items from the paginator in this page
    fn items(&mut self) -> Vec<Self::Item>;
}

/// Endpoints which return a bare JSON array are their own page.
impl<T> Paginator for Vec<T> {
    type Item = T;

    fn items(&mut self) -> Vec<Self::Item> {
        std::mem::take(self)
    }
}

/// Find the URI of the next page in a `Link` header, if there is one.
pub fn next_link(headers: &HeaderMap) -> Option<Uri> {
    headers
        .get_all(http::header::LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let target = target.strip_prefix('<')?.strip_suffix('>')?;

            let is_next = parts.any(|param| {
                let Some((name, value)) = param.split_once('=') else {
                    return false;
                };
                name.trim().eq_ignore_ascii_case("rel")
                    && value
                        .trim()
                        .trim_matches('"')
                        .split_ascii_whitespace()
                        .any(|rel| rel == "next")
            });

            if is_next {
                target.parse().ok()
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn link(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::LINK, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn finds_next_among_relations() {
        let headers = link(
            r#"<https://api.github.com/installation/repositories?page=1>; rel="prev", <https://api.github.com/installation/repositories?page=3>; rel="next", <https://api.github.com/installation/repositories?page=9>; rel="last""#,
        );

        let next = next_link(&headers).unwrap();
        assert_eq!(
            next.to_string(),
            "https://api.github.com/installation/repositories?page=3"
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let headers = link(
            r#"<https://api.github.com/app/installations?page=1>; rel="first", <https://api.github.com/app/installations?page=4>; rel="prev""#,
        );
        assert!(next_link(&headers).is_none());
    }

    #[test]
    fn missing_header_has_no_next() {
        assert!(next_link(&HeaderMap::new()).is_none());
    }

    #[test]
    fn vec_is_its_own_page() {
        let mut page = vec![1, 2, 3];
        assert_eq!(page.items(), vec![1, 2, 3]);
        assert!(page.is_empty());
    }
}
