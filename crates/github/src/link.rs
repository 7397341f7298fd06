use reqwest::Url;

/// The page number of the `rel="next"` target of a `Link` header, if any.
pub fn next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let url = Url::parse(target.strip_prefix('<')?.strip_suffix('>')?).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_next_page() {
        let link = r#"<https://api.github.com/repositories/1/issues?state=all&per_page=100&page=3>; rel="next", <https://api.github.com/repositories/1/issues?state=all&per_page=100&page=50>; rel="last""#;
        assert_eq!(next_page(link), Some(3));
    }

    #[test]
    fn last_page_has_no_next() {
        let link = r#"<https://api.github.com/repositories/1/issues?page=1>; rel="first", <https://api.github.com/repositories/1/issues?page=49>; rel="prev""#;
        assert_eq!(next_page(link), None);
    }

    #[test]
    fn ignores_per_page_and_garbage() {
        assert_eq!(next_page(r#"<https://x.test/i?per_page=7>; rel="next""#), None);
        assert_eq!(next_page("nonsense"), None);
        assert_eq!(next_page(""), None);
    }
}
