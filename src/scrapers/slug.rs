//! URL-safe identifiers derived from display titles.

use std::collections::HashSet;

/// Turn a title into a lowercase, hyphen-separated slug.
///
/// Output matches `^[a-z0-9]+(-[a-z0-9]+)*$` or is empty. Characters outside
/// letters, digits, whitespace and hyphens are dropped, and underscores are
/// treated as separators. Non-ASCII letters are dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }

    slug
}

/// Something with a visible title.
pub trait Titled {
    fn title(&self) -> &str;
}

/// Keep the first item for each title, preserving order.
pub fn dedup_by_title<T: Titled>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.title().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_well_formed(slug: &str) -> bool {
        slug.is_empty()
            || slug
                .split('-')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
    }

    #[test]
    fn test_basic_slugs() {
        assert_eq!(slugify("Fiction"), "fiction");
        assert_eq!(slugify("Crime & Thriller"), "crime-thriller");
        assert_eq!(slugify("  Sci-Fi   Fantasy  "), "sci-fi-fantasy");
        assert_eq!(slugify("Books -- Rare"), "books-rare");
        assert_eq!(slugify("snake_case_title"), "snake-case-title");
        assert_eq!(slugify("Children's Books"), "childrens-books");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_idempotent_and_well_formed() {
        for input in [
            "Fiction",
            "  -Leading and trailing-  ",
            "Über Bücher",
            "A__B",
            "2024 Best-Sellers!",
            "---",
            "Mixed\tWhite\nSpace",
        ] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
            assert!(is_well_formed(&once), "malformed slug {once:?} for {input:?}");
        }
    }

    struct Link(&'static str, &'static str);

    impl Titled for Link {
        fn title(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_dedup_keeps_first() {
        let links = vec![
            Link("Fiction", "/fiction"),
            Link("History", "/history"),
            Link("Fiction", "/fiction-2"),
        ];
        let deduped = dedup_by_title(links);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].1, "/fiction");
        assert_eq!(deduped[1].0, "History");
    }
}
