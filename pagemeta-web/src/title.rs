//! Title cleanup tuned for the "Page Title - Site Name" convention.
//!
//! Titles that contain hyphens without a trailing site suffix get
//! mis-segmented; that imprecision is accepted.

use regex::Regex;
use std::sync::OnceLock;

static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN
        .get_or_init(|| Regex::new(r"[\t\n\x0C\r ]+").expect("whitespace pattern is valid"))
}

/// Collapse every run of spaces, tabs and line breaks into one space.
///
/// ```
/// use pagemeta_web::title::clean_break;
///
/// assert_eq!(clean_break("Line1\n\r  Line2"), "Line1 Line2");
/// ```
pub fn clean_break(text: &str) -> String {
    whitespace_run().replace_all(text, " ").into_owned()
}

/// Drop the trailing site-name segment from a title.
///
/// Underscores count as hyphens and spaces are removed before splitting on
/// `-`; every segment but the last is kept. A single segment comes back
/// unchanged apart from that normalization.
///
/// ```
/// use pagemeta_web::title::pure_title;
///
/// assert_eq!(pure_title("Foo Bar - Example Site"), "FooBar");
/// assert_eq!(pure_title("NoHyphenTitle"), "NoHyphenTitle");
/// ```
pub fn pure_title(title: &str) -> String {
    let normalized = title.replace('_', "-").replace(' ', "");
    let segments: Vec<&str> = normalized.split('-').collect();
    match segments.split_last() {
        Some((_, head)) if !head.is_empty() => head.concat(),
        _ => normalized,
    }
}

/// Guess the site name as the last separator-delimited segment of a title.
///
/// Separators are `-`, `_`, the full-width hyphen `－` and `|`.
///
/// ```
/// use pagemeta_web::title::parse_site_name_from_title;
///
/// assert_eq!(parse_site_name_from_title("Foo Bar - Example Site"), "ExampleSite");
/// assert_eq!(parse_site_name_from_title("Release notes | Rust Blog"), "RustBlog");
/// ```
pub fn parse_site_name_from_title(title: &str) -> String {
    let normalized = clean_break(title)
        .replace('_', "-")
        .replace(' ', "")
        .replace('－', "-")
        .replace('|', "-");
    normalized.rsplit('-').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_title_keeps_all_but_last_segment() {
        assert_eq!(pure_title("Foo Bar - Example Site"), "FooBar");
        assert_eq!(pure_title("Part One - Part Two - Site"), "PartOnePartTwo");
        assert_eq!(pure_title("snake_case_title"), "snakecase");
    }

    #[test]
    fn pure_title_single_segment_is_only_normalized() {
        assert_eq!(pure_title("NoHyphenTitle"), "NoHyphenTitle");
        assert_eq!(pure_title("Example Domain"), "ExampleDomain");
        assert_eq!(pure_title(""), "");
    }

    #[test]
    fn pure_title_ignores_pipes() {
        assert_eq!(pure_title("News | Brand"), "News|Brand");
    }

    #[test]
    fn site_name_is_last_segment() {
        assert_eq!(parse_site_name_from_title("Foo Bar - Example Site"), "ExampleSite");
        assert_eq!(parse_site_name_from_title("文章标题－网站名"), "网站名");
        assert_eq!(parse_site_name_from_title("Docs_Project"), "Project");
        assert_eq!(parse_site_name_from_title("Example Domain"), "ExampleDomain");
    }

    #[test]
    fn site_name_of_empty_title_is_empty() {
        assert_eq!(parse_site_name_from_title(""), "");
        assert_eq!(parse_site_name_from_title("Trailing -"), "");
    }

    #[test]
    fn site_name_collapses_line_breaks_first() {
        assert_eq!(
            parse_site_name_from_title("\n  Headline\n  - \r\n  The Paper\n"),
            "ThePaper"
        );
    }

    #[test]
    fn segment_selections_are_complementary() {
        for title in ["Foo Bar - Example Site", "A - B - C", "left_right"] {
            let joined = format!("{}{}", pure_title(title), parse_site_name_from_title(title));
            let flattened: String = title
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '_'))
                .collect();
            assert_eq!(joined, flattened, "title {title:?}");
        }
    }

    #[test]
    fn clean_break_collapses_mixed_whitespace() {
        assert_eq!(clean_break("Line1\n\r  Line2"), "Line1 Line2");
        assert_eq!(clean_break("\ta\t\tb\n"), " a b ");
        assert_eq!(clean_break("plain"), "plain");
    }
}
