//! Path slug formatting.
//!
//! Turns a list of human-readable path segments (screen titles, section names)
//! into a URL-safe path such as `/settings/list-view`.
//!
//! Each segment is transliterated to lowercase ASCII, split on anything outside
//! `[0-9a-z-]`, and rejoined with `-`. Segments that end up empty are dropped,
//! so `["***"]` collapses to `/`. The transformation is idempotent: slugging an
//! already-slugged path returns it unchanged.
//!
//! # Example
//!
//! ```
//! use simpleanalytics::slug::format_path;
//!
//! assert_eq!(format_path(["List View", "Édit!"]), "/list-view/edit");
//! assert_eq!(format_path(Vec::<String>::new()), "/");
//! ```

use deunicode::deunicode_char;

/// Separator placed between the fragments of a single segment.
const FRAGMENT_SEPARATOR: &str = "-";

/// Formats path segments into a `/`-prefixed slug path.
///
/// Never fails. Segments that cannot be transliterated, or that contain no
/// slug-safe characters, are silently dropped.
#[must_use]
pub fn format_path<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let slugs: Vec<String> = segments
        .into_iter()
        .filter_map(|segment| slugify(segment.as_ref()))
        .collect();

    format!("/{}", slugs.join("/"))
}

/// Converts a single segment into a slug.
///
/// Returns `None` when the segment contains a character with no ASCII
/// transliteration, or when nothing slug-safe is left after splitting.
///
/// ```
/// use simpleanalytics::slug::slugify;
///
/// assert_eq!(slugify("Hello, World"), Some("hello-world".to_string()));
/// assert_eq!(slugify("--"), Some("--".to_string()));
/// assert_eq!(slugify("!!!"), None);
/// ```
#[must_use]
pub fn slugify(segment: &str) -> Option<String> {
    let ascii = transliterate(segment)?;

    let slug = ascii
        .split(|c: char| !is_slug_char(c))
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR);

    (!slug.is_empty()).then_some(slug)
}

/// Folds a segment to lowercase ASCII, or `None` if any character is unmappable.
fn transliterate(segment: &str) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        out.push_str(deunicode_char(c)?);
    }
    out.make_ascii_lowercase();
    Some(out)
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_lowercase() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_path_is_root() {
        assert_eq!(format_path(Vec::<&str>::new()), "/");
    }

    #[test]
    fn segments_are_lowercased_and_hyphenated() {
        assert_eq!(format_path(["List View", "Édit!"]), "/list-view/edit");
    }

    #[test]
    fn symbol_only_segment_vanishes() {
        assert_eq!(format_path(["***"]), "/");
        assert_eq!(format_path(["home", "***", "detail"]), "/home/detail");
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(format_path(["", "home", ""]), "/home");
    }

    #[test]
    fn accents_are_folded() {
        assert_eq!(format_path(["Crème Brûlée"]), "/creme-brulee");
    }

    #[test]
    fn slashes_inside_a_segment_become_hyphens() {
        assert_eq!(format_path(["a/b"]), "/a-b");
    }

    #[test]
    fn digits_and_hyphens_survive() {
        assert_eq!(format_path(["step-2", "Page 10"]), "/step-2/page-10");
    }

    #[test]
    fn slugify_collapses_runs_of_separators() {
        assert_eq!(slugify("  hello   world  "), Some("hello-world".to_string()));
        assert_eq!(slugify("a.b,c"), Some("a-b-c".to_string()));
    }

    #[test]
    fn slugify_rejects_empty_results() {
        assert_eq!(slugify(""), None);
        assert_eq!(slugify("   "), None);
        assert_eq!(slugify("?!*"), None);
    }

    #[test]
    fn accepts_owned_strings() {
        let segments = vec!["Settings".to_string(), "Privacy".to_string()];
        assert_eq!(format_path(&segments), "/settings/privacy");
    }

    fn resplit(path: &str) -> Vec<String> {
        path.trim_start_matches('/')
            .split('/')
            .map(str::to_string)
            .collect()
    }

    proptest! {
        #[test]
        fn formatting_is_idempotent(segments in prop::collection::vec("[ -~]{0,16}", 0..6)) {
            let once = format_path(&segments);
            let twice = format_path(resplit(&once));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn output_is_always_slug_safe(segments in prop::collection::vec(".{0,12}", 0..6)) {
            let path = format_path(&segments);
            prop_assert!(path.starts_with('/'));
            prop_assert!(path.chars().all(|c| c == '/' || is_slug_char(c)));
        }
    }
}
