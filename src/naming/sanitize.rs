//! File name helpers

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

/// Name used when sanitizing leaves nothing behind
pub const UNTITLED: &str = "untitled";

/// Marker inserted where a name was shortened
const ELLIPSIS: &str = "...";

static RESERVED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Make `name` safe to use as a file name.
///
/// Reserved characters and whitespace runs become `-`, hyphen runs collapse
/// to one, and leading or trailing hyphens are removed. A name that ends up
/// empty becomes `untitled`.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = RESERVED.replace_all(name, "-");
    let replaced = WHITESPACE.replace_all(&replaced, "-");
    let collapsed = HYPHENS.replace_all(&replaced, "-");
    let trimmed = collapsed.trim_matches('-');

    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Shorten `file_name` to at most `max_length` characters.
///
/// When the name has an extension it is kept, and the stem is cut with
/// `...` in front of the extension. Lengths count characters, not bytes.
pub fn truncate_file_name(file_name: &str, max_length: usize) -> String {
    let length = file_name.chars().count();
    if length <= max_length {
        return file_name.to_string();
    }

    if let Some((stem, extension)) = split_extension(file_name) {
        // Extension length including its dot
        let extension_length = extension.chars().count() + 1;
        let keep = max_length as isize - extension_length as isize - ELLIPSIS.len() as isize;
        if keep > 0 {
            let head: String = stem.chars().take(keep as usize).collect();
            return format!("{}{}.{}", head, ELLIPSIS, extension);
        }
    }

    let head: String = file_name
        .chars()
        .take(max_length.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{}{}", head, ELLIPSIS)
}

/// Split at the last dot, when it is neither the first nor the last character
pub fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    let dot = file_name.rfind('.')?;
    if dot == 0 || dot == file_name.len() - 1 {
        return None;
    }
    Some((&file_name[..dot], &file_name[dot + 1..]))
}

/// Timestamp base name for the current local time
pub fn timestamp_file_name() -> String {
    timestamp_file_name_at(Local::now())
}

/// Timestamp base name `image-YYYYMMDD-HHMMSS`
pub fn timestamp_file_name_at(time: DateTime<Local>) -> String {
    time.format("image-%Y%m%d-%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/b:c", "a-b-c")]
    #[case("///***//", "untitled")]
    #[case("", "untitled")]
    #[case("   ", "untitled")]
    #[case("My Screenshot", "My-Screenshot")]
    #[case("  -- what?  is <this> -- ", "what-is-this")]
    #[case("tab\tand\nnewline", "tab-and-newline")]
    #[case("系统 架构", "系统-架构")]
    #[case("already-clean", "already-clean")]
    fn test_sanitize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(input), expected);
    }

    #[rstest]
    #[case("short.png", 255, "short.png")]
    #[case("abcdefghij.png", 10, "abc....png")]
    #[case("abcdefghij", 8, "abcde...")]
    #[case("abcdefghij.verylongext", 10, "abcdefg...")]
    #[case(".hiddenfile", 8, ".hidd...")]
    #[case("trailingdot.", 8, "trail...")]
    fn test_truncate(#[case] input: &str, #[case] max: usize, #[case] expected: &str) {
        assert_eq!(truncate_file_name(input, max), expected);
    }

    #[test]
    fn test_truncate_counts_chars() {
        let name = format!("{}.png", "图".repeat(300));
        let truncated = truncate_file_name(&name, 255);
        assert_eq!(truncated.chars().count(), 255);
        assert!(truncated.ends_with("....png"));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("shot.png"), Some(("shot", "png")));
        assert_eq!(split_extension("a.b.jpg"), Some(("a.b", "jpg")));
        assert_eq!(split_extension(".png"), None);
        assert_eq!(split_extension("png."), None);
        assert_eq!(split_extension("png"), None);
    }

    #[test]
    fn test_timestamp_format() {
        let time = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(timestamp_file_name_at(time), "image-20240307-090502");

        let pattern = Regex::new(r"^image-\d{8}-\d{6}$").unwrap();
        assert!(pattern.is_match(&timestamp_file_name()));
    }

    #[test]
    fn test_timestamps_one_second_apart_differ() {
        let first = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let second = first + chrono::Duration::seconds(1);
        assert_ne!(timestamp_file_name_at(first), timestamp_file_name_at(second));
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(name in ".{0,64}") {
            let once = sanitize_file_name(&name);
            prop_assert_eq!(sanitize_file_name(&once), once.clone());
            prop_assert!(!once.is_empty());
            prop_assert!(!once.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|']));
        }

        #[test]
        fn truncate_respects_limit(stem in "[a-z0-9-]{1,400}", ext in "(png|jpg|gif|bmp|webp)") {
            let name = format!("{}.{}", stem, ext);
            let truncated = truncate_file_name(&name, 255);
            prop_assert!(truncated.chars().count() <= 255);
            let expected_suffix = format!(".{}", ext);
            prop_assert!(truncated.ends_with(&expected_suffix));
        }
    }
}
