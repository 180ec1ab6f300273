//! Status message sanitization

use super::MAX_STATUS_LENGTH;

/// Clean a user supplied status line before it goes on the wire or is kept
///
/// Tag-like `<...>` runs are removed, whitespace is trimmed, blank results
/// become `None`, and the rest is cut to `MAX_STATUS_LENGTH` characters.
pub fn sanitize_status(value: Option<&str>) -> Option<String> {
    let value = value?;
    let stripped = strip_tags(value);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_STATUS_LENGTH).collect())
}

fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            // An unterminated `<` is plain text.
            None => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_and_truncates() {
        let raw = "<script>hi</script>  pad".repeat(20);
        let clean = sanitize_status(Some(&raw)).unwrap();
        assert_eq!(clean.chars().count(), MAX_STATUS_LENGTH);
        assert!(!clean.contains('<'));
        assert_eq!(clean, &"hi  pad".repeat(20)[..MAX_STATUS_LENGTH]);
    }

    #[test]
    fn test_blank_is_absent() {
        assert_eq!(sanitize_status(None), None);
        assert_eq!(sanitize_status(Some("   ")), None);
        assert_eq!(sanitize_status(Some("<b></b>")), None);
    }

    #[test]
    fn test_keeps_plain_text() {
        assert_eq!(sanitize_status(Some("  reading ch. 4 ")), Some("reading ch. 4".to_string()));
        assert_eq!(sanitize_status(Some("a < b")), Some("a < b".to_string()));
        assert_eq!(sanitize_status(Some("x <i>y</i> z")), Some("x y z".to_string()));
    }

    #[test]
    fn test_truncates_by_character() {
        let raw = "é".repeat(200);
        assert_eq!(sanitize_status(Some(&raw)).unwrap().chars().count(), MAX_STATUS_LENGTH);
    }
}
