use similar::TextDiff;

/// Unified diff between `original` and `modified`, or `None` when they match.
pub fn build_unified_diff(original: &str, modified: &str, path: &str) -> Option<String> {
    if original == modified {
        return None;
    }

    let diff = TextDiff::from_lines(original, modified);
    let header_old = format!("a/{path}");
    let header_new = format!("b/{path}");

    Some(
        diff.unified_diff()
            .context_radius(3)
            .header(&header_old, &header_new)
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_none_for_identical_content() {
        assert!(build_unified_diff("[A]\n", "[A]\n", "Skin.ini").is_none());
    }

    #[test]
    fn produces_diff_for_changes() {
        let diff = build_unified_diff("[A]\nx = 1\n", "[A]\nx=1\n", "Skin.ini").unwrap();
        assert!(diff.starts_with("--- a/Skin.ini\n+++ b/Skin.ini\n"));
        assert!(diff.contains("-x = 1"));
        assert!(diff.contains("+x=1"));
    }
}
