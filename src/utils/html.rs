/// Sanitises author-supplied course and exam text.
///
/// Keeps harmless formatting tags (`<b>`, `<p>`, lists) and drops scripts,
/// frames and event-handler attributes, so stored descriptions can be
/// rendered as HTML by any client.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitises an optional field, keeping `None` as is.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_stripped() {
        let cleaned = clean_html("<p>Intro</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Intro</p>");
    }

    #[test]
    fn test_none_passes_through() {
        assert_eq!(clean_optional(None), None);
    }
}
