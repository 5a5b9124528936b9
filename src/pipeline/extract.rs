//! Best-effort scraping of DSL candidates out of free-form model output.
//!
//! This is a heuristic, not a parser: it finds the start word followed by a
//! quoted string or a brace block without nested braces. Whatever it returns
//! still has to get past the grammar.

use regex::Regex;

/// Find the first `<start_word> { ... }` (or `<start_word> "..."`) in `text`.
pub fn extract_dsl(text: &str, start_word: &str) -> Option<String> {
    let word = regex::escape(start_word);

    let direct = Regex::new(&format!(r#"(?s){}\s*(".*?"|\{{[^}}]*\}})"#, word)).ok()?;
    if let Some(found) = direct.find(text) {
        return Some(found.as_str().to_string());
    }

    // Allow a header between the start word and the block, e.g. `bill for table 4 { ... }`.
    let loose = Regex::new(&format!(r"(?s){}\s+.*?\s*\{{[^}}]*\}}", word)).ok()?;
    loose.find(text).map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_block_inside_chatter() {
        let reply = "Sure! Here is your DSL:\n```\nbill {\n  burger: 2 * 5.0\n}\n```\nEnjoy.";
        assert_eq!(
            extract_dsl(reply, "bill").as_deref(),
            Some("bill {\n  burger: 2 * 5.0\n}")
        );
    }

    #[test]
    fn allows_text_between_word_and_block() {
        let reply = "ride plan for Sunday { terrain: hilly distance_km: 40 }";
        assert_eq!(
            extract_dsl(reply, "ride").as_deref(),
            Some("ride plan for Sunday { terrain: hilly distance_km: 40 }")
        );
    }

    #[test]
    fn returns_none_without_start_word() {
        assert_eq!(extract_dsl("I cannot help with that.", "bill"), None);
    }
}
