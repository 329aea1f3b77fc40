//! Text-to-text passes applied before parsing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Strips every `%` comment: from the `%` up to, but not including, the end of the line.
///
/// `\%` is not special-cased.
pub fn remove_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut is_commented = false;

    for c in text.chars() {
        match c {
            '%' => is_commented = true,
            '\n' | '\r' => is_commented = false,
            _ => {}
        }

        if !is_commented {
            result.push(c);
        }
    }

    result
}

// Group 1 matches spans that must survive untouched: verbatim blocks, escaped symbols
// and math.
static SHORTCUT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(\\begin\{verbatim\}.*?\\end\{verbatim\}|\\.|\$\$[^$]*\$\$|\$[^$]*\$)|~|---",
    )
    .expect("shortcut pattern is valid")
});

/// HTML shortcuts: `~` becomes a non-breaking space and `---` an em-dash.
pub fn substitute_shortcuts(text: &str) -> String {
    SHORTCUT_PATTERN
        .replace_all(text, |caps: &Captures| {
            if let Some(kept) = caps.get(1) {
                return kept.as_str().to_string();
            }
            match &caps[0] {
                "~" => r"\unescaped{&nbsp;}".to_string(),
                _ => r"\unescaped{&mdash;}".to_string(),
            }
        })
        .into_owned()
}

/// The full pre-parse pipeline of the HTML backend.
pub fn preprocess_for_html(text: &str) -> String {
    substitute_shortcuts(&remove_comments(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_comments() {
        assert_eq!(remove_comments("% only a comment"), "");
        assert_eq!(remove_comments("a%\nb"), "a\nb");
        assert_eq!(remove_comments("a %  x\n b"), "a \n b");
        assert_eq!(remove_comments("a%     \nb%cd"), "a\nb");
        assert_eq!(remove_comments("a%%%%%\\%%%%%%%%\\%"), "a");
        assert_eq!(remove_comments("no comment here"), "no comment here");
    }

    #[test]
    fn test_remove_comments_is_idempotent() {
        let inputs = [
            "",
            "plain",
            "a%b\nc%d\n%\n\n",
            "\\% escaped? no",
            "line one % tail\r\nline two",
        ];
        for input in inputs {
            let once = remove_comments(input);
            assert_eq!(remove_comments(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_substitute_shortcuts() {
        assert_eq!(substitute_shortcuts("a~b"), r"a\unescaped{&nbsp;}b");
        assert_eq!(substitute_shortcuts("a---b"), r"a\unescaped{&mdash;}b");
        assert_eq!(substitute_shortcuts("a--b"), "a--b");
    }

    #[test]
    fn test_substitute_shortcuts_keeps_escapes_math_and_verbatim() {
        assert_eq!(substitute_shortcuts(r"\~"), r"\~");
        assert_eq!(substitute_shortcuts("$a~b$"), "$a~b$");
        assert_eq!(substitute_shortcuts("$$a---b$$"), "$$a---b$$");
        let verbatim = "\\begin{verbatim}x~y---z\\end{verbatim}";
        assert_eq!(substitute_shortcuts(verbatim), verbatim);
    }
}
