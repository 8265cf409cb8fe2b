use regex::Regex;
use std::sync::OnceLock;

fn line_comment() -> &'static Regex {
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
    LINE_COMMENT.get_or_init(|| Regex::new(r"//[^\n]*").expect("line comment pattern is valid"))
}

/// Reduce consequence text to a comparable form.
///
/// `//` comments are removed up to the next newline (or the end of the text), then
/// every newline, carriage return, tab and space is dropped. The result is lossy:
/// `//` inside a string literal also starts a comment.
pub fn normalize_consequence(text: &str) -> String {
    line_comment()
        .replace_all(text, "")
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t' | ' '))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_whitespace() {
        assert_eq!(
            normalize_consequence("// comment\n  retract(f);  \n"),
            "retract(f);"
        );
    }

    #[test]
    fn unterminated_comment_runs_to_end() {
        assert_eq!(normalize_consequence("update(f); // done"), "update(f);");
    }

    #[test]
    fn comment_marker_inside_string_is_stripped_too() {
        assert_eq!(
            normalize_consequence("log(\"http://x\");\nretract(f);"),
            "log(\"http:retract(f);"
        );
    }
}
