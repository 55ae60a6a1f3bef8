//! COPY sub-protocol text-mode encoding (§4.7 COPY).
//!
//! Only the text format's row encoding is implemented; binary-format COPY
//! is out of scope (Non-goals). Decoding a COPY-out row back into columns
//! is left to the embedder -- this crate only hands back the raw bytes of
//! each `CopyData` chunk (§4.4 `CopyDataBody`).
//!
//! Grounded on the escaping table in the specification's COPY section,
//! in the style of the small free-function helpers in
//! `qs/src/postgres/pg_format.rs` (one function per concern, no trait
//! needed since there is nothing to generalize over).

/// Escapes one field value for COPY text format: backslash, backspace,
/// form feed, newline, tab, and vertical tab each become a two-character
/// backslash escape.
fn escape_field(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            other => out.push(other),
        }
    }
}

/// Encodes one COPY text-format row: tab-separated fields, each
/// backslash-escaped, SQL NULL as the literal two-character `\N`,
/// terminated by a newline.
pub fn encode_copy_row(columns: &[Option<&str>]) -> String {
    let mut out = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        match column {
            None => out.push_str("\\N"),
            Some(value) => escape_field(value, &mut out),
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_null_as_backslash_n() {
        assert_eq!(encode_copy_row(&[None]), "\\N\n");
    }

    #[test]
    fn joins_fields_with_tabs() {
        assert_eq!(encode_copy_row(&[Some("a"), Some("b")]), "a\tb\n");
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(encode_copy_row(&[Some("a\\b\tc\nd")]), "a\\\\b\\tc\\nd\n");
    }

    #[test]
    fn mixed_null_and_text_columns() {
        assert_eq!(encode_copy_row(&[Some("x"), None, Some("y")]), "x\t\\N\ty\n");
    }
}
