//! Python literal helpers for text scraped from the REPL.
//!
//! The interpreter answers in `repr()` syntax, so listings come back as
//! `['boot.py', 'main.py']` and `os.uname()` as a named tuple. Nothing here
//! decodes escape sequences or nested structures; the functions only pick
//! quoted strings out of plain text and never fail.

/// Extract the quoted string elements of a Python list or tuple literal.
///
/// One matching pair of outer `[...]` or `(...)` is stripped, then every
/// `'...'` or `"..."` substring is returned without its quotes, in
/// left-to-right order. Unquoted tokens such as numbers or `None` are
/// skipped, and an unterminated quote is ignored rather than reported.
pub fn parse_str_sequence(input: &str) -> Vec<String> {
    let input = strip_outer_brackets(input.trim());
    if input.is_empty() {
        return Vec::new();
    }

    quoted_spans(input)
        .into_iter()
        .map(|(start, end)| input[start..end].to_string())
        .collect()
}

/// Extract `name='value'` pairs from a named-tuple repr such as the one
/// printed by `os.uname()`.
pub fn parse_keyword_strings(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (start, end) in quoted_spans(input) {
        // start points past the opening quote
        let before = input[..start - 1].trim_end();
        let Some(before) = before.strip_suffix('=') else {
            continue;
        };
        let before = before.trim_end();
        let key_start = before
            .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_')
            .len();
        let key = &before[key_start..];
        if !key.is_empty() {
            pairs.push((key.to_string(), input[start..end].to_string()));
        }
    }
    pairs
}

/// Render `text` as a single-quoted Python string literal.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn strip_outer_brackets(input: &str) -> &str {
    if (input.starts_with('[') && input.ends_with(']'))
        || (input.starts_with('(') && input.ends_with(')'))
    {
        return &input[1..input.len() - 1];
    }
    input
}

/// Byte ranges of the contents of every quoted substring, quotes excluded.
fn quoted_spans(input: &str) -> Vec<(usize, usize)> {
    let bytes = input.as_bytes();
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let quote = bytes[pos];
        if quote != b'\'' && quote != b'"' {
            pos += 1;
            continue;
        }
        match bytes[pos + 1..].iter().position(|&b| b == quote) {
            Some(len) => {
                let start = pos + 1;
                spans.push((start, start + len));
                pos = start + len + 1;
            }
            // unterminated: skip this quote and keep scanning
            None => pos += 1,
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_str_sequence("['hello', 'world']"), vec!["hello", "world"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_str_sequence("").is_empty());
        assert!(parse_str_sequence("   \r\n").is_empty());
        assert!(parse_str_sequence("[]").is_empty());
        assert!(parse_str_sequence("()").is_empty());
    }

    #[test]
    fn test_parse_tuple() {
        assert_eq!(parse_str_sequence("('a', 'b', 'c')"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_mixed_quotes() {
        assert_eq!(
            parse_str_sequence(r#"["mixed", 'quotes']"#),
            vec!["mixed", "quotes"]
        );
    }

    #[test]
    fn test_parse_keeps_quote_of_other_kind() {
        assert_eq!(
            parse_str_sequence(r#"["it's", 'say "hi"']"#),
            vec!["it's", "say \"hi\""]
        );
    }

    #[test]
    fn test_parse_ignores_unquoted_tokens() {
        assert_eq!(
            parse_str_sequence("[1, 'a', None, 2.5, 'b']"),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_parse_unterminated_quote() {
        assert_eq!(parse_str_sequence("['ok', 'broken"), vec!["ok"]);
        assert_eq!(parse_str_sequence(r#"'abc "d""#), vec!["d"]);
    }

    #[test]
    fn test_parse_empty_string_element() {
        assert_eq!(parse_str_sequence("['', 'x']"), vec!["", "x"]);
    }

    #[test]
    fn test_parse_without_brackets() {
        assert_eq!(parse_str_sequence("'lib', 'main.py'"), vec!["lib", "main.py"]);
    }

    #[test]
    fn test_parse_keyword_strings() {
        let uname = "(sysname='rp2', nodename='rp2', release='1.22.0', \
                     version='v1.22.0 on 2023-12-27 (GNU 11.2.1 MinSizeRel)', \
                     machine='Raspberry Pi Pico with RP2040')";
        let pairs = parse_keyword_strings(uname);
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], ("sysname".to_string(), "rp2".to_string()));
        assert_eq!(pairs[3].0, "version");
        assert_eq!(pairs[3].1, "v1.22.0 on 2023-12-27 (GNU 11.2.1 MinSizeRel)");
        assert_eq!(pairs[4].1, "Raspberry Pi Pico with RP2040");
    }

    #[test]
    fn test_parse_keyword_strings_skips_positional() {
        let pairs = parse_keyword_strings("('x', key = 'v', 3)");
        assert_eq!(pairs, vec![("key".to_string(), "v".to_string())]);

        assert!(parse_keyword_strings("(é='v')").is_empty());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("main.py"), "'main.py'");
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote("a\\b"), r"'a\\b'");
        assert_eq!(quote("l1\nl2\r\tx"), r"'l1\nl2\r\tx'");
        assert_eq!(quote("\u{1b}[0m"), r"'\x1b[0m'");
        assert_eq!(quote("héllo"), "'héllo'");
    }
}
