//! Layout lexer
//!
//! Splits a layout into literal text and `{{ ... }}` actions. Trim markers
//! (`{{- ` and ` -}}`) and comments are resolved here so the parser only
//! sees text and action bodies.

use crate::error::{RenderError, RenderResult};

const OPEN: &str = "{{";
const CLOSE: &[u8] = b"}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    Text(String),
    Action { body: String, line: usize },
}

pub(crate) fn lex(source: &str) -> RenderResult<Vec<Item>> {
    let mut items = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next = false;

    while let Some(open) = rest.find(OPEN) {
        let after_open = &rest[open + OPEN.len()..];
        let trim_before = starts_with_trim_marker(after_open);

        let mut text = &rest[..open];
        if trim_next {
            text = text.trim_start();
        }
        if trim_before {
            text = text.trim_end();
        }
        if !text.is_empty() {
            items.push(Item::Text(text.to_string()));
        }
        line += rest[..open].matches('\n').count();

        let body_start = usize::from(trim_before);
        let close = find_close(&after_open[body_start..])
            .ok_or_else(|| RenderError::syntax(line, "unclosed action"))?;
        let raw = &after_open[body_start..body_start + close];

        let (body, trim_after) = match raw.strip_suffix('-') {
            Some(stripped) if stripped.ends_with(char::is_whitespace) => (stripped, true),
            _ => (raw, false),
        };

        let action_line = line;
        line += raw.matches('\n').count();
        rest = &after_open[body_start + close + CLOSE.len()..];
        trim_next = trim_after;

        let body = body.trim();
        if body.starts_with("/*") {
            if body.len() < 4 || !body.ends_with("*/") {
                return Err(RenderError::syntax(action_line, "unclosed comment"));
            }
            continue;
        }

        items.push(Item::Action {
            body: body.to_string(),
            line: action_line,
        });
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }

    Ok(items)
}

/// `{{-` only trims when the dash is followed by whitespace; `{{-3}}` is a number.
fn starts_with_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// Offset of the closing `}}`, skipping over quoted strings
fn find_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if q == b'"' && b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'`' {
                    quote = Some(b);
                } else if bytes[i..].starts_with(CLOSE) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(body: &str, line: usize) -> Item {
        Item::Action {
            body: body.to_string(),
            line,
        }
    }

    #[test]
    fn test_text_and_actions() {
        let items = lex("Hello {{.Name}}!\nBye {{ .Other }}").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Text("Hello ".to_string()),
                action(".Name", 1),
                Item::Text("!\nBye ".to_string()),
                action(".Other", 2),
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        let items = lex("a  \n {{- .X -}} \n  b").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Text("a".to_string()),
                action(".X", 2),
                Item::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_number_is_not_trim() {
        let items = lex("x {{-3}}").unwrap();
        assert_eq!(items, vec![Item::Text("x ".to_string()), action("-3", 1)]);
    }

    #[test]
    fn test_comment_is_dropped() {
        let items = lex("a{{/* note */}}b").unwrap();
        assert_eq!(
            items,
            vec![Item::Text("a".to_string()), Item::Text("b".to_string())]
        );
    }

    #[test]
    fn test_close_inside_string() {
        let items = lex(r#"{{Fmt "}}" .X}}"#).unwrap();
        assert_eq!(items, vec![action(r#"Fmt "}}" .X"#, 1)]);
    }

    #[test]
    fn test_unclosed_action() {
        let err = lex("line1\nline2 {{.Name").unwrap_err();
        assert_eq!(
            err,
            RenderError::Syntax {
                line: 2,
                message: "unclosed action".to_string()
            }
        );
    }

    #[test]
    fn test_empty_source() {
        assert!(lex("").unwrap().is_empty());
    }
}
