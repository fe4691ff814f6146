//! Parser for Freelancer's textual INI dialect
//!
//! The game's loader is famously tolerant: repeated section names, repeated
//! keys, trailing junk after a section header, comments anywhere, and a mix
//! of CRLF and LF line endings all occur in shipping files and in mods.
//! That rules out a conforming INI grammar, so this parser mirrors the
//! loader instead: anything the game accepts is accepted, and a malformed
//! line is diagnosed and skipped rather than aborting the file.
//!
//! Tokens on the right of `=` are comma-separated and typed by precedence:
//! base-10 integer, then float, then the `true`/`false` literals, then a
//! raw (unquoted) string. Section names and keys are lowercased on
//! ingestion; string values keep their case.

use tracing::warn;

use crate::error::Error;
use crate::formats::{decode_windows_1252, Entry, Section, Value};

const COMMENT: char = ';';
const KEY_VALUE: char = '=';

/// Parse the textual dialect into an ordered list of sections.
///
/// `origin` names the source in diagnostics. This function does not fail:
/// malformed lines are skipped with a warning, matching the game's loader.
pub fn parse(data: &[u8], origin: &str) -> Vec<Section> {
    // UTF-8 BOM from text editors is tolerated; the rest is Windows-1252
    let data = data.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(data);
    let text = decode_windows_1252(data);

    let mut sections: Vec<Section> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = match raw.find(COMMENT) {
            Some(at) => &raw[..at],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            // everything after the closing bracket is ignored
            match rest.find(']') {
                Some(end) => {
                    sections.push(Section::new(rest[..end].trim().to_ascii_lowercase()));
                }
                None => skip(origin, index, "unterminated section header"),
            }
            continue;
        }

        let Some((key, rest)) = line.split_once(KEY_VALUE) else {
            skip(origin, index, "expected `key = value`");
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            skip(origin, index, "entry with empty key");
            continue;
        }
        let Some(section) = sections.last_mut() else {
            skip(origin, index, "entry outside of any section");
            continue;
        };

        let values = rest.split(',').map(|t| parse_token(t.trim())).collect();
        section.entries.push(Entry { key, values });
    }
    sections
}

fn skip(origin: &str, index: usize, reason: &str) {
    let diagnostic = Error::MalformedText {
        file: origin.to_string(),
        line: index + 1,
        reason: reason.to_string(),
    };
    warn!("skipping line: {diagnostic}");
}

fn parse_token(token: &str) -> Value {
    if let Ok(i) = token.parse::<i32>() {
        Value::Int(i)
    } else if let Ok(f) = token.parse::<f32>() {
        Value::Float(f)
    } else if token.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if token.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        Value::Str(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> Vec<Section> {
        parse(text.as_bytes(), "test.ini")
    }

    #[test]
    fn test_mixed_value_types() {
        let sections = parse_str("[Object]\nnickname = li01, foo, 3.5\n");
        assert_eq!(sections[0].name, "object");
        let entry = &sections[0].entries[0];
        assert_eq!(entry.key, "nickname");
        assert_eq!(
            entry.values,
            vec![
                Value::Str("li01".into()),
                Value::Str("foo".into()),
                Value::Float(3.5)
            ]
        );
    }

    #[test]
    fn test_boolean_literals() {
        let sections = parse_str("[Gun]\nlootable = TRUE\nauto_turret = false\n");
        assert_eq!(sections[0].boolean("lootable"), Some(true));
        assert_eq!(sections[0].boolean("auto_turret"), Some(false));
    }

    #[test]
    fn test_crlf_bom_and_comments() {
        let mut data = b"\xEF\xBB\xBF".to_vec();
        data.extend_from_slice(
            b"; leading comment\r\n[System]  trailing junk\r\nnickname = li01 ; eol comment\r\n\r\n",
        );
        let sections = parse(&data, "test.ini");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "system");
        assert_eq!(sections[0].string("nickname"), Some("li01"));
    }

    #[test]
    fn test_repeated_sections_and_keys_keep_order() {
        let sections = parse_str(
            "[Object]\nnickname = a\n[Object]\nnickname = b\nrumor = one\nrumor = two\n",
        );
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].string("nickname"), Some("b"));
        let rumors: Vec<_> = sections[1]
            .get_all("rumor")
            .filter_map(Entry::as_str)
            .collect();
        assert_eq!(rumors, ["one", "two"]);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let sections = parse_str("orphan = 1\n[Zone]\njust some words\n= no key\nsize = 400\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].entries.len(), 1);
        assert_eq!(sections[0].int("size"), Some(400));
    }

    #[test]
    fn test_values_keep_case_keys_do_not() {
        let sections = parse_str("[Base]\nStrid_Name = 458752\nFile = Systems\\Li01\\Li01.ini\n");
        assert_eq!(sections[0].int("strid_name"), Some(458752));
        assert_eq!(sections[0].string("file"), Some("Systems\\Li01\\Li01.ini"));
    }

    #[test]
    fn test_negative_and_float_tokens() {
        let sections = parse_str("[Zone]\npos = -45000, 0, 75000.5\n");
        assert_eq!(sections[0].vec3("pos"), Some((-45000.0, 0.0, 75000.5)));
    }
}
