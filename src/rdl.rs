//! RDL (Render Display List) markup conversion
//!
//! Infocards are stored as XML-encoded RDL, the game's own rich-text tag
//! language. This module converts it with a tag-by-tag substitution table
//! (based on work by adoxa and cshake): known formatting tags map to a
//! whitelisted subset of HTML, everything unrecognised is stripped. A full
//! RDL interpreter is deliberately not attempted.

/// Output format for an infocard lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// Substitute known RDL tags with HTML, strip the rest.
    #[default]
    Html,
    /// Strip all markup; paragraph breaks become newlines.
    Plain,
    /// The raw RDL markup as decoded from the resource DLL.
    Rdl,
}

/// RDL tags to HTML. The `<TRA/>` attribute soup encodes bold/italic/
/// colour state transitions; only the combinations that actually occur in
/// the game files are listed.
const RDL_TO_HTML: &[(&str, &str)] = &[
    ("<TRA data=\"1\" mask=\"1\" def=\"-2\"/>", "<b>"),
    ("<TRA bold=\"true\"/>", "<b>"),
    ("<TRA data=\"0\" mask=\"1\" def=\"-1\"/>", "</b>"),
    ("<TRA data=\"0x00000001\" mask=\"-1\" def=\"-2\"/>", "<b>"),
    ("<TRA data=\"0x00000000\" mask=\"-1\" def=\"-1\"/>", "</b>"),
    ("<TRA data=\"2\" mask=\"3\" def=\"-3\"/>", "<i>"),
    ("<TRA data=\"0\" mask=\"3\" def=\"-1\"/>", "</i>"),
    ("<TRA data=\"98\" mask=\"-29\" def=\"-3\"/>", "<i>"),
    ("<TRA data=\"96\" mask=\"-29\" def=\"-1\"/>", "</i>"),
    ("<TRA data=\"2\" mask=\"2\" def=\"-3\"/>", "<i>"),
    ("<TRA data=\"0\" mask=\"2\" def=\"-1\"/>", "</i>"),
    ("<TRA data=\"5\" mask=\"5\" def=\"-6\"/>", "<b><u>"),
    ("<TRA data=\"0\" mask=\"5\" def=\"-1\"/>", "</b></u>"),
    ("<TRA data=\"5\" mask=\"7\" def=\"-6\"/>", "<b><u>"),
    ("<TRA data=\"0\" mask=\"7\" def=\"-1\"/>", "</b></u>"),
    (
        "<TRA data=\"65280\" mask=\"-32\" def=\"31\"/>",
        "<span style=\"color: red\">",
    ),
    ("<TRA data=\"96\" mask=\"-32\" def=\"-1\"/>", "</span>"),
    (
        "<TRA data=\"65281\" mask=\"-31\" def=\"30\"/>",
        "<b><span style=\"color: red\">",
    ),
    ("<TRA data=\"96\" mask=\"-31\" def=\"-1\"/>", "</b></span>"),
    (
        "<TRA data=\"-16777216\" mask=\"-32\" def=\"31\"/>",
        "<span style=\"color: blue\">",
    ),
    ("<PARA/>", "<p>"),
    ("</PARA>", "</p>"),
    ("<JUST loc=\"left\"/>", "<p style=\"text-align: left\">"),
    ("<JUST loc=\"center\"/>", "<p style=\"text-align: center\">"),
    ("\u{a0}", "&nbsp;"),
];

/// Convert RDL markup to HTML: apply the substitution table, then strip
/// whatever RDL tags remain unrecognised.
pub fn to_html(rdl: &str) -> String {
    let mut result = rdl.to_string();
    for (tag, html) in RDL_TO_HTML {
        if result.contains(tag) {
            result = result.replace(tag, html);
        }
    }
    strip_rdl_tags(&result)
}

/// Convert markup to plain text: paragraph breaks (RDL or the HTML this
/// module emits) become newlines and every other tag is dropped, so
/// `to_plain(to_html(x)) == to_plain(x)`.
pub fn to_plain(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            // unterminated tag; everything after it is markup
            break;
        };
        let tag = &rest[open + 1..open + close];
        if is_paragraph_tag(tag) {
            out.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    if !rest.contains('<') {
        out.push_str(rest);
    }
    out.replace("&nbsp;", "\u{a0}")
}

/// Opening paragraph-like tags, RDL and HTML alike.
fn is_paragraph_tag(tag: &str) -> bool {
    let name = tag
        .split([' ', '/'])
        .find(|part| !part.is_empty())
        .unwrap_or("");
    !tag.starts_with('/') && (name.eq_ignore_ascii_case("para") || name.eq_ignore_ascii_case("p") || name.eq_ignore_ascii_case("just"))
}

/// Remove tags the substitution table did not recognise. RDL tag names are
/// uppercase (and the XML declaration starts with `?`), while the HTML the
/// table emits is lowercase, so this never eats our own output.
fn strip_rdl_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let is_rdl = after
            .trim_start_matches('/')
            .starts_with(|c: char| c.is_ascii_uppercase() || c == '?');
        match (is_rdl, after.find('>')) {
            (true, Some(close)) => {
                out.push_str(&rest[..open]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..open + 1]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
