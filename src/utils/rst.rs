//! Helpers for emitting reStructuredText source, and a reader for the
//! section structure of existing documents.

use serde::Serialize;

/// Underline characters in section nesting order.
pub const SECTION_LEVELS: [char; 8] = ['=', '_', '-', '\'', '"', '^', '#', '*'];

pub const HORIZONTAL_RULE: &str = "\n\n----\n\n";

/// Format `text` as a section title, underlined (and optionally overlined)
/// with `underline` or the top level character.
pub fn title(text: &str, underline: Option<char>, top_line: bool) -> String {
    let underline = underline.unwrap_or(SECTION_LEVELS[0]);
    let text = text.trim();
    let rule: String = std::iter::repeat(underline)
        .take(text.chars().count())
        .collect();
    let mut out = String::new();
    if top_line {
        out.push_str(&rule);
        out.push('\n');
    }
    out.push_str(text);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n\n");
    out
}

/// Render `:key: value` lines in the given order.
pub fn metadata<K: AsRef<str>, V: AsRef<str>>(fields: &[(K, V)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!(":{}: {}\n", key.as_ref(), value.as_ref()))
        .collect()
}

/// A literal block holding `text` verbatim.
pub fn literal_block(text: &str) -> String {
    let mut out = String::from("::\n\n");
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

pub fn image(path: &str) -> String {
    format!(".. image:: {}\n", path)
}

/// A `.. raw:: html` directive wrapping `html`.
pub fn raw_html(html: &str) -> String {
    let mut out = String::from(".. raw:: html\n\n");
    for line in html.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// One section heading, with its nesting level starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: usize,
    pub title: String,
    pub line: usize,
}

/// Title, docinfo fields and section outline of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentTree {
    pub title: Option<String>,
    pub metadata: Vec<(String, String)>,
    pub sections: Vec<Heading>,
}

/// A line made of one repeated punctuation character, flush left.
fn adornment(line: &str) -> Option<char> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    if !first.is_ascii_punctuation() || line.chars().count() < 2 {
        return None;
    }
    line.chars().all(|c| c == first).then_some(first)
}

fn is_text(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with(char::is_whitespace)
}

fn docinfo_field(line: &str) -> Option<(String, String)> {
    let (key, value) = line.strip_prefix(':')?.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Read the section structure of a reStructuredText document.
///
/// Levels follow the order in which adornment styles first appear. A lone
/// heading at the very top becomes the document title, and a field list
/// directly after it becomes the metadata.
pub fn parse_structure(text: &str) -> DocumentTree {
    let lines: Vec<&str> = text.lines().collect();
    let mut styles: Vec<(char, bool)> = Vec::new();
    let mut tree = DocumentTree::default();
    let mut title_end = None;
    let mut i = 0;

    while i < lines.len() {
        let preceded_by_blank = i == 0 || lines[i - 1].trim().is_empty();
        let found = if let (Some(over), true) = (adornment(lines[i]), i + 2 < lines.len()) {
            let under = adornment(lines[i + 2]);
            (is_text(lines[i + 1].trim_start()) && under == Some(over))
                .then(|| ((over, true), lines[i + 1].trim(), i + 2, 3))
        } else {
            None
        };
        let found = found.or_else(|| {
            if !preceded_by_blank || !is_text(lines[i]) || adornment(lines[i]).is_some() {
                return None;
            }
            let under_line = lines.get(i + 1)?;
            let under = adornment(under_line)?;
            let title = lines[i].trim();
            (under_line.trim_end().chars().count() >= title.chars().count())
                .then(|| ((under, false), title, i + 1, 2))
        });

        match found {
            Some((style, title, line, consumed)) => {
                let level = match styles.iter().position(|s| *s == style) {
                    Some(index) => index + 1,
                    None => {
                        styles.push(style);
                        styles.len()
                    }
                };
                if tree.sections.is_empty() && level == 1 && is_preamble(&lines[..i]) {
                    tree.title = Some(title.to_string());
                    title_end = Some(i + consumed);
                }
                tree.sections.push(Heading {
                    level,
                    title: title.to_string(),
                    line,
                });
                i += consumed;
            }
            None => i += 1,
        }
    }

    if let Some(start) = title_end {
        tree.metadata = lines[start..]
            .iter()
            .skip_while(|line| line.trim().is_empty())
            .map_while(|line| docinfo_field(line))
            .collect();
    }
    tree
}

fn is_preamble(lines: &[&str]) -> bool {
    lines.iter().all(|line| line.trim().is_empty())
}
