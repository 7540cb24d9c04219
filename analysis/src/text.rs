//! Textual heuristics over source text and hover strings.
//!
//! These are approximations that work on raw text; they do not parse any
//! particular language.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use sonar_lsp::Position;

/// Receivers that are never reported as dead parameters.
const RECEIVERS: &[&str] = &["self", "this", "cls"];

/// Leading words dropped when normalizing a signature.
const DECLARATION_KEYWORDS: &[&str] = &[
    "export", "default", "declare", "async", "function", "def", "fn", "func", "pub", "static",
    "public", "private", "protected", "const", "let", "var", "method", "abstract", "override",
    "unsafe", "extern",
];

/// Modifiers that may precede a field or parameter name.
const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "readonly", "static", "declare", "pub", "pub(crate)",
    "override", "abstract", "mut", "var", "let", "val", "const",
];

static FIELD_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^#?([A-Za-z_$][A-Za-z0-9_$]*)\??!?\s*([:=;,]|$)"));

static SELF_ATTR_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\bself\.([A-Za-z_][A-Za-z0-9_]*)\s*(?::[^=\n]*)?=[^=]"));

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte offset of an LSP position. Characters are counted as chars, which
/// matches UTF-16 for the BMP.
#[must_use]
pub fn offset_of(text: &str, position: Position) -> Option<usize> {
    let mut line_start = 0;
    for _ in 0..position.line {
        line_start += text[line_start..].find('\n')? + 1;
    }
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |i| line_start + i);
    let line = &text[line_start..line_end];
    let column = line
        .char_indices()
        .nth(position.character as usize)
        .map_or(line.len(), |(i, _)| i);
    Some(line_start + column)
}

/// Find the `)` matching the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested in brackets, braces, parens or
/// generics.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = '\0';
    for (i, c) in list.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            // `=>` is an arrow, not a closing generic.
            '>' if prev != '=' && prev != '-' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&list[start..]);
    parts
}

/// Position of the first `:` or `=` at nesting depth zero.
fn top_level_char(item: &str, wanted: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut prev = '\0';
    for (i, c) in item.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '>' if prev != '=' && prev != '-' => depth -= 1,
            c if c == wanted && depth == 0 => {
                // `==`, `=>`, `::` are not separators.
                let next = item[i + c.len_utf8()..].chars().next();
                if next != Some('=') && next != Some('>') && next != Some(':') && prev != ':' {
                    return Some(i);
                }
            }
            _ => {}
        }
        prev = c;
    }
    None
}

fn strip_modifiers(mut item: &str) -> &str {
    loop {
        let trimmed = item.trim_start();
        let next = MEMBER_MODIFIERS.iter().find_map(|modifier| {
            trimmed
                .strip_prefix(modifier)
                .filter(|rest| rest.starts_with(char::is_whitespace))
        });
        match next {
            Some(rest) => item = rest,
            None => return trimmed,
        }
    }
}

/// Parameter identifier of one parameter-list item, or `None` for
/// receivers, destructuring patterns, markers and `_`-prefixed names.
fn param_name(item: &str) -> Option<&str> {
    let item = strip_modifiers(item.trim());
    let item = item
        .trim_start_matches('&')
        .trim_start_matches("...")
        .trim_start_matches('*');
    let item = strip_modifiers(item);
    if item.starts_with('{') || item.starts_with('[') || item.starts_with('(') {
        return None;
    }
    let end = item
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(item.len(), |(i, _)| i);
    let name = &item[..end];
    if name.is_empty()
        || name.starts_with('_')
        || name.starts_with(|c: char| c.is_ascii_digit())
        || RECEIVERS.contains(&name)
    {
        return None;
    }
    Some(name)
}

/// Parameters of the callable declared at `start`, plus the byte offset just
/// past the closing `)`.
#[must_use]
pub fn parameters(text: &str, start: Position) -> Option<(Vec<String>, usize)> {
    let from = offset_of(text, start)?;
    let open = from + text[from..].find('(')?;
    // The parameter list must start on the declaration line.
    if text[from..open].contains('\n') {
        return None;
    }
    let close = matching_paren(text, open)?;
    let names = split_top_level(&text[open + 1..close])
        .into_iter()
        .filter_map(param_name)
        .map(String::from)
        .collect();
    Some((names, close + 1))
}

/// Whether `word` occurs in `haystack` as a whole identifier, bounded on
/// both sides by a non-identifier char or the end of the text.
#[must_use]
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce hover text to a name-free signature shape.
///
/// `function add(a: number, b: number): number` and
/// `(method) Calc.sum(x: number, y: number): number` both become
/// `(number, number): number`. Untyped parameters become `_`.
#[must_use]
pub fn normalize_signature(hover: &str) -> Option<String> {
    // The signature is the first paragraph; documentation follows.
    let first = hover
        .split("\n\n")
        .map(str::trim)
        .find(|block| !block.is_empty())?;
    let mut rest = collapse_whitespace(first);

    // `(method) ...` style tags.
    if rest.starts_with('(')
        && let Some(end) = rest.find(')')
        && rest[1..end].chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
        && end > 1
    {
        rest = rest[end + 1..].trim_start().to_string();
    }
    loop {
        let stripped = DECLARATION_KEYWORDS.iter().find_map(|kw| {
            rest.strip_prefix(kw)
                .filter(|r| r.starts_with(' '))
                .map(|r| r.trim_start().to_string())
        });
        match stripped {
            Some(next) => rest = next,
            None => break,
        }
    }

    let open = rest.find('(')?;
    let close = matching_paren(&rest, open)?;
    let params: Vec<String> = split_top_level(&rest[open + 1..close])
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter(|item| {
            let name = item.trim_start_matches('&').split([':', ' ']).next().unwrap_or("");
            !RECEIVERS.contains(&name)
        })
        .map(|item| {
            let item = match top_level_char(item, '=') {
                Some(eq) => item[..eq].trim(),
                None => item,
            };
            match top_level_char(item, ':') {
                Some(colon) => item[colon + 1..].trim().to_string(),
                None if item.starts_with("...") || item.starts_with('*') => "..._".to_string(),
                None => "_".to_string(),
            }
        })
        .collect();
    let tail = rest[close + 1..].trim();
    let mut normalized = format!("({})", params.join(", "));
    if !tail.is_empty() {
        if !tail.starts_with(':') {
            normalized.push(' ');
        }
        normalized.push_str(tail);
    }
    Some(normalized)
}

/// Property names declared directly in the type body starting at `start`.
///
/// Brace-delimited bodies are tracked by depth; a header ending in `:`
/// switches to indentation (Python classes).
#[must_use]
pub fn type_properties(text: &str, start: Position) -> Vec<String> {
    let Some(from) = offset_of(text, start) else {
        return Vec::new();
    };
    // Skip to the first `{` or a header-terminating `:` at line end.
    let mut brace = None;
    let mut colon_line_end = None;
    let mut line_start = from;
    for line in text[from..].split_inclusive('\n').take(8) {
        let trimmed = line.trim_end();
        if let Some(i) = line.find('{') {
            brace = Some(line_start + i);
            break;
        }
        if trimmed.ends_with(':') {
            colon_line_end = Some(line_start + line.len());
            break;
        }
        line_start += line.len();
    }

    let mut names = BTreeSet::new();
    if let Some(open) = brace {
        brace_body_properties(text, open, &mut names);
    } else if let Some(body_start) = colon_line_end {
        let header_indent = indent_of(line_at(text, from));
        indented_body_properties(&text[body_start..], header_indent, &mut names);
    }
    names.into_iter().collect()
}

fn line_at(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
    &text[start..end]
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn field_name(line: &str) -> Option<String> {
    let line = strip_modifiers(line.trim());
    let re = FIELD_RE.as_ref().ok()?;
    let caps = re.captures(line)?;
    let name = caps.get(1)?.as_str();
    if name == "constructor" || (name.starts_with("__") && name.ends_with("__")) {
        return None;
    }
    Some(name.to_string())
}

fn brace_body_properties(text: &str, open: usize, names: &mut BTreeSet<String>) {
    let mut depth = 0usize;
    let mut statement = String::new();
    for c in text[open..].chars() {
        match c {
            '{' => {
                if depth == 1 {
                    flush_statement(&mut statement, names, true);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    flush_statement(&mut statement, names, false);
                    return;
                }
                if depth == 1 {
                    statement.clear();
                }
            }
            ';' | ',' | '\n' if depth == 1 => flush_statement(&mut statement, names, false),
            _ if depth == 1 => statement.push(c),
            _ => {}
        }
    }
}

/// Record the statement's leading name unless it opens a block (a method or
/// nested type).
fn flush_statement(statement: &mut String, names: &mut BTreeSet<String>, opens_block: bool) {
    let text = statement.trim();
    let is_member = !text.is_empty() && !text.contains('(') && !opens_block;
    if is_member
        && let Some(name) = field_name(text)
    {
        names.insert(name);
    }
    statement.clear();
}

fn indented_body_properties(body: &str, header_indent: usize, names: &mut BTreeSet<String>) {
    let mut body_indent = None;
    for line in body.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let indent = indent_of(line);
        if indent <= header_indent {
            break;
        }
        let level = *body_indent.get_or_insert(indent);
        let trimmed = line.trim();
        if indent == level
            && !trimmed.starts_with("def ")
            && !trimmed.starts_with("async ")
            && !trimmed.starts_with("class ")
            && !trimmed.starts_with('@')
            && let Some(name) = field_name(trimmed)
        {
            names.insert(name);
        }
        if let Ok(re) = SELF_ATTR_RE.as_ref() {
            for caps in re.captures_iter(trimmed) {
                if let Some(name) = caps.get(1) {
                    names.insert(name.as_str().to_string());
                }
            }
        }
    }
}
