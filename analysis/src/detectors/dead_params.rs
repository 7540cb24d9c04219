use super::DeadParameter;
use crate::index::SymbolIndex;
use crate::text::{contains_word, offset_of, parameters};

/// Parameters never mentioned in their function's body.
///
/// The parameter list is read from the name line, so decorators inside the
/// declaration range are skipped. The body is everything after the parameter
/// list up to the end of the declaration range. Names are matched textually, so a shadowing closure
/// parameter hides a dead outer one.
#[must_use]
pub fn detect(index: &SymbolIndex) -> Vec<DeadParameter> {
    let mut findings = Vec::new();
    for entry in index.entries() {
        if !entry.kind.is_callable() {
            continue;
        }
        let Some(text) = index.file_text(&entry.file) else {
            continue;
        };
        let Some((params, body_start)) = parameters(text, entry.selection_range.start) else {
            continue;
        };
        let Some(body_end) = offset_of(text, entry.range.end) else {
            continue;
        };
        // Signature-only declarations (overloads, abstract methods) have no body.
        let body = text.get(body_start..body_end).unwrap_or_default();
        if !has_body(body) {
            continue;
        }
        for param in params {
            if !contains_word(body, &param) {
                findings.push(DeadParameter {
                    symbol: index.symbol_ref(entry),
                    param,
                });
            }
        }
    }
    findings.sort_by(|a, b| {
        a.symbol
            .file
            .cmp(&b.symbol.file)
            .then_with(|| a.symbol.line.cmp(&b.symbol.line))
    });
    findings
}

/// A braced block, an arrow expression, or a colon-introduced suite that
/// continues on the next line.
fn has_body(body: &str) -> bool {
    if body.contains('{') || body.contains("=>") {
        return true;
    }
    let (header, rest) = body.split_once('\n').unwrap_or((body, ""));
    header.trim_end().ends_with(':') && !rest.trim().is_empty()
}
