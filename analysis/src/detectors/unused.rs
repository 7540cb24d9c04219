use sonar_lsp::SymbolKind;

use super::{Confidence, UnusedSymbol};
use crate::index::{SymbolEntry, SymbolIndex};

/// Names invoked by runtimes or test harnesses rather than by code.
fn is_entry_point(name: &str) -> bool {
    name == "main" || name.starts_with("test_")
}

fn confidence(kind: SymbolKind) -> Option<Confidence> {
    match kind {
        SymbolKind::Class | SymbolKind::Function => Some(Confidence::High),
        SymbolKind::Method | SymbolKind::Interface => Some(Confidence::Medium),
        _ => None,
    }
}

fn is_candidate(entry: &SymbolEntry) -> bool {
    !entry.name.starts_with('_') && !entry.name.starts_with('#') && !is_entry_point(&entry.name)
}

/// Exportable symbols with no references outside their own declaration.
///
/// Entries whose references were never collected are not judged.
#[must_use]
pub fn detect(index: &SymbolIndex) -> Vec<UnusedSymbol> {
    let mut findings: Vec<UnusedSymbol> = index
        .entries()
        .iter()
        .filter(|entry| is_candidate(entry))
        .filter_map(|entry| {
            let confidence = confidence(entry.kind)?;
            let references = entry.external_references()?;
            references.is_empty().then(|| UnusedSymbol {
                symbol: index.symbol_ref(entry),
                confidence,
            })
        })
        .collect();

    findings.sort_by(|a, b| {
        a.confidence
            .cmp(&b.confidence)
            .then_with(|| a.symbol.file.cmp(&b.symbol.file))
            .then_with(|| a.symbol.line.cmp(&b.symbol.line))
    });
    findings
}
