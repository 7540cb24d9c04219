//! Cross-file detectors over a finished [`SymbolIndex`].
//!
//! Each detector is a pure function of the index and the settings; they can
//! run in any order.

mod cooccurrence;
mod dead_params;
mod hotspots;
mod signatures;
mod similar_types;
mod unused;

use serde::Serialize;
use sonar_lsp::SymbolKind;

use crate::index::{SymbolIndex, SymbolRef};
use crate::settings::{AnalysisSettings, DetectorKind};

pub use cooccurrence::detect as detect_cooccurrence;
pub use dead_params::detect as detect_dead_params;
pub use hotspots::detect as detect_hotspots;
pub use signatures::detect as detect_signatures;
pub use similar_types::detect as detect_similar_types;
pub use unused::detect as detect_unused;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnusedSymbol {
    pub symbol: SymbolRef,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureGroup {
    pub signature: String,
    pub members: Vec<SymbolRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CooccurrencePair {
    pub symbol_a: String,
    pub symbol_b: String,
    pub shared_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadParameter {
    pub symbol: SymbolRef,
    pub param: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub symbol: SymbolRef,
    pub reference_count: usize,
    pub referencing_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarTypePair {
    pub type_a: SymbolRef,
    pub type_b: SymbolRef,
    pub shared_properties: Vec<String>,
    pub similarity: f64,
}

/// Findings of one run, one list per detector, each already ranked.
///
/// A list is `None` when its detector did not run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Findings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unused: Option<Vec<UnusedSymbol>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<SignatureGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooccurrence: Option<Vec<CooccurrencePair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_params: Option<Vec<DeadParameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotspots: Option<Vec<Hotspot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_types: Option<Vec<SimilarTypePair>>,
}

impl Findings {
    /// Number of findings reported by `kind`, or `None` if it did not run.
    #[must_use]
    pub fn count(&self, kind: DetectorKind) -> Option<usize> {
        match kind {
            DetectorKind::Unused => self.unused.as_ref().map(Vec::len),
            DetectorKind::Signatures => self.signatures.as_ref().map(Vec::len),
            DetectorKind::Cooccurrence => self.cooccurrence.as_ref().map(Vec::len),
            DetectorKind::DeadParams => self.dead_params.as_ref().map(Vec::len),
            DetectorKind::Hotspots => self.hotspots.as_ref().map(Vec::len),
            DetectorKind::SimilarTypes => self.similar_types.as_ref().map(Vec::len),
        }
    }
}

/// Run one detector and store its ranked findings.
pub fn run(kind: DetectorKind, index: &SymbolIndex, settings: &AnalysisSettings, out: &mut Findings) {
    match kind {
        DetectorKind::Unused => out.unused = Some(detect_unused(index)),
        DetectorKind::Signatures => out.signatures = Some(detect_signatures(index)),
        DetectorKind::Cooccurrence => {
            out.cooccurrence = Some(detect_cooccurrence(index, settings.min_shared_files));
        }
        DetectorKind::DeadParams => out.dead_params = Some(detect_dead_params(index)),
        DetectorKind::Hotspots => {
            out.hotspots = Some(detect_hotspots(index, settings.hotspot_threshold));
        }
        DetectorKind::SimilarTypes => {
            out.similar_types = Some(detect_similar_types(
                index,
                settings.similarity_floor,
                settings.min_shared_properties,
            ));
        }
    }
    tracing::info!(detector = %kind, findings = out.count(kind).unwrap_or(0), "Detector finished");
}

/// Kinds that are top-level "units" for co-occurrence and hotspots.
fn is_unit_kind(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::Function | SymbolKind::Class | SymbolKind::Interface
    )
}
