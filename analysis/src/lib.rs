//! Semantic analysis over a language-server session.
//!
//! [`Analyzer`] opens every source file, pulls outlines, references and hover
//! text into a [`SymbolIndex`], then runs the enabled detectors and returns an
//! [`AnalysisReport`].

pub mod detectors;
pub mod files;
pub mod index;
pub mod report;
pub mod settings;

mod engine;
mod text;

pub use detectors::{
    Confidence, CooccurrencePair, DeadParameter, Findings, Hotspot, SignatureGroup,
    SimilarTypePair, UnusedSymbol,
};
pub use engine::{AnalysisError, Analyzer, EngineState};
pub use files::{FileSelection, discover, language_id_for};
pub use index::{SymbolEntry, SymbolIndex, SymbolRef};
pub use report::{AnalysisReport, FileSummary, Summary};
pub use settings::{AnalysisSettings, DetectorKind, UnknownDetector};
