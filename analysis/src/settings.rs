//! Analysis tuning knobs and detector selection.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sonar_lsp::SessionOptions;

/// The six detectors, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    Unused,
    Signatures,
    Cooccurrence,
    DeadParams,
    Hotspots,
    SimilarTypes,
}

impl DetectorKind {
    pub const ALL: [Self; 6] = [
        Self::Unused,
        Self::Signatures,
        Self::Cooccurrence,
        Self::DeadParams,
        Self::Hotspots,
        Self::SimilarTypes,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Signatures => "signatures",
            Self::Cooccurrence => "cooccurrence",
            Self::DeadParams => "dead-params",
            Self::Hotspots => "hotspots",
            Self::SimilarTypes => "similar-types",
        }
    }

    /// Needs `textDocument/references` results on the index.
    #[must_use]
    pub const fn needs_references(self) -> bool {
        matches!(self, Self::Unused | Self::Hotspots)
    }

    /// Needs `textDocument/hover` results on the index.
    #[must_use]
    pub const fn needs_hover(self) -> bool {
        matches!(self, Self::Signatures)
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analysis `{0}` (expected one of: unused, signatures, cooccurrence, dead-params, hotspots, similar-types)")]
pub struct UnknownDetector(String);

impl FromStr for DetectorKind {
    type Err = UnknownDetector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownDetector(s.to_string()))
    }
}

/// `[analysis]` section.
///
/// ```toml
/// [analysis]
/// detectors = ["unused", "hotspots"]
/// hotspot_threshold = 10
/// similarity_floor = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub detectors: Vec<DetectorKind>,
    /// Minimum reference count for a hotspot.
    pub hotspot_threshold: usize,
    /// Minimum Jaccard score for a similar-type pair.
    pub similarity_floor: f64,
    /// Minimum number of files a co-occurring pair must share.
    pub min_shared_files: usize,
    /// Minimum number of shared properties for a similar-type pair.
    pub min_shared_properties: usize,
    pub request_timeout_ms: u64,
    pub init_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let session = SessionOptions::default();
        Self {
            detectors: DetectorKind::ALL.to_vec(),
            hotspot_threshold: 10,
            similarity_floor: 0.5,
            min_shared_files: 3,
            min_shared_properties: 2,
            request_timeout_ms: duration_ms(session.request_timeout),
            init_timeout_ms: duration_ms(session.init_timeout),
            shutdown_grace_ms: duration_ms(session.shutdown_grace),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AnalysisSettings {
    /// Enabled detectors, deduplicated, in report order.
    #[must_use]
    pub fn enabled(&self) -> Vec<DetectorKind> {
        let mut kinds = self.detectors.clone();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            init_timeout: Duration::from_millis(self.init_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }
}
