//! Result formatting: pretty JSON or sectioned text.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::detectors::{Confidence, Findings};
use crate::index::{SymbolIndex, SymbolRef};
use crate::settings::DetectorKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub symbols: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_analyzed: usize,
    pub total_symbols: usize,
    /// Findings per detector that ran, keyed by detector name.
    pub findings: BTreeMap<&'static str, usize>,
    /// Unused findings keyed by confidence.
    pub unused_by_confidence: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub workspace_root: String,
    pub server_command: String,
    pub summary: Summary,
    pub files: Vec<FileSummary>,
    pub findings: Findings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<DetectorKind>,
}

impl AnalysisReport {
    #[must_use]
    pub fn new(
        index: &SymbolIndex,
        server_command: &str,
        findings: Findings,
        skipped: Vec<DetectorKind>,
    ) -> Self {
        let files: Vec<FileSummary> = index
            .files()
            .iter()
            .map(|file| FileSummary {
                file: index.display(&file.path),
                symbols: file.symbol_count,
            })
            .collect();

        let mut summary = Summary {
            files_analyzed: files.len(),
            total_symbols: files.iter().map(|f| f.symbols).sum(),
            ..Summary::default()
        };
        for kind in DetectorKind::ALL {
            if let Some(count) = findings.count(kind) {
                summary.findings.insert(kind.as_str(), count);
            }
        }
        if let Some(unused) = &findings.unused {
            for finding in unused {
                *summary
                    .unused_by_confidence
                    .entry(finding.confidence.as_str())
                    .or_default() += 1;
            }
        }

        Self {
            workspace_root: index.root().display().to_string(),
            server_command: server_command.to_string(),
            summary,
            files,
            findings,
            skipped,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report, one section per detector that ran.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Workspace: {}", self.workspace_root);
        let _ = writeln!(out, "Server:    {}", self.server_command);
        let _ = writeln!(
            out,
            "Analyzed {} files, {} symbols",
            self.summary.files_analyzed, self.summary.total_symbols
        );
        for kind in &self.skipped {
            let _ = writeln!(out, "Skipped {kind}: server has no references provider");
        }

        if let Some(unused) = &self.findings.unused {
            section(&mut out, "Unused symbols", unused.len());
            for confidence in [Confidence::High, Confidence::Medium] {
                for finding in unused.iter().filter(|f| f.confidence == confidence) {
                    let _ = writeln!(out, "  [{}] {}", confidence.as_str(), symbol(&finding.symbol));
                }
            }
        }
        if let Some(groups) = &self.findings.signatures {
            section(&mut out, "Duplicate signatures", groups.len());
            for group in groups {
                let _ = writeln!(out, "  {} ({} symbols)", group.signature, group.members.len());
                for member in &group.members {
                    let _ = writeln!(out, "    {}", symbol(member));
                }
            }
        }
        if let Some(pairs) = &self.findings.cooccurrence {
            section(&mut out, "Co-occurring symbols", pairs.len());
            for pair in pairs {
                let _ = writeln!(
                    out,
                    "  {} + {} in {} files: {}",
                    pair.symbol_a,
                    pair.symbol_b,
                    pair.shared_files.len(),
                    pair.shared_files.join(", ")
                );
            }
        }
        if let Some(dead) = &self.findings.dead_params {
            section(&mut out, "Dead parameters", dead.len());
            for finding in dead {
                let _ = writeln!(out, "  {} in {}", finding.param, symbol(&finding.symbol));
            }
        }
        if let Some(hotspots) = &self.findings.hotspots {
            section(&mut out, "Hotspots", hotspots.len());
            for hotspot in hotspots {
                let _ = writeln!(
                    out,
                    "  {} refs across {} files: {}",
                    hotspot.reference_count,
                    hotspot.referencing_files.len(),
                    symbol(&hotspot.symbol)
                );
            }
        }
        if let Some(pairs) = &self.findings.similar_types {
            section(&mut out, "Similar types", pairs.len());
            for pair in pairs {
                let _ = writeln!(
                    out,
                    "  {:.0}% {} ~ {} shared: {}",
                    pair.similarity * 100.0,
                    symbol(&pair.type_a),
                    symbol(&pair.type_b),
                    pair.shared_properties.join(", ")
                );
            }
        }
        out
    }
}

fn section(out: &mut String, title: &str, count: usize) {
    let _ = writeln!(out, "\n{title} ({count})");
}

fn symbol(symbol: &SymbolRef) -> String {
    format!(
        "{} {} ({}:{})",
        symbol.kind.label(),
        symbol.qualified_name,
        symbol.file,
        symbol.line
    )
}
