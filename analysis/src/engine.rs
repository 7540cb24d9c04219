//! Analysis engine: drives a language client across the file set, builds the
//! symbol index, then runs the enabled detectors.
//!
//! ```text
//! Idle ──start──▶ Collecting ──all files visited──▶ Analyzing ──detectors run──▶ Done
//! ```

use std::path::{Path, PathBuf};

use sonar_lsp::{LanguageClient, ServerConfig, SessionError, SpawnSpec, SymbolKind};

use crate::detectors::{self, Findings};
use crate::files;
use crate::index::{self, SymbolIndex};
use crate::report::AnalysisReport;
use crate::settings::{AnalysisSettings, DetectorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Collecting,
    Analyzing,
    Done,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("spawn failed: {0}")]
    Spawn(#[source] SessionError),

    #[error("handshake failed: {0}")]
    Handshake(#[source] SessionError),

    #[error("language server exited while analyzing {}", file.display())]
    ProcessExited { file: PathBuf },

    #[error("analyzer already ran (state {0:?})")]
    AlreadyRan(EngineState),
}

impl AnalysisError {
    /// Short name of the phase that failed.
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Spawn(_) => "spawn",
            Self::Handshake(_) => "handshake",
            Self::ProcessExited { .. } => "collect",
            Self::AlreadyRan(_) => "start",
        }
    }
}

/// Kinds whose references the Unused detector judges.
fn wants_references_for_unused(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::Class | SymbolKind::Function | SymbolKind::Interface | SymbolKind::Method
    )
}

fn wants_references_for_hotspots(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::Class | SymbolKind::Function | SymbolKind::Interface
    )
}

/// One analysis run over one workspace.
pub struct Analyzer {
    workspace_root: PathBuf,
    settings: AnalysisSettings,
    state: EngineState,
}

impl Analyzer {
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>, settings: AnalysisSettings) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            settings,
            state: EngineState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Spawn the server and complete the handshake.
    pub async fn start_client(&self, spec: &SpawnSpec) -> Result<LanguageClient, AnalysisError> {
        LanguageClient::start(spec, self.settings.session_options())
            .await
            .map_err(|e| match e {
                SessionError::ProcessSpawnFailed { .. } => AnalysisError::Spawn(e),
                other => AnalysisError::Handshake(other),
            })
    }

    /// Collect over `paths` with an already-started client, then run the
    /// detectors. The client is stopped before returning, on success or
    /// failure.
    pub async fn analyze(
        &mut self,
        mut client: LanguageClient,
        paths: &[PathBuf],
        server: &ServerConfig,
    ) -> Result<AnalysisReport, AnalysisError> {
        if self.state != EngineState::Idle {
            return Err(AnalysisError::AlreadyRan(self.state));
        }

        let mut skipped = Vec::new();
        let mut enabled = self.settings.enabled();
        if !client.capabilities().references {
            enabled.retain(|kind| {
                let keep = !kind.needs_references();
                if !keep {
                    tracing::warn!(detector = %kind, "Server has no references provider; skipping");
                    skipped.push(*kind);
                }
                keep
            });
        }

        self.transition(EngineState::Collecting);
        let collected = self
            .collect(&mut client, paths, &enabled, server.language_id())
            .await;
        client.stop().await;
        let index = match collected {
            Ok(index) => index,
            Err(e) => {
                self.transition(EngineState::Done);
                return Err(e);
            }
        };

        self.transition(EngineState::Analyzing);
        let mut findings = Findings::default();
        for kind in &enabled {
            detectors::run(*kind, &index, &self.settings, &mut findings);
        }
        self.transition(EngineState::Done);

        Ok(AnalysisReport::new(&index, server.command(), findings, skipped))
    }

    fn transition(&mut self, next: EngineState) {
        tracing::info!(from = ?self.state, to = ?next, "Analyzer state");
        self.state = next;
    }

    async fn collect(
        &self,
        client: &mut LanguageClient,
        paths: &[PathBuf],
        enabled: &[DetectorKind],
        default_language_id: &str,
    ) -> Result<SymbolIndex, AnalysisError> {
        let want_unused = enabled.contains(&DetectorKind::Unused);
        let want_hotspots = enabled.contains(&DetectorKind::Hotspots);
        let want_hover = enabled.iter().any(|kind| kind.needs_hover());

        let mut index = SymbolIndex::new(&self.workspace_root);
        for (n, path) in paths.iter().enumerate() {
            if client.has_exited() {
                return Err(AnalysisError::ProcessExited { file: path.clone() });
            }

            let text = match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %path.display(), "Skipping unreadable file: {e}");
                    continue;
                }
            };
            let uri = match sonar_lsp::path_to_file_uri(path) {
                Ok(uri) => uri.to_string(),
                Err(e) => {
                    tracing::warn!("Skipping file: {e}");
                    continue;
                }
            };
            let language_id = files::language_id_for(path).unwrap_or(default_language_id);

            if client.open(&uri, language_id, text.clone()).is_err() {
                return Err(AnalysisError::ProcessExited { file: path.clone() });
            }

            let outline = client.outline(&uri).await;
            let mut entries = index::flatten(&outline, path, &uri);
            for entry in &mut entries {
                if client.has_exited() {
                    break;
                }
                let wants_references = (want_unused && wants_references_for_unused(entry.kind))
                    || (want_hotspots && wants_references_for_hotspots(entry.kind));
                if wants_references {
                    entry.references = Some(
                        client
                            .references(&uri, entry.selection_point(), false)
                            .await,
                    );
                }
                if want_hover && entry.kind.is_callable() {
                    entry.hover = client.hover_text(&uri, entry.selection_point()).await;
                }
            }

            if let Err(e) = client.close(&uri) {
                tracing::debug!(uri, "didClose failed: {e}");
            }
            if client.has_exited() {
                return Err(AnalysisError::ProcessExited { file: path.clone() });
            }

            tracing::debug!(
                file = %path.display(),
                symbols = entries.len(),
                progress = format!("{}/{}", n + 1, paths.len()),
                "Indexed file"
            );
            index.push_file(path.clone(), uri, text, entries);
        }
        Ok(index)
    }
}
