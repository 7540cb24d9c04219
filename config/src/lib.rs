//! Configuration loading for sonar.
//!
//! ```toml
//! [server]
//! command = "typescript-language-server"
//! args = ["--stdio"]
//!
//! [analysis]
//! detectors = ["unused", "hotspots"]
//! hotspot_threshold = 15
//!
//! [files]
//! extensions = ["ts", "tsx"]
//! max_files = 500
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use sonar_analysis::{AnalysisSettings, FileSelection};
use sonar_lsp::ServerConfig;

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = ".sonar.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SonarConfig {
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub files: FileSelection,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl SonarConfig {
    /// Parse a config document. `${VAR}` references in the server command
    /// and arguments are expanded.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        if let Some(server) = config.server.as_mut() {
            server.command = expand_env_vars(&server.command);
            for arg in &mut server.args {
                *arg = expand_env_vars(arg);
            }
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Resolve and load the config for `project`.
    ///
    /// An explicit path must exist. Otherwise `<project>/.sonar.toml` is
    /// tried, then `~/.sonar/config.toml`; no file at all yields `None`.
    pub fn discover(
        explicit: Option<&Path>,
        project: &Path,
    ) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path).map(|config| Some((path.to_path_buf(), config)));
        }

        let candidates = [Some(project.join(PROJECT_CONFIG_FILE)), config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
        }
        Ok(None)
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if var.is_empty() {
                    // `${}` is kept as written.
                    out.push_str("${}");
                } else {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unclosed reference: keep the remainder verbatim.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// User-level config file: `~/.sonar/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sonar").join("config.toml"))
}
