//! Public types consumed by the analysis engine.
//!
//! These types define the interface between `sonar-lsp` and
//! `sonar-analysis`: the engine builds a [`ServerConfig`], reads
//! [`ServerCapabilities`] after the handshake, and receives outlines and
//! locations from the query facade.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Zero-based line/character position (UTF-16 code units per LSP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `position` lies within this range (end inclusive).
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

/// Symbol kind, mapped from the LSP numeric `SymbolKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    EnumMember,
    Struct,
    Event,
    Operator,
    TypeParameter,
    /// Literal-ish kinds (string, number, key, ...) and unknown values.
    Other,
}

impl SymbolKind {
    #[must_use]
    pub fn from_lsp(value: u64) -> Self {
        match value {
            1 => Self::File,
            2 => Self::Module,
            3 => Self::Namespace,
            4 => Self::Package,
            5 => Self::Class,
            6 => Self::Method,
            7 => Self::Property,
            8 => Self::Field,
            9 => Self::Constructor,
            10 => Self::Enum,
            11 => Self::Interface,
            12 => Self::Function,
            13 => Self::Variable,
            14 => Self::Constant,
            22 => Self::EnumMember,
            23 => Self::Struct,
            24 => Self::Event,
            25 => Self::Operator,
            26 => Self::TypeParameter,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Package => "package",
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Field => "field",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::EnumMember => "enum_member",
            Self::Struct => "struct",
            Self::Event => "event",
            Self::Operator => "operator",
            Self::TypeParameter => "type_parameter",
            Self::Other => "other",
        }
    }

    /// Functions and methods: things with a parameter list.
    #[must_use]
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }

    /// Classes, interfaces and structs: things with declared properties.
    #[must_use]
    pub fn is_type_like(self) -> bool {
        matches!(self, Self::Class | Self::Interface | Self::Struct)
    }
}

/// One node of a document outline as returned by the server.
///
/// Flat `SymbolInformation` answers become childless nodes with `container`
/// set to the server-reported container name.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub detail: Option<String>,
    /// Full declaration span.
    pub range: Range,
    /// Span of the name itself.
    pub selection_range: Range,
    pub container: Option<String>,
    pub children: Vec<DocumentSymbolNode>,
}

/// Configuration for the language server to spawn.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Executable command (e.g. "typescript-language-server").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Language identifier for documents whose extension has no known tag.
    #[serde(default = "default_language_id")]
    pub language_id: String,
    /// Passed verbatim as `initializationOptions`.
    #[serde(default)]
    pub initialization_options: Option<serde_json::Value>,
}

fn default_language_id() -> String {
    "plaintext".to_string()
}

impl ServerConfig {
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            language_id: default_language_id(),
            initialization_options: None,
        }
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }
}

/// Everything needed to launch a session against a workspace.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub server: ServerConfig,
    pub workspace_root: PathBuf,
}

/// Timeouts governing a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Bound on the `initialize` round trip.
    pub init_timeout: Duration,
    /// Default bound for facade queries.
    pub request_timeout: Duration,
    /// How long `stop()` waits for the process before killing it.
    pub shutdown_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

/// Capability flags recovered from the `initialize` result.
///
/// A provider counts as supported when present and not `false` (servers may
/// send `true` or an options object).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub document_symbol: bool,
    pub references: bool,
    pub hover: bool,
}

impl ServerCapabilities {
    /// Assume everything is supported; used when a server omits capabilities.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            document_symbol: true,
            references: true,
            hover: true,
        }
    }

    #[must_use]
    pub fn from_initialize_result(result: &serde_json::Value) -> Self {
        let Some(capabilities) = result.get("capabilities").filter(|c| c.is_object()) else {
            return Self::all();
        };
        let provided = |key: &str| {
            capabilities
                .get(key)
                .is_some_and(|v| !v.is_null() && v.as_bool() != Some(false))
        };
        Self {
            document_symbol: provided("documentSymbolProvider"),
            references: provided("referencesProvider"),
            hover: provided("hoverProvider"),
        }
    }
}
